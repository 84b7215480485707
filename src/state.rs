//! Shared and per-loop state
//!
//! `OverrideState` is the only state shared between the monitoring loop and
//! the hotkey listener. `TrackedWindow` belongs to the monitoring loop alone.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Whether screen-based switching is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Device follows the tracked window's screen
    Automatic,
    /// Fixed override device; automatic switching suspended
    Manual,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Automatic => f.write_str("automatic"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

/// Atomic override flag
///
/// Device switches run under [`OverrideState::switching`], and the toggle
/// flips the mode under the same lock. A switch that checked the mode
/// therefore finishes before the mode can change under it.
#[derive(Debug, Default)]
pub struct OverrideState {
    manual: AtomicBool,
    switching: Mutex<()>,
}

impl OverrideState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self) -> Mode {
        if self.manual.load(Ordering::Acquire) {
            Mode::Manual
        } else {
            Mode::Automatic
        }
    }

    /// Exclusive right to check the mode and then switch devices
    pub async fn switching(&self) -> MutexGuard<'_, ()> {
        self.switching.lock().await
    }

    /// Flip the mode and return the new one
    pub fn toggle(&self) -> Mode {
        let was_manual = self.manual.fetch_xor(true, Ordering::AcqRel);
        if was_manual {
            Mode::Automatic
        } else {
            Mode::Manual
        }
    }
}

/// What the monitoring loop remembers between polls
#[derive(Debug, Default)]
pub struct TrackedWindow {
    /// Configured title that matched most recently
    pub title: Option<String>,
    /// Monitor the window last resolved to; kept across missed polls
    pub screen: Option<String>,
    /// Consecutive polls without a match
    pub not_found: u32,
}

impl TrackedWindow {
    /// Count a poll where no configured window was found
    pub fn record_miss(&mut self) -> u32 {
        self.not_found += 1;
        self.not_found
    }

    /// Record a found window; returns true when its screen differs from the remembered one
    pub fn record_hit(&mut self, title: &str, screen: &str) -> bool {
        self.not_found = 0;

        if self.title.as_deref() != Some(title) {
            debug!("Tracking window '{}'", title);
            self.title = Some(title.to_string());
        }

        if self.screen.as_deref() == Some(screen) {
            return false;
        }
        self.screen = Some(screen.to_string());
        true
    }
}
