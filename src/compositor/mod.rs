//! Compositor abstraction layer
//!
//! Answers "which monitor is this window on?" using the compositor's own IPC:
//! - Sway: i3-ipc socket (`GET_TREE`, `GET_OUTPUTS`)
//! - Hyprland: `hyprctl -j clients` / `hyprctl -j monitors`
//!
//! Each backend produces a [`Layout`] snapshot (window rectangles plus monitor
//! rectangles in one logical coordinate space); the geometry that maps a
//! window to a monitor is shared.

mod hyprland;
mod sway;

use color_eyre::eyre::{self, Result};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use hyprland::HyprlandCompositor;
pub use sway::SwayCompositor;

// ============================================================================
// Geometry
// ============================================================================

/// Rectangle in the compositor's logical coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    #[must_use]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Integer center point
    #[must_use]
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Containment with both edges inclusive
    #[must_use]
    pub fn contains(&self, (px, py): (i32, i32)) -> bool {
        self.x <= px && px <= self.x + self.width && self.y <= py && py <= self.y + self.height
    }
}

/// A mapped top-level window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowInfo {
    pub title: String,
    pub rect: Rect,
}

/// An active output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorInfo {
    /// Identifier matched against `screen_devices` keys
    pub id: String,
    pub rect: Rect,
}

impl MonitorInfo {
    /// Identifier from connector name plus an optional human description
    #[must_use]
    pub fn new(name: &str, description: &str, rect: Rect) -> Self {
        let description = description.trim();
        let id = if description.is_empty() {
            name.to_string()
        } else {
            format!("{name} {description}")
        };
        Self { id, rect }
    }
}

/// Windows and monitors as seen at one instant
#[derive(Debug, Clone, Default, Serialize)]
pub struct Layout {
    pub windows: Vec<WindowInfo>,
    pub monitors: Vec<MonitorInfo>,
}

impl Layout {
    /// Monitor containing the center of the first window whose title contains `title`
    #[must_use]
    pub fn screen_of(&self, title: &str) -> Option<&str> {
        let window = self.windows.iter().find(|w| w.title.contains(title))?;
        self.monitor_at(window.rect.center())
    }

    /// First title, in order, that resolves to a monitor, with that monitor
    #[must_use]
    pub fn locate_any<'a>(&'a self, titles: &'a [String]) -> Option<(&'a str, &'a str)> {
        titles
            .iter()
            .find_map(|title| Some((title.as_str(), self.screen_of(title)?)))
    }

    /// Monitor whose bounds contain `point`
    #[must_use]
    pub fn monitor_at(&self, point: (i32, i32)) -> Option<&str> {
        self.monitors
            .iter()
            .find(|m| m.rect.contains(point))
            .map(|m| m.id.as_str())
    }
}

// ============================================================================
// Locator
// ============================================================================

/// Resolves a window title to the monitor it currently occupies
pub trait WindowLocator: Send + Sync {
    /// `None` when no window matches, it sits outside every monitor, or the lookup failed
    fn locate(&self, title: &str) -> impl Future<Output = Option<String>> + Send;

    /// First of `titles` that resolves, paired with its monitor
    ///
    /// Backends that can snapshot the desktop should answer from one snapshot.
    fn locate_any(
        &self,
        titles: &[String],
    ) -> impl Future<Output = Option<(String, String)>> + Send {
        async move {
            for title in titles {
                if let Some(screen) = self.locate(title).await {
                    return Some((title.clone(), screen));
                }
            }
            None
        }
    }
}

impl<T: WindowLocator> WindowLocator for Arc<T> {
    fn locate(&self, title: &str) -> impl Future<Output = Option<String>> + Send {
        (**self).locate(title)
    }

    fn locate_any(
        &self,
        titles: &[String],
    ) -> impl Future<Output = Option<(String, String)>> + Send {
        (**self).locate_any(titles)
    }
}

/// Supported compositor backends
#[derive(Debug)]
enum Backend {
    Sway(SwayCompositor),
    Hyprland(HyprlandCompositor),
}

/// Window locator backed by the running compositor
#[derive(Debug)]
pub struct CompositorLocator {
    backend: Backend,
}

impl CompositorLocator {
    /// Detect the running compositor from the environment
    ///
    /// # Errors
    /// Returns an error if no supported compositor is detected.
    pub fn detect() -> Result<Self> {
        if let Ok(sway) = SwayCompositor::new() {
            info!("Using Sway IPC at {}", sway.socket_path());
            return Ok(Self {
                backend: Backend::Sway(sway),
            });
        }

        if let Ok(hyprland) = HyprlandCompositor::new() {
            info!("Using Hyprland IPC (hyprctl)");
            return Ok(Self {
                backend: Backend::Hyprland(hyprland),
            });
        }

        eyre::bail!(
            "No supported compositor found.\n\
             \n\
             Supported compositors:\n\
             - Sway (SWAYSOCK must be set)\n\
             - Hyprland (HYPRLAND_INSTANCE_SIGNATURE must be set)"
        )
    }

    /// Compositor name for display
    #[must_use]
    pub fn name(&self) -> &'static str {
        match &self.backend {
            Backend::Sway(_) => "Sway",
            Backend::Hyprland(_) => "Hyprland",
        }
    }

    /// Snapshot of all windows and monitors
    ///
    /// # Errors
    /// Returns an error if the compositor cannot be queried or returns unexpected data.
    pub async fn layout(&self) -> Result<Layout> {
        match &self.backend {
            Backend::Sway(sway) => sway.layout().await,
            Backend::Hyprland(hyprland) => hyprland.layout().await,
        }
    }
}

impl CompositorLocator {
    async fn snapshot(&self) -> Option<Layout> {
        self.layout()
            .await
            .inspect_err(|e| warn!("Window lookup failed: {:#}", e))
            .ok()
    }
}

impl WindowLocator for CompositorLocator {
    async fn locate(&self, title: &str) -> Option<String> {
        let layout = self.snapshot().await?;
        let screen = layout.screen_of(title).map(str::to_string);
        debug!("Locate '{}': {:?}", title, screen);
        screen
    }

    /// One compositor query per call, whatever the number of titles
    async fn locate_any(&self, titles: &[String]) -> Option<(String, String)> {
        let layout = self.snapshot().await?;
        let found = layout
            .locate_any(titles)
            .map(|(title, screen)| (title.to_string(), screen.to_string()));
        debug!("Locate {:?}: {:?}", titles, found);
        found
    }
}
