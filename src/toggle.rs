//! Manual override toggle
//!
//! A held hotkey is polled every 100ms and fires once per press. Entering
//! manual mode forces the fixed override device; leaving it asks the
//! monitoring loop for an immediate re-resolution of the window's screen.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::device::DeviceSwitcher;
use crate::notification::{get_device_icon, send_notification};
use crate::state::{Mode, OverrideState};

/// How often the trigger is sampled
pub const TRIGGER_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A level-triggered input such as a held key chord
pub trait TriggerSource {
    fn is_pressed(&mut self) -> bool;
}

/// Turns a level signal into single firings on press
#[derive(Debug, Default)]
pub struct EdgeDetector {
    held: bool,
}

impl EdgeDetector {
    /// True only on the transition from released to pressed
    pub fn update(&mut self, pressed: bool) -> bool {
        let fired = pressed && !self.held;
        self.held = pressed;
        fired
    }
}

/// Request sent to the monitoring loop when automatic mode resumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resync;

/// Flips the override mode and performs the side effects of each transition
pub struct OverrideToggle<S> {
    mode: Arc<OverrideState>,
    switcher: Arc<S>,
    override_device: Option<String>,
    resync: mpsc::UnboundedSender<Resync>,
    notify: bool,
}

impl<S: DeviceSwitcher> OverrideToggle<S> {
    pub fn new(
        mode: Arc<OverrideState>,
        switcher: Arc<S>,
        override_device: Option<String>,
        resync: mpsc::UnboundedSender<Resync>,
        notify: bool,
    ) -> Self {
        Self {
            mode,
            switcher,
            override_device,
            resync,
            notify,
        }
    }

    /// Handle one trigger firing; returns the mode now in effect
    pub async fn fire(&self) -> Mode {
        // Waits out a switch the loop already committed to, so the override lands last
        let switching = self.mode.switching().await;
        let mode = self.mode.toggle();

        match mode {
            Mode::Manual => {
                if let Some(device) = &self.override_device {
                    info!("Override ON: forcing '{}'", device);
                    self.switcher.set_device(device).await;
                }
                drop(switching);
                if self.override_device.is_none() {
                    warn!("Override ON: no override_device configured, switching suspended only");
                }
                self.notify_toggle("Override on", self.override_device.as_deref());
            }
            Mode::Automatic => {
                drop(switching);
                info!("Override OFF: following the tracked window again");
                if self.resync.send(Resync).is_err() {
                    warn!("Monitor is not running; cannot re-resolve screen");
                }
                self.notify_toggle("Override off", None);
            }
        }

        mode
    }

    fn notify_toggle(&self, summary: &str, device: Option<&str>) {
        if !self.notify {
            return;
        }
        let body = device.map_or_else(
            || "Audio follows the tracked window".to_string(),
            |d| format!("Fixed output: {d}"),
        );
        let icon = device.map(get_device_icon);
        if let Err(e) = send_notification(summary, &body, icon.as_deref()) {
            warn!("Notification failed: {:#}", e);
        }
    }
}

/// Poll `trigger` forever, firing the toggle on each press
pub async fn listen<T: TriggerSource, S: DeviceSwitcher>(mut trigger: T, toggle: &OverrideToggle<S>) {
    let mut edge = EdgeDetector::default();
    let mut ticker = tokio::time::interval(TRIGGER_POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if edge.update(trigger.is_pressed()) {
            toggle.fire().await;
        }
    }
}
