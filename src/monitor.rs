//! Monitoring loop
//!
//! Polls the tracked window's screen on a fixed cadence and switches the
//! audio output when the screen changes. The loop ends once no configured
//! window has been found for `not_found_threshold` consecutive polls.
//!
//! ```text
//!            found, same screen          found, new screen → switch
//!              ┌──────┐                    ┌──────┐
//!              ▼      │                    ▼      │
//!        TRACKING(screen) ─── not found ──▶ LOST(n) ── n == threshold ──▶ exit
//!              ▲                              │
//!              └────────── found ─────────────┘
//! ```
//!
//! Manual override suspends everything except the cadence itself.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::compositor::WindowLocator;
use crate::config::{Config, ScreenDevices};
use crate::device::DeviceSwitcher;
use crate::resolver;
use crate::state::{Mode, OverrideState, TrackedWindow};
use crate::toggle::Resync;

/// Result of a single poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cycle {
    /// Override active; nothing was looked up
    Suspended,
    /// Window found on the remembered screen
    Unchanged,
    /// Window found on a different screen; a switch was attempted if a device maps to it
    Moved { screen: String },
    /// No configured window found; consecutive miss count
    Missing { count: u32 },
    /// Miss count reached the threshold
    Closed,
}

pub struct Monitor<L, S> {
    titles: Vec<String>,
    devices: ScreenDevices,
    threshold: u32,
    interval: Duration,
    locator: L,
    switcher: Arc<S>,
    mode: Arc<OverrideState>,
    tracked: TrackedWindow,
}

impl<L: WindowLocator, S: DeviceSwitcher> Monitor<L, S> {
    pub fn new(config: &Config, locator: L, switcher: Arc<S>, mode: Arc<OverrideState>) -> Self {
        Self {
            titles: config.window_titles.clone(),
            devices: config.screen_devices.clone(),
            threshold: config.not_found_threshold,
            interval: config.check_interval,
            locator,
            switcher,
            mode,
            tracked: TrackedWindow::default(),
        }
    }

    #[must_use]
    pub fn tracked(&self) -> &TrackedWindow {
        &self.tracked
    }

    /// Poll until the tracked window is gone for good
    ///
    /// Resync requests from the override toggle are served between ticks
    /// without disturbing the cadence. Either path can end the loop.
    pub async fn run(&mut self, resync: &mut mpsc::UnboundedReceiver<Resync>) {
        info!("Monitoring windows: {:?}", self.titles);
        info!(
            "Stopping after {} consecutive polls without a window",
            self.threshold
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let cycle = tokio::select! {
                _ = ticker.tick() => self.poll_once().await,
                Some(Resync) = resync.recv() => self.resync().await,
            };
            if cycle == Cycle::Closed {
                return;
            }
        }
    }

    /// One regular poll
    pub async fn poll_once(&mut self) -> Cycle {
        if self.mode.get() == Mode::Manual {
            debug!("Override active, skipping poll");
            return Cycle::Suspended;
        }

        let Some((title, screen)) = self.find_window().await else {
            return self.miss();
        };

        if self.tracked.title.as_deref() != Some(title.as_str()) {
            info!("Tracking window '{}'", title);
        }
        if !self.tracked.record_hit(&title, &screen) {
            return Cycle::Unchanged;
        }

        info!("Window '{}' moved to screen: {}", title, screen);
        self.switch_for(&screen).await;
        Cycle::Moved { screen }
    }

    /// Re-resolve immediately after the override is released
    ///
    /// Same as a poll, except the device is switched even if the screen
    /// matches the remembered one: the override device is still active.
    pub async fn resync(&mut self) -> Cycle {
        if self.mode.get() == Mode::Manual {
            debug!("Override re-enabled before resync, skipping");
            return Cycle::Suspended;
        }

        let Some((title, screen)) = self.find_window().await else {
            warn!("Override released but no configured window is visible");
            return self.miss();
        };

        self.tracked.record_hit(&title, &screen);
        info!("Window '{}' is on screen: {}", title, screen);
        self.switch_for(&screen).await;
        Cycle::Moved { screen }
    }

    /// Count a cycle without a window
    fn miss(&mut self) -> Cycle {
        let count = self.tracked.record_miss();
        info!("Window not found ({}/{})", count, self.threshold);
        if count >= self.threshold {
            info!("Window closed, stopping monitor");
            return Cycle::Closed;
        }
        Cycle::Missing { count }
    }

    /// First configured title that resolves to a screen, from one snapshot
    async fn find_window(&self) -> Option<(String, String)> {
        self.locator.locate_any(&self.titles).await
    }

    async fn switch_for(&self, screen: &str) {
        let Some(device) = resolver::resolve(screen, &self.devices) else {
            warn!("No audio device configured for screen {}", screen);
            return;
        };

        // The hotkey may have fired while the window was being located;
        // holding the lock keeps it from firing until this switch completes
        let _switching = self.mode.switching().await;
        if self.mode.get() == Mode::Manual {
            debug!("Override became active, not switching to '{}'", device);
            return;
        }

        self.switcher.set_device(device).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use crate::test_utils::{RecordingSwitcher, ScriptedLocator};
    use crate::toggle::OverrideToggle;
    use pretty_assertions::assert_eq;

    type TestMonitor = Monitor<Arc<ScriptedLocator>, RecordingSwitcher>;

    struct Harness {
        monitor: TestMonitor,
        locator: Arc<ScriptedLocator>,
        switcher: Arc<RecordingSwitcher>,
        mode: Arc<OverrideState>,
    }

    fn config(json: &str) -> Config {
        let file: ConfigFile = serde_json::from_str(json).unwrap();
        Config::from_config_file(file).unwrap()
    }

    fn scenario_config() -> Config {
        config(
            r#"{"window_titles":["App"],
                "screen_devices":{"DISPLAY1":"Speakers","DISPLAY2":"Headset"},
                "not_found_threshold":2,"check_interval":1}"#,
        )
    }

    fn harness(config: &Config) -> Harness {
        let locator = Arc::new(ScriptedLocator::default());
        let switcher = Arc::new(RecordingSwitcher::default());
        let mode = Arc::new(OverrideState::new());
        let monitor = Monitor::new(
            config,
            Arc::clone(&locator),
            Arc::clone(&switcher),
            Arc::clone(&mode),
        );
        Harness {
            monitor,
            locator,
            switcher,
            mode,
        }
    }

    #[tokio::test]
    async fn test_first_sighting_switches_then_debounces() {
        let mut h = harness(&scenario_config());
        h.locator.place("App", "DISPLAY2-xyz");

        assert_eq!(
            h.monitor.poll_once().await,
            Cycle::Moved {
                screen: "DISPLAY2-xyz".to_string()
            }
        );
        assert_eq!(h.switcher.calls(), vec!["Headset"]);

        assert_eq!(h.monitor.poll_once().await, Cycle::Unchanged);
        assert_eq!(h.switcher.calls(), vec!["Headset"]);
    }

    #[tokio::test]
    async fn test_exits_after_threshold_misses_without_switching() {
        let mut h = harness(&scenario_config());

        assert_eq!(h.monitor.poll_once().await, Cycle::Missing { count: 1 });
        assert_eq!(h.monitor.poll_once().await, Cycle::Closed);
        assert!(h.switcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_every_screen_change_switches_in_order() {
        let mut h = harness(&scenario_config());

        for screen in ["DISPLAY1", "DISPLAY2", "DISPLAY1"] {
            h.locator.place("App", screen);
            h.monitor.poll_once().await;
        }

        assert_eq!(h.switcher.calls(), vec!["Speakers", "Headset", "Speakers"]);
    }

    #[tokio::test]
    async fn test_switch_iff_screen_differs_from_previous() {
        let mut h = harness(&scenario_config());
        let screens = [
            "DISPLAY1", "DISPLAY1", "DISPLAY2", "DISPLAY2", "DISPLAY2", "DISPLAY1", "DISPLAY2",
            "DISPLAY2", "DISPLAY1", "DISPLAY1",
        ];

        let mut expected = Vec::new();
        let mut previous: Option<&str> = None;
        for screen in screens {
            h.locator.place("App", screen);
            h.monitor.poll_once().await;
            if previous != Some(screen) {
                expected.push(if screen == "DISPLAY1" { "Speakers" } else { "Headset" });
            }
            previous = Some(screen);
        }

        assert_eq!(h.switcher.calls(), expected);
    }

    #[tokio::test]
    async fn test_override_suspends_and_release_resyncs_once() {
        let config = config(
            r#"{"window_titles":["App"],
                "screen_devices":{"DISPLAY1":"Speakers","DISPLAY2":"Headset"},
                "not_found_threshold":2,"override_device":"Override"}"#,
        );
        let mut h = harness(&config);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let toggle = OverrideToggle::new(
            Arc::clone(&h.mode),
            Arc::clone(&h.switcher),
            config.override_device.clone(),
            tx,
            false,
        );

        h.locator.place("App", "DISPLAY1");
        h.monitor.poll_once().await;
        assert_eq!(h.switcher.calls(), vec!["Speakers"]);

        // Manual: override device forced immediately, movement ignored
        toggle.fire().await;
        assert_eq!(h.switcher.calls(), vec!["Speakers", "Override"]);
        h.locator.place("App", "DISPLAY2");
        assert_eq!(h.monitor.poll_once().await, Cycle::Suspended);
        h.locator.place("App", "DISPLAY1");
        assert_eq!(h.monitor.poll_once().await, Cycle::Suspended);
        assert_eq!(h.switcher.calls(), vec!["Speakers", "Override"]);

        // Back to automatic: one immediate switch to the current screen's device,
        // even though it matches the screen remembered before the override
        toggle.fire().await;
        let request = rx.try_recv().unwrap();
        assert_eq!(request, Resync);
        h.monitor.resync().await;
        assert_eq!(h.switcher.calls(), vec!["Speakers", "Override", "Speakers"]);

        // Next regular poll is debounced
        assert_eq!(h.monitor.poll_once().await, Cycle::Unchanged);
        assert_eq!(h.switcher.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_manual_mode_never_counts_misses() {
        let mut h = harness(&scenario_config());
        h.mode.toggle();

        for _ in 0..5 {
            assert_eq!(h.monitor.poll_once().await, Cycle::Suspended);
        }
        assert_eq!(h.monitor.tracked().not_found, 0);
    }

    #[tokio::test]
    async fn test_hit_resets_miss_counter() {
        let config = config(
            r#"{"window_titles":["App"],"screen_devices":{"DISPLAY1":"Speakers"},
                "not_found_threshold":3}"#,
        );
        let mut h = harness(&config);

        assert_eq!(h.monitor.poll_once().await, Cycle::Missing { count: 1 });
        assert_eq!(h.monitor.poll_once().await, Cycle::Missing { count: 2 });
        h.locator.place("App", "DISPLAY1");
        h.monitor.poll_once().await;
        assert_eq!(h.monitor.tracked().not_found, 0);

        h.locator.close("App");
        assert_eq!(h.monitor.poll_once().await, Cycle::Missing { count: 1 });
        assert_eq!(h.monitor.poll_once().await, Cycle::Missing { count: 2 });
        assert_eq!(h.monitor.poll_once().await, Cycle::Closed);
    }

    #[tokio::test]
    async fn test_reappearing_on_same_screen_does_not_switch() {
        let mut h = harness(&scenario_config());
        h.locator.place("App", "DISPLAY1");
        h.monitor.poll_once().await;

        h.locator.close("App");
        assert_eq!(h.monitor.poll_once().await, Cycle::Missing { count: 1 });
        h.locator.place("App", "DISPLAY1");
        assert_eq!(h.monitor.poll_once().await, Cycle::Unchanged);

        assert_eq!(h.switcher.calls(), vec!["Speakers"]);
    }

    #[tokio::test]
    async fn test_earlier_title_preferred() {
        let config = config(
            r#"{"window_titles":["Primary","Secondary"],
                "screen_devices":{"DISPLAY1":"Speakers","DISPLAY2":"Headset"}}"#,
        );
        let mut h = harness(&config);
        h.locator.place("Secondary", "DISPLAY2");
        h.locator.place("Primary", "DISPLAY1");

        h.monitor.poll_once().await;
        assert_eq!(h.monitor.tracked().title.as_deref(), Some("Primary"));
        assert_eq!(h.switcher.calls(), vec!["Speakers"]);

        h.locator.close("Primary");
        h.monitor.poll_once().await;
        assert_eq!(h.monitor.tracked().title.as_deref(), Some("Secondary"));
        assert_eq!(h.switcher.calls(), vec!["Speakers", "Headset"]);
    }

    #[tokio::test]
    async fn test_unmapped_screen_is_remembered_without_switching() {
        let mut h = harness(&scenario_config());
        h.locator.place("App", "DISPLAY3");

        assert_eq!(
            h.monitor.poll_once().await,
            Cycle::Moved {
                screen: "DISPLAY3".to_string()
            }
        );
        assert!(h.switcher.calls().is_empty());
        assert_eq!(h.monitor.poll_once().await, Cycle::Unchanged);
    }

    #[tokio::test]
    async fn test_switch_failure_does_not_stop_tracking() {
        let mut h = harness(&scenario_config());
        h.switcher.set_failing(true);
        h.locator.place("App", "DISPLAY1");
        h.monitor.poll_once().await;

        // Not retried while the screen is unchanged
        assert_eq!(h.monitor.poll_once().await, Cycle::Unchanged);

        h.switcher.set_failing(false);
        h.locator.place("App", "DISPLAY2");
        h.monitor.poll_once().await;
        assert_eq!(h.switcher.calls(), vec!["Speakers", "Headset"]);
    }

    #[tokio::test]
    async fn test_resync_miss_counts_toward_threshold() {
        let mut h = harness(&scenario_config());

        assert_eq!(h.monitor.poll_once().await, Cycle::Missing { count: 1 });
        assert_eq!(h.monitor.resync().await, Cycle::Closed);
        assert_eq!(h.monitor.tracked().not_found, 2);
        assert!(h.switcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resync_hit_resets_counter() {
        let mut h = harness(&scenario_config());
        assert_eq!(h.monitor.poll_once().await, Cycle::Missing { count: 1 });

        h.locator.place("App", "DISPLAY2");
        assert_eq!(
            h.monitor.resync().await,
            Cycle::Moved {
                screen: "DISPLAY2".to_string()
            }
        );
        assert_eq!(h.monitor.tracked().not_found, 0);
        assert_eq!(h.switcher.calls(), vec!["Headset"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_resync_reaches_threshold() {
        let mut h = harness(&scenario_config());
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            // After the first (missed) tick, before the second
            tokio::time::sleep(Duration::from_millis(500)).await;
            tx.send(Resync).unwrap();
            std::future::pending::<()>().await;
        });

        tokio::time::timeout(Duration::from_millis(900), h.monitor.run(&mut rx))
            .await
            .expect("resync miss should close the monitor before the next tick");
        assert_eq!(h.monitor.tracked().not_found, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_override_waits_for_switch_in_progress() {
        let config = config(
            r#"{"window_titles":["App"],"screen_devices":{"DISPLAY1":"Speakers"},
                "override_device":"Override"}"#,
        );
        let mut h = harness(&config);
        let (tx, _rx) = mpsc::unbounded_channel();
        let toggle = OverrideToggle::new(
            Arc::clone(&h.mode),
            Arc::clone(&h.switcher),
            config.override_device.clone(),
            tx,
            false,
        );
        // The automatic switch is slow, the override one instant
        h.switcher.set_delay("Speakers", Duration::from_secs(1));
        h.locator.place("App", "DISPLAY1");

        let (cycle, mode) = tokio::join!(h.monitor.poll_once(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            toggle.fire().await
        });

        assert_eq!(
            cycle,
            Cycle::Moved {
                screen: "DISPLAY1".to_string()
            }
        );
        assert_eq!(mode, Mode::Manual);
        // Completion order: the override device is the one left active
        assert_eq!(h.switcher.calls(), vec!["Speakers", "Override"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_when_window_stays_closed() {
        let mut h = harness(&scenario_config());
        let (_tx, mut rx) = mpsc::unbounded_channel();

        tokio::time::timeout(Duration::from_secs(30), h.monitor.run(&mut rx))
            .await
            .expect("monitor should stop after the threshold");
        assert_eq!(h.monitor.tracked().not_found, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_serves_resync_between_ticks() {
        let mut h = harness(&scenario_config());
        h.locator.place("App", "DISPLAY1");
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            tx.send(Resync).unwrap();
        });

        let _ = tokio::time::timeout(Duration::from_millis(1500), h.monitor.run(&mut rx)).await;

        // First tick switches, resync forces one more switch to the same device
        assert_eq!(h.switcher.calls(), vec!["Speakers", "Speakers"]);
    }
}
