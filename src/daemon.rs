//! Monitor mode
//!
//! Wires the compositor locator, switch command and override hotkey together
//! and runs the monitoring loop and hotkey listener until the tracked window
//! is gone or the process is interrupted.

use color_eyre::eyre::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::compositor::CompositorLocator;
use crate::config::Config;
use crate::device::CommandSwitcher;
use crate::hotkey::KeyboardTrigger;
use crate::monitor::Monitor;
use crate::state::OverrideState;
use crate::toggle::{self, OverrideToggle};

/// Run the monitor with the given configuration
///
/// Logging must already be initialized.
///
/// # Errors
/// Returns an error if no compositor is detected, the switch command is
/// unusable, or signal handlers cannot be installed.
pub async fn run(config: Config) -> Result<()> {
    info!("Starting SoundSurfer {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Loaded {} window titles, {} screen mappings",
        config.window_titles.len(),
        config.screen_devices.len()
    );

    let locator = CompositorLocator::detect()?;
    info!("Compositor: {}", locator.name());

    let switcher = Arc::new(CommandSwitcher::from_config(&config)?);
    let mode = Arc::new(OverrideState::new());
    let (resync_tx, mut resync_rx) = mpsc::unbounded_channel();

    let override_toggle = OverrideToggle::new(
        Arc::clone(&mode),
        Arc::clone(&switcher),
        config.override_device.clone(),
        resync_tx,
        config.notify_override,
    );
    let mut monitor = Monitor::new(&config, locator, switcher, mode);

    let trigger = match KeyboardTrigger::open(config.override_hotkey.clone()) {
        Ok(trigger) => Some(trigger),
        Err(e) => {
            warn!("Override hotkey disabled: {:#}", e);
            None
        }
    };
    let hotkey = async {
        match trigger {
            Some(trigger) => toggle::listen(trigger, &override_toggle).await,
            None => std::future::pending().await,
        }
    };

    let mut sigterm =
        unix_signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    if let Err(e) = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]) {
        warn!("Failed to notify systemd: {}", e);
    }

    tokio::select! {
        () = monitor.run(&mut resync_rx) => {
            info!("Tracked window closed");
        }
        () = hotkey => {}
        _ = signal::ctrl_c() => {
            info!("Received interrupt, shutting down");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
        }
    }

    let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Stopping]);
    info!("SoundSurfer stopped");
    Ok(())
}
