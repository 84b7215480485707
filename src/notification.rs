//! Desktop notifications
//!
//! Handles sending notifications via notify-rust and icon detection
//! using `FreeDesktop` standard icon names.

use color_eyre::eyre::{Context, Result};
use notify_rust::Notification;

/// Send a desktop notification
///
/// # Errors
/// Returns an error if the notification cannot be sent (e.g., no notification daemon running).
pub fn send_notification(summary: &str, body: &str, icon: Option<&str>) -> Result<()> {
    let icon = icon.unwrap_or("audio-card");

    Notification::new()
        .summary(summary)
        .body(body)
        .appname("SoundSurfer")
        .icon(icon)
        .timeout(3000)
        .show()
        .context("Failed to show notification")?;

    Ok(())
}

/// Guess a `FreeDesktop` icon from a device name
#[must_use]
pub fn get_device_icon(device: &str) -> String {
    let lower = device.to_lowercase();

    if lower.contains("hdmi") || lower.contains("displayport") || lower.contains("monitor") {
        "video-display".to_string()
    } else if lower.contains("headphone")
        || lower.contains("headset")
        || lower.contains("bluez")
        || lower.contains("bluetooth")
    {
        "audio-headphones".to_string()
    } else {
        "audio-speakers".to_string()
    }
}
