//! Hyprland compositor implementation
//!
//! Queries `hyprctl` in JSON mode. Monitor sizes are reported in physical
//! pixels and converted to the logical space client positions live in.

use color_eyre::eyre::{self, Context, Result};
use serde::Deserialize;
use std::env;
use tokio::process::Command;
use tracing::trace;

use super::{Layout, MonitorInfo, Rect, WindowInfo};

// ============================================================================
// hyprctl JSON Structures
// ============================================================================

/// Entry of `hyprctl -j clients`
#[derive(Debug, Deserialize)]
struct HyprClient {
    #[serde(default)]
    title: String,
    at: [i32; 2],
    size: [i32; 2],
    #[serde(default = "default_true")]
    mapped: bool,
    #[serde(default)]
    hidden: bool,
}

/// Entry of `hyprctl -j monitors`
#[derive(Debug, Deserialize)]
struct HyprMonitor {
    name: String,
    #[serde(default)]
    description: String,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    #[serde(default = "default_scale")]
    scale: f64,
    #[serde(default)]
    transform: u8,
    #[serde(default)]
    disabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_scale() -> f64 {
    1.0
}

impl HyprMonitor {
    /// Bounds in logical coordinates
    fn logical_rect(&self) -> Rect {
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        let width = (f64::from(self.width) / scale).round() as i32;
        let height = (f64::from(self.height) / scale).round() as i32;
        // Odd transforms rotate by 90° or 270°
        if self.transform % 2 == 1 {
            Rect::new(self.x, self.y, height, width)
        } else {
            Rect::new(self.x, self.y, width, height)
        }
    }
}

fn parse_clients(payload: &[u8]) -> Result<Vec<WindowInfo>> {
    let clients: Vec<HyprClient> =
        serde_json::from_slice(payload).context("Failed to parse hyprctl clients")?;
    Ok(clients
        .into_iter()
        .filter(|c| c.mapped && !c.hidden)
        .map(|c| WindowInfo {
            title: c.title,
            rect: Rect::new(c.at[0], c.at[1], c.size[0], c.size[1]),
        })
        .collect())
}

fn parse_monitors(payload: &[u8]) -> Result<Vec<MonitorInfo>> {
    let monitors: Vec<HyprMonitor> =
        serde_json::from_slice(payload).context("Failed to parse hyprctl monitors")?;
    Ok(monitors
        .iter()
        .filter(|m| !m.disabled)
        .map(|m| MonitorInfo::new(&m.name, &m.description, m.logical_rect()))
        .collect())
}

// ============================================================================
// Hyprland Compositor
// ============================================================================

/// Hyprland compositor queried through `hyprctl`
#[derive(Debug, Clone)]
pub struct HyprlandCompositor;

impl HyprlandCompositor {
    /// Checks `HYPRLAND_INSTANCE_SIGNATURE`
    ///
    /// # Errors
    /// Returns an error if Hyprland is not running in this session.
    pub fn new() -> Result<Self> {
        env::var("HYPRLAND_INSTANCE_SIGNATURE")
            .context("HYPRLAND_INSTANCE_SIGNATURE not set. Is Hyprland running?")?;
        Ok(Self)
    }

    /// # Errors
    /// Returns an error if `hyprctl` fails or prints unexpected JSON.
    pub async fn layout(&self) -> Result<Layout> {
        let clients = hyprctl("clients").await?;
        let monitors = hyprctl("monitors").await?;
        Ok(Layout {
            windows: parse_clients(&clients)?,
            monitors: parse_monitors(&monitors)?,
        })
    }
}

/// Run `hyprctl -j <what>` and return stdout
async fn hyprctl(what: &str) -> Result<Vec<u8>> {
    let output = Command::new("hyprctl")
        .args(["-j", what])
        .output()
        .await
        .context("Hyprland tool 'hyprctl' not found or failed")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        eyre::bail!("hyprctl {} failed: {}", what, stderr.trim());
    }

    trace!("hyprctl {} returned {} bytes", what, output.stdout.len());
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CLIENTS_JSON: &str = r#"[
        {"title": "Mozilla Firefox", "at": [2000, 50], "size": [1200, 900],
         "mapped": true, "hidden": false, "monitor": 1},
        {"title": "Hidden group member", "at": [0, 0], "size": [100, 100],
         "mapped": true, "hidden": true, "monitor": 0},
        {"title": "kitty", "at": [10, 10], "size": [800, 600],
         "mapped": true, "hidden": false, "monitor": 0}
    ]"#;

    const MONITORS_JSON: &str = r#"[
        {"id": 0, "name": "eDP-1", "description": "BOE 0x0BCA", "x": 0, "y": 0,
         "width": 2880, "height": 1800, "scale": 1.5, "transform": 0, "disabled": false},
        {"id": 1, "name": "DP-2", "description": "LG Electronics LG HDR 4K", "x": 1920, "y": 0,
         "width": 3840, "height": 2160, "scale": 2.0, "transform": 1, "disabled": false}
    ]"#;

    #[test]
    fn test_parse_clients_skips_hidden() {
        let windows = parse_clients(CLIENTS_JSON.as_bytes()).unwrap();
        let titles: Vec<&str> = windows.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["Mozilla Firefox", "kitty"]);
        assert_eq!(windows[0].rect, Rect::new(2000, 50, 1200, 900));
    }

    #[test]
    fn test_parse_monitors_applies_scale_and_rotation() {
        let monitors = parse_monitors(MONITORS_JSON.as_bytes()).unwrap();
        assert_eq!(monitors[0].id, "eDP-1 BOE 0x0BCA");
        assert_eq!(monitors[0].rect, Rect::new(0, 0, 1920, 1200));
        // 3840x2160 at 2x rotated 90°
        assert_eq!(monitors[1].rect, Rect::new(1920, 0, 1080, 1920));
    }

    #[test]
    fn test_layout_resolves_client_to_monitor() {
        let layout = Layout {
            windows: parse_clients(CLIENTS_JSON.as_bytes()).unwrap(),
            monitors: parse_monitors(MONITORS_JSON.as_bytes()).unwrap(),
        };
        assert_eq!(layout.screen_of("Firefox"), Some("DP-2 LG Electronics LG HDR 4K"));
        assert_eq!(layout.screen_of("kitty"), Some("eDP-1 BOE 0x0BCA"));
    }

    #[test]
    fn test_disabled_monitor_ignored() {
        let json = r#"[{"name": "HDMI-A-1", "x": 0, "y": 0, "width": 1920,
                        "height": 1080, "disabled": true}]"#;
        assert!(parse_monitors(json.as_bytes()).unwrap().is_empty());
    }
}
