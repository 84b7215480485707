//! CLI commands
//!
//! One-shot commands that inspect the config or the compositor without
//! starting the monitor.

use color_eyre::eyre::{self, Result};
use crossterm::style::Stylize;
use serde::Serialize;
use std::io;
use std::path::Path;

use crate::compositor::{CompositorLocator, Layout};
use crate::config::{Config, ConfigFile};
use crate::picker;
use crate::resolver;
use crate::style::SurferStyle;

/// Load and validate the config without creating it, then print a summary
///
/// # Errors
/// Returns an error if the file is missing or invalid.
pub fn validate(config_path: Option<&Path>) -> Result<()> {
    let path = Config::resolve_path(config_path)?;
    let config = Config::load_from_path(&path)?;
    config.print_summary(&path);
    Ok(())
}

/// Show where each title resolves and which device that screen maps to
///
/// With no `title`, every configured title is checked in priority order.
///
/// # Errors
/// Returns an error if the compositor cannot be queried.
pub async fn locate(config: &Config, title: Option<&str>) -> Result<()> {
    let compositor = CompositorLocator::detect()?;
    let layout = compositor.layout().await?;

    let titles: Vec<&str> = match title {
        Some(t) => vec![t],
        None => config.window_titles.iter().map(String::as_str).collect(),
    };

    println!("{} ({})", "Window locations".header(), compositor.name());
    for title in titles {
        match layout.screen_of(title) {
            Some(screen) => {
                let device = resolver::resolve(screen, &config.screen_devices);
                println!(
                    "  {} {} → {}",
                    "•".success(),
                    title.bold(),
                    screen.technical()
                );
                match device {
                    Some(device) => println!("    device: {}", device.success()),
                    None => println!("    device: {}", "no mapping for this screen".warning()),
                }
            }
            None => println!("  {} {} {}", "•".error(), title.bold(), "not found".error()),
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct WindowJson<'a> {
    title: &'a str,
    screen: Option<&'a str>,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

fn window_rows(layout: &Layout) -> Vec<WindowJson<'_>> {
    layout
        .windows
        .iter()
        .map(|w| WindowJson {
            title: &w.title,
            screen: layout.monitor_at(w.rect.center()),
            x: w.rect.x,
            y: w.rect.y,
            width: w.rect.width,
            height: w.rect.height,
        })
        .collect()
}

/// List windows as the locator sees them
///
/// # Errors
/// Returns an error if the compositor cannot be queried or JSON serialization fails.
pub async fn list_windows(json_output: bool) -> Result<()> {
    let compositor = CompositorLocator::detect()?;
    let layout = compositor.layout().await?;
    let rows = window_rows(&layout);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{}", format!("Monitors ({}):", layout.monitors.len()).header());
    for monitor in &layout.monitors {
        let r = monitor.rect;
        println!(
            "  {} {}",
            monitor.id.as_str().technical(),
            format!("{}x{}+{}+{}", r.width, r.height, r.x, r.y).dim()
        );
    }

    println!("\n{}", format!("Windows ({}):", rows.len()).header());
    if rows.is_empty() {
        println!("  {}", "(none)".dim());
    }
    for row in &rows {
        println!("  {} {}", "•".success(), row.title);
        println!(
            "    {}: {}",
            "screen".dim(),
            row.screen.unwrap_or("off-screen")
        );
    }
    Ok(())
}

/// Choose the tracked window interactively and save it as the only title
///
/// # Errors
/// Returns an error if the config file does not exist, the compositor cannot
/// be queried, or the config cannot be saved.
pub async fn pick_window(config_path: Option<&Path>) -> Result<()> {
    let path = Config::resolve_path(config_path)?;
    if !path.exists() {
        eyre::bail!(
            "Config file not found: {}\nRun 'soundsurfer' once to create it.",
            path.display()
        );
    }
    let mut file = ConfigFile::read(&path)?;

    let compositor = CompositorLocator::detect()?;
    let layout = compositor.layout().await?;
    let titles = picker::candidates(&layout.windows);

    let Some(title) = picker::choose(&titles, io::stdin().lock(), io::stdout())? else {
        println!("{}", "No window selected; config unchanged.".warning());
        return Ok(());
    };

    file.window_titles = vec![title.clone()];
    file.save(&path)?;
    tracing::info!("window_titles set to [{}]", title);

    println!(
        "{} Tracking '{}' (restart soundsurfer to apply)",
        "✓".success(),
        title.bold()
    );
    Ok(())
}
