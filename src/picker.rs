//! Window picker
//!
//! Turns the compositor's window list into a short menu of titles worth
//! tracking and reads the user's choice from stdin.

use color_eyre::eyre::{self, Context, Result};
use std::io::{BufRead, Write};

use crate::compositor::WindowInfo;

/// Titles containing any of these are never offered
pub const EXCLUDED_KEYWORDS: &[&str] = &[
    "Settings",
    "Input Method",
    "xdg-desktop-portal",
    "Picture-in-Picture",
];

/// Browser windows are offered under the browser's name, since page titles change
pub const BROWSER_NAMES: &[&str] = &[
    "Edge",
    "Google Chrome",
    "Firefox",
    "Opera",
    "Safari",
    "Brave",
    "Vivaldi",
];

/// Browser name contained in `title`, or `title` itself
#[must_use]
pub fn simplify_title(title: &str) -> &str {
    BROWSER_NAMES
        .iter()
        .find(|browser| title.contains(*browser))
        .copied()
        .unwrap_or(title)
}

/// Titles to offer, in window order, without duplicates
#[must_use]
pub fn candidates(windows: &[WindowInfo]) -> Vec<String> {
    let mut titles: Vec<String> = Vec::new();
    for window in windows {
        let title = window.title.trim();
        if title.is_empty() || EXCLUDED_KEYWORDS.iter().any(|k| title.contains(k)) {
            continue;
        }
        let title = simplify_title(title);
        if !titles.iter().any(|t| t == title) {
            titles.push(title.to_string());
        }
    }
    titles
}

/// Print a numbered menu and read a choice until it is valid
///
/// Blank input or end of input cancels and returns `None`.
///
/// # Errors
/// Returns an error if reading input or writing the prompt fails.
pub fn choose(
    titles: &[String],
    mut input: impl BufRead,
    mut output: impl Write,
) -> Result<Option<String>> {
    if titles.is_empty() {
        eyre::bail!("No selectable windows are open");
    }

    writeln!(output, "Select the window to track:")?;
    for (i, title) in titles.iter().enumerate() {
        writeln!(output, "  {}. {}", i + 1, title)?;
    }

    loop {
        write!(output, "Number (blank to cancel): ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line).context("Failed to read selection")? == 0 {
            return Ok(None);
        }
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        match line.parse::<usize>() {
            Ok(n) if (1..=titles.len()).contains(&n) => return Ok(Some(titles[n - 1].clone())),
            _ => writeln!(output, "Enter a number between 1 and {}", titles.len())?,
        }
    }
}
