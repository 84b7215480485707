//! `SoundSurfer` - audio output follows your window
//!
//! Tracks one application window across monitors and switches the default
//! audio device to the one mapped to the window's current screen.
//!
//! # Features
//! - Window lookup through the compositor's IPC (Sway, Hyprland)
//! - Ordered substring mapping from monitor identifiers to audio devices
//! - Debounced switching through a configurable external command
//! - Global hotkey that pins audio to a fixed override device
//! - Interactive picker for the tracked window

pub mod cli;
pub mod commands;
pub mod compositor;
pub mod config;
pub mod daemon;
pub mod device;
pub mod hotkey;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod picker;
pub mod resolver;
pub mod state;
pub mod style;
pub mod toggle;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types for convenience
pub use cli::Args;
pub use config::Config;
pub use state::{Mode, OverrideState};
