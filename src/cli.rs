//! Command-line interface definitions
//!
//! Uses clap for argument parsing with derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SoundSurfer - audio output follows your window
///
/// Moves audio to the device mapped to whichever screen the tracked window is on.
#[derive(Parser)]
#[command(name = "soundsurfer")]
#[command(version)]
#[command(about = "Switch the audio output to follow a window across screens")]
#[command(after_help = "\
BEHAVIOR:
  - Polls the compositor for the first configured window title that is open
  - When that window lands on a different screen, switches to the screen's device
  - Exits after the window has been missing for not_found_threshold polls
  - The override hotkey pins audio to override_device until pressed again

COMMANDS:
  soundsurfer              Run the monitor (same as: soundsurfer run)
  soundsurfer validate     Check the config file and print a summary
  soundsurfer locate       Show which screen and device each window resolves to
  soundsurfer list-windows List windows and the screen each one is on
  soundsurfer pick-window  Choose the tracked window interactively

CONFIG:
  $XDG_CONFIG_HOME/soundsurfer/config.json (created on first run)

LOGS:
  $XDG_STATE_HOME/soundsurfer/soundsurfer.log

SUPPORTED COMPOSITORS:
  Sway (i3 IPC via $SWAYSOCK), Hyprland (hyprctl)")]
pub struct Args {
    /// Use this config file instead of the default location
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Follow the tracked window and switch audio (default)
    Run,

    /// Validate the config file and print a summary
    Validate,

    /// Resolve a window to its screen and audio device
    Locate {
        /// Window title substring (defaults to the configured titles)
        title: Option<String>,
    },

    /// List open windows and their screens
    ListWindows {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Pick the tracked window from the open windows
    PickWindow,
}
