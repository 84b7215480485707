//! `SoundSurfer` binary entry point
//!
//! Dispatches to the monitor or a one-shot command based on CLI arguments.

use clap::Parser;
use color_eyre::eyre::Result;
use soundsurfer::{cli::Args, cli::Command, commands, config::Config, daemon, logging};
use tracing::{error, info};

const FALLBACK_LOG_LEVEL: &str = "info";

/// Record a fatal error and the shutdown line in the monitor log
fn log_failure(result: Result<()>) -> Result<()> {
    if let Err(e) = &result {
        error!("SoundSurfer failed: {:#}", e);
        info!("SoundSurfer stopped");
    }
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let config_path = args.config.as_deref();

    match args.command.unwrap_or(Command::Run) {
        Command::Run => match Config::load(config_path) {
            Ok(config) => {
                let _guard = logging::init_monitor(&config.log_level)?;
                log_failure(daemon::run(config).await)
            }
            Err(e) => {
                // No config, no level: log the failure at the default level
                let _guard = logging::init_monitor(FALLBACK_LOG_LEVEL)?;
                log_failure(Err(e))
            }
        },

        Command::Validate => {
            logging::init_cli();
            commands::validate(config_path)
        }

        Command::Locate { title } => {
            logging::init_cli();
            let config = Config::load(config_path)?;
            commands::locate(&config, title.as_deref()).await
        }

        Command::ListWindows { json } => {
            logging::init_cli();
            commands::list_windows(json).await
        }

        Command::PickWindow => {
            logging::init_cli();
            commands::pick_window(config_path).await
        }
    }
}
