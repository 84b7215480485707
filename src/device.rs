//! Device switch gateway
//!
//! Runs the configured external command to change the default audio output.
//! Failures never propagate: they are logged and reported as `false`.

use color_eyre::eyre::{self, Context, Result};
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::Config;

/// Something that can make a named device the default output
pub trait DeviceSwitcher: Send + Sync {
    /// Returns true only if the switch succeeded
    fn set_device(&self, name: &str) -> impl Future<Output = bool> + Send;
}

/// Switches devices by running `<program> <args...> <device>`
#[derive(Debug, Clone)]
pub struct CommandSwitcher {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSwitcher {
    /// # Errors
    /// Returns an error if `command` is empty.
    pub fn new(command: &[String], timeout: Duration) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| eyre::eyre!("switch command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }

    /// # Errors
    /// Returns an error if the configured switch command is empty.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.switch_command, config.switch_timeout)
    }

    async fn run(&self, device: &str) -> Result<()> {
        debug!("Running: {} {} {}", self.program, self.args.join(" "), device);

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(device)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Could not start '{}'", self.program))?;

        // Dropping the future on timeout drops the child, which kills it
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| eyre::eyre!("'{}' timed out after {:?}", self.program, self.timeout))?
            .with_context(|| format!("Failed waiting for '{}'", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            eyre::bail!("'{}' exited with {}: {}", self.program, output.status, stderr.trim());
        }

        Ok(())
    }
}

impl DeviceSwitcher for CommandSwitcher {
    async fn set_device(&self, name: &str) -> bool {
        match self.run(name).await {
            Ok(()) => {
                info!("Switched audio output to '{}'", name);
                true
            }
            Err(e) => {
                error!("Failed to switch audio output to '{}': {:#}", name, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> CommandSwitcher {
        // `sh -c SCRIPT NAME DEVICE`: the device lands in $1
        CommandSwitcher::new(
            &[
                "sh".to_string(),
                "-c".to_string(),
                script.to_string(),
                "switch".to_string(),
            ],
            timeout,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(CommandSwitcher::new(&[], Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_success_exit_status_reports_true() {
        let switcher = sh("test \"$1\" = Speakers", Duration::from_secs(5));
        assert!(switcher.set_device("Speakers").await);
    }

    #[tokio::test]
    async fn test_failure_exit_status_reports_false() {
        let switcher = sh("echo \"no such sink: $1\" >&2; exit 3", Duration::from_secs(5));
        assert!(!switcher.set_device("Headset").await);
    }

    #[tokio::test]
    async fn test_missing_program_reports_false() {
        let switcher = CommandSwitcher::new(
            &["soundsurfer-no-such-program".to_string()],
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!switcher.set_device("Speakers").await);
    }

    #[tokio::test]
    async fn test_hung_command_times_out() {
        let switcher = sh("sleep 5", Duration::from_millis(100));
        let started = std::time::Instant::now();
        assert!(!switcher.set_device("Speakers").await);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_same_device_twice_is_safe() {
        let switcher = sh("exit 0", Duration::from_secs(5));
        assert!(switcher.set_device("Speakers").await);
        assert!(switcher.set_device("Speakers").await);
    }
}
