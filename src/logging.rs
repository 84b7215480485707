//! Logging setup
//!
//! The monitor logs to stderr and to a size-rotated file under the XDG state
//! directory. One-shot commands log to stderr only, quiet by default.

use color_eyre::eyre::{Context, ContextCompat, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use crate::config::APP_NAME;

pub const LOG_FILE: &str = "soundsurfer.log";
const MAX_LOG_SIZE: u64 = 1024 * 1024;

/// A file appender that rotates logs based on size.
///
/// Keeps exactly two files:
/// - `current`: The active log file.
/// - `backup`: The previous log file (rotated when `current` exceeds limit).
///
/// Features:
/// - **Size Limit:** Rotates when the file reaches `max_size_bytes`.
/// - **Self-Healing:** Re-creates the file if it is deleted externally.
/// - **Thread-Safe:** An internal Mutex serializes writes.
/// - **Private:** Created files are 0o600 on Unix.
pub struct RotatingFileAppender {
    path: PathBuf,
    backup_path: PathBuf,
    max_size_bytes: u64,
    file: Mutex<Option<File>>,
}

impl RotatingFileAppender {
    /// Create a new rotating file appender.
    ///
    /// # Arguments
    /// * `dir` - Directory to store logs in (created on first write).
    /// * `filename` - Base filename (e.g., `soundsurfer.log`).
    /// * `max_size_bytes` - Size that triggers rotation (1 MiB for the monitor).
    pub fn new(dir: impl Into<PathBuf>, filename: &str, max_size_bytes: u64) -> Self {
        let dir = dir.into();
        let path = dir.join(filename);
        let backup_path = dir.join(format!("{filename}.old"));

        Self {
            path,
            backup_path,
            max_size_bytes,
            file: Mutex::new(None),
        }
    }

    /// Open `path` with owner-only permissions, appending or truncating
    fn open_secure(path: &Path, append: bool) -> io::Result<File> {
        let mut options = fs::OpenOptions::new();
        options.create(true).write(true);

        if append {
            options.append(true);
        } else {
            options.truncate(true);
        }

        #[cfg(unix)]
        {
            options.mode(0o600);
        }

        options.open(path)
    }

    /// Open the file if not open, or re-open if deleted
    fn get_file<'a>(&self, guard: &'a mut Option<File>) -> io::Result<&'a mut File> {
        // Someone removed the log (e.g. `rm` while tailing): drop the stale handle
        if !self.path.exists() {
            *guard = None;
        }

        if guard.is_none() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            *guard = Some(Self::open_secure(&self.path, true)?);
        }

        guard
            .as_mut()
            .ok_or_else(|| io::Error::other("log file unavailable"))
    }

    /// current -> backup, then start a fresh current
    fn rotate(&self, guard: &mut Option<File>) -> io::Result<()> {
        // Close current file
        *guard = None;

        // Rename current -> backup (overwrites existing backup)
        if self.path.exists() {
            fs::rename(&self.path, &self.backup_path)?;
        }

        *guard = Some(Self::open_secure(&self.path, false)?);
        Ok(())
    }
}

impl Write for RotatingFileAppender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(format!("Log mutex poisoned: {e}")))?;

        // 1. Ensure the file is open and read its size
        let current_size = match self.get_file(&mut guard) {
            Ok(f) => f.metadata()?.len(),
            Err(_) => 0,
        };

        // 2. Rotate if needed; a failed rotation keeps writing to the current file
        if current_size >= self.max_size_bytes
            && let Err(e) = self.rotate(&mut guard)
        {
            eprintln!("Failed to rotate log file: {e}");
        }

        // 3. Write to whichever file is current now
        let file = self.get_file(&mut guard)?;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(format!("Log mutex poisoned: {e}")))?;

        if let Some(file) = guard.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// `$XDG_STATE_HOME/soundsurfer`, falling back to the local data directory
///
/// # Errors
/// Returns an error if neither directory can be determined.
pub fn log_dir() -> Result<PathBuf> {
    let base = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .context("Could not determine state directory for logs")?;
    Ok(base.join(APP_NAME))
}

/// Logging for the monitor: stderr plus the rotated log file
///
/// `RUST_LOG` overrides `level`. Keep the returned guard alive until exit so
/// buffered lines reach the file.
///
/// # Errors
/// Returns an error if the log directory is unknown or a subscriber is already set.
pub fn init_monitor(level: &str) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{APP_NAME}={level}")));

    let dir = log_dir()?;
    let appender = RotatingFileAppender::new(&dir, LOG_FILE, MAX_LOG_SIZE);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("Failed to initialize logging")?;

    tracing::debug!("Logging to {}", dir.join(LOG_FILE).display());
    Ok(guard)
}

/// Logging for one-shot commands: stderr only, warnings unless `RUST_LOG` says otherwise
pub fn init_cli() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
