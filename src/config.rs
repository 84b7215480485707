//! Configuration management
//!
//! Handles loading, validating and persisting the JSON configuration file.
//! `screen_devices` keeps the order it was written in: that order is the
//! match priority used when several keys occur in one monitor identifier.

use color_eyre::eyre::{self, Context, ContextCompat, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::hotkey::Hotkey;

/// Application directory name under the XDG config/state roots
pub const APP_NAME: &str = "soundsurfer";

const CONFIG_FILE: &str = "config.json";

// ============================================================================
// Public Configuration Types
// ============================================================================

/// Validated configuration used by the daemon
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Candidate window titles, tried in order
    pub window_titles: Vec<String>,
    pub screen_devices: ScreenDevices,
    /// Consecutive missed polls before the monitor stops
    pub not_found_threshold: u32,
    pub check_interval: Duration,
    /// Device forced while the override is active
    pub override_device: Option<String>,
    pub override_hotkey: Hotkey,
    /// Program plus fixed arguments; the device name is appended
    pub switch_command: Vec<String>,
    pub switch_timeout: Duration,
    pub notify_override: bool,
    pub log_level: String,
}

/// One `screen_devices` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenDevice {
    /// Substring searched for in monitor identifiers
    pub screen: String,
    pub device: String,
}

/// Monitor substring → device table, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenDevices(Vec<ScreenDevice>);

impl ScreenDevices {
    #[must_use]
    pub fn new(entries: Vec<ScreenDevice>) -> Self {
        Self(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScreenDevice> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>, D: Into<String>> FromIterator<(S, D)> for ScreenDevices {
    fn from_iter<I: IntoIterator<Item = (S, D)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(screen, device)| ScreenDevice {
                    screen: screen.into(),
                    device: device.into(),
                })
                .collect(),
        )
    }
}

impl Serialize for ScreenDevices {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            map.serialize_entry(&entry.screen, &entry.device)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ScreenDevices {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = ScreenDevices;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of monitor name fragments to device names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<ScreenDevice> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((screen, device)) = access.next_entry::<String, String>()? {
                    if entries.iter().any(|e| e.screen == screen) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate screen key '{screen}'"
                        )));
                    }
                    entries.push(ScreenDevice { screen, device });
                }
                Ok(ScreenDevices(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

// ============================================================================
// Config File (JSON)
// ============================================================================

/// On-disk representation, kept field-for-field so rewrites preserve settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub window_titles: Vec<String>,
    #[serde(default)]
    pub screen_devices: ScreenDevices,
    #[serde(default = "default_not_found_threshold")]
    pub not_found_threshold: u32,
    #[serde(default = "default_check_interval")]
    pub check_interval: f64,
    #[serde(default)]
    pub override_device: Option<String>,
    #[serde(default = "default_override_hotkey")]
    pub override_hotkey: String,
    #[serde(default = "default_switch_command")]
    pub switch_command: Vec<String>,
    #[serde(default = "default_switch_timeout")]
    pub switch_timeout: f64,
    #[serde(default = "default_true")]
    pub notify_override: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_not_found_threshold() -> u32 {
    3
}

fn default_check_interval() -> f64 {
    1.0
}

fn default_override_hotkey() -> String {
    "ctrl+alt+m".to_string()
}

fn default_switch_command() -> Vec<String> {
    vec!["pactl".to_string(), "set-default-sink".to_string()]
}

fn default_switch_timeout() -> f64 {
    10.0
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ConfigFile {
    /// Sample written on first run: one title, two screen mappings
    fn default() -> Self {
        Self {
            window_titles: vec!["Firefox".to_string()],
            screen_devices: [
                ("DP-1", "alsa_output.pci-0000_00_1f.3.analog-stereo"),
                ("HDMI-A-1", "alsa_output.pci-0000_01_00.1.hdmi-stereo"),
            ]
            .into_iter()
            .collect(),
            not_found_threshold: default_not_found_threshold(),
            check_interval: default_check_interval(),
            override_device: None,
            override_hotkey: default_override_hotkey(),
            switch_command: default_switch_command(),
            switch_timeout: default_switch_timeout(),
            notify_override: true,
            log_level: default_log_level(),
        }
    }
}

impl ConfigFile {
    /// Read and parse an existing config file
    ///
    /// # Errors
    /// Returns an error if the file is missing, unreadable, or not valid JSON.
    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Write the config as pretty JSON, replacing the file atomically
    ///
    /// # Errors
    /// Returns an error if the directory is not writable or serialization fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config dir: {}", dir.display()))?;

        let mut json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        json.push('\n');

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(json.as_bytes())
            .context("Failed to write config")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to replace config: {}", path.display()))?;
        Ok(())
    }
}

// ============================================================================
// Config Implementation
// ============================================================================

impl Config {
    /// Load configuration, writing the default sample first if the file is missing
    ///
    /// Uses `explicit` when given, otherwise the XDG config path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created, read, parsed or validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(explicit)?;

        if !path.exists() {
            ConfigFile::default().save(&path)?;
            info!("Created default config at {}", path.display());
            eprintln!("Created default config at: {}", path.display());
            eprintln!("Edit window_titles and screen_devices, then restart.");
        }

        Self::load_from_path(&path)
    }

    /// Load and validate a config file that must already exist
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        Self::from_config_file(ConfigFile::read(path)?)
    }

    /// Validate a parsed config file
    ///
    /// # Errors
    /// Returns an error describing the first invalid setting.
    pub fn from_config_file(file: ConfigFile) -> Result<Self> {
        if file.window_titles.iter().all(|t| t.trim().is_empty()) {
            eyre::bail!("No window_titles defined. Add at least one window title to track.");
        }
        if file.screen_devices.is_empty() {
            eyre::bail!("No screen_devices defined. Map at least one monitor to a device.");
        }
        if file.not_found_threshold == 0 {
            eyre::bail!("not_found_threshold must be at least 1");
        }
        let check_interval = positive_seconds("check_interval", file.check_interval)?;
        let switch_timeout = positive_seconds("switch_timeout", file.switch_timeout)?;

        if file.switch_command.first().is_none_or(|p| p.trim().is_empty()) {
            eyre::bail!("switch_command must name a program, e.g. [\"pactl\", \"set-default-sink\"]");
        }

        match file.log_level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            level => eyre::bail!(
                "Invalid log_level '{level}'. Must be: error, warn, info, debug, or trace"
            ),
        }

        let override_hotkey: Hotkey = file
            .override_hotkey
            .parse()
            .with_context(|| format!("Invalid override_hotkey '{}'", file.override_hotkey))?;

        let window_titles = file
            .window_titles
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect();

        Ok(Self {
            window_titles,
            screen_devices: file.screen_devices,
            not_found_threshold: file.not_found_threshold,
            check_interval,
            override_device: file.override_device.filter(|d| !d.trim().is_empty()),
            override_hotkey,
            switch_command: file.switch_command,
            switch_timeout,
            notify_override: file.notify_override,
            log_level: file.log_level,
        })
    }

    /// Config path: `explicit` if given, else `$XDG_CONFIG_HOME/soundsurfer/config.json`
    ///
    /// # Errors
    /// Returns an error if no config directory can be determined.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join(APP_NAME);
        Ok(config_dir.join(CONFIG_FILE))
    }

    /// Print a human-readable summary of the configuration
    pub fn print_summary(&self, path: &Path) {
        use crate::style::SurferStyle;

        println!("{}\n", "✓ Configuration valid".success());

        println!("{}", "Windows (first match wins):".header());
        for (i, title) in self.window_titles.iter().enumerate() {
            println!("  {}. {}", i + 1, title);
        }

        println!("\n{}", "Screens (first match wins):".header());
        for (i, entry) in self.screen_devices.iter().enumerate() {
            println!(
                "  {}. {} → {}",
                i + 1,
                entry.screen.as_str().technical(),
                entry.device
            );
        }

        println!("\n{}", "Settings:".header());
        println!("  not_found_threshold: {}", self.not_found_threshold);
        println!("  check_interval: {:?}", self.check_interval);
        println!(
            "  override_device: {}",
            self.override_device.as_deref().unwrap_or("(none)")
        );
        println!("  override_hotkey: {}", self.override_hotkey);
        println!("  switch_command: {} <device>", self.switch_command.join(" "));
        println!("  switch_timeout: {:?}", self.switch_timeout);
        println!("  notify_override: {}", self.notify_override);
        println!("  log_level: {}", self.log_level);

        println!("\nConfig: {}", path.display().to_string().technical());
    }
}

fn positive_seconds(key: &str, secs: f64) -> Result<Duration> {
    if !(secs.is_finite() && secs > 0.0) {
        eyre::bail!("{key} must be a positive number of seconds (got {secs})");
    }
    Duration::try_from_secs_f64(secs).with_context(|| format!("{key} is out of range: {secs}"))
}
