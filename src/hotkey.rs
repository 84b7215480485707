//! Global override hotkey
//!
//! Chords such as `ctrl+alt+m` are read straight from kernel input devices
//! via `evdev`, so they work regardless of compositor or window focus.
//! Reading `/dev/input/event*` requires membership in the `input` group.

use color_eyre::eyre::{self, Result};
use evdev::{AttributeSet, Device, Key};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, trace};

use crate::toggle::TriggerSource;

/// A key chord; each part is satisfied by any of its alternatives (left/right modifiers)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkey {
    names: Vec<String>,
    parts: Vec<&'static [Key]>,
}

impl Hotkey {
    /// True when every part of the chord is currently held
    pub fn is_held(&self, held: impl Fn(Key) -> bool) -> bool {
        self.parts
            .iter()
            .all(|alternatives| alternatives.iter().any(|&k| held(k)))
    }

    /// All keys that can take part in the chord
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.parts.iter().flat_map(|alternatives| alternatives.iter().copied())
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names.join("+"))
    }
}

impl FromStr for Hotkey {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        let mut names = Vec::new();
        let mut parts = Vec::new();

        for raw in s.split('+') {
            let name = raw.trim().to_ascii_lowercase();
            if name.is_empty() {
                eyre::bail!("empty key in hotkey '{s}'");
            }
            let keys = lookup_key(&name).ok_or_else(|| eyre::eyre!("unknown key '{name}'"))?;
            if parts.contains(&keys) {
                eyre::bail!("key '{name}' appears twice");
            }
            names.push(name);
            parts.push(keys);
        }

        Ok(Self { names, parts })
    }
}

/// Map a lowercase key name to its evdev codes
#[allow(clippy::too_many_lines)]
fn lookup_key(name: &str) -> Option<&'static [Key]> {
    let keys: &'static [Key] = match name {
        "ctrl" | "control" => &[Key::KEY_LEFTCTRL, Key::KEY_RIGHTCTRL],
        "alt" => &[Key::KEY_LEFTALT, Key::KEY_RIGHTALT],
        "shift" => &[Key::KEY_LEFTSHIFT, Key::KEY_RIGHTSHIFT],
        "super" | "meta" | "win" | "logo" => &[Key::KEY_LEFTMETA, Key::KEY_RIGHTMETA],

        "a" => &[Key::KEY_A],
        "b" => &[Key::KEY_B],
        "c" => &[Key::KEY_C],
        "d" => &[Key::KEY_D],
        "e" => &[Key::KEY_E],
        "f" => &[Key::KEY_F],
        "g" => &[Key::KEY_G],
        "h" => &[Key::KEY_H],
        "i" => &[Key::KEY_I],
        "j" => &[Key::KEY_J],
        "k" => &[Key::KEY_K],
        "l" => &[Key::KEY_L],
        "m" => &[Key::KEY_M],
        "n" => &[Key::KEY_N],
        "o" => &[Key::KEY_O],
        "p" => &[Key::KEY_P],
        "q" => &[Key::KEY_Q],
        "r" => &[Key::KEY_R],
        "s" => &[Key::KEY_S],
        "t" => &[Key::KEY_T],
        "u" => &[Key::KEY_U],
        "v" => &[Key::KEY_V],
        "w" => &[Key::KEY_W],
        "x" => &[Key::KEY_X],
        "y" => &[Key::KEY_Y],
        "z" => &[Key::KEY_Z],

        "0" => &[Key::KEY_0],
        "1" => &[Key::KEY_1],
        "2" => &[Key::KEY_2],
        "3" => &[Key::KEY_3],
        "4" => &[Key::KEY_4],
        "5" => &[Key::KEY_5],
        "6" => &[Key::KEY_6],
        "7" => &[Key::KEY_7],
        "8" => &[Key::KEY_8],
        "9" => &[Key::KEY_9],

        "f1" => &[Key::KEY_F1],
        "f2" => &[Key::KEY_F2],
        "f3" => &[Key::KEY_F3],
        "f4" => &[Key::KEY_F4],
        "f5" => &[Key::KEY_F5],
        "f6" => &[Key::KEY_F6],
        "f7" => &[Key::KEY_F7],
        "f8" => &[Key::KEY_F8],
        "f9" => &[Key::KEY_F9],
        "f10" => &[Key::KEY_F10],
        "f11" => &[Key::KEY_F11],
        "f12" => &[Key::KEY_F12],

        "space" => &[Key::KEY_SPACE],
        "tab" => &[Key::KEY_TAB],
        "enter" | "return" => &[Key::KEY_ENTER],
        "esc" | "escape" => &[Key::KEY_ESC],
        "insert" => &[Key::KEY_INSERT],
        "delete" => &[Key::KEY_DELETE],
        "home" => &[Key::KEY_HOME],
        "end" => &[Key::KEY_END],
        "pageup" => &[Key::KEY_PAGEUP],
        "pagedown" => &[Key::KEY_PAGEDOWN],
        "pause" => &[Key::KEY_PAUSE],
        "scrolllock" => &[Key::KEY_SCROLLLOCK],
        _ => return None,
    };
    Some(keys)
}

// ============================================================================
// Keyboard Trigger (evdev)
// ============================================================================

/// Polls every keyboard that can produce the chord's keys
pub struct KeyboardTrigger {
    hotkey: Hotkey,
    devices: Vec<(PathBuf, Device)>,
}

impl KeyboardTrigger {
    /// Open all readable input devices that report at least one of the chord's keys
    ///
    /// # Errors
    /// Returns an error if no such device can be opened (usually a permissions issue).
    pub fn open(hotkey: Hotkey) -> Result<Self> {
        let devices: Vec<(PathBuf, Device)> = evdev::enumerate()
            .filter(|(_, device)| {
                device
                    .supported_keys()
                    .is_some_and(|supported| hotkey.keys().any(|k| supported.contains(k)))
            })
            .collect();

        if devices.is_empty() {
            eyre::bail!(
                "No readable keyboard found for hotkey '{hotkey}'.\n\
                 Add your user to the 'input' group (then log in again) to enable the override."
            );
        }

        for (path, device) in &devices {
            debug!(
                "Watching {} ({}) for hotkey",
                path.display(),
                device.name().unwrap_or("unnamed device")
            );
        }
        info!("Override hotkey: {} ({} devices)", hotkey, devices.len());

        Ok(Self { hotkey, devices })
    }
}

impl TriggerSource for KeyboardTrigger {
    fn is_pressed(&mut self) -> bool {
        let states: Vec<AttributeSet<Key>> = self
            .devices
            .iter()
            .filter_map(|(path, device)| match device.get_key_state() {
                Ok(state) => Some(state),
                Err(e) => {
                    trace!("Key state read failed for {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        self.hotkey
            .is_held(|key| states.iter().any(|state| state.contains(key)))
    }
}
