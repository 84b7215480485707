//! Scripted collaborators for exercising the monitor and toggle without a desktop

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::compositor::WindowLocator;
use crate::device::DeviceSwitcher;

/// Window locator whose answers are set by the test
#[derive(Debug, Default)]
pub(crate) struct ScriptedLocator {
    screens: Mutex<HashMap<String, String>>,
}

impl ScriptedLocator {
    /// Put the window titled `title` on `screen`
    pub fn place(&self, title: &str, screen: &str) {
        self.screens
            .lock()
            .unwrap()
            .insert(title.to_string(), screen.to_string());
    }

    /// Close the window titled `title`
    pub fn close(&self, title: &str) {
        self.screens.lock().unwrap().remove(title);
    }
}

impl WindowLocator for ScriptedLocator {
    async fn locate(&self, title: &str) -> Option<String> {
        self.screens.lock().unwrap().get(title).cloned()
    }
}

/// Device switcher that records every device it finished switching to
#[derive(Debug, Default)]
pub(crate) struct RecordingSwitcher {
    calls: Mutex<Vec<String>>,
    failing: AtomicBool,
    delays: Mutex<HashMap<String, Duration>>,
}

impl RecordingSwitcher {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Make switches to `device` take `delay` before they complete
    pub fn set_delay(&self, device: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(device.to_string(), delay);
    }

    /// Make subsequent switches report failure
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl DeviceSwitcher for RecordingSwitcher {
    async fn set_device(&self, name: &str) -> bool {
        let delay = self.delays.lock().unwrap().get(name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(name.to_string());
        !self.failing.load(Ordering::SeqCst)
    }
}
