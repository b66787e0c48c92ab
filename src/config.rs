use core::time::Duration;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::ensure;
use parking_lot::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub notify_on_switch: bool,
    pub duration_ms: u64,
}

impl Settings {
    pub fn new(notify_on_switch: bool, duration_ms: u64) -> anyhow::Result<Self> {
        ensure!(
            duration_ms > 0,
            "Invalid notification duration: expected a positive number of milliseconds"
        );

        Ok(Self {
            notify_on_switch,
            duration_ms,
        })
    }

    pub fn duration(self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Read-only view of the user's settings, consulted on every event.
pub trait SettingsProvider {
    fn settings(&self) -> Settings;
}

pub type DynSettingsProvider = dyn SettingsProvider + Send + Sync;

/// Settings that may change while the daemon runs.
#[derive(Clone)]
pub struct SharedSettings(Arc<RwLock<Settings>>);

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self(Arc::new(RwLock::new(settings)))
    }

    pub fn set_notify_on_switch(&self, enabled: bool) {
        self.0.write().notify_on_switch = enabled;
        log::info!(
            "Switch notifications {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn set_duration_ms(&self, duration_ms: u64) -> anyhow::Result<()> {
        let mut settings = self.0.write();
        *settings = Settings::new(settings.notify_on_switch, duration_ms)?;
        log::info!("Notification duration set to {duration_ms} ms");
        Ok(())
    }
}

impl SettingsProvider for SharedSettings {
    fn settings(&self) -> Settings {
        *self.0.read()
    }
}

pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
