// ctrl2esc Settings Module
// Operator settings loaded from a TOML file

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::input::DeviceFilter;
use crate::session::{SessionOptions, DEFAULT_GRAB_DELAY};
use crate::transform::RemapPolicy;

/// Default sysfs rescan period when udev hot-plug is unavailable
pub const DEFAULT_RESCAN_INTERVAL: Duration = Duration::from_millis(2000);

/// Upper bound on the grab grace period
const MAX_GRAB_DELAY_MS: u64 = 10_000;

/// Settings for ctrl2esc.
///
/// Loaded from a TOML file (default: ~/.config/ctrl2esc/settings.toml).
/// The key policy is fixed and has no settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Wait between opening a device and grabbing it
    grab_delay: Duration,

    /// Operator device filter
    device_filter: DeviceFilter,

    /// Sysfs rescan period for the polling hot-plug monitor
    rescan_interval: Duration,

    /// File the settings were read from, if any
    source_path: Option<PathBuf>,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// TOML representation for deserializing settings
#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsToml {
    #[serde(default)]
    session: Option<SessionSettings>,

    #[serde(default)]
    devices: Option<DeviceSettings>,

    #[serde(default)]
    supervisor: Option<SupervisorSettings>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SessionSettings {
    #[serde(default)]
    grab_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DeviceSettings {
    #[serde(default)]
    only: Vec<String>,

    #[serde(default)]
    ignore: Vec<String>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SupervisorSettings {
    #[serde(default)]
    rescan_interval_ms: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    pub fn new() -> Self {
        Self {
            grab_delay: DEFAULT_GRAB_DELAY,
            device_filter: DeviceFilter::default(),
            rescan_interval: DEFAULT_RESCAN_INTERVAL,
            source_path: None,
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let toml_settings: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();

        if let Some(session) = toml_settings.session {
            if let Some(ms) = session.grab_delay_ms {
                if ms > MAX_GRAB_DELAY_MS {
                    return Err(SettingsError::InvalidValue(format!(
                        "session.grab_delay_ms = {} exceeds {}",
                        ms, MAX_GRAB_DELAY_MS
                    )));
                }
                settings.grab_delay = Duration::from_millis(ms);
            }
        }

        if let Some(devices) = toml_settings.devices {
            settings.device_filter = DeviceFilter::new(devices.only, devices.ignore);
        }

        if let Some(supervisor) = toml_settings.supervisor {
            if let Some(ms) = supervisor.rescan_interval_ms {
                if ms == 0 {
                    return Err(SettingsError::InvalidValue(
                        "supervisor.rescan_interval_ms must be positive".to_string(),
                    ));
                }
                settings.rescan_interval = Duration::from_millis(ms);
            }
        }

        Ok(settings)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ctrl2esc").join("settings.toml"))
    }

    /// Load from default location (~/.config/ctrl2esc/settings.toml)
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        // Return default settings if file doesn't exist
        Ok(Self::new())
    }

    pub fn grab_delay(&self) -> Duration {
        self.grab_delay
    }

    pub fn device_filter(&self) -> &DeviceFilter {
        &self.device_filter
    }

    pub fn rescan_interval(&self) -> Duration {
        self.rescan_interval
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Options for a device session under these settings
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            policy: RemapPolicy::CTRL_TO_ESC,
            grab_delay: self.grab_delay,
        }
    }
}

/// Create default settings content for a new installation
pub fn default_settings_content() -> &'static str {
    r#"# ctrl2esc Settings
# Place this file at: ~/.config/ctrl2esc/settings.toml

[session]
# Wait between opening a keyboard and grabbing it, in milliseconds
grab_delay_ms = 1000

[devices]
# Device paths or names. When "only" is non-empty, no other device is remapped.
only = []
ignore = []

[supervisor]
# How often /sys/class/input is rescanned when udev hot-plug is unavailable
rescan_interval_ms = 2000
"#
}
