//! Runtime configuration

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::MIN_TOUCH_VERSION;
use crate::device::DevicePolicy;

/// Environment variable overriding the display to connect to
pub const DISPLAY_ENV: &str = "XTOUCH_DISPLAY";

/// Config loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display name (e.g. ":1"); the default display when unset
    pub display: Option<String>,

    /// Event-receiving surface geometry
    pub window: WindowConfig,

    /// Device selection policy
    pub device: DevicePolicy,

    /// Also select pointer motion and report it as touch-down.
    /// Handy for testing without a touchscreen.
    pub diagnostic_motion: bool,

    /// XInput version requested from the server
    pub version: VersionConfig,

    /// Upper bound on events consumed by a single poll (unbounded when unset)
    pub max_events_per_poll: Option<NonZeroUsize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: None,
            window: WindowConfig::default(),
            device: DevicePolicy::default(),
            diagnostic_motion: true,
            version: VersionConfig::default(),
            max_events_per_poll: None,
        }
    }
}

/// Surface geometry and title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 500,
            height: 500,
            title: "xtouch".to_string(),
        }
    }
}

/// Requested XInput protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionConfig {
    pub major: u16,
    pub minor: u16,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self { major: 2, minor: 3 }
    }
}

impl Config {
    /// Load configuration from the standard locations, falling back to defaults
    pub fn load() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("xtouch/config.toml")),
            Some(PathBuf::from("/etc/xtouch/config.toml")),
        ];

        let mut config = None;
        for path in config_paths.into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            match Self::from_path(&path) {
                Ok(loaded) => {
                    tracing::info!(?path, device = %loaded.device, "loaded configuration");
                    config = Some(loaded);
                    break;
                }
                Err(e) => {
                    tracing::warn!(?path, error = %e, "ignoring config");
                }
            }
        }

        let mut config = config.unwrap_or_else(|| {
            tracing::info!("using default configuration");
            Self::default()
        });
        config.apply_env();
        config
    }

    /// Load configuration from an explicit path; errors are not swallowed
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the session cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let requested = (self.version.major, self.version.minor);
        if requested < MIN_TOUCH_VERSION {
            return Err(ConfigError::Invalid(format!(
                "XInput version {}.{} has no touch events (need {}.{} or later)",
                requested.0, requested.1, MIN_TOUCH_VERSION.0, MIN_TOUCH_VERSION.1
            )));
        }
        Ok(())
    }

    /// Apply `XTOUCH_DISPLAY` if set and non-empty
    pub fn apply_env(&mut self) {
        if let Some(name) = std::env::var(DISPLAY_ENV).ok().filter(|d| !d.is_empty()) {
            tracing::debug!(display_name = %name, "display overridden from environment");
            self.display = Some(name);
        }
    }
}

/// Helper for getting XDG directories
mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
    }
}
