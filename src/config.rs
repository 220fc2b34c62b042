//! Application config
//!
//! One TOML file, `padbridge/config.toml` below the user's config directory
//! (or the path in `PADBRIDGE_CONFIG`). A missing file is created from the
//! defaults, a broken one is logged and replaced by the defaults in memory.

use crate::error::ConfigError;
use crate::mapping::config::MappingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, warn, Level};

pub const CONFIG_ENV: &str = "PADBRIDGE_CONFIG";
const CONFIG_DIR: &str = "padbridge";
const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_REPEAT_DELAY_MS: u64 = 500;
pub const DEFAULT_REPEAT_RATE_MS: u64 = 32;
pub const DEFAULT_RECOVERY_DELAY_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Configured level, INFO if it does not parse.
    pub fn level(&self) -> Level {
        Level::from_str(self.level.trim()).unwrap_or(Level::INFO)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    pub repeat_delay_ms: u64,
    pub repeat_rate_ms: u64,
    pub partial_keys: bool,
    pub fallback_layout: bool,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            repeat_delay_ms: DEFAULT_REPEAT_DELAY_MS,
            repeat_rate_ms: DEFAULT_REPEAT_RATE_MS,
            partial_keys: false,
            fallback_layout: true,
        }
    }
}

impl KeyboardConfig {
    pub fn repeat_delay(&self) -> Duration {
        Duration::from_millis(self.repeat_delay_ms)
    }

    pub fn repeat_rate(&self) -> Duration {
        Duration::from_millis(self.repeat_rate_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub recovery_delay_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            recovery_delay_ms: DEFAULT_RECOVERY_DELAY_MS,
        }
    }
}

impl TransportConfig {
    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    /// `"VID:PID:Description"` entries added to the built-in list.
    pub custom: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub mapping: MappingConfig,
    pub keyboard: KeyboardConfig,
    pub transport: TransportConfig,
    pub devices: DevicesConfig,
}

impl AppConfig {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reads and parses the file without logging, so it can run before the
    /// subscriber is installed.
    pub async fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()))
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_toml_str(&content, path)
    }

    /// Writes the default template, creating the parent directory.
    pub async fn write_default(path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let content = AppConfig::default().to_toml_string()?;
        tokio::fs::write(path, content).await.map_err(io_err)?;
        Ok(())
    }

    /// Turns the result of [`AppConfig::read`] into a usable config. Never fails:
    /// problems are logged and the defaults take over.
    pub async fn resolve(loaded: Result<Self, ConfigError>, path: &Path) -> Self {
        let mut config = match loaded {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(ConfigError::NotFound(_)) => {
                info!("No config at {}, writing defaults", path.display());
                if let Err(e) = Self::write_default(path).await {
                    warn!("Could not write default config: {}", e);
                }
                AppConfig::default()
            }
            Err(e) => {
                error!("{}, using defaults", e);
                AppConfig::default()
            }
        };
        let fixes = config.sanitize();
        if fixes > 0 {
            warn!("Config sanitized: {} value(s) replaced", fixes);
        }
        config
    }

    /// Convenience for callers that do not care about log ordering.
    pub async fn load_or_default(path: &Path) -> Self {
        let loaded = Self::read(path).await;
        Self::resolve(loaded, path).await
    }

    /// Clamps and resets out-of-range values. Returns the number of fixes.
    pub fn sanitize(&mut self) -> usize {
        let mut fixes = 0;

        fixes += self.mapping.sanitize();

        if self.logging.level.trim().parse::<Level>().is_err() {
            warn!("Unknown log level {:?}, using info", self.logging.level);
            self.logging = LoggingConfig::default();
            fixes += 1;
        }

        let keyboard_defaults = KeyboardConfig::default();
        if self.keyboard.repeat_delay_ms == 0 {
            warn!("repeat_delay_ms 0 reset to {}", keyboard_defaults.repeat_delay_ms);
            self.keyboard.repeat_delay_ms = keyboard_defaults.repeat_delay_ms;
            fixes += 1;
        }
        if self.keyboard.repeat_rate_ms == 0 {
            warn!("repeat_rate_ms 0 reset to {}", keyboard_defaults.repeat_rate_ms);
            self.keyboard.repeat_rate_ms = keyboard_defaults.repeat_rate_ms;
            fixes += 1;
        }

        fixes
    }
}

/// Config file location: `PADBRIDGE_CONFIG` or `<config dir>/padbridge/config.toml`.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    Ok(path)
}
