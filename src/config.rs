//! Runtime configuration.
//!
//! Resolution order: built-in defaults, then the TOML file named by `ORDER_TRACKER_CONFIG` (if set),
//! then the `ORDER_TRACKER_BASE_URL` and `ORDER_TRACKER_TOKEN` environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "ORDER_TRACKER_CONFIG";
pub const BASE_URL_ENV: &str = "ORDER_TRACKER_BASE_URL";
pub const TOKEN_ENV: &str = "ORDER_TRACKER_TOKEN";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub gateway: GatewayConfig,
    pub polling: PollingConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Bearer token sent with every request when present.
    pub auth_token: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8082".to_string(),
            auth_token: None,
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Period of discovery and status polling for a fresh checkout.
    pub checkout_period_ms: u64,
    /// Period of status polling for an already-placed order.
    pub tracking_period_ms: u64,
    /// Delay between observing `DELIVERY_REQUESTED` and the redirect notification.
    pub redirect_delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            checkout_period_ms: 2_000,
            tracking_period_ms: 3_000,
            redirect_delay_ms: 3_000,
        }
    }
}

impl PollingConfig {
    pub fn checkout_period(&self) -> Duration {
        Duration::from_millis(self.checkout_period_ms)
    }

    pub fn tracking_period(&self) -> Duration {
        Duration::from_millis(self.tracking_period_ms)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Capacity of each session's command channel.
    pub command_buffer: usize,
    /// Capacity of each session's event broadcast channel.
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_buffer: 32,
            event_buffer: 64,
        }
    }
}

impl TrackerConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies the environment overrides. Blank values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = env_trimmed(BASE_URL_ENV) {
            self.gateway.base_url = url;
        }
        if let Some(token) = env_trimmed(TOKEN_ENV) {
            self.gateway.auth_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("gateway.base_url must not be empty".into()));
        }
        if self.gateway.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "gateway.request_timeout_ms must be > 0".into(),
            ));
        }
        let periods = [
            ("polling.checkout_period_ms", self.polling.checkout_period_ms),
            ("polling.tracking_period_ms", self.polling.tracking_period_ms),
            ("polling.redirect_delay_ms", self.polling.redirect_delay_ms),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be > 0")));
            }
        }
        if self.session.command_buffer == 0 || self.session.event_buffer == 0 {
            return Err(ConfigError::Invalid(
                "session buffers must hold at least one message".into(),
            ));
        }
        Ok(())
    }
}

fn env_trimmed(key: &str) -> Option<String> {
    let value = std::env::var(key).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Loads and validates the configuration.
pub fn load_config() -> Result<TrackerConfig, ConfigError> {
    let mut config = match env_trimmed(CONFIG_PATH_ENV) {
        Some(path) => TrackerConfig::from_toml_file(Path::new(&path))?,
        None => TrackerConfig::default(),
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
