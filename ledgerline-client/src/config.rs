//! Configuration loading for the Ledgerline client.
//!
//! All fields are required unless explicitly marked optional. No defaults.
//! The API origin may be overridden from the environment
//! (`LEDGERLINE_API_BASE_URL`, then `NEXT_PUBLIC_API_BASE_URL`).

use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "LEDGERLINE_CONFIG";
pub const API_BASE_URL_ENV: &str = "LEDGERLINE_API_BASE_URL";
pub const LEGACY_API_BASE_URL_ENV: &str = "NEXT_PUBLIC_API_BASE_URL";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub ws_path: String,
    /// Tenant sent as `x-company-id`. Super-admin sessions run without one.
    pub company_id: Option<String>,
    pub request_timeout_ms: u64,
    pub cache: CacheSettings,
    pub reconnect: ReconnectConfig,
    pub notifications: NotificationSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    /// How long an entry without subscribers survives before collection.
    pub keep_unused_for_ms: u64,
}

impl CacheSettings {
    pub fn keep_unused_for(&self) -> Duration {
        Duration::from_millis(self.keep_unused_for_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub multiplier: f64,
    pub jitter_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationSettings {
    pub max_visible: usize,
    pub auto_hide_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or LEDGERLINE_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let mut config = Self::from_path(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let origin = lookup(API_BASE_URL_ENV)
            .or_else(|| lookup(LEGACY_API_BASE_URL_ENV))
            .filter(|value| !value.trim().is_empty());
        if let Some(origin) = origin {
            self.api_base_url = origin;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_url()?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must use http or https".to_string(),
            });
        }
        if !self.ws_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "ws_path",
                reason: "must start with '/'".to_string(),
            });
        }
        if let Some(company_id) = &self.company_id {
            if company_id.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "company_id",
                    reason: "must not be blank when set".to_string(),
                });
            }
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.reconnect.initial_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reconnect.initial_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.reconnect.max_ms < self.reconnect.initial_ms {
            return Err(ConfigError::InvalidValue {
                field: "reconnect.max_ms",
                reason: "must be >= initial_ms".to_string(),
            });
        }
        if !self.reconnect.multiplier.is_finite() || self.reconnect.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "reconnect.multiplier",
                reason: "must be a finite number >= 1.0".to_string(),
            });
        }
        if self.notifications.max_visible == 0 {
            return Err(ConfigError::InvalidValue {
                field: "notifications.max_visible",
                reason: "must be > 0".to_string(),
            });
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        Url::parse(self.api_base_url.trim()).map_err(|e| ConfigError::InvalidValue {
            field: "api_base_url",
            reason: e.to_string(),
        })
    }

    /// Realtime endpoint: the API origin with a `ws`/`wss` scheme and `ws_path`.
    pub fn ws_url(&self) -> Result<Url, ConfigError> {
        let mut url = self.api_url()?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme).map_err(|_| ConfigError::InvalidValue {
            field: "api_base_url",
            reason: format!("cannot derive a {scheme} endpoint"),
        })?;
        url.set_path(&self.ws_path);
        url.set_query(None);
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
