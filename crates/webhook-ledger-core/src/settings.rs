//! Process settings.
//!
//! Settings are read once at startup from environment variables and passed
//! explicitly to the components that need them. Two values are required:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `DATABASE_URL` | connection string for the event database |
//! | `WEBHOOK_SECRET` | shared secret used to sign deliveries |
//!
//! Everything else carries a default. Presence is the only validation applied
//! to the required values; an empty secret loads fine and simply makes every
//! signature check fail.

use crate::storage::{redact_database_url, DatabaseSettings};
use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Default cap on webhook request bodies; GitHub sends up to 25MB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 25 * 1024 * 1024;

/// Environment keys that must be present for the service to start.
const REQUIRED_KEYS: [&str; 2] = ["database_url", "webhook_secret"];

/// Shared webhook secret.
///
/// The value is never printed by `Debug` and is wiped from memory on drop.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get secret as bytes (only for immediate use)
    pub fn expose_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSecret")
            .field("length", &self.0.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Settings loading errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Missing required setting: {key}")]
    Missing { key: String },

    #[error("Invalid settings: {0}")]
    Invalid(#[from] ConfigError),
}

/// Service settings
#[derive(Clone, Deserialize)]
pub struct Settings {
    /// Database connection string
    pub database_url: String,

    /// Shared secret for `X-Hub-Signature-256`
    pub webhook_secret: WebhookSecret,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum webhook request size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Connections kept open in the pool
    #[serde(default = "default_pool_size")]
    pub db_pool_size: u32,

    /// Extra connections allowed above `db_pool_size` under load
    #[serde(default = "default_max_overflow")]
    pub db_max_overflow: u32,

    /// Seconds to wait for a pooled connection
    #[serde(default = "default_pool_timeout")]
    pub db_pool_timeout_seconds: u64,

    /// Seconds after which a connection is recycled
    #[serde(default = "default_pool_recycle")]
    pub db_pool_recycle_seconds: u64,

    /// Check connection liveness before handing it out
    #[serde(default = "default_true")]
    pub db_pool_pre_ping: bool,

    /// Log every SQL statement
    #[serde(default = "default_true")]
    pub db_echo: bool,

    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::load(Environment::default())
    }

    /// Load settings from an explicit set of variables instead of the process
    /// environment. Keys are matched case-insensitively, as with `from_env`.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let source: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::load(Environment::default().source(Some(source)))
    }

    fn load(environment: Environment) -> Result<Self, SettingsError> {
        // No `try_parsing`: a secret such as `0123` must stay a string.
        let config = Config::builder()
            .add_source(environment)
            .build()?;

        for key in REQUIRED_KEYS {
            if let Err(ConfigError::NotFound(_)) = config.get::<String>(key) {
                return Err(SettingsError::Missing {
                    key: key.to_uppercase(),
                });
            }
        }

        Ok(config.try_deserialize()?)
    }

    /// Pool and connection settings for the event database.
    pub fn database(&self) -> DatabaseSettings {
        DatabaseSettings {
            url: self.database_url.clone(),
            pool_size: self.db_pool_size,
            max_overflow: self.db_max_overflow,
            pool_timeout: Duration::from_secs(self.db_pool_timeout_seconds),
            pool_recycle: Duration::from_secs(self.db_pool_recycle_seconds),
            pre_ping: self.db_pool_pre_ping,
            echo: self.db_echo,
        }
    }

    /// `host:port` string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("database_url", &redact_database_url(&self.database_url))
            .field("webhook_secret", &self.webhook_secret)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_body_size", &self.max_body_size)
            .field("db_pool_size", &self.db_pool_size)
            .field("db_max_overflow", &self.db_max_overflow)
            .field("db_pool_timeout_seconds", &self.db_pool_timeout_seconds)
            .field("db_pool_recycle_seconds", &self.db_pool_recycle_seconds)
            .field("db_pool_pre_ping", &self.db_pool_pre_ping)
            .field("db_echo", &self.db_echo)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .finish()
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

fn default_pool_size() -> u32 {
    10
}

fn default_max_overflow() -> u32 {
    20
}

fn default_pool_timeout() -> u64 {
    30
}

fn default_pool_recycle() -> u64 {
    1800
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
