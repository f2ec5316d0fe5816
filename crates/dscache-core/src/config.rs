//! Configuration structures for dscache.
//!
//! Configuration is loaded from TOML files and can be overridden via CLI flags.
//! All recognized options are enumerated here and validated once at startup;
//! nothing is read from ambient environment values at runtime.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Remote dataset source configuration
    pub source: SourceConfig,

    /// Durable store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log output format
    #[serde(default)]
    pub format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Structured JSON lines
    Json,
    /// Human-readable text
    #[default]
    Text,
}

/// Remote dataset source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// URL of the dataset JSON document
    pub url: String,

    /// Request timeout in seconds (bounds both connect and body read)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Path of the database file
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Row keying policy, fixed per deployment
    #[serde(default)]
    pub key_policy: KeyPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            key_policy: KeyPolicy::default(),
        }
    }
}

/// Row keying policy for collection stores.
///
/// The dataset contract does not pin down how rows are keyed, so the policy
/// is a deployment-wide choice rather than a per-call one. Positional keys
/// are the default; `explicit-id` reads a numeric `id` field off each record
/// and falls back to the position when the field is absent.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum KeyPolicy {
    /// Key each record by its position within the collection
    #[default]
    Positional,
    /// Key each record by its numeric `id` field, position as fallback
    ExplicitId,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_store_path() -> PathBuf {
    PathBuf::from("dscache.redb")
}

impl Config {
    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if self.source.url.is_empty() {
            return Err(crate::Error::Config("Dataset source URL is required".into()));
        }

        if self.source.request_timeout_secs == 0 {
            return Err(crate::Error::Config(
                "Request timeout must be nonzero".into(),
            ));
        }

        if self.store.path.as_os_str().is_empty() {
            return Err(crate::Error::Config("Store path is required".into()));
        }

        Ok(())
    }
}
