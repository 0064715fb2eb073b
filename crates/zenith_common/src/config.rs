//! Zenith Configuration
//!
//! The API key comes only from the environment (`GOOGLE_API_KEY`).
//! Backend tuning can be overridden from a TOML file:
//! `$ZENITH_CONFIG`, or `~/.config/zenith/config.toml`.
//!
//! ```toml
//! [backend]
//! model = "gemini-2.0-flash"
//! endpoint = "https://generativelanguage.googleapis.com/v1beta"
//! timeout_secs = 60
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ZenithError};

pub const GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "ZENITH_CONFIG";

/// Everything the diagnostics service needs to reach the reasoning backend.
///
/// Built once and passed to the service explicitly. Never mutated afterwards.
#[derive(Clone, Serialize, Deserialize)]
pub struct ZenithConfig {
    #[serde(skip)]
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for ZenithConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: GEMINI_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

// Keep the key out of logs and panic messages.
impl fmt::Debug for ZenithConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZenithConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// On-disk overrides. The API key is deliberately not accepted here.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    backend: BackendOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BackendOverrides {
    model: Option<String>,
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

impl ZenithConfig {
    /// Defaults plus the given key
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            ..Self::default()
        }
    }

    /// Load from the process environment and the optional config file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` in place of the process environment.
    ///
    /// A missing or blank key fails with `Configuration` before the config
    /// file is even looked at.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV).unwrap_or_default();
        if api_key.trim().is_empty() {
            tracing::error!("{} environment variable is not set", API_KEY_ENV);
            return Err(ZenithError::Configuration(format!(
                "{} environment variable is not set.",
                API_KEY_ENV
            )));
        }

        let mut config = Self::with_api_key(api_key);

        let path = lookup(CONFIG_PATH_ENV)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .or_else(Self::user_config_path);
        if let Some(path) = path {
            config.apply_file(&path)?;
        }

        Ok(config)
    }

    /// `~/.config/zenith/config.toml`, if a config directory exists
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("zenith").join("config.toml"))
    }

    /// Apply overrides from a TOML file. A missing file is not an error.
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            ZenithError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let file: ConfigFile = toml::from_str(&contents).map_err(|e| {
            ZenithError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        let backend = file.backend;
        if let Some(model) = backend.model.filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }
        if let Some(endpoint) = backend.endpoint.filter(|e| !e.trim().is_empty()) {
            self.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = backend.timeout_secs {
            if timeout == 0 {
                return Err(ZenithError::Configuration(format!(
                    "{}: timeout_secs must be greater than zero",
                    path.display()
                )));
            }
            self.timeout_secs = timeout;
        }

        tracing::debug!("Applied config overrides from {}", path.display());
        Ok(())
    }
}
