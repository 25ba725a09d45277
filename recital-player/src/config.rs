//! Configuration for the Recital audio player
//!
//! Two-tier configuration:
//! 1. **TOML bootstrap**: backend URL, port, logging (static, restart to change)
//! 2. **Overrides**: command-line arguments and environment variables
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--port, --backend-url)
//! 2. Environment variables (RECITAL_BACKEND_URL, RECITAL_PORT)
//! 3. TOML configuration file
//! 4. Built-in defaults

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime. The player must restart
/// to pick up changes to the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the synthesis backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout for backend HTTP calls
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        TomlConfig {
            backend_url: default_backend_url(),
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_port() -> u16 {
    5750
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Complete application configuration after overrides are applied
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the synthesis backend
    pub backend_url: String,

    /// HTTP server port
    pub port: u16,

    /// Per-request timeout for backend HTTP calls
    pub request_timeout: Duration,

    /// Log level for the default EnvFilter
    pub log_level: String,
}

impl Config {
    /// Load configuration from an optional TOML file plus overrides
    ///
    /// A missing `toml_path` (or `None`) falls back to built-in defaults;
    /// a present but unparseable file is an error.
    pub async fn load(toml_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let toml_config = match toml_path {
            Some(path) => {
                let toml_str = tokio::fs::read_to_string(path).await.map_err(|e| {
                    Error::Config(format!("Failed to read config file {:?}: {}", path, e))
                })?;
                let parsed: TomlConfig = toml::from_str(&toml_str)
                    .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
                info!("Loaded TOML configuration from {:?}", path);
                parsed
            }
            None => TomlConfig::default(),
        };

        let backend_url = overrides
            .backend_url
            .unwrap_or(toml_config.backend_url)
            .trim_end_matches('/')
            .to_string();
        let port = overrides.port.unwrap_or(toml_config.port);

        if backend_url.is_empty() {
            return Err(Error::Config("backend_url must not be empty".to_string()));
        }

        Ok(Config {
            backend_url,
            port,
            request_timeout: Duration::from_millis(toml_config.request_timeout_ms),
            log_level: toml_config.logging.level,
        })
    }
}

/// Command-line / environment configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend_url: Option<String>,
    pub port: Option<u16>,
}
