//! # Server Configuration
//!
//! Production-grade configuration management with:
//!
//! - Environment variable support (12-factor app)
//! - Configuration file loading (YAML)
//! - Comprehensive validation
//! - Sensible defaults
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `GITWIRE_HTTP_ADDR` | HTTP listen address | `127.0.0.1:8080` |
//! | `GITWIRE_REQUEST_TIMEOUT` | Request timeout in seconds | `30` |
//! | `GITWIRE_MAX_BODY_BYTES` | Maximum request body size in bytes | `52428800` (50MB) |
//! | `GITWIRE_LOG_LEVEL` | Log level | `info` |
//! | `GITWIRE_LOG_FORMAT` | Log format (json/pretty) | `json` |
//! | `GITWIRE_DATA_DIR` | Data directory | `./data` |
//! | `GITWIRE_AUTH_REALM` | Basic-auth realm string | `gitwire` |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gitwire_server::config::ServerConfig;
//!
//! let config = ServerConfig::from_env().expect("invalid configuration");
//! config.validate_config().expect("configuration validation failed");
//! ```

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use validator::Validate;

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Environment variable parsing error.
    #[error("failed to parse environment variable {key}: {message}")]
    EnvParse { key: String, message: String },

    /// File loading error.
    #[error("failed to load configuration file: {0}")]
    FileLoad(String),

    /// Validation error.
    #[error("validation failed: {0}")]
    Validation(String),
}

/// Root server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct ServerConfig {
    /// HTTP adapter configuration.
    #[validate(nested)]
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging configuration.
    #[validate(nested)]
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Storage configuration.
    #[validate(nested)]
    #[serde(default)]
    pub storage: StorageConfig,

    /// Authentication configuration.
    #[validate(nested)]
    #[serde(default)]
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.merge_env()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileLoad(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::FileLoad(e.to_string()))
    }

    /// Overlay `GITWIRE_*` environment variables onto an existing configuration.
    pub fn merge_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(addr) = std::env::var("GITWIRE_HTTP_ADDR") {
            self.http.addr = addr.parse().map_err(|_| ConfigError::EnvParse {
                key: "GITWIRE_HTTP_ADDR".to_string(),
                message: "invalid socket address".to_string(),
            })?;
        }

        if let Ok(timeout) = std::env::var("GITWIRE_REQUEST_TIMEOUT") {
            self.http.request_timeout_secs =
                timeout.parse().map_err(|_| ConfigError::EnvParse {
                    key: "GITWIRE_REQUEST_TIMEOUT".to_string(),
                    message: "invalid timeout value".to_string(),
                })?;
        }

        if let Ok(bytes) = std::env::var("GITWIRE_MAX_BODY_BYTES") {
            self.http.max_body_bytes = bytes.parse().map_err(|_| ConfigError::EnvParse {
                key: "GITWIRE_MAX_BODY_BYTES".to_string(),
                message: "invalid byte count".to_string(),
            })?;
        }

        if let Ok(level) = std::env::var("GITWIRE_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = std::env::var("GITWIRE_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(dir) = std::env::var("GITWIRE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        if let Ok(realm) = std::env::var("GITWIRE_AUTH_REALM") {
            self.auth.realm = realm;
        }

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "invalid log level '{}'. valid values: {:?}",
                self.logging.level, valid_levels
            )));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "invalid log format '{}'. valid values: {:?}",
                self.logging.format, valid_formats
            )));
        }

        if self.http.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be non-zero".to_string(),
            ));
        }

        if self.auth.realm.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth realm must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// HTTP adapter configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct HttpConfig {
    /// Listen address.
    pub addr: SocketAddr,

    /// Request timeout in seconds.
    #[validate(range(min = 1, max = 3600))]
    pub request_timeout_secs: u32,

    /// Maximum request body size in bytes, enforced before buffering a POST body.
    #[validate(range(min = 1024, max = 1_073_741_824))] // 1KB to 1GB
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".parse().expect("valid default address"),
            request_timeout_secs: 30,
            max_body_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Log format (json, pretty).
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct StorageConfig {
    /// Data directory backing the bundled in-memory repository agent, when persisted.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AuthConfig {
    /// Realm string sent in the `WWW-Authenticate: Basic realm="..."` challenge.
    pub realm: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            realm: "gitwire".to_string(),
        }
    }
}
