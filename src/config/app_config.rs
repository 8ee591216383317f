//! Application configuration structures
//!
//! Values come from an optional `Conf` file (any format the `config` crate
//! understands) overlaid by `BBC_SERVER__*` environment variables.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use validator::Validate;

use crate::config::validation::ConfigValidator;
use crate::shared::error::{AppError, AppResult};

/// Environment variable prefix, e.g. `BBC_SERVER__SERVER__PORT=9090`
pub const ENV_PREFIX: &str = "BBC_SERVER";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    /// Address both listeners bind to
    pub bind_address: IpAddr,

    /// Cross-chain RPC port
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    /// Plugin management RPC port
    #[validate(range(min = 1, max = 65535))]
    pub management_port: u16,

    /// Maximum request size in bytes
    #[validate(range(min = 1024, max = 10485760))] // 1KB to 10MB
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 9090,
            management_port: 9091,
            max_request_size: 4 * 1024 * 1024,
        }
    }
}

/// Plugin repository configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directory scanned by `loadPlugins`
    #[validate(length(min = 1))]
    pub repository: String,

    /// Load every artifact in the repository at boot
    pub load_on_startup: bool,

    /// Start every loaded plugin at boot
    pub start_on_startup: bool,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            repository: "plugins".to_string(),
            load_on_startup: true,
            start_on_startup: true,
        }
    }
}

impl PluginsConfig {
    pub fn repository_path(&self) -> PathBuf {
        PathBuf::from(&self.repository)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    #[validate(length(min = 1))]
    pub level: String,

    /// `json` or `text`
    #[validate(length(min = 1))]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub plugins: PluginsConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `Conf.*` in the working directory and the environment
    pub fn load() -> AppResult<Self> {
        Self::load_from("Conf")
    }

    /// Load configuration from `path` (extension optional) and the environment
    pub fn load_from(path: &str) -> AppResult<Self> {
        let config = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build configuration: {}", e)))?;

        let config: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::Config(format!("Failed to deserialize configuration: {}", e)))?;

        config.validate_config().map_err(|e| {
            AppError::Validation(format!("Configuration validation failed: {}", e))
        })?;
        ConfigValidator::validate_config(&config)?;

        Ok(config)
    }

    /// Field-level validation of every section
    pub fn validate_config(&self) -> Result<(), validator::ValidationErrors> {
        self.server.validate()?;
        self.plugins.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    pub fn management_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.management_port)
    }
}
