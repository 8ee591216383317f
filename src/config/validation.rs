//! Configuration validation module
//!
//! Cross-field checks the validator derive cannot express.

use crate::config::app_config::{LoggingConfig, PluginsConfig, ServerConfig};
use crate::config::AppConfig;
use crate::shared::error::{AppError, AppResult};

/// Configuration validator for additional validation logic
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the complete configuration
    pub fn validate_config(config: &AppConfig) -> AppResult<()> {
        Self::validate_server_config(&config.server)?;
        Self::validate_plugins_config(&config.plugins)?;
        Self::validate_logging_config(&config.logging)?;
        Ok(())
    }

    fn validate_server_config(server: &ServerConfig) -> AppResult<()> {
        if server.port == server.management_port {
            return Err(AppError::Validation(format!(
                "management port must differ from the cross-chain port ({})",
                server.port
            )));
        }

        if !server.bind_address.is_loopback() {
            tracing::warn!(
                bind_address = %server.bind_address,
                "Management port is reachable from outside this host"
            );
        }
        Ok(())
    }

    fn validate_plugins_config(plugins: &PluginsConfig) -> AppResult<()> {
        if plugins.start_on_startup && !plugins.load_on_startup {
            return Err(AppError::Validation(
                "start_on_startup requires load_on_startup".to_string(),
            ));
        }

        if plugins.load_on_startup && !plugins.repository_path().is_dir() {
            tracing::warn!(
                repository = %plugins.repository,
                "Plugin repository does not exist; no plugins will be loaded at boot"
            );
        }
        Ok(())
    }

    fn validate_logging_config(logging: &LoggingConfig) -> AppResult<()> {
        if !["json", "text"].contains(&logging.format.to_ascii_lowercase().as_str()) {
            return Err(AppError::Validation(format!(
                "Invalid log format: {}",
                logging.format
            )));
        }

        tracing_subscriber::EnvFilter::try_new(&logging.level)
            .map_err(|e| AppError::Validation(format!("Invalid log level '{}': {}", logging.level, e)))?;
        Ok(())
    }
}
