//! Configuration management module
//!
//! Loading, validation, and access to server settings.

pub mod app_config;
pub mod validation;

pub use app_config::AppConfig;
pub use validation::ConfigValidator;
