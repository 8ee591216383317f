//! Error handling module
//!
//! Centralized error types for the application. Registry and directory errors
//! stay typed so management operations can map each failure to its own code.

use crate::domain::plugin::{LoadError, PluginState};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn http_status_code(&self) -> warp::http::StatusCode {
        match self {
            AppError::Json(_) => warp::http::StatusCode::BAD_REQUEST,
            AppError::Validation(_) => warp::http::StatusCode::BAD_REQUEST,
            _ => warp::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application result type
pub type AppResult<T> = Result<T, AppError>;

impl warp::reject::Reject for AppError {}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Json(err.to_string())
    }
}

/// Plugin registry failure, one variant per lifecycle step
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("load failed: {0}")]
    Load(String),

    #[error("start failed: {0}")]
    Start(String),

    #[error("stop failed: {0}")]
    Stop(String),

    #[error("start from stop failed: {0}")]
    StartFromStop(String),

    #[error("reload failed: {0}")]
    Reload(String),

    #[error("no plugin registered for product '{0}'")]
    NotFound(String),

    #[error("product '{0}' is already registered")]
    Duplicate(String),

    #[error("cannot {operation} plugin '{product}' in state {state}")]
    InvalidState {
        product: String,
        state: PluginState,
        operation: &'static str,
    },
}

impl From<LoadError> for RegistryError {
    fn from(err: LoadError) -> Self {
        RegistryError::Load(err.to_string())
    }
}

/// Instance directory failure.
///
/// Cloneable because one construction outcome is shared by every caller that
/// waited on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectoryError {
    #[error("product '{0}' not supported")]
    PluginNotSupported(String),

    #[error("failed to create bbc service for {product}/{domain}: {reason}")]
    Create {
        product: String,
        domain: String,
        reason: String,
    },
}
