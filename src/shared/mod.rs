//! Shared utilities and common functionality
//!
//! Error handling, logging, serde helpers and the blocking-call wrapper used
//! across the application.

pub mod blocking;
pub mod encoding;
pub mod error;
pub mod logging;

pub use blocking::run_blocking;
pub use error::{AppError, AppResult, DirectoryError, RegistryError};
pub use logging::LoggingUtils;
