//! Test suite for the BBC plugin server
//!
//! - `common`: scripted loader, plugins and services plus setup helpers
//! - `integration`: end-to-end scenarios over the HTTP routes

pub mod common;
pub mod integration;

/// Test configuration and utilities
pub mod config {
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Initialize test environment
    pub fn init() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter("debug")
                .with_test_writer()
                .try_init();
        });
    }
}

/// Test result types
pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
