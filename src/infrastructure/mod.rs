//! Infrastructure layer - External concerns and adapters
//!
//! This module contains the module loader, adapters and HTTP handling.

pub mod adapters;
pub mod http;
pub mod loader;

// Re-export main adapters
pub use adapters::MonitoringAdapter;
pub use http::HttpServer;
pub use loader::ManifestModuleLoader;
