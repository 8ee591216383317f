//! HTTP routes module
//!
//! This module contains all HTTP route configurations.

pub mod builder;
pub mod cross_chain;
pub mod health;
pub mod management;
pub mod metrics;

// Re-export commonly used types
pub use builder::RouteBuilder;
pub use cross_chain::CrossChainRoutes;
pub use health::HealthRoutes;
pub use management::ManagementRoutes;
pub use metrics::MetricsRoutes;
