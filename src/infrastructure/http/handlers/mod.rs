//! HTTP route handlers module
//!
//! This module contains separate route handlers for different endpoint types,
//! organized by functionality to improve maintainability and testability.

pub mod cross_chain;
pub mod health;
pub mod management;
pub mod metrics;

pub use cross_chain::{
    handle_bbc_call, handle_heartbeat, handle_if_domain_alive, handle_if_product_support,
};
pub use health::handle_health_request;
pub use management::handle_manage_request;
pub use metrics::handle_prometheus_request;
