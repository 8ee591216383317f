//! Application layer - Use cases and application services
//!
//! Services own the plugin registry, the instance directory and dispatch; use
//! cases put the two RPC surfaces on top of them.

pub mod services;
pub mod use_cases;

pub use services::*;
pub use use_cases::*;
