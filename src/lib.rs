//! BBC plugin server - hosts blockchain bridge adapters behind one RPC surface
//!
//! Adapters ("plugins") are loaded from a repository, driven through their
//! lifecycle over a management listener, and instantiated once per
//! (product, domain) on relayer demand. Every call returns the same envelope:
//! a success payload or a numeric error code with a message.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

#[cfg(test)]
mod tests;

pub use config::AppConfig;
pub use infrastructure::HttpServer;
pub use shared::error::{AppError, AppResult};
