//! HTTP infrastructure module
//!
//! This module contains HTTP-related concerns including request models,
//! server implementation, routes, handlers and utilities.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod server;
pub mod utils;

pub use models::{DomainsQuery, ProductsQuery};
pub use server::HttpServer;
