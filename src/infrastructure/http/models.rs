//! HTTP request bodies for the cross-chain listener

use serde::{Deserialize, Serialize};

/// Body of `POST /if-product-support`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductsQuery {
    pub products: Vec<String>,
}

/// Body of `POST /if-domain-alive`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainsQuery {
    pub domains: Vec<String>,
}
