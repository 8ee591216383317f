//! Cross-chain routes module
//!
//! Liveness queries and bbc calls served on the cross-chain listener.

use crate::{
    application::use_cases::CrossChainUseCase,
    config::AppConfig,
    domain::envelope::BbcCallRequest,
    infrastructure::http::{
        handlers::{handle_bbc_call, handle_heartbeat, handle_if_domain_alive, handle_if_product_support},
        models::{DomainsQuery, ProductsQuery},
        utils::{json_body, with_caller, with_cross_chain_use_case},
    },
};
use std::sync::Arc;
use warp::Filter;

/// Cross-chain routes configuration
pub struct CrossChainRoutes;

impl CrossChainRoutes {
    /// `POST /heartbeat`
    pub fn create_heartbeat_route(
        use_case: Arc<CrossChainUseCase>,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        warp::path("heartbeat")
            .and(warp::path::end())
            .and(warp::post())
            .and(with_caller())
            .and(with_cross_chain_use_case(use_case))
            .and_then(handle_heartbeat)
    }

    /// `POST /if-product-support`
    pub fn create_if_product_support_route(
        config: &AppConfig,
        use_case: Arc<CrossChainUseCase>,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        warp::path("if-product-support")
            .and(warp::path::end())
            .and(warp::post())
            .and(json_body::<ProductsQuery>(config.server.max_request_size as u64))
            .and(with_cross_chain_use_case(use_case))
            .and_then(handle_if_product_support)
    }

    /// `POST /if-domain-alive`
    pub fn create_if_domain_alive_route(
        config: &AppConfig,
        use_case: Arc<CrossChainUseCase>,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        warp::path("if-domain-alive")
            .and(warp::path::end())
            .and(warp::post())
            .and(json_body::<DomainsQuery>(config.server.max_request_size as u64))
            .and(with_cross_chain_use_case(use_case))
            .and_then(handle_if_domain_alive)
    }

    /// `POST /bbc-call`
    pub fn create_bbc_call_route(
        config: &AppConfig,
        use_case: Arc<CrossChainUseCase>,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        warp::path("bbc-call")
            .and(warp::path::end())
            .and(warp::post())
            .and(json_body::<BbcCallRequest>(config.server.max_request_size as u64))
            .and(with_cross_chain_use_case(use_case))
            .and_then(handle_bbc_call)
    }
}
