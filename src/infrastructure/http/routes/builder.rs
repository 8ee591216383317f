//! Route builder module
//!
//! This module contains the route builder that assembles the filters served
//! by each listener.

use crate::{
    application::use_cases::{
        CrossChainUseCase, GetMetricsUseCase, HealthCheckUseCase, ManagementUseCase,
    },
    config::AppConfig,
    infrastructure::http::{
        routes::{CrossChainRoutes, HealthRoutes, ManagementRoutes, MetricsRoutes},
        utils::handle_rejection,
    },
};
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

/// Route builder that orchestrates the creation of all application routes
pub struct RouteBuilder;

impl RouteBuilder {
    /// Routes of the cross-chain listener
    pub fn build_cross_chain_routes(
        config: &AppConfig,
        cross_chain_use_case: Arc<CrossChainUseCase>,
        health_use_case: Arc<HealthCheckUseCase>,
        metrics_use_case: Arc<GetMetricsUseCase>,
    ) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
        let heartbeat_route = CrossChainRoutes::create_heartbeat_route(cross_chain_use_case.clone());
        let product_route =
            CrossChainRoutes::create_if_product_support_route(config, cross_chain_use_case.clone());
        let domain_route =
            CrossChainRoutes::create_if_domain_alive_route(config, cross_chain_use_case.clone());
        let bbc_call_route = CrossChainRoutes::create_bbc_call_route(config, cross_chain_use_case);
        let health_route = HealthRoutes::create_health_route(health_use_case);
        let metrics_route = MetricsRoutes::create_metrics_route(metrics_use_case);

        heartbeat_route
            .or(product_route)
            .or(domain_route)
            .or(bbc_call_route)
            .or(health_route)
            .or(metrics_route)
            .recover(handle_rejection)
    }

    /// Routes of the management listener
    pub fn build_management_routes(
        config: &AppConfig,
        management_use_case: Arc<ManagementUseCase>,
    ) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
        ManagementRoutes::create_manage_route(config, management_use_case).recover(handle_rejection)
    }
}
