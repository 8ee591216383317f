//! Metrics routes module
//!
//! This module contains the Prometheus route configuration.

use crate::{
    application::use_cases::GetMetricsUseCase,
    infrastructure::http::{handlers::handle_prometheus_request, utils::with_metrics_use_case},
};
use std::sync::Arc;
use warp::Filter;

/// Metrics routes configuration
pub struct MetricsRoutes;

impl MetricsRoutes {
    /// Create the Prometheus metrics endpoint route
    pub fn create_metrics_route(
        metrics_use_case: Arc<GetMetricsUseCase>,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        warp::path("metrics")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_metrics_use_case(metrics_use_case))
            .and_then(handle_prometheus_request)
    }
}
