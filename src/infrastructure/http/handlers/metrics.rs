//! Metrics handler module
//!
//! This module contains the Prometheus endpoint handler.

use crate::application::use_cases::GetMetricsUseCase;
use std::sync::Arc;
use warp::Reply;

/// Handle Prometheus metrics requests
pub async fn handle_prometheus_request(
    metrics_use_case: Arc<GetMetricsUseCase>,
) -> Result<impl Reply, warp::reject::Rejection> {
    let metrics = metrics_use_case
        .execute()
        .await
        .map_err(warp::reject::custom)?;

    Ok(warp::reply::with_header(
        warp::reply::with_status(metrics, warp::http::StatusCode::OK),
        "Content-Type",
        "text/plain; version=0.0.4; charset=utf-8",
    ))
}
