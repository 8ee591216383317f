//! Health check handler module
//!
//! This module contains the health check endpoint handler for monitoring system status.

use crate::application::use_cases::HealthCheckUseCase;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::Reply;

/// Handle health check requests
pub async fn handle_health_request(
    health_use_case: Arc<HealthCheckUseCase>,
) -> Result<impl Reply, warp::reject::Rejection> {
    let health_response = health_use_case
        .execute()
        .await
        .map_err(warp::reject::custom)?;

    let status = StatusCode::from_u16(health_response.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok(warp::reply::with_status(
        warp::reply::json(&health_response),
        status,
    ))
}
