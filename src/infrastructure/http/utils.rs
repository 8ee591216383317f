//! HTTP utilities - Common helper functions
//!
//! Filter injectors shared by the route modules, the bounded JSON body
//! extractor and the rejection handler that turns every rejection into a
//! response envelope.

use crate::{
    application::use_cases::{
        CrossChainUseCase, GetMetricsUseCase, HealthCheckUseCase, ManagementUseCase,
    },
    domain::{envelope::Response, error_code::ServerErrorCode},
    shared::error::AppError,
};
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Helper function to inject the cross-chain use case into route
pub fn with_cross_chain_use_case(
    use_case: Arc<CrossChainUseCase>,
) -> impl Filter<Extract = (Arc<CrossChainUseCase>,), Error = Infallible> + Clone {
    warp::any().map(move || use_case.clone())
}

/// Helper function to inject the management use case into route
pub fn with_management_use_case(
    use_case: Arc<ManagementUseCase>,
) -> impl Filter<Extract = (Arc<ManagementUseCase>,), Error = Infallible> + Clone {
    warp::any().map(move || use_case.clone())
}

/// Helper function to inject health use case into route
pub fn with_health_use_case(
    health_use_case: Arc<HealthCheckUseCase>,
) -> impl Filter<Extract = (Arc<HealthCheckUseCase>,), Error = Infallible> + Clone {
    warp::any().map(move || health_use_case.clone())
}

/// Helper function to inject metrics use case into route
pub fn with_metrics_use_case(
    metrics_use_case: Arc<GetMetricsUseCase>,
) -> impl Filter<Extract = (Arc<GetMetricsUseCase>,), Error = Infallible> + Clone {
    warp::any().map(move || metrics_use_case.clone())
}

/// JSON body capped at `limit` bytes
pub fn json_body<T>(limit: u64) -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(limit).and(warp::body::json())
}

/// Caller address as reported by the fronting proxy, if any
pub fn with_caller() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::header::optional::<String>(FORWARDED_FOR).map(|forwarded: Option<String>| {
        forwarded
            .and_then(|value| value.split(',').next().map(|ip| ip.trim().to_string()))
            .filter(|ip| !ip.is_empty())
            .unwrap_or_else(|| "direct".to_string())
    })
}

/// Serialize an envelope with HTTP 200; callers read the envelope code
pub fn envelope_reply(response: &Response) -> warp::reply::Json {
    warp::reply::json(response)
}

/// Map rejections to an envelope carrying the generic error code
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "no such endpoint".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("malformed request body: {}", e))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large".to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "content-length required".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "expected application/json".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else if let Some(e) = err.find::<AppError>() {
        (e.http_status_code(), e.to_string())
    } else {
        warn!(rejection = ?err, "Unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{:?}", err))
    };

    debug!(status = status.as_u16(), detail = %detail, "Request rejected");
    let body = Response::fail_with(ServerErrorCode::UnknownError, detail);
    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
