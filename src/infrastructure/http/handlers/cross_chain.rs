//! Cross-chain request handlers
//!
//! Every handler answers with the response envelope; failures travel as
//! envelope codes, never as HTTP errors.

use crate::{
    application::use_cases::CrossChainUseCase,
    domain::envelope::BbcCallRequest,
    infrastructure::http::{
        models::{DomainsQuery, ProductsQuery},
        utils::envelope_reply,
    },
    shared::logging::LoggingUtils,
};
use std::sync::Arc;
use tracing::{debug, info};
use warp::Reply;

/// Handle heartbeat requests
pub async fn handle_heartbeat(
    caller: String,
    use_case: Arc<CrossChainUseCase>,
) -> Result<impl Reply, warp::reject::Rejection> {
    info!(caller = %caller, "Heartbeat received");
    let response = use_case.heartbeat().await;
    Ok(envelope_reply(&response))
}

pub async fn handle_if_product_support(
    query: ProductsQuery,
    use_case: Arc<CrossChainUseCase>,
) -> Result<impl Reply, warp::reject::Rejection> {
    let response = use_case.if_product_support(query.products).await;
    Ok(envelope_reply(&response))
}

pub async fn handle_if_domain_alive(
    query: DomainsQuery,
    use_case: Arc<CrossChainUseCase>,
) -> Result<impl Reply, warp::reject::Rejection> {
    let response = use_case.if_domain_alive(query.domains).await;
    Ok(envelope_reply(&response))
}

/// Handle a bbc call addressed to one (product, domain)
pub async fn handle_bbc_call(
    call: BbcCallRequest,
    use_case: Arc<CrossChainUseCase>,
) -> Result<impl Reply, warp::reject::Rejection> {
    debug!(
        request_id = %LoggingUtils::generate_request_id(),
        product = %call.product,
        domain = %call.domain,
        request = %call.kind(),
        "Processing bbc call"
    );
    let response = use_case.bbc_call(call).await;
    Ok(envelope_reply(&response))
}
