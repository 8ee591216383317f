//! Management request handler

use crate::{
    application::use_cases::ManagementUseCase,
    domain::envelope::ManageRequest,
    infrastructure::http::utils::envelope_reply,
    shared::logging::LoggingUtils,
};
use std::sync::Arc;
use tracing::info;
use warp::Reply;

/// Handle one plugin management request
pub async fn handle_manage_request(
    request: ManageRequest,
    caller: String,
    use_case: Arc<ManagementUseCase>,
) -> Result<impl Reply, warp::reject::Rejection> {
    info!(
        request_id = %LoggingUtils::generate_request_id(),
        caller = %caller,
        operation = request.name(),
        "Management request received"
    );
    let response = use_case.execute(request).await;
    Ok(envelope_reply(&response))
}
