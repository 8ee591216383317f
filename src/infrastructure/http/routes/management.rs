//! Management routes module

use crate::{
    application::use_cases::ManagementUseCase,
    config::AppConfig,
    domain::envelope::ManageRequest,
    infrastructure::http::{
        handlers::handle_manage_request,
        utils::{json_body, with_caller, with_management_use_case},
    },
};
use std::sync::Arc;
use warp::Filter;

/// Management routes configuration
pub struct ManagementRoutes;

impl ManagementRoutes {
    /// `POST /manage`
    pub fn create_manage_route(
        config: &AppConfig,
        use_case: Arc<ManagementUseCase>,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        warp::path("manage")
            .and(warp::path::end())
            .and(warp::post())
            .and(json_body::<ManageRequest>(config.server.max_request_size as u64))
            .and(with_caller())
            .and(with_management_use_case(use_case))
            .and_then(handle_manage_request)
    }
}
