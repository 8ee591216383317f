use crate::{
    application::services::{InstanceDirectory, PluginRegistry},
    domain::health::HealthResponse,
    shared::error::AppResult,
};
use std::sync::Arc;

/// Health check use case
pub struct HealthCheckUseCase {
    registry: Arc<PluginRegistry>,
    directory: Arc<InstanceDirectory>,
}

impl HealthCheckUseCase {
    pub fn new(registry: Arc<PluginRegistry>, directory: Arc<InstanceDirectory>) -> Self {
        Self {
            registry,
            directory,
        }
    }

    /// Plugin states and live instance count
    pub async fn execute(&self) -> AppResult<HealthResponse> {
        let plugins = self.registry.states().await;
        Ok(HealthResponse::new(plugins, self.directory.running_count()))
    }
}
