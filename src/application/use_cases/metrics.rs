use crate::{
    application::services::{InstanceDirectory, PluginRegistry},
    infrastructure::adapters::MonitoringAdapter,
    shared::error::{AppError, AppResult},
};
use std::sync::Arc;

/// Renders Prometheus metrics after refreshing the inventory gauges
pub struct GetMetricsUseCase {
    registry: Arc<PluginRegistry>,
    directory: Arc<InstanceDirectory>,
    monitoring: Arc<MonitoringAdapter>,
}

impl GetMetricsUseCase {
    pub fn new(
        registry: Arc<PluginRegistry>,
        directory: Arc<InstanceDirectory>,
        monitoring: Arc<MonitoringAdapter>,
    ) -> Self {
        Self {
            registry,
            directory,
            monitoring,
        }
    }

    pub async fn execute(&self) -> AppResult<String> {
        let started = self.registry.products().await.len();
        self.monitoring
            .update_inventory(self.directory.running_count(), started);
        self.monitoring
            .get_prometheus_metrics()
            .map_err(|e| AppError::Internal(format!("Failed to encode metrics: {}", e)))
    }
}
