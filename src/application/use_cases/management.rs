//! Plugin management surface
//!
//! Each operation reports its own error code. Reload evicts the product's
//! instances so the next startup is served by the new incarnation.

use crate::{
    application::services::{InstanceDirectory, PluginRegistry},
    domain::{
        bbc::BbcService,
        envelope::{ManageRequest, Response},
        error_code::ServerErrorCode,
    },
    infrastructure::adapters::MonitoringAdapter,
    shared::{blocking::run_blocking, logging::LoggingUtils},
};
use std::path::Path;
use std::sync::Arc;

/// Plugin management use case
pub struct ManagementUseCase {
    registry: Arc<PluginRegistry>,
    directory: Arc<InstanceDirectory>,
    monitoring: Arc<MonitoringAdapter>,
}

impl ManagementUseCase {
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

    pub async fn execute(&self, request: ManageRequest) -> Response {
        let operation = request.name();
        let target = match &request {
            ManageRequest::LoadPlugin { path } | ManageRequest::StartPlugin { path } => path.clone(),
            ManageRequest::StopPlugin { product }
            | ManageRequest::StartPluginFromStop { product }
            | ManageRequest::ReloadPlugin { product } => product.clone(),
            ManageRequest::ReloadPluginInNewPath { product, path } => {
                format!("{} <- {}", product, path)
            }
            ManageRequest::RestartBbc { product, domain } => format!("{}/{}", product, domain),
            ManageRequest::LoadPlugins | ManageRequest::StartPlugins => {
                self.registry.repository().display().to_string()
            }
            ManageRequest::Unsupported => String::new(),
        };

        let response = match self.run(request).await {
            Ok(()) => {
                LoggingUtils::log_manage_success(operation, &target);
                Response::success(None)
            }
            Err(response) => {
                LoggingUtils::log_manage_failure(
                    operation,
                    &target,
                    response.code,
                    &response.error_msg,
                );
                response
            }
        };
        self.monitoring.record_management(operation, response.code);
        response
    }

    async fn run(&self, request: ManageRequest) -> Result<(), Response> {
        use ServerErrorCode as C;

        match request {
            ManageRequest::LoadPlugins => self
                .registry
                .load_plugins()
                .await
                .map(|_| ())
                .map_err(|e| Response::fail_with(C::ManageLoadPlugins, e)),
            ManageRequest::StartPlugins => self
                .registry
                .start_plugins()
                .await
                .map(|_| ())
                .map_err(|e| Response::fail_with(C::ManageStartPlugins, e)),
            ManageRequest::LoadPlugin { path } => self
                .registry
                .load_plugin(Path::new(&path))
                .await
                .map(|_| ())
                .map_err(|e| Response::fail_with(C::ManageLoadPlugin, e)),
            ManageRequest::StartPlugin { path } => self
                .registry
                .start_plugin(Path::new(&path))
                .await
                .map(|_| ())
                .map_err(|e| Response::fail_with(C::ManageStartPlugin, e)),
            ManageRequest::StopPlugin { product } => self
                .registry
                .stop_plugin(&product)
                .await
                .map_err(|e| Response::fail_with(C::ManageStopPlugin, e)),
            ManageRequest::StartPluginFromStop { product } => self
                .registry
                .start_plugin_from_stop(&product)
                .await
                .map_err(|e| Response::fail_with(C::ManageStartPluginFromStop, e)),
            ManageRequest::ReloadPlugin { product } => self
                .reload(&product, None)
                .await
                .map_err(|e| Response::fail_with(C::ManageReloadPlugin, e)),
            ManageRequest::ReloadPluginInNewPath { product, path } => self
                .reload(&product, Some(Path::new(&path)))
                .await
                .map_err(|e| Response::fail_with(C::ManageReloadPluginInNewPath, e)),
            ManageRequest::RestartBbc { product, domain } => self
                .restart_bbc(&product, &domain)
                .await
                .map_err(|e| Response::fail_with(C::ManageRestartBbc, e)),
            ManageRequest::Unsupported => Err(Response::fail(C::UnsupportedManageRequest)),
        }
    }

    async fn reload(
        &self,
        product: &str,
        new_path: Option<&Path>,
    ) -> Result<(), crate::shared::error::RegistryError> {
        let directory = self.directory.clone();
        self.registry
            .reload_plugin(product, new_path, move |product| {
                let evicted = directory.evict_product(product);
                if !evicted.is_empty() {
                    shutdown_in_background(product.to_string(), evicted);
                }
            })
            .await
    }

    /// Shut down and forget one instance; the next startup builds a new one
    async fn restart_bbc(&self, product: &str, domain: &str) -> Result<(), String> {
        let service = self
            .directory
            .evict(product, domain)
            .ok_or_else(|| format!("no bbc service running for {}/{}", product, domain))?;

        run_blocking(move || service.shutdown())
            .await
            .map_err(|panic| format!("adapter panicked: {}", panic))?
            .map_err(|e| e.to_string())
    }
}

/// Best effort shutdown of evicted instances on the blocking pool
fn shutdown_in_background(product: String, evicted: Vec<(String, Arc<dyn BbcService>)>) {
    tokio::task::spawn_blocking(move || {
        for (domain, service) in evicted {
            if let Err(e) = service.shutdown() {
                LoggingUtils::log_best_effort_failure(
                    "shutdown evicted bbc service",
                    &format!("{}/{}", product, domain),
                    &e.to_string(),
                );
            }
        }
    });
}
