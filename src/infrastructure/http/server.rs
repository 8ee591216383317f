//! HTTP server implementation
//!
//! Two listeners share one set of use cases: the cross-chain listener answers
//! relayers, the management listener drives the plugin lifecycle. Keep the
//! management port off public interfaces.

use crate::{
    application::{
        services::{InstanceDirectory, PluginRegistry},
        use_cases::{CrossChainUseCase, GetMetricsUseCase, HealthCheckUseCase, ManagementUseCase},
    },
    config::AppConfig,
    infrastructure::{adapters::MonitoringAdapter, http::routes::RouteBuilder},
    shared::error::AppResult,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, instrument};
use warp::{Filter, Reply};

/// HTTP server hosting the cross-chain and management listeners
pub struct HttpServer {
    config: AppConfig,
    directory: Arc<InstanceDirectory>,
    cross_chain_use_case: Arc<CrossChainUseCase>,
    management_use_case: Arc<ManagementUseCase>,
    health_use_case: Arc<HealthCheckUseCase>,
    metrics_use_case: Arc<GetMetricsUseCase>,
}

impl HttpServer {
    pub fn new(
        config: AppConfig,
        registry: Arc<PluginRegistry>,
        directory: Arc<InstanceDirectory>,
        monitoring: Arc<MonitoringAdapter>,
    ) -> Self {
        let cross_chain_use_case = Arc::new(CrossChainUseCase::new(
            registry.clone(),
            directory.clone(),
            monitoring.clone(),
        ));
        let management_use_case = Arc::new(ManagementUseCase::new(
            registry.clone(),
            directory.clone(),
            monitoring.clone(),
        ));
        let health_use_case = Arc::new(HealthCheckUseCase::new(registry.clone(), directory.clone()));
        let metrics_use_case = Arc::new(GetMetricsUseCase::new(registry, directory.clone(), monitoring));

        Self {
            config,
            directory,
            cross_chain_use_case,
            management_use_case,
            health_use_case,
            metrics_use_case,
        }
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    pub fn cross_chain_routes(
        &self,
    ) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
        RouteBuilder::build_cross_chain_routes(
            &self.config,
            self.cross_chain_use_case.clone(),
            self.health_use_case.clone(),
            self.metrics_use_case.clone(),
        )
    }

    pub fn management_routes(
        &self,
    ) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
        RouteBuilder::build_management_routes(&self.config, self.management_use_case.clone())
    }

    /// Tear down the instance directory
    pub async fn shutdown(&self) {
        let count = self.directory.shutdown_all().await;
        info!(instances = count, "Server stopped");
    }

    /// Serve both listeners until ctrl-c, then shut down every live instance
    #[instrument(skip(self))]
    pub async fn run(self) -> AppResult<()> {
        let cross_chain_addr = SocketAddr::new(self.config.server.bind_address, self.config.server.port);
        let management_addr = SocketAddr::new(
            self.config.server.bind_address,
            self.config.server.management_port,
        );

        let cross_chain = warp::serve(self.cross_chain_routes()).run(cross_chain_addr);
        let management = warp::serve(self.management_routes()).run(management_addr);

        info!(address = %cross_chain_addr, "Cross-chain listener started");
        info!(address = %management_addr, "Management listener started");

        tokio::select! {
            _ = cross_chain => info!("Cross-chain listener exited"),
            _ = management => info!("Management listener exited"),
            _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
        }

        self.shutdown().await;
        Ok(())
    }
}
