use anyhow::Context;
use bbc_plugin_server::{
    application::services::{InstanceDirectory, PluginRegistry},
    infrastructure::{adapters::MonitoringAdapter, loader::ManifestModuleLoader},
    shared::logging::LoggingUtils,
    AppConfig, HttpServer,
};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    if let Err(e) = LoggingUtils::initialize(&config.logging.level, &config.logging.format) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting BBC plugin server...");

    if let Err(e) = run(config).await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let loader = Arc::new(ManifestModuleLoader::with_builtin_factories());
    info!(factories = ?loader.factory_names(), "Plugin factories registered");

    let registry = Arc::new(PluginRegistry::new(config.plugins.repository_path(), loader));
    let directory = Arc::new(InstanceDirectory::new(registry.clone()));
    let monitoring = Arc::new(MonitoringAdapter::new().context("Failed to register metrics")?);

    // Boot failures are logged; the operator can fix plugins over the management port
    if config.plugins.load_on_startup {
        match registry.load_plugins().await {
            Ok(products) => info!(products = ?products, "Plugins loaded"),
            Err(e) => warn!(error = %e, "Some plugins failed to load"),
        }
    }
    if config.plugins.start_on_startup {
        match registry.start_plugins().await {
            Ok(products) => info!(products = ?products, "Plugins started"),
            Err(e) => warn!(error = %e, "Some plugins failed to start"),
        }
    }

    let server = HttpServer::new(config, registry, directory, monitoring);
    info!(
        cross_chain = %server.config().server_address(),
        management = %server.config().management_address(),
        "Server initialized"
    );
    server.run().await.context("HTTP server failed")
}
