//! Cross-chain surface: liveness queries and bbc calls

use crate::{
    application::services::{BbcDispatcher, InstanceDirectory, PluginRegistry},
    domain::envelope::{
        BbcCallRequest, HeartbeatResponse, MembershipResponse, Response, ResponsePayload,
    },
    infrastructure::adapters::MonitoringAdapter,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Cross-chain use case
pub struct CrossChainUseCase {
    registry: Arc<PluginRegistry>,
    directory: Arc<InstanceDirectory>,
    dispatcher: Arc<BbcDispatcher>,
    monitoring: Arc<MonitoringAdapter>,
}

impl CrossChainUseCase {
    pub fn new(
        registry: Arc<PluginRegistry>,
        directory: Arc<InstanceDirectory>,
        monitoring: Arc<MonitoringAdapter>,
    ) -> Self {
        let dispatcher = Arc::new(BbcDispatcher::new(registry.clone(), directory.clone()));
        Self {
            registry,
            directory,
            dispatcher,
            monitoring,
        }
    }

    /// Running domains and servable products
    pub async fn heartbeat(&self) -> Response {
        let products = self.registry.products().await;
        let domains = self.directory.list_running_domains();
        self.monitoring
            .update_inventory(self.directory.running_count(), products.len());

        Response::success(Some(ResponsePayload::Heartbeat(HeartbeatResponse {
            domains,
            products,
        })))
    }

    pub async fn if_product_support(&self, products: Vec<String>) -> Response {
        let mut results = BTreeMap::new();
        for product in products {
            if results.contains_key(&product) {
                continue;
            }
            let supported = self.registry.has(&product).await;
            results.insert(product, supported);
        }
        Response::success(Some(ResponsePayload::IfProductSupport(MembershipResponse {
            results,
        })))
    }

    pub async fn if_domain_alive(&self, domains: Vec<String>) -> Response {
        let results: BTreeMap<String, bool> = domains
            .into_iter()
            .map(|domain| {
                let alive = self.directory.has(&domain);
                (domain, alive)
            })
            .collect();
        Response::success(Some(ResponsePayload::IfDomainAlive(MembershipResponse {
            results,
        })))
    }

    pub async fn bbc_call(&self, call: BbcCallRequest) -> Response {
        let kind = call.kind();
        let started = Instant::now();
        let response = self.dispatcher.dispatch(call).await;
        self.monitoring
            .record_bbc_call(kind.as_str(), response.code, started.elapsed());
        response
    }
}
