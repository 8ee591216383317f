//! Per (product, domain) adapter instances
//!
//! An instance is built at most once per key. Concurrent first callers share a
//! single construction and all observe its result, success or failure. A
//! failed construction leaves no entry behind, so a later call can retry.

use crate::application::services::plugin_registry::PluginRegistry;
use crate::domain::bbc::BbcService;
use crate::shared::blocking::run_blocking;
use crate::shared::error::DirectoryError;
use crate::shared::logging::LoggingUtils;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

type InstanceKey = (String, String);
type ServiceHandle = Arc<dyn BbcService>;
type Construction = Shared<BoxFuture<'static, Result<ServiceHandle, DirectoryError>>>;

#[derive(Clone)]
enum Slot {
    /// Construction in flight; `ticket` tells this attempt apart from later ones
    Pending { ticket: u64, construction: Construction },
    Ready(ServiceHandle),
}

/// Directory of live adapter instances
pub struct InstanceDirectory {
    registry: Arc<PluginRegistry>,
    instances: Arc<DashMap<InstanceKey, Slot>>,
    next_ticket: AtomicU64,
}

impl InstanceDirectory {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            instances: Arc::new(DashMap::new()),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Return the instance for (product, domain), building it on first use
    pub async fn get_or_create(
        &self,
        product: &str,
        domain: &str,
    ) -> Result<ServiceHandle, DirectoryError> {
        let key = (product.to_string(), domain.to_string());

        let construction = match self.instances.entry(key.clone()) {
            Entry::Occupied(occupied) => match occupied.get() {
                Slot::Ready(service) => return Ok(service.clone()),
                Slot::Pending { construction, .. } => construction.clone(),
            },
            Entry::Vacant(vacant) => {
                let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                let construction = self.construct(key, ticket);
                vacant.insert(Slot::Pending {
                    ticket,
                    construction: construction.clone(),
                });
                construction
            }
        };

        construction.await
    }

    /// Start one construction attempt on its own task.
    ///
    /// Callers only share the task's outcome, so an abandoned caller cannot
    /// stall the build. The shard holding the key stays locked until the
    /// pending slot is inserted, so the task cannot settle before it exists.
    fn construct(&self, key: InstanceKey, ticket: u64) -> Construction {
        let (product, domain) = key.clone();
        let build = tokio::spawn(build_instance(
            self.registry.clone(),
            self.instances.clone(),
            key,
            ticket,
        ));

        async move {
            match build.await {
                Ok(result) => result,
                Err(e) => Err(DirectoryError::Create {
                    product,
                    domain,
                    reason: format!("construction task failed: {}", e),
                }),
            }
        }
        .boxed()
        .shared()
    }

    /// Non-creating lookup of a built instance
    pub fn get(&self, product: &str, domain: &str) -> Option<ServiceHandle> {
        let key = (product.to_string(), domain.to_string());
        match self.instances.get(&key).as_deref() {
            Some(Slot::Ready(service)) => Some(service.clone()),
            _ => None,
        }
    }

    /// Whether any product has a built instance for `domain`
    pub fn has(&self, domain: &str) -> bool {
        self.instances
            .iter()
            .any(|e| e.key().1 == domain && matches!(e.value(), Slot::Ready(_)))
    }

    /// Domains with at least one built instance, sorted and deduplicated
    pub fn list_running_domains(&self) -> Vec<String> {
        let domains: BTreeSet<String> = self
            .instances
            .iter()
            .filter(|e| matches!(e.value(), Slot::Ready(_)))
            .map(|e| e.key().1.clone())
            .collect();
        domains.into_iter().collect()
    }

    pub fn running_count(&self) -> usize {
        self.instances
            .iter()
            .filter(|e| matches!(e.value(), Slot::Ready(_)))
            .count()
    }

    /// Remove one built instance and hand it back to the caller
    pub fn evict(&self, product: &str, domain: &str) -> Option<ServiceHandle> {
        let key = (product.to_string(), domain.to_string());
        self.instances
            .remove_if(&key, |_, slot| matches!(slot, Slot::Ready(_)))
            .and_then(|(_, slot)| match slot {
                Slot::Ready(service) => Some(service),
                Slot::Pending { .. } => None,
            })
    }

    /// Remove every built instance of `product`
    pub fn evict_product(&self, product: &str) -> Vec<(String, ServiceHandle)> {
        let keys: Vec<InstanceKey> = self
            .instances
            .iter()
            .filter(|e| e.key().0 == product && matches!(e.value(), Slot::Ready(_)))
            .map(|e| e.key().clone())
            .collect();

        let evicted: Vec<(String, ServiceHandle)> = keys
            .into_iter()
            .filter_map(|key| {
                let domain = key.1.clone();
                self.evict(&key.0, &key.1).map(|service| (domain, service))
            })
            .collect();

        debug!(product = %product, evicted = evicted.len(), "Evicted bbc services");
        evicted
    }

    /// Evict every built instance and shut each one down on the blocking pool.
    ///
    /// Constructions still in flight are left to finish on their own tasks.
    pub async fn shutdown_all(&self) -> usize {
        let keys: Vec<InstanceKey> = self
            .instances
            .iter()
            .filter(|e| matches!(e.value(), Slot::Ready(_)))
            .map(|e| e.key().clone())
            .collect();

        let mut count = 0;
        for (product, domain) in keys {
            if let Some(service) = self.evict(&product, &domain) {
                discard(&product, &domain, service).await;
                count += 1;
            }
        }
        info!(count, "Bbc services shut down");
        count
    }
}

async fn build_instance(
    registry: Arc<PluginRegistry>,
    instances: Arc<DashMap<InstanceKey, Slot>>,
    key: InstanceKey,
    ticket: u64,
) -> Result<ServiceHandle, DirectoryError> {
    let (product, domain) = key.clone();
    let handle = match registry.handle(&product).await {
        Some(handle) => handle,
        None => {
            settle(&instances, &key, ticket, None);
            return Err(DirectoryError::PluginNotSupported(product));
        }
    };

    let plugin = handle.plugin().clone();
    let build_domain = domain.clone();
    let built = run_blocking(move || plugin.create_service(&build_domain))
        .await
        .map_err(|panic| format!("adapter panicked: {}", panic))
        .and_then(|r| r.map_err(|e| e.to_string()));

    let service: ServiceHandle = match built {
        Ok(service) => Arc::from(service),
        Err(reason) => {
            settle(&instances, &key, ticket, None);
            return Err(DirectoryError::Create {
                product,
                domain,
                reason,
            });
        }
    };

    // A reload evicts under the registry write lock, so promotion has to be
    // checked against the incarnation under the read lock.
    let promoted = registry
        .if_current(&product, handle.incarnation(), || {
            settle(&instances, &key, ticket, Some(service.clone()))
        })
        .await
        .unwrap_or(false);

    if promoted {
        info!(product = %product, domain = %domain, "Bbc service created");
        return Ok(service);
    }

    settle(&instances, &key, ticket, None);
    warn!(product = %product, domain = %domain, "Discarding bbc service built from a replaced plugin");
    discard(&product, &domain, service).await;
    Err(DirectoryError::Create {
        product,
        domain,
        reason: "plugin was reloaded while the service was being built".to_string(),
    })
}

async fn discard(product: &str, domain: &str, service: ServiceHandle) {
    let outcome = run_blocking(move || service.shutdown())
        .await
        .map_err(|panic| format!("adapter panicked: {}", panic))
        .and_then(|r| r.map_err(|e| e.to_string()));
    if let Err(reason) = outcome {
        LoggingUtils::log_best_effort_failure(
            "shutdown bbc service",
            &format!("{}/{}", product, domain),
            &reason,
        );
    }
}

/// Promote or clear the slot of one construction attempt; true when promoted
fn settle(
    instances: &DashMap<InstanceKey, Slot>,
    key: &InstanceKey,
    ticket: u64,
    service: Option<ServiceHandle>,
) -> bool {
    let owned = |slot: &Slot| matches!(slot, Slot::Pending { ticket: t, .. } if *t == ticket);
    match service {
        Some(service) => match instances.get_mut(key) {
            Some(mut slot) if owned(slot.value()) => {
                *slot = Slot::Ready(service);
                true
            }
            _ => false,
        },
        None => {
            instances.remove_if(key, |_, slot| owned(slot));
            false
        }
    }
}
