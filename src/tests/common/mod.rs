//! Common test utilities and mock implementations
//!
//! This module provides the scripted plugin loader, plugins and bbc services
//! shared by the unit and integration tests.

use crate::{
    application::services::{InstanceDirectory, PluginRegistry},
    config::AppConfig,
    domain::{
        bbc::{
            AuthMessageContract, BbcContext, BbcError, BbcResult, BbcService, ContractStatus,
            CrossChainMessage, CrossChainMessageReceipt, SdpContract,
        },
        plugin::{BbcPlugin, LoadError, ModuleLoader, PluginError},
    },
    infrastructure::{adapters::MonitoringAdapter, http::HttpServer},
};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted behaviour of one mock plugin artifact
#[derive(Debug, Clone, Default)]
pub struct PluginSpec {
    product: String,
    fail_start: bool,
    fail_stop: bool,
    fail_create: bool,
    panic_create: bool,
    create_delay: Option<Duration>,
    failing_ops: Vec<&'static str>,
    panicking_ops: Vec<&'static str>,
    forget_contracts: bool,
}

impl PluginSpec {
    pub fn new(product: &str) -> Self {
        Self {
            product: product.to_string(),
            ..Default::default()
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn panicking_create(mut self) -> Self {
        self.panic_create = true;
        self
    }

    pub fn create_delay_ms(mut self, millis: u64) -> Self {
        self.create_delay = Some(Duration::from_millis(millis));
        self
    }

    /// Make the named service method return a backend error
    pub fn failing_op(mut self, op: &'static str) -> Self {
        self.failing_ops.push(op);
        self
    }

    /// Make the named service method panic
    pub fn panicking_op(mut self, op: &'static str) -> Self {
        self.panicking_ops.push(op);
        self
    }

    /// Contract setup succeeds without recording the contract in the context
    pub fn forgetting_contracts(mut self) -> Self {
        self.forget_contracts = true;
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    unloads: AtomicUsize,
    create_attempts: AtomicUsize,
    constructions: AtomicUsize,
    shutdowns: AtomicUsize,
}

enum Artifact {
    Plugin(PluginSpec),
    Broken,
}

/// Module loader over an in-memory table of artifact locations
pub struct MockLoader {
    artifacts: BTreeMap<PathBuf, Artifact>,
    counters: Arc<Counters>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self {
            artifacts: BTreeMap::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_artifact(mut self, location: &str, spec: PluginSpec) -> Self {
        self.artifacts
            .insert(PathBuf::from(location), Artifact::Plugin(spec));
        self
    }

    /// Discoverable artifact whose manifest never parses
    pub fn with_broken_artifact(mut self, location: &str) -> Self {
        self.artifacts.insert(PathBuf::from(location), Artifact::Broken);
        self
    }

    pub fn unloads(&self) -> usize {
        self.counters.unloads.load(Ordering::SeqCst)
    }

    pub fn create_attempts(&self) -> usize {
        self.counters.create_attempts.load(Ordering::SeqCst)
    }

    /// Successful `create_service` calls
    pub fn constructions(&self) -> usize {
        self.counters.constructions.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.counters.shutdowns.load(Ordering::SeqCst)
    }
}

impl ModuleLoader for MockLoader {
    fn discover(&self, repository: &Path) -> Result<Vec<PathBuf>, LoadError> {
        Ok(self
            .artifacts
            .keys()
            .filter(|path| path.starts_with(repository))
            .cloned()
            .collect())
    }

    fn load(&self, location: &Path) -> Result<Arc<dyn BbcPlugin>, LoadError> {
        match self.artifacts.get(location) {
            Some(Artifact::Plugin(spec)) => Ok(Arc::new(MockPlugin {
                spec: spec.clone(),
                counters: self.counters.clone(),
            })),
            Some(Artifact::Broken) => Err(LoadError::Manifest {
                path: location.to_path_buf(),
                reason: "unexpected end of input".to_string(),
            }),
            None => Err(LoadError::Artifact {
                path: location.to_path_buf(),
                reason: "no such file or directory".to_string(),
            }),
        }
    }

    fn unload(&self, _plugin: &Arc<dyn BbcPlugin>) {
        self.counters.unloads.fetch_add(1, Ordering::SeqCst);
    }
}

/// Plugin built by [`MockLoader`]; every load yields a new incarnation
pub struct MockPlugin {
    spec: PluginSpec,
    counters: Arc<Counters>,
}

impl BbcPlugin for MockPlugin {
    fn product(&self) -> &str {
        &self.spec.product
    }

    fn on_start(&self) -> Result<(), PluginError> {
        if self.spec.fail_start {
            return Err(PluginError("start hook refused".to_string()));
        }
        Ok(())
    }

    fn on_stop(&self) -> Result<(), PluginError> {
        if self.spec.fail_stop {
            return Err(PluginError("stop hook refused".to_string()));
        }
        Ok(())
    }

    fn create_service(&self, domain: &str) -> Result<Box<dyn BbcService>, BbcError> {
        if let Some(delay) = self.spec.create_delay {
            std::thread::sleep(delay);
        }
        self.counters.create_attempts.fetch_add(1, Ordering::SeqCst);

        if self.spec.panic_create {
            panic!("factory exploded for {}", domain);
        }
        if self.spec.fail_create {
            return Err(BbcError::backend(format!("cannot build service for {}", domain)));
        }

        self.counters.constructions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockService {
            spec: self.spec.clone(),
            counters: self.counters.clone(),
            ledger: Mutex::new(MockLedger::default()),
        }))
    }
}

#[derive(Default)]
struct MockLedger {
    context: BbcContext,
    height: u64,
    receipts: HashMap<String, CrossChainMessageReceipt>,
    local_domain: Option<String>,
}

/// In-memory bbc service; height starts at zero and each relay advances it
pub struct MockService {
    spec: PluginSpec,
    counters: Arc<Counters>,
    ledger: Mutex<MockLedger>,
}

impl MockService {
    fn check(&self, op: &str) -> BbcResult<()> {
        if self.spec.panicking_ops.iter().any(|o| *o == op) {
            panic!("{} exploded", op);
        }
        if self.spec.failing_ops.iter().any(|o| *o == op) {
            return Err(BbcError::backend(format!("{} rejected by backend", op)));
        }
        Ok(())
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, MockLedger> {
        self.ledger.lock().unwrap()
    }
}

impl BbcService for MockService {
    fn startup(&self, context: BbcContext) -> BbcResult<()> {
        self.check("startup")?;
        self.ledger().context = context;
        Ok(())
    }

    fn shutdown(&self) -> BbcResult<()> {
        self.check("shutdown")?;
        self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_context(&self) -> BbcResult<BbcContext> {
        self.check("get_context")?;
        Ok(self.ledger().context.clone())
    }

    fn setup_sdp_message_contract(&self) -> BbcResult<()> {
        self.check("setup_sdp_message_contract")?;
        if !self.spec.forget_contracts {
            self.ledger().context.sdp_contract = Some(SdpContract {
                contract_address: "0xsdp".to_string(),
                status: ContractStatus::ContractDeployed,
            });
        }
        Ok(())
    }

    fn setup_auth_message_contract(&self) -> BbcResult<()> {
        self.check("setup_auth_message_contract")?;
        if !self.spec.forget_contracts {
            self.ledger().context.auth_message_contract = Some(AuthMessageContract {
                contract_address: "0xam".to_string(),
                status: ContractStatus::ContractDeployed,
            });
        }
        Ok(())
    }

    fn set_protocol(&self, _protocol_address: &str, _protocol_type: &str) -> BbcResult<()> {
        self.check("set_protocol")
    }

    fn set_am_contract(&self, _contract_address: &str) -> BbcResult<()> {
        self.check("set_am_contract")
    }

    fn relay_auth_message(&self, raw_message: &[u8]) -> BbcResult<CrossChainMessageReceipt> {
        self.check("relay_auth_message")?;
        let mut ledger = self.ledger();
        ledger.height += 1;
        let receipt = CrossChainMessageReceipt {
            tx_hash: format!("0x{:04x}{}", ledger.height, hex::encode(raw_message)),
            confirmed: true,
            successful: true,
            error_msg: String::new(),
        };
        ledger.receipts.insert(receipt.tx_hash.clone(), receipt.clone());
        Ok(receipt)
    }

    fn read_cross_chain_message_receipt(
        &self,
        tx_hash: &str,
    ) -> BbcResult<Option<CrossChainMessageReceipt>> {
        self.check("read_cross_chain_message_receipt")?;
        Ok(self.ledger().receipts.get(tx_hash).cloned())
    }

    fn read_cross_chain_messages_by_height(&self, _height: u64) -> BbcResult<Vec<CrossChainMessage>> {
        self.check("read_cross_chain_messages_by_height")?;
        Ok(Vec::new())
    }

    fn query_sdp_message_seq(
        &self,
        _sender_domain: &str,
        _from_address: &str,
        _receiver_domain: &str,
        _to_address: &str,
    ) -> BbcResult<u64> {
        self.check("query_sdp_message_seq")?;
        Ok(0)
    }

    fn query_latest_height(&self) -> BbcResult<u64> {
        self.check("query_latest_height")?;
        Ok(self.ledger().height)
    }

    fn set_local_domain(&self, domain: &str) -> BbcResult<()> {
        self.check("set_local_domain")?;
        self.ledger().local_domain = Some(domain.to_string());
        Ok(())
    }
}

/// Plugin that serves nothing; for loader tests
pub struct NullPlugin {
    product: String,
}

impl NullPlugin {
    pub fn new(product: &str) -> Self {
        Self {
            product: product.to_string(),
        }
    }
}

impl BbcPlugin for NullPlugin {
    fn product(&self) -> &str {
        &self.product
    }

    fn create_service(&self, domain: &str) -> Result<Box<dyn BbcService>, BbcError> {
        Err(BbcError::backend(format!("{} serves no domains ({})", self.product, domain)))
    }
}

/// Registry over `/repo` with every artifact loaded and started
pub async fn create_started_registry(loader: Arc<MockLoader>) -> Arc<PluginRegistry> {
    let registry = Arc::new(PluginRegistry::new("/repo", loader));
    registry.load_plugins().await.unwrap();
    registry.start_plugins().await.unwrap();
    registry
}

/// Server over a started registry, plus the registry and directory behind it
pub async fn create_test_server(
    loader: Arc<MockLoader>,
) -> (HttpServer, Arc<PluginRegistry>, Arc<InstanceDirectory>) {
    let registry = create_started_registry(loader).await;
    let directory = Arc::new(InstanceDirectory::new(registry.clone()));
    let monitoring = Arc::new(MonitoringAdapter::new().unwrap());
    let server = HttpServer::new(
        AppConfig::default(),
        registry.clone(),
        directory.clone(),
        monitoring,
    );
    (server, registry, directory)
}

/// Encoded context accepted by `startUp`
pub fn create_test_context() -> Vec<u8> {
    BbcContext::new(b"{}".to_vec()).encode().unwrap()
}

/// Write a minimal plugin manifest into `dir`
pub fn write_manifest(dir: &Path, file_name: &str, product: &str, factory: &str) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(
        &path,
        format!("product = \"{}\"\nfactory = \"{}\"\n", product, factory),
    )
    .unwrap();
    path
}
