//! In-memory ledger adapter
//!
//! Behaves like a small ledger: relaying a message mines a block, receipts
//! are kept by tx hash, and system contracts are "deployed" into the service
//! context. Used for local development and end-to-end tests.

use crate::domain::bbc::{
    AuthMessageContract, BbcContext, BbcError, BbcResult, BbcService, ContractStatus,
    CrossChainMessage, CrossChainMessageReceipt, CrossChainMessageType, ProvableLedgerData,
    SdpContract,
};
use crate::domain::plugin::{BbcPlugin, PluginError};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Factory name used in plugin manifests
pub const SIMULATOR_FACTORY: &str = "simulator";

/// Simulator settings read from the manifest `[settings]` table
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Height reported before any message is relayed
    pub initial_height: u64,
    /// Fail `on_start`, for exercising lifecycle errors
    pub fail_on_start: bool,
}

pub struct SimulatorPlugin {
    product: String,
    settings: SimulatorSettings,
    running: AtomicBool,
}

impl SimulatorPlugin {
    pub fn new(product: impl Into<String>, settings: SimulatorSettings) -> Self {
        Self {
            product: product.into(),
            settings,
            running: AtomicBool::new(false),
        }
    }
}

impl BbcPlugin for SimulatorPlugin {
    fn product(&self) -> &str {
        &self.product
    }

    fn on_start(&self) -> Result<(), PluginError> {
        if self.settings.fail_on_start {
            return Err(PluginError(format!("{} refuses to start", self.product)));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn on_stop(&self) -> Result<(), PluginError> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn create_service(&self, domain: &str) -> Result<Box<dyn BbcService>, BbcError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(BbcError::backend(format!("plugin {} is not running", self.product)));
        }
        debug!(product = %self.product, domain = %domain, "Creating simulator ledger");
        Ok(Box::new(SimulatorService::new(domain, self.settings.initial_height)))
    }
}

#[derive(Default)]
struct Ledger {
    started: bool,
    context: BbcContext,
    local_domain: String,
    protocol_address: Option<String>,
    height: u64,
    next_tx: u64,
    receipts: HashMap<String, CrossChainMessageReceipt>,
    messages: BTreeMap<u64, Vec<CrossChainMessage>>,
    delivered: u64,
}

impl Ledger {
    fn ensure_started(&self) -> BbcResult<()> {
        if self.started {
            Ok(())
        } else {
            Err(BbcError::backend("simulator ledger not started"))
        }
    }
}

/// One simulated ledger bound to a domain
pub struct SimulatorService {
    ledger: Mutex<Ledger>,
}

impl SimulatorService {
    pub fn new(domain: &str, initial_height: u64) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                local_domain: domain.to_string(),
                height: initial_height,
                ..Ledger::default()
            }),
        }
    }

    fn with_ledger<T>(&self, f: impl FnOnce(&mut Ledger) -> BbcResult<T>) -> BbcResult<T> {
        let mut ledger = self
            .ledger
            .lock()
            .map_err(|_| BbcError::backend("simulator ledger poisoned"))?;
        f(&mut ledger)
    }
}

fn contract_address(kind: &str, domain: &str) -> String {
    format!("0x{}", hex::encode(format!("{}@{}", kind, domain)))
}

impl BbcService for SimulatorService {
    fn startup(&self, context: BbcContext) -> BbcResult<()> {
        self.with_ledger(|ledger| {
            ledger.context = context;
            ledger.started = true;
            Ok(())
        })
    }

    fn shutdown(&self) -> BbcResult<()> {
        self.with_ledger(|ledger| {
            ledger.started = false;
            Ok(())
        })
    }

    fn get_context(&self) -> BbcResult<BbcContext> {
        self.with_ledger(|ledger| {
            ledger.ensure_started()?;
            Ok(ledger.context.clone())
        })
    }

    fn setup_sdp_message_contract(&self) -> BbcResult<()> {
        self.with_ledger(|ledger| {
            ledger.ensure_started()?;
            if ledger.context.sdp_contract.is_none() {
                ledger.context.sdp_contract = Some(SdpContract {
                    contract_address: contract_address("sdp", &ledger.local_domain),
                    status: ContractStatus::ContractDeployed,
                });
            }
            Ok(())
        })
    }

    fn setup_auth_message_contract(&self) -> BbcResult<()> {
        self.with_ledger(|ledger| {
            ledger.ensure_started()?;
            if ledger.context.auth_message_contract.is_none() {
                ledger.context.auth_message_contract = Some(AuthMessageContract {
                    contract_address: contract_address("am", &ledger.local_domain),
                    status: ContractStatus::ContractDeployed,
                });
            }
            Ok(())
        })
    }

    /// Binds the SDP protocol into the AM contract, which makes the AM contract ready
    fn set_protocol(&self, protocol_address: &str, _protocol_type: &str) -> BbcResult<()> {
        self.with_ledger(|ledger| {
            ledger.ensure_started()?;
            let am = ledger
                .context
                .auth_message_contract
                .as_mut()
                .ok_or_else(|| BbcError::backend("am contract not deployed"))?;
            am.status = ContractStatus::ContractReady;
            ledger.protocol_address = Some(protocol_address.to_string());
            Ok(())
        })
    }

    /// Points the SDP contract at the AM contract, which makes the SDP contract ready
    fn set_am_contract(&self, _contract_address: &str) -> BbcResult<()> {
        self.with_ledger(|ledger| {
            ledger.ensure_started()?;
            let sdp = ledger
                .context
                .sdp_contract
                .as_mut()
                .ok_or_else(|| BbcError::backend("sdp contract not deployed"))?;
            sdp.status = ContractStatus::ContractReady;
            Ok(())
        })
    }

    fn relay_auth_message(&self, raw_message: &[u8]) -> BbcResult<CrossChainMessageReceipt> {
        self.with_ledger(|ledger| {
            ledger.ensure_started()?;
            if raw_message.is_empty() {
                return Err(BbcError::backend("empty auth message"));
            }

            ledger.height += 1;
            ledger.next_tx += 1;
            ledger.delivered += 1;
            let tx_hash = format!("0x{:064x}", ledger.next_tx);

            let receipt = CrossChainMessageReceipt {
                tx_hash: tx_hash.clone(),
                confirmed: true,
                successful: true,
                error_msg: String::new(),
            };
            ledger.receipts.insert(tx_hash.clone(), receipt.clone());

            let height = ledger.height;
            ledger.messages.entry(height).or_default().push(CrossChainMessage {
                message_type: CrossChainMessageType::AuthMsg,
                message: raw_message.to_vec(),
                provable_data: ProvableLedgerData {
                    height,
                    ledger_data: raw_message.to_vec(),
                    proof: Vec::new(),
                    block_hash: height.to_be_bytes().to_vec(),
                    timestamp: chrono::Utc::now().timestamp_millis().max(0) as u64,
                    tx_hash: ledger.next_tx.to_be_bytes().to_vec(),
                },
            });
            Ok(receipt)
        })
    }

    fn read_cross_chain_message_receipt(
        &self,
        tx_hash: &str,
    ) -> BbcResult<Option<CrossChainMessageReceipt>> {
        self.with_ledger(|ledger| {
            ledger.ensure_started()?;
            Ok(ledger.receipts.get(tx_hash).cloned())
        })
    }

    fn read_cross_chain_messages_by_height(&self, height: u64) -> BbcResult<Vec<CrossChainMessage>> {
        self.with_ledger(|ledger| {
            ledger.ensure_started()?;
            if height > ledger.height {
                return Err(BbcError::backend(format!(
                    "height {} is above latest height {}",
                    height, ledger.height
                )));
            }
            Ok(ledger.messages.get(&height).cloned().unwrap_or_default())
        })
    }

    /// Messages delivered to this ledger's domain; other channels report 0
    fn query_sdp_message_seq(
        &self,
        _sender_domain: &str,
        _from_address: &str,
        receiver_domain: &str,
        _to_address: &str,
    ) -> BbcResult<u64> {
        self.with_ledger(|ledger| {
            ledger.ensure_started()?;
            if receiver_domain == ledger.local_domain {
                Ok(ledger.delivered)
            } else {
                Ok(0)
            }
        })
    }

    fn query_latest_height(&self) -> BbcResult<u64> {
        self.with_ledger(|ledger| {
            ledger.ensure_started()?;
            Ok(ledger.height)
        })
    }

    fn set_local_domain(&self, domain: &str) -> BbcResult<()> {
        self.with_ledger(|ledger| {
            if domain.is_empty() {
                return Err(BbcError::backend("local domain must not be empty"));
            }
            ledger.local_domain = domain.to_string();
            Ok(())
        })
    }
}
