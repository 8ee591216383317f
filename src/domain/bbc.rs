//! Blockchain bridge capability (BBC) contract
//!
//! Every adapter hands out services implementing [`BbcService`], one per ledger
//! domain. The server never looks inside a service; it only moves the types in
//! this module between the wire and the adapter.

use crate::shared::encoding::hex_bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by an adapter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BbcError {
    #[error("{0}")]
    Backend(String),

    #[error("invalid context: {0}")]
    InvalidContext(String),

    #[error("adapter panicked: {0}")]
    Panicked(String),
}

impl BbcError {
    pub fn backend(message: impl Into<String>) -> Self {
        BbcError::Backend(message.into())
    }
}

pub type BbcResult<T> = Result<T, BbcError>;

/// Deployment status of a system contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    #[default]
    Init,
    ContractDeployed,
    ContractReady,
    ContractFreeze,
}

/// Authenticated-message (AM) contract record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthMessageContract {
    pub contract_address: String,
    pub status: ContractStatus,
}

/// Sequenced-delivery protocol (SDP) contract record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SdpContract {
    pub contract_address: String,
    pub status: ContractStatus,
}

/// Startup context handed to a service.
///
/// `raw_conf` is adapter-specific configuration the server never parses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BbcContext {
    #[serde(with = "hex_bytes", default)]
    pub raw_conf: Vec<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_message_contract: Option<AuthMessageContract>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_contract: Option<SdpContract>,
}

impl BbcContext {
    pub fn new(raw_conf: Vec<u8>) -> Self {
        Self {
            raw_conf,
            ..Default::default()
        }
    }

    /// Decode a context from its transport encoding
    pub fn decode(raw: &[u8]) -> BbcResult<Self> {
        if raw.is_empty() {
            return Err(BbcError::InvalidContext("empty context".to_string()));
        }
        serde_json::from_slice(raw).map_err(|e| BbcError::InvalidContext(e.to_string()))
    }

    pub fn encode(&self) -> BbcResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| BbcError::InvalidContext(e.to_string()))
    }
}

/// Receipt of a relayed cross-chain message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CrossChainMessageReceipt {
    pub tx_hash: String,
    pub confirmed: bool,
    pub successful: bool,
    pub error_msg: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrossChainMessageType {
    AuthMsg,
    DeviceMsg,
}

/// Ledger data with the proof material a relayer needs to verify a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProvableLedgerData {
    pub height: u64,
    #[serde(with = "hex_bytes", default)]
    pub ledger_data: Vec<u8>,
    #[serde(with = "hex_bytes", default)]
    pub proof: Vec<u8>,
    #[serde(with = "hex_bytes", default)]
    pub block_hash: Vec<u8>,
    pub timestamp: u64,
    #[serde(with = "hex_bytes", default)]
    pub tx_hash: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossChainMessage {
    #[serde(rename = "type")]
    pub message_type: CrossChainMessageType,
    #[serde(with = "hex_bytes", default)]
    pub message: Vec<u8>,
    pub provable_data: ProvableLedgerData,
}

/// Capability contract every adapter instance implements.
///
/// Calls may block on ledger I/O; the dispatcher runs them on the blocking
/// pool. One service may be called concurrently from several requests, so
/// implementations synchronize their own state.
pub trait BbcService: Send + Sync {
    fn startup(&self, context: BbcContext) -> BbcResult<()>;

    fn shutdown(&self) -> BbcResult<()>;

    fn get_context(&self) -> BbcResult<BbcContext>;

    fn setup_sdp_message_contract(&self) -> BbcResult<()>;

    fn setup_auth_message_contract(&self) -> BbcResult<()>;

    fn set_protocol(&self, protocol_address: &str, protocol_type: &str) -> BbcResult<()>;

    fn set_am_contract(&self, contract_address: &str) -> BbcResult<()>;

    fn relay_auth_message(&self, raw_message: &[u8]) -> BbcResult<CrossChainMessageReceipt>;

    /// `None` when the ledger has no receipt for `tx_hash`
    fn read_cross_chain_message_receipt(
        &self,
        tx_hash: &str,
    ) -> BbcResult<Option<CrossChainMessageReceipt>>;

    fn read_cross_chain_messages_by_height(&self, height: u64) -> BbcResult<Vec<CrossChainMessage>>;

    fn query_sdp_message_seq(
        &self,
        sender_domain: &str,
        from_address: &str,
        receiver_domain: &str,
        to_address: &str,
    ) -> BbcResult<u64>;

    fn query_latest_height(&self) -> BbcResult<u64>;

    fn set_local_domain(&self, domain: &str) -> BbcResult<()>;
}
