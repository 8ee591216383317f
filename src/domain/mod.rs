//! Domain layer - Core models of the plugin server
//!
//! The BBC capability contract, plugin lifecycle, wire envelopes and error
//! codes. Nothing here depends on HTTP or on a concrete plugin loader.

pub mod bbc;
pub mod envelope;
pub mod error_code;
pub mod health;
pub mod plugin;

pub use bbc::{
    AuthMessageContract, BbcContext, BbcError, BbcResult, BbcService, ContractStatus,
    CrossChainMessage, CrossChainMessageReceipt, CrossChainMessageType, ProvableLedgerData,
    SdpContract,
};
pub use envelope::{
    BbcCallRequest, BbcRequest, BbcRequestKind, BbcResponse, HeartbeatResponse, ManageRequest,
    MembershipResponse, Response, ResponsePayload,
};
pub use error_code::ServerErrorCode;
pub use health::{HealthResponse, HealthStatus};
pub use plugin::{BbcPlugin, LoadError, ModuleLoader, PluginError, PluginState};
