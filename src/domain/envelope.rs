//! Request and response envelopes for both RPC surfaces

use crate::domain::bbc::{
    AuthMessageContract, CrossChainMessage, CrossChainMessageReceipt, SdpContract,
};
use crate::domain::error_code::ServerErrorCode;
use crate::shared::encoding::hex_bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cross-chain call addressed to one (product, domain) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BbcCallRequest {
    pub product: String,
    pub domain: String,
    /// Unset is answered with "unsupport bbc request type"
    #[serde(default)]
    pub request: Option<BbcRequest>,
}

impl BbcCallRequest {
    pub fn new(product: impl Into<String>, domain: impl Into<String>, request: BbcRequest) -> Self {
        Self {
            product: product.into(),
            domain: domain.into(),
            request: Some(request),
        }
    }

    pub fn kind(&self) -> BbcRequestKind {
        self.request
            .as_ref()
            .map(BbcRequest::kind)
            .unwrap_or(BbcRequestKind::Unsupported)
    }
}

/// Operation carried by a [`BbcCallRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BbcRequest {
    StartUp {
        #[serde(with = "hex_bytes", default)]
        raw_context: Vec<u8>,
    },
    ShutDown,
    GetContext,
    SetupSdpMessageContract,
    SetupAuthMessageContract,
    SetProtocol {
        protocol_address: String,
        protocol_type: String,
    },
    SetAmContract {
        contract_address: String,
    },
    RelayAuthMessage {
        #[serde(with = "hex_bytes", default)]
        raw_message: Vec<u8>,
    },
    ReadCrossChainMessageReceipt {
        tx_hash: String,
    },
    ReadCrossChainMessagesByHeight {
        height: u64,
    },
    QuerySdpMessageSeq {
        sender_domain: String,
        from_address: String,
        receiver_domain: String,
        to_address: String,
    },
    QueryLatestHeight,
    SetLocalDomain {
        domain: String,
    },
    #[serde(other)]
    Unsupported,
}

/// Tag of a [`BbcRequest`], used for routing, logs and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BbcRequestKind {
    StartUp,
    ShutDown,
    GetContext,
    SetupSdpMessageContract,
    SetupAuthMessageContract,
    SetProtocol,
    SetAmContract,
    RelayAuthMessage,
    ReadCrossChainMessageReceipt,
    ReadCrossChainMessagesByHeight,
    QuerySdpMessageSeq,
    QueryLatestHeight,
    SetLocalDomain,
    Unsupported,
}

impl BbcRequest {
    pub fn kind(&self) -> BbcRequestKind {
        match self {
            BbcRequest::StartUp { .. } => BbcRequestKind::StartUp,
            BbcRequest::ShutDown => BbcRequestKind::ShutDown,
            BbcRequest::GetContext => BbcRequestKind::GetContext,
            BbcRequest::SetupSdpMessageContract => BbcRequestKind::SetupSdpMessageContract,
            BbcRequest::SetupAuthMessageContract => BbcRequestKind::SetupAuthMessageContract,
            BbcRequest::SetProtocol { .. } => BbcRequestKind::SetProtocol,
            BbcRequest::SetAmContract { .. } => BbcRequestKind::SetAmContract,
            BbcRequest::RelayAuthMessage { .. } => BbcRequestKind::RelayAuthMessage,
            BbcRequest::ReadCrossChainMessageReceipt { .. } => {
                BbcRequestKind::ReadCrossChainMessageReceipt
            }
            BbcRequest::ReadCrossChainMessagesByHeight { .. } => {
                BbcRequestKind::ReadCrossChainMessagesByHeight
            }
            BbcRequest::QuerySdpMessageSeq { .. } => BbcRequestKind::QuerySdpMessageSeq,
            BbcRequest::QueryLatestHeight => BbcRequestKind::QueryLatestHeight,
            BbcRequest::SetLocalDomain { .. } => BbcRequestKind::SetLocalDomain,
            BbcRequest::Unsupported => BbcRequestKind::Unsupported,
        }
    }
}

impl BbcRequestKind {
    pub const ALL: [BbcRequestKind; 14] = [
        Self::StartUp,
        Self::ShutDown,
        Self::GetContext,
        Self::SetupSdpMessageContract,
        Self::SetupAuthMessageContract,
        Self::SetProtocol,
        Self::SetAmContract,
        Self::RelayAuthMessage,
        Self::ReadCrossChainMessageReceipt,
        Self::ReadCrossChainMessagesByHeight,
        Self::QuerySdpMessageSeq,
        Self::QueryLatestHeight,
        Self::SetLocalDomain,
        Self::Unsupported,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartUp => "startUp",
            Self::ShutDown => "shutDown",
            Self::GetContext => "getContext",
            Self::SetupSdpMessageContract => "setupSdpMessageContract",
            Self::SetupAuthMessageContract => "setupAuthMessageContract",
            Self::SetProtocol => "setProtocol",
            Self::SetAmContract => "setAmContract",
            Self::RelayAuthMessage => "relayAuthMessage",
            Self::ReadCrossChainMessageReceipt => "readCrossChainMessageReceipt",
            Self::ReadCrossChainMessagesByHeight => "readCrossChainMessagesByHeight",
            Self::QuerySdpMessageSeq => "querySdpMessageSeq",
            Self::QueryLatestHeight => "queryLatestHeight",
            Self::SetLocalDomain => "setLocalDomain",
            Self::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for BbcRequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator request on the management surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ManageRequest {
    LoadPlugins,
    StartPlugins,
    LoadPlugin { path: String },
    StartPlugin { path: String },
    StopPlugin { product: String },
    StartPluginFromStop { product: String },
    ReloadPlugin { product: String },
    ReloadPluginInNewPath { product: String, path: String },
    RestartBbc { product: String, domain: String },
    #[serde(other)]
    Unsupported,
}

impl ManageRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ManageRequest::LoadPlugins => "loadPlugins",
            ManageRequest::StartPlugins => "startPlugins",
            ManageRequest::LoadPlugin { .. } => "loadPlugin",
            ManageRequest::StartPlugin { .. } => "startPlugin",
            ManageRequest::StopPlugin { .. } => "stopPlugin",
            ManageRequest::StartPluginFromStop { .. } => "startPluginFromStop",
            ManageRequest::ReloadPlugin { .. } => "reloadPlugin",
            ManageRequest::ReloadPluginInNewPath { .. } => "reloadPluginInNewPath",
            ManageRequest::RestartBbc { .. } => "restartBbc",
            ManageRequest::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HeartbeatResponse {
    pub domains: Vec<String>,
    pub products: Vec<String>,
}

/// Per-key membership answer for `ifProductSupport` / `ifDomainAlive`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MembershipResponse {
    pub results: BTreeMap<String, bool>,
}

/// Success payload of a bbc call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BbcResponse {
    Empty,
    GetContext {
        #[serde(with = "hex_bytes")]
        raw_context: Vec<u8>,
    },
    SetupSdp {
        sdp_contract: SdpContract,
    },
    SetupAm {
        am_contract: AuthMessageContract,
    },
    RelayAuthMessage {
        receipt: CrossChainMessageReceipt,
    },
    ReadCrossChainMessageReceipt {
        receipt: CrossChainMessageReceipt,
    },
    ReadCrossChainMessagesByHeight {
        message_list: Vec<CrossChainMessage>,
    },
    QuerySdpMessageSeq {
        sequence: u64,
    },
    QueryLatestHeight {
        height: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponsePayload {
    Heartbeat(HeartbeatResponse),
    IfProductSupport(MembershipResponse),
    IfDomainAlive(MembershipResponse),
    BbcResp(BbcResponse),
}

/// Uniform reply of every RPC: a success payload or a (code, message) failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub code: i32,
    pub error_msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ResponsePayload>,
}

impl Response {
    pub fn success(payload: Option<ResponsePayload>) -> Self {
        Self {
            code: ServerErrorCode::Success.code(),
            error_msg: String::new(),
            payload,
        }
    }

    pub fn bbc_success(resp: BbcResponse) -> Self {
        Self::success(Some(ResponsePayload::BbcResp(resp)))
    }

    /// Failure carrying only the code's short message
    pub fn fail(code: ServerErrorCode) -> Self {
        Self {
            code: code.code(),
            error_msg: code.short_msg().to_string(),
            payload: None,
        }
    }

    /// Failure with the underlying cause appended to the short message
    pub fn fail_with(code: ServerErrorCode, detail: impl std::fmt::Display) -> Self {
        Self {
            code: code.code(),
            error_msg: format!("{}: {}", code.short_msg(), detail),
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ServerErrorCode::Success.code()
    }

    pub fn error_code(&self) -> Option<ServerErrorCode> {
        ServerErrorCode::from_code(self.code)
    }

    pub fn bbc_payload(&self) -> Option<&BbcResponse> {
        match &self.payload {
            Some(ResponsePayload::BbcResp(resp)) => Some(resp),
            _ => None,
        }
    }
}
