//! Server error codes
//!
//! Closed set of (code, short message) pairs returned to callers. Callers match
//! on the numeric code, so every failing operation owns exactly one entry.

use serde::{Serialize, Serializer};

/// Error codes grouped by range: generic (0/100), bbc dispatch (2xx),
/// plugin management (3xx)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerErrorCode {
    Success,
    UnknownError,

    UnsupportedBbcRequest,
    BbcGetService,
    BbcCreate,
    BbcStartup,
    BbcShutdown,
    BbcGetContext,
    BbcSetupSdpMessageContract,
    BbcSetupAuthMessageContract,
    BbcSetProtocol,
    BbcSetAmContract,
    /// Kept for numeric compatibility with existing relayers.
    BbcAddValidRelayer,
    BbcRelayAuthMessage,
    BbcReadCrossChainMessageReceipt,
    BbcReadCrossChainMessagesByHeight,
    BbcQuerySdpMessageSeq,
    BbcQueryLatestHeight,
    BbcSetLocalDomain,
    BbcObjectNotStarted,
    BbcPluginNotSupport,

    UnsupportedManageRequest,
    ManageLoadPlugins,
    ManageStartPlugins,
    ManageLoadPlugin,
    ManageStartPlugin,
    ManageStopPlugin,
    ManageStartPluginFromStop,
    ManageReloadPlugin,
    ManageReloadPluginInNewPath,
    ManageRestartBbc,
}

impl ServerErrorCode {
    pub const ALL: [ServerErrorCode; 31] = [
        Self::Success,
        Self::UnknownError,
        Self::UnsupportedBbcRequest,
        Self::BbcGetService,
        Self::BbcCreate,
        Self::BbcStartup,
        Self::BbcShutdown,
        Self::BbcGetContext,
        Self::BbcSetupSdpMessageContract,
        Self::BbcSetupAuthMessageContract,
        Self::BbcSetProtocol,
        Self::BbcSetAmContract,
        Self::BbcAddValidRelayer,
        Self::BbcRelayAuthMessage,
        Self::BbcReadCrossChainMessageReceipt,
        Self::BbcReadCrossChainMessagesByHeight,
        Self::BbcQuerySdpMessageSeq,
        Self::BbcQueryLatestHeight,
        Self::BbcSetLocalDomain,
        Self::BbcObjectNotStarted,
        Self::BbcPluginNotSupport,
        Self::UnsupportedManageRequest,
        Self::ManageLoadPlugins,
        Self::ManageStartPlugins,
        Self::ManageLoadPlugin,
        Self::ManageStartPlugin,
        Self::ManageStopPlugin,
        Self::ManageStartPluginFromStop,
        Self::ManageReloadPlugin,
        Self::ManageReloadPluginInNewPath,
        Self::ManageRestartBbc,
    ];

    /// Numeric code sent on the wire
    pub fn code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::UnknownError => 100,
            Self::UnsupportedBbcRequest => 200,
            Self::BbcGetService => 201,
            Self::BbcCreate => 202,
            Self::BbcStartup => 203,
            Self::BbcShutdown => 204,
            Self::BbcGetContext => 205,
            Self::BbcSetupSdpMessageContract => 206,
            Self::BbcSetupAuthMessageContract => 207,
            Self::BbcSetProtocol => 208,
            Self::BbcSetAmContract => 209,
            Self::BbcAddValidRelayer => 210,
            Self::BbcRelayAuthMessage => 211,
            Self::BbcReadCrossChainMessageReceipt => 212,
            Self::BbcReadCrossChainMessagesByHeight => 213,
            Self::BbcQuerySdpMessageSeq => 214,
            Self::BbcQueryLatestHeight => 215,
            Self::BbcSetLocalDomain => 216,
            Self::BbcObjectNotStarted => 217,
            Self::BbcPluginNotSupport => 218,
            Self::UnsupportedManageRequest => 300,
            Self::ManageLoadPlugins => 301,
            Self::ManageStartPlugins => 302,
            Self::ManageLoadPlugin => 303,
            Self::ManageStartPlugin => 304,
            Self::ManageStopPlugin => 305,
            Self::ManageStartPluginFromStop => 306,
            Self::ManageReloadPlugin => 307,
            Self::ManageReloadPluginInNewPath => 308,
            Self::ManageRestartBbc => 309,
        }
    }

    /// Short description attached to every failure envelope
    pub fn short_msg(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::UnknownError => "unknow error",
            Self::UnsupportedBbcRequest => "unsupport bbc request type",
            Self::BbcGetService => "[bbc] get service failed",
            Self::BbcCreate => "[bbc] create service failed",
            Self::BbcStartup => "[bbc] start up failed",
            Self::BbcShutdown => "[bbc] shut down failed",
            Self::BbcGetContext => "[bbc] get context failed",
            Self::BbcSetupSdpMessageContract => "[bbc] set up sdp contract failed",
            Self::BbcSetupAuthMessageContract => "[bbc] set up am contract failed",
            Self::BbcSetProtocol => "[bbc] set protocol failed",
            Self::BbcSetAmContract => "[bbc] set am contract failed",
            Self::BbcAddValidRelayer => "[bbc] add valid relayer failed",
            Self::BbcRelayAuthMessage => "[bbc] forward relayer auth msg failed",
            Self::BbcReadCrossChainMessageReceipt => "[bbc] read cross chain msg receipt failed",
            Self::BbcReadCrossChainMessagesByHeight => "[bbc] read cross chain msg by height failed",
            Self::BbcQuerySdpMessageSeq => "[bbc] query sdp msg sequence failed",
            Self::BbcQueryLatestHeight => "[bbc] query latest height failed",
            Self::BbcSetLocalDomain => "[bbc] set local domain failed",
            Self::BbcObjectNotStarted => "[bbc] none bbc object started",
            Self::BbcPluginNotSupport => "[bbc] none plugin found",
            Self::UnsupportedManageRequest => "unsupport manage request type",
            Self::ManageLoadPlugins => "[manage] load plugins failed",
            Self::ManageStartPlugins => "[manage] start plugins failed",
            Self::ManageLoadPlugin => "[manage] load plugin in the specified path failed",
            Self::ManageStartPlugin => "[manage] start plugin in the specified path failed",
            Self::ManageStopPlugin => "[manage] stop plugin of specified product failed",
            Self::ManageStartPluginFromStop => {
                "[manage] start plugin of specified product from stop failed"
            }
            Self::ManageReloadPlugin => "[manage] reload plugin failed",
            Self::ManageReloadPluginInNewPath => "[manage] reload plugin in new path failed",
            Self::ManageRestartBbc => "[manage] restart bbc failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Look up a code by its numeric value
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }
}

impl std::fmt::Display for ServerErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.short_msg(), self.code())
    }
}

impl Serialize for ServerErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}
