//! Routes bbc calls to adapter instances
//!
//! Every call yields exactly one [`Response`]. Adapter failures and panics are
//! caught here and reported under the failing operation's own error code.

use crate::application::services::instance_directory::InstanceDirectory;
use crate::application::services::plugin_registry::PluginRegistry;
use crate::domain::bbc::{BbcContext, BbcError, BbcResult, BbcService};
use crate::domain::envelope::{BbcCallRequest, BbcRequest, BbcRequestKind, BbcResponse, Response};
use crate::domain::error_code::ServerErrorCode;
use crate::shared::blocking::run_blocking;
use crate::shared::error::DirectoryError;
use crate::shared::logging::LoggingUtils;
use std::sync::Arc;
use tracing::debug;

/// Uniform adapter call: the request is guaranteed to match the route's kind
pub type Handler = fn(&dyn BbcService, &BbcRequest) -> BbcResult<BbcResponse>;

/// Error code and handler of one operation
#[derive(Clone, Copy)]
pub struct Route {
    pub error_code: ServerErrorCode,
    pub handler: Handler,
}

/// Routing table. `Unsupported` has no route.
pub fn route(kind: BbcRequestKind) -> Option<Route> {
    use BbcRequestKind as K;
    use ServerErrorCode as C;

    let entry = |error_code: ServerErrorCode, handler: Handler| Route {
        error_code,
        handler,
    };

    Some(match kind {
        K::StartUp => entry(C::BbcStartup, handle_startup),
        K::ShutDown => entry(C::BbcShutdown, handle_shutdown),
        K::GetContext => entry(C::BbcGetContext, handle_get_context),
        K::SetupSdpMessageContract => entry(C::BbcSetupSdpMessageContract, handle_setup_sdp),
        K::SetupAuthMessageContract => entry(C::BbcSetupAuthMessageContract, handle_setup_am),
        K::SetProtocol => entry(C::BbcSetProtocol, handle_set_protocol),
        K::SetAmContract => entry(C::BbcSetAmContract, handle_set_am_contract),
        K::RelayAuthMessage => entry(C::BbcRelayAuthMessage, handle_relay_auth_message),
        K::ReadCrossChainMessageReceipt => {
            entry(C::BbcReadCrossChainMessageReceipt, handle_read_receipt)
        }
        K::ReadCrossChainMessagesByHeight => {
            entry(C::BbcReadCrossChainMessagesByHeight, handle_read_messages_by_height)
        }
        K::QuerySdpMessageSeq => entry(C::BbcQuerySdpMessageSeq, handle_query_sdp_message_seq),
        K::QueryLatestHeight => entry(C::BbcQueryLatestHeight, handle_query_latest_height),
        K::SetLocalDomain => entry(C::BbcSetLocalDomain, handle_set_local_domain),
        K::Unsupported => return None,
    })
}

/// Dispatcher over the registry and the instance directory
pub struct BbcDispatcher {
    registry: Arc<PluginRegistry>,
    directory: Arc<InstanceDirectory>,
}

impl BbcDispatcher {
    pub fn new(registry: Arc<PluginRegistry>, directory: Arc<InstanceDirectory>) -> Self {
        Self {
            registry,
            directory,
        }
    }

    pub async fn dispatch(&self, call: BbcCallRequest) -> Response {
        let kind = call.kind();
        debug!(product = %call.product, domain = %call.domain, request = %kind, "Dispatching bbc call");

        let response = self.resolve_and_call(&call, kind).await;
        if !response.is_success() {
            LoggingUtils::log_bbc_failure(
                &call.product,
                &call.domain,
                kind.as_str(),
                response.code,
                &response.error_msg,
            );
        }
        response
    }

    async fn resolve_and_call(&self, call: &BbcCallRequest, kind: BbcRequestKind) -> Response {
        if !self.registry.has(&call.product).await {
            return Response::fail_with(
                ServerErrorCode::BbcPluginNotSupport,
                format!("product not supported: {}", call.product),
            );
        }

        let service = if kind == BbcRequestKind::StartUp {
            match self.directory.get_or_create(&call.product, &call.domain).await {
                Ok(service) => service,
                Err(DirectoryError::PluginNotSupported(product)) => {
                    return Response::fail_with(
                        ServerErrorCode::BbcPluginNotSupport,
                        format!("product not supported: {}", product),
                    );
                }
                Err(e) => return Response::fail_with(ServerErrorCode::BbcCreate, e),
            }
        } else {
            if !self.directory.has(&call.domain) {
                return Response::fail_with(
                    ServerErrorCode::BbcObjectNotStarted,
                    format!("call startup plz: {}", call.domain),
                );
            }
            match self.directory.get(&call.product, &call.domain) {
                Some(service) => service,
                None => {
                    return Response::fail_with(
                        ServerErrorCode::BbcGetService,
                        format!("null bbc service object for {}/{}", call.product, call.domain),
                    );
                }
            }
        };

        let (Some(entry), Some(request)) = (route(kind), call.request.clone()) else {
            return Response::fail(ServerErrorCode::UnsupportedBbcRequest);
        };

        let handler = entry.handler;
        match run_blocking(move || handler(service.as_ref(), &request)).await {
            Ok(Ok(resp)) => Response::bbc_success(resp),
            Ok(Err(e)) => Response::fail_with(entry.error_code, e),
            Err(panic) => Response::fail_with(entry.error_code, BbcError::Panicked(panic)),
        }
    }
}

fn mismatch(request: &BbcRequest) -> BbcError {
    BbcError::backend(format!("request routed to the wrong handler: {}", request.kind()))
}

fn handle_startup(service: &dyn BbcService, request: &BbcRequest) -> BbcResult<BbcResponse> {
    let BbcRequest::StartUp { raw_context } = request else {
        return Err(mismatch(request));
    };
    let context = BbcContext::decode(raw_context)?;
    service.startup(context)?;
    Ok(BbcResponse::Empty)
}

fn handle_shutdown(service: &dyn BbcService, _request: &BbcRequest) -> BbcResult<BbcResponse> {
    service.shutdown()?;
    Ok(BbcResponse::Empty)
}

fn handle_get_context(service: &dyn BbcService, _request: &BbcRequest) -> BbcResult<BbcResponse> {
    let context = service.get_context()?;
    Ok(BbcResponse::GetContext {
        raw_context: context.encode()?,
    })
}

fn handle_setup_sdp(service: &dyn BbcService, _request: &BbcRequest) -> BbcResult<BbcResponse> {
    service.setup_sdp_message_contract()?;
    let sdp_contract = service
        .get_context()?
        .sdp_contract
        .ok_or_else(|| BbcError::backend("sdp contract missing from context after setup"))?;
    Ok(BbcResponse::SetupSdp { sdp_contract })
}

fn handle_setup_am(service: &dyn BbcService, _request: &BbcRequest) -> BbcResult<BbcResponse> {
    service.setup_auth_message_contract()?;
    let am_contract = service
        .get_context()?
        .auth_message_contract
        .ok_or_else(|| BbcError::backend("am contract missing from context after setup"))?;
    Ok(BbcResponse::SetupAm { am_contract })
}

fn handle_set_protocol(service: &dyn BbcService, request: &BbcRequest) -> BbcResult<BbcResponse> {
    let BbcRequest::SetProtocol {
        protocol_address,
        protocol_type,
    } = request
    else {
        return Err(mismatch(request));
    };
    service.set_protocol(protocol_address, protocol_type)?;
    Ok(BbcResponse::Empty)
}

fn handle_set_am_contract(service: &dyn BbcService, request: &BbcRequest) -> BbcResult<BbcResponse> {
    let BbcRequest::SetAmContract { contract_address } = request else {
        return Err(mismatch(request));
    };
    service.set_am_contract(contract_address)?;
    Ok(BbcResponse::Empty)
}

fn handle_relay_auth_message(
    service: &dyn BbcService,
    request: &BbcRequest,
) -> BbcResult<BbcResponse> {
    let BbcRequest::RelayAuthMessage { raw_message } = request else {
        return Err(mismatch(request));
    };
    let receipt = service.relay_auth_message(raw_message)?;
    Ok(BbcResponse::RelayAuthMessage { receipt })
}

fn handle_read_receipt(service: &dyn BbcService, request: &BbcRequest) -> BbcResult<BbcResponse> {
    let BbcRequest::ReadCrossChainMessageReceipt { tx_hash } = request else {
        return Err(mismatch(request));
    };
    let receipt = service
        .read_cross_chain_message_receipt(tx_hash)?
        .ok_or_else(|| BbcError::backend(format!("no receipt found for tx {}", tx_hash)))?;
    Ok(BbcResponse::ReadCrossChainMessageReceipt { receipt })
}

fn handle_read_messages_by_height(
    service: &dyn BbcService,
    request: &BbcRequest,
) -> BbcResult<BbcResponse> {
    let BbcRequest::ReadCrossChainMessagesByHeight { height } = request else {
        return Err(mismatch(request));
    };
    let message_list = service.read_cross_chain_messages_by_height(*height)?;
    Ok(BbcResponse::ReadCrossChainMessagesByHeight { message_list })
}

fn handle_query_sdp_message_seq(
    service: &dyn BbcService,
    request: &BbcRequest,
) -> BbcResult<BbcResponse> {
    let BbcRequest::QuerySdpMessageSeq {
        sender_domain,
        from_address,
        receiver_domain,
        to_address,
    } = request
    else {
        return Err(mismatch(request));
    };
    let sequence =
        service.query_sdp_message_seq(sender_domain, from_address, receiver_domain, to_address)?;
    Ok(BbcResponse::QuerySdpMessageSeq { sequence })
}

fn handle_query_latest_height(
    service: &dyn BbcService,
    _request: &BbcRequest,
) -> BbcResult<BbcResponse> {
    let height = service.query_latest_height()?;
    Ok(BbcResponse::QueryLatestHeight { height })
}

fn handle_set_local_domain(service: &dyn BbcService, request: &BbcRequest) -> BbcResult<BbcResponse> {
    let BbcRequest::SetLocalDomain { domain } = request else {
        return Err(mismatch(request));
    };
    service.set_local_domain(domain)?;
    Ok(BbcResponse::Empty)
}
