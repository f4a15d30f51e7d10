// crates/vouch-ledger/src/dispatch.rs
//
// JSON-RPC method routers for LedgerService. Whatever HTTP layer hosts the
// service hands each decoded envelope to a dispatcher and writes back the
// response envelope; errors carry their `errorCode` so clients can rebuild
// the precise variant.
//
// Client and operator methods are split across two entry points. `dispatch`
// is the only one meant to face wallets; `dispatch_operator` settles proofs
// and must sit behind operator authentication in the hosting layer.

use serde::{Deserialize, Serialize};

use vouch_core::api::{
    JsonRpcRequest, JsonRpcResponse, StatusRequest, SubmitProofRequest, METHOD_STATUS,
    METHOD_SUBMIT,
};
use vouch_core::VouchError;

use crate::service::LedgerService;

/// Operator method: mark a proof confirmed.
pub const METHOD_CONFIRM: &str = "proof/confirm";
/// Operator method: mark a proof failed.
pub const METHOD_FAIL: &str = "proof/fail";
/// Operator method: reconcile pending proofs with the ledger.
pub const METHOD_SYNC: &str = "ledger/sync";

const OPERATOR_METHODS: [&str; 3] = [METHOD_CONFIRM, METHOD_FAIL, METHOD_SYNC];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailRequest {
    pub proof_id: String,
    pub reason: String,
}

/// Client-facing router: `proof/submit` and `proof/status` only.
pub async fn dispatch(service: &LedgerService, request: JsonRpcRequest) -> JsonRpcResponse {
    tracing::debug!("Dispatching {}", request.method);

    let result = match request.method.as_str() {
        METHOD_SUBMIT => {
            handle(request.params, |r: SubmitProofRequest| async move {
                service.submit(&r).await
            })
            .await
        }
        METHOD_STATUS => {
            handle(request.params, |r: StatusRequest| async move {
                service.status(&r.proof_id).await
            })
            .await
        }
        other if OPERATOR_METHODS.contains(&other) => {
            tracing::warn!("Refused operator method {} on the client endpoint", other);
            Err(VouchError::Unauthorized(format!(
                "{} is an operator method",
                other
            )))
        }
        other => Err(VouchError::Validation(format!("Unknown method: {}", other))),
    };

    respond(&request.method, result)
}

/// Operator router: settles proofs and reconciles with the ledger.
pub async fn dispatch_operator(service: &LedgerService, request: JsonRpcRequest) -> JsonRpcResponse {
    tracing::debug!("Dispatching operator {}", request.method);

    let result = match request.method.as_str() {
        METHOD_CONFIRM => {
            handle(request.params, |r: StatusRequest| async move {
                service.confirm(&r.proof_id).await
            })
            .await
        }
        METHOD_FAIL => {
            handle(request.params, |r: FailRequest| async move {
                service.fail(&r.proof_id, &r.reason).await
            })
            .await
        }
        METHOD_SYNC => {
            let report = service.sync_pending().await;
            report.and_then(|r| serde_json::to_value(r).map_err(VouchError::from))
        }
        other => Err(VouchError::Validation(format!("Unknown method: {}", other))),
    };

    respond(&request.method, result)
}

fn respond(method: &str, result: Result<serde_json::Value, VouchError>) -> JsonRpcResponse {
    match result {
        Ok(value) => JsonRpcResponse::ok(value),
        Err(e) => {
            tracing::debug!("{} failed: {}", method, e);
            JsonRpcResponse::err(&e)
        }
    }
}

/// Deserialize params, run the handler, serialize its result.
async fn handle<Req, Resp, F, Fut>(params: serde_json::Value, handler: F) -> Result<serde_json::Value, VouchError>
where
    Req: serde::de::DeserializeOwned,
    Resp: Serialize,
    F: FnOnce(Req) -> Fut,
    Fut: std::future::Future<Output = Result<Resp, VouchError>>,
{
    let request: Req = serde_json::from_value(params)
        .map_err(|e| VouchError::Validation(format!("Invalid params: {}", e)))?;
    let response = handler(request).await?;
    Ok(serde_json::to_value(response)?)
}
