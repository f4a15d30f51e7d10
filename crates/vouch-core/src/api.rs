// crates/vouch-core/src/api.rs
//
// Wire types shared by the submission pipeline, the ledger-facing backend,
// and the prover. JSON-RPC envelopes follow the `{method, params}` /
// `{success, result, error}` shape, extended with a machine-readable
// `errorCode` so clients can rebuild the precise error variant.

use serde::{Deserialize, Serialize};

use crate::error::VouchError;
use crate::proof::{Circuit, ProofStatus, PublicOutputs};
use crate::witness::Witness;

/// JSON-RPC method: submit a proof.
pub const METHOD_SUBMIT: &str = "proof/submit";
/// JSON-RPC method: query a submission's status.
pub const METHOD_STATUS: &str = "proof/status";

/// A JSON-RPC-style request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// The RPC method to invoke (e.g., "proof/submit").
    pub method: String,
    /// JSON-encoded parameters for the method.
    pub params: serde_json::Value,
}

/// A JSON-RPC-style response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRpcResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// The result data (if success).
    pub result: Option<serde_json::Value>,
    /// Error message (if not success).
    pub error: Option<String>,
    /// Stable error code (see `VouchError::code`).
    #[serde(default)]
    pub error_code: Option<String>,
}

impl JsonRpcResponse {
    pub fn ok(result: serde_json::Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            error_code: None,
        }
    }

    pub fn err(error: &VouchError) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.to_string()),
            error_code: Some(error.code().to_string()),
        }
    }

    /// Unwrap the envelope into its result or the error it carries.
    pub fn into_result(self) -> Result<serde_json::Value, VouchError> {
        if self.success {
            return self
                .result
                .ok_or_else(|| VouchError::Serialization("No result in response".to_string()));
        }
        let message = self.error.unwrap_or_else(|| "Unknown error".to_string());
        Err(match self.error_code.as_deref() {
            Some(code) => VouchError::from_code(code, message),
            None => VouchError::SubmissionRejected(message),
        })
    }
}

/// Public inputs sent to the prover alongside the witness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProverPublicInputs {
    pub threshold: f64,
}

/// Request body for the external prover.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProveRequest {
    pub circuit: Circuit,
    pub witness: Witness,
    pub public_inputs: ProverPublicInputs,
}

/// Parameters of `proof/submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProofRequest {
    pub proof: String,
    pub public_inputs: Vec<String>,
    pub public_outputs: PublicOutputs,
    pub wallet_signature: String,
    pub wallet_address: String,
}

/// Result of `proof/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub proof_id: String,
    pub tx_hash: String,
    pub status: ProofStatus,
}

/// Parameters of `proof/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub proof_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_envelope_roundtrip_keeps_variant() {
        let err = VouchError::ReplayDetected {
            nullifier: "b".repeat(64),
        };
        let wire = serde_json::to_value(JsonRpcResponse::err(&err)).unwrap();
        assert_eq!(wire["errorCode"], json!("replay_detected"));

        let back: JsonRpcResponse = serde_json::from_value(wire).unwrap();
        assert!(matches!(
            back.into_result(),
            Err(VouchError::ReplayDetected { .. })
        ));
    }

    #[test]
    fn test_success_without_result_is_error() {
        let resp = JsonRpcResponse {
            success: true,
            result: None,
            error: None,
            error_code: None,
        };
        assert!(matches!(
            resp.into_result(),
            Err(VouchError::Serialization(_))
        ));
    }

    #[test]
    fn test_prove_request_wire_shape() {
        let request = ProveRequest {
            circuit: Circuit::CreditScore,
            witness: crate::witness::fixtures::reference_witness(),
            public_inputs: ProverPublicInputs { threshold: 700.0 },
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["circuit"], json!("credit_score"));
        assert_eq!(wire["publicInputs"]["threshold"], json!(700.0));
        assert_eq!(wire["witness"]["employmentMonths"], json!(12));
    }
}
