// crates/vouch-prover/src/http.rs
//
// HTTP clients for the proving service and the ledger-facing backend.
//
// Transport failures are classified rather than flattened: operators alert
// differently on "prover down", "prover slow" and "prover answered garbage".

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use vouch_core::api::{
    JsonRpcRequest, JsonRpcResponse, ProveRequest, StatusRequest, SubmissionReceipt,
    SubmitProofRequest, METHOD_STATUS, METHOD_SUBMIT,
};
use vouch_core::{LedgerBackend, ProofSubmission, Prover, VouchError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// Endpoint URL.
    pub url: String,
    /// Bearer token sent in the `Authorization` header, if any.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl HttpClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_millis(self.request_timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    }

    fn post(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let builder = client.post(&self.url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

// ---------------------------------------------------------------------------
// HttpProver
// ---------------------------------------------------------------------------

/// Client for the external proving service.
pub struct HttpProver {
    config: HttpClientConfig,
    client: reqwest::Client,
}

impl HttpProver {
    pub fn new(config: HttpClientConfig) -> Self {
        let client = config.client();
        Self { config, client }
    }
}

#[async_trait]
impl Prover for HttpProver {
    async fn prove(&self, request: &ProveRequest) -> Result<serde_json::Value, VouchError> {
        let response = self
            .config
            .post(&self.client)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VouchError::ProverTimeout(self.config.request_timeout_ms)
                } else {
                    VouchError::ProverUnreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(VouchError::ProverUnreachable(format!(
                "prover answered HTTP {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(VouchError::MalformedProof(format!(
                "prover answered HTTP {}",
                status
            )));
        }

        response.json::<serde_json::Value>().await.map_err(|e| {
            if e.is_timeout() {
                VouchError::ProverTimeout(self.config.request_timeout_ms)
            } else {
                VouchError::MalformedProof(format!("undecodable prover body: {}", e))
            }
        })
    }
}

// ---------------------------------------------------------------------------
// HttpLedgerClient
// ---------------------------------------------------------------------------

/// JSON-RPC client for the ledger-facing backend.
pub struct HttpLedgerClient {
    config: HttpClientConfig,
    client: reqwest::Client,
}

impl HttpLedgerClient {
    pub fn new(config: HttpClientConfig) -> Self {
        let client = config.client();
        Self { config, client }
    }

    /// Send one JSON-RPC call and unwrap the envelope.
    pub async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, VouchError> {
        let request = JsonRpcRequest {
            method: method.to_string(),
            params,
        };

        let response = self
            .config
            .post(&self.client)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VouchError::Timeout(format!("{} after {} ms", method, self.config.request_timeout_ms))
                } else {
                    VouchError::Network(format!("{}: {}", method, e))
                }
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(VouchError::Unauthorized(format!(
                "{} rejected the credentials",
                self.config.url
            )));
        }

        let envelope: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| VouchError::Serialization(format!("Failed to parse response: {}", e)))?;

        envelope.into_result()
    }
}

#[async_trait]
impl LedgerBackend for HttpLedgerClient {
    async fn submit(&self, request: &SubmitProofRequest) -> Result<SubmissionReceipt, VouchError> {
        let result = self.call(METHOD_SUBMIT, serde_json::to_value(request)?).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn status(&self, proof_id: &str) -> Result<ProofSubmission, VouchError> {
        let params = serde_json::to_value(StatusRequest {
            proof_id: proof_id.to_string(),
        })?;
        let result = self.call(METHOD_STATUS, params).await?;
        Ok(serde_json::from_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vouch_core::{Circuit, Witness};

    fn unroutable() -> HttpClientConfig {
        // Port 9 on localhost refuses connections.
        HttpClientConfig {
            url: "http://127.0.0.1:9/prove".to_string(),
            auth_token: Some("token".to_string()),
            request_timeout_ms: 2_000,
        }
    }

    fn prove_request() -> ProveRequest {
        ProveRequest {
            circuit: Circuit::Income,
            witness: Witness {
                income: 5000.0,
                employment_months: 12,
                employer_hash: "a".repeat(64),
                assets: 50000.0,
                liabilities: 10000.0,
                credit_score: 720.0,
                ssn_verified: true,
                selfie_verified: true,
                document_verified: true,
                timestamp: 1_234_567_890_000,
            },
            public_inputs: vouch_core::api::ProverPublicInputs { threshold: 5000.0 },
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_prover_unreachable() {
        let prover = HttpProver::new(unroutable());
        let err = prover.prove(&prove_request()).await.unwrap_err();
        assert!(matches!(err, VouchError::ProverUnreachable(_)));
        assert!(err.is_external_fault());
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_error_for_ledger() {
        let ledger = HttpLedgerClient::new(unroutable());
        let err = ledger.status("some-id").await.unwrap_err();
        assert!(matches!(err, VouchError::Network(_)));
    }

    #[test]
    fn test_config_defaults() {
        let config: HttpClientConfig =
            serde_json::from_str(r#"{"url":"http://localhost:8080/rpc"}"#).unwrap();
        assert_eq!(config.request_timeout_ms, 10_000);
        assert!(config.auth_token.is_none());
    }
}
