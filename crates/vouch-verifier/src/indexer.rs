// crates/vouch-verifier/src/indexer.rs
//
// HttpIndexer: GraphQL-over-HTTP client for the proof indexer.
//
// Indexers commonly serialize 64-bit integers and big numbers as strings,
// so numeric fields accept either JSON numbers or numeric strings.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use vouch_core::{IndexerQuery, ProofFilter, ProofRecord, VouchError};

const PROOF_FIELDS: &str = "nullifier threshold timestamp expiresAt userDID isValid";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// GraphQL endpoint URL.
    pub url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl IndexerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// A proof as the indexer serializes it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexedProof {
    nullifier: String,
    threshold: Value,
    timestamp: Value,
    expires_at: Value,
    #[serde(rename = "userDID")]
    user_did: String,
    is_valid: bool,
}

impl TryFrom<IndexedProof> for ProofRecord {
    type Error = VouchError;

    fn try_from(p: IndexedProof) -> Result<Self, Self::Error> {
        Ok(ProofRecord {
            threshold: as_f64(&p.threshold, "threshold")?,
            timestamp: as_i64(&p.timestamp, "timestamp")?,
            expires_at: as_i64(&p.expires_at, "expiresAt")?,
            nullifier: p.nullifier.to_ascii_lowercase(),
            user_did: p.user_did,
            is_valid: p.is_valid,
            is_expired: false,
        })
    }
}

fn as_f64(value: &Value, field: &str) -> Result<f64, VouchError> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
    .ok_or_else(|| VouchError::Serialization(format!("Indexer field `{}` is not numeric", field)))
}

fn as_i64(value: &Value, field: &str) -> Result<i64, VouchError> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| VouchError::Serialization(format!("Indexer field `{}` is not an integer", field)))
}

pub struct HttpIndexer {
    config: IndexerConfig,
    client: reqwest::Client,
}

impl HttpIndexer {
    pub fn new(config: IndexerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    /// Run one GraphQL query and return `data.{root}`.
    async fn query(&self, query: &str, variables: Value, root: &str) -> Result<Value, VouchError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                VouchError::Timeout(format!("Indexer query after {} ms", self.config.request_timeout_ms))
            } else {
                VouchError::Network(format!("Indexer unreachable: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(VouchError::Network(format!("Indexer answered HTTP {}", status)));
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| VouchError::Serialization(format!("Malformed indexer response: {}", e)))?;

        parse_data(body, root)
    }

    async fn query_list(&self, query: &str, variables: Value, root: &str) -> Result<Vec<ProofRecord>, VouchError> {
        let data = self.query(query, variables, root).await?;
        let items: Vec<IndexedProof> = serde_json::from_value(data)
            .map_err(|e| VouchError::Serialization(format!("Malformed `{}` list: {}", root, e)))?;
        items.into_iter().map(ProofRecord::try_from).collect()
    }
}

fn parse_data(body: GraphQlResponse, root: &str) -> Result<Value, VouchError> {
    if !body.errors.is_empty() {
        let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
        return Err(VouchError::Network(format!("Indexer error: {}", messages.join("; "))));
    }
    body.data
        .and_then(|mut data| data.get_mut(root).map(Value::take))
        .ok_or_else(|| VouchError::Serialization(format!("Indexer response has no `{}`", root)))
}

#[async_trait]
impl IndexerQuery for HttpIndexer {
    async fn proof_by_nullifier(&self, nullifier: &str) -> Result<Option<ProofRecord>, VouchError> {
        let query = format!(
            "query ProofByNullifier($nullifier: String!) {{ proof(nullifier: $nullifier) {{ {} }} }}",
            PROOF_FIELDS
        );
        let data = self
            .query(&query, json!({ "nullifier": nullifier }), "proof")
            .await?;
        if data.is_null() {
            return Ok(None);
        }
        let indexed: IndexedProof = serde_json::from_value(data)
            .map_err(|e| VouchError::Serialization(format!("Malformed proof: {}", e)))?;
        Ok(Some(indexed.try_into()?))
    }

    async fn proofs_by_user(&self, user_did: &str) -> Result<Vec<ProofRecord>, VouchError> {
        let query = format!(
            "query ProofsByUser($userDID: String!) {{ proofs(where: {{ userDID: $userDID }}, orderBy: timestamp, orderDirection: desc) {{ {} }} }}",
            PROOF_FIELDS
        );
        self.query_list(&query, json!({ "userDID": user_did }), "proofs")
            .await
    }

    async fn proofs_filtered(&self, filter: &ProofFilter) -> Result<Vec<ProofRecord>, VouchError> {
        let query = format!(
            "query ProofsFiltered($where: ProofFilter) {{ proofs(where: $where, orderBy: timestamp, orderDirection: desc) {{ {} }} }}",
            PROOF_FIELDS
        );
        self.query_list(&query, json!({ "where": filter }), "proofs")
            .await
    }
}
