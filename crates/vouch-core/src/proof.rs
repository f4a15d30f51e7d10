// crates/vouch-core/src/proof.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::VouchError;
use crate::hash::canonical_number;
use crate::witness::HEX_DIGEST_LEN;

/// Validity window of a confirmed proof: 30 days, in seconds.
pub const PROOF_VALIDITY_SECS: i64 = 2_592_000;

/// Domain tag prefixed to every wallet signing payload.
const SIGNING_DOMAIN: &str = "vouch-proof-v1";

/// The closed set of circuits the prover knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Circuit {
    /// income >= threshold
    Income,
    /// assets >= threshold
    Assets,
    /// creditScore >= threshold
    CreditScore,
    /// employmentMonths >= threshold
    Employment,
}

impl Circuit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Circuit::Income => "income",
            Circuit::Assets => "assets",
            Circuit::CreditScore => "credit_score",
            Circuit::Employment => "employment",
        }
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Circuit {
    type Err = VouchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Circuit::Income),
            "assets" => Ok(Circuit::Assets),
            "credit_score" => Ok(Circuit::CreditScore),
            "employment" => Ok(Circuit::Employment),
            other => Err(VouchError::Validation(format!("Unknown circuit {:?}", other))),
        }
    }
}

/// Public outputs of a proof, as returned by the prover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicOutputs {
    /// 64 lowercase hex chars, unique per witness and circuit.
    pub nullifier: String,
    /// Proof creation time, Unix seconds.
    pub timestamp: i64,
    /// Expiry, Unix seconds. Always strictly after `timestamp`.
    pub expires_at: i64,
}

impl PublicOutputs {
    /// Check the invariants a prover response must satisfy.
    pub fn validate(&self) -> Result<(), VouchError> {
        parse_nullifier(&self.nullifier)?;
        if self.timestamp <= 0 {
            return Err(VouchError::Validation(
                "publicOutputs.timestamp must be positive".to_string(),
            ));
        }
        if self.expires_at <= self.timestamp {
            return Err(VouchError::Validation(format!(
                "publicOutputs.expiresAt ({}) must be after timestamp ({})",
                self.expires_at, self.timestamp
            )));
        }
        Ok(())
    }
}

/// A zero-knowledge proof produced by the external prover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkProof {
    /// Opaque encoded proof blob.
    pub proof: String,
    /// Ordered public inputs; the first is the threshold.
    pub public_inputs: Vec<String>,
    pub public_outputs: PublicOutputs,
}

impl ZkProof {
    /// Strictly validate a raw prover response and turn it into a proof.
    ///
    /// Requires a non-empty string `proof`, a well-formed nullifier, integer
    /// `timestamp` and `expiresAt` with `expiresAt > timestamp`. If the
    /// response echoes `publicInputs`, the first entry must be the requested
    /// threshold.
    pub fn from_prover_response(response: &Value, threshold: f64) -> Result<Self, VouchError> {
        let malformed = |msg: &str| VouchError::MalformedProof(msg.to_string());

        let obj = response
            .as_object()
            .ok_or_else(|| malformed("response is not an object"))?;

        let proof = obj
            .get("proof")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing string field `proof`"))?;
        if proof.is_empty() {
            return Err(malformed("`proof` is empty"));
        }

        let outputs = obj
            .get("publicOutputs")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed("missing object field `publicOutputs`"))?;

        let nullifier = outputs
            .get("nullifier")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing string field `publicOutputs.nullifier`"))?;
        let nullifier =
            parse_nullifier(nullifier).map_err(|e| VouchError::MalformedProof(e.to_string()))?;

        let timestamp = outputs
            .get("timestamp")
            .and_then(Value::as_i64)
            .ok_or_else(|| malformed("missing integer field `publicOutputs.timestamp`"))?;
        let expires_at = outputs
            .get("expiresAt")
            .and_then(Value::as_i64)
            .ok_or_else(|| malformed("missing integer field `publicOutputs.expiresAt`"))?;

        let public_outputs = PublicOutputs {
            nullifier,
            timestamp,
            expires_at,
        };
        public_outputs
            .validate()
            .map_err(|e| VouchError::MalformedProof(e.to_string()))?;

        let threshold_text = threshold_string(threshold)?;
        let public_inputs = match obj.get("publicInputs") {
            None | Some(Value::Null) => vec![threshold_text],
            Some(Value::Array(items)) => {
                let inputs = items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<String>>>()
                    .ok_or_else(|| malformed("`publicInputs` must be an array of strings"))?;
                if inputs.first() != Some(&threshold_text) {
                    return Err(malformed("`publicInputs[0]` does not match the threshold"));
                }
                inputs
            }
            Some(_) => return Err(malformed("`publicInputs` must be an array")),
        };

        Ok(ZkProof {
            proof: proof.to_string(),
            public_inputs,
            public_outputs,
        })
    }

    /// The threshold carried as the first public input.
    pub fn threshold(&self) -> Result<f64, VouchError> {
        self.public_inputs
            .first()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|t| t.is_finite())
            .ok_or_else(|| VouchError::Validation("publicInputs[0] is not a threshold".to_string()))
    }
}

/// Validate a nullifier and return its lowercase form.
pub fn parse_nullifier(nullifier: &str) -> Result<String, VouchError> {
    if nullifier.len() == HEX_DIGEST_LEN && nullifier.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(nullifier.to_ascii_lowercase())
    } else {
        Err(VouchError::Validation(format!(
            "Nullifier must be {} hex characters",
            HEX_DIGEST_LEN
        )))
    }
}

/// Canonical text of a threshold, as it appears in public inputs.
pub fn threshold_string(threshold: f64) -> Result<String, VouchError> {
    if threshold < 0.0 {
        return Err(VouchError::Validation(format!(
            "Threshold must not be negative (got {})",
            threshold
        )));
    }
    Ok(canonical_number(threshold)?.to_string())
}

/// Bytes a wallet signs to authorize submission of a proof.
///
/// Layout: `vouch-proof-v1|{nullifier}|{threshold}|{timestamp}|{expiresAt}`.
pub fn signing_payload(outputs: &PublicOutputs, threshold: f64) -> Result<Vec<u8>, VouchError> {
    Ok(format!(
        "{}|{}|{}|{}|{}",
        SIGNING_DOMAIN,
        outputs.nullifier,
        threshold_string(threshold)?,
        outputs.timestamp,
        outputs.expires_at
    )
    .into_bytes())
}

/// Lifecycle of a submitted proof.
///
///   Pending --> Confirmed
///      |
///      +-----> Failed
///
/// Both terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofStatus {
    Pending,
    Confirmed,
    Failed,
}

impl ProofStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProofStatus::Pending)
    }

    /// Only pending -> confirmed and pending -> failed are allowed.
    pub fn can_transition_to(&self, next: ProofStatus) -> bool {
        matches!(
            (self, next),
            (ProofStatus::Pending, ProofStatus::Confirmed)
                | (ProofStatus::Pending, ProofStatus::Failed)
        )
    }
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofStatus::Pending => write!(f, "pending"),
            ProofStatus::Confirmed => write!(f, "confirmed"),
            ProofStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Backend-tracked state of an in-flight or settled proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofSubmission {
    pub proof_id: String,
    /// Globally unique across all submissions.
    pub nullifier: String,
    /// Ledger transaction reference, set once broadcast.
    pub tx_hash: Option<String>,
    pub threshold: f64,
    pub status: ProofStatus,
    /// Unix seconds.
    pub submitted_at: i64,
    /// Unix seconds, set only on the transition to confirmed.
    pub confirmed_at: Option<i64>,
    /// Unix seconds.
    pub expires_at: i64,
    #[serde(rename = "userDID")]
    pub user_did: String,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl ProofSubmission {
    /// Create a new pending submission for a validated proof.
    pub fn pending(proof: &ZkProof, threshold: f64, user_did: &str, now_secs: i64) -> Self {
        Self {
            proof_id: Uuid::now_v7().to_string(),
            nullifier: proof.public_outputs.nullifier.clone(),
            tx_hash: None,
            threshold,
            status: ProofStatus::Pending,
            submitted_at: now_secs,
            confirmed_at: None,
            expires_at: proof.public_outputs.expires_at,
            user_did: user_did.to_string(),
            failure_reason: None,
        }
    }

    /// Move to `Confirmed`, starting the validity window at `now_secs`.
    pub fn confirm(&mut self, now_secs: i64, validity_secs: i64) -> Result<(), VouchError> {
        self.check_transition(ProofStatus::Confirmed)?;
        self.status = ProofStatus::Confirmed;
        self.confirmed_at = Some(now_secs);
        self.expires_at = now_secs + validity_secs;
        Ok(())
    }

    /// Move to `Failed`, recording why.
    pub fn fail(&mut self, reason: &str) -> Result<(), VouchError> {
        self.check_transition(ProofStatus::Failed)?;
        self.status = ProofStatus::Failed;
        self.failure_reason = Some(reason.to_string());
        Ok(())
    }

    fn check_transition(&self, next: ProofStatus) -> Result<(), VouchError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(VouchError::InvalidState(format!(
                "Invalid proof status transition: {} -> {}",
                self.status, next
            )))
        }
    }

    /// Seconds of validity left at `now_secs`, or `None` if not confirmed or
    /// already expired.
    pub fn remaining_validity(&self, now_secs: i64) -> Option<i64> {
        if self.status != ProofStatus::Confirmed {
            return None;
        }
        let remaining = self.expires_at - now_secs;
        (remaining > 0).then_some(remaining)
    }

    /// Whether a confirmed proof expires within `horizon_secs` of `now_secs`.
    pub fn is_expiring_soon(&self, now_secs: i64, horizon_secs: i64) -> bool {
        self.remaining_validity(now_secs)
            .map(|left| left <= horizon_secs)
            .unwrap_or(false)
    }
}

/// Read model of a proof as served by the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRecord {
    pub nullifier: String,
    pub threshold: f64,
    /// Unix seconds.
    pub timestamp: i64,
    /// Unix seconds.
    pub expires_at: i64,
    #[serde(rename = "userDID")]
    pub user_did: String,
    /// Validity flag as last written by the indexer. May be stale.
    pub is_valid: bool,
    #[serde(default)]
    pub is_expired: bool,
}

impl ProofRecord {
    /// Recompute expiry against `now_secs`; a record is valid only if the
    /// indexer says so and it has not expired.
    pub fn refreshed(mut self, now_secs: i64) -> Self {
        self.is_expired = now_secs >= self.expires_at;
        self.is_valid = self.is_valid && !self.is_expired;
        self
    }
}

/// Conjunctive filter for indexer listings. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofFilter {
    #[serde(rename = "userDID", skip_serializing_if = "Option::is_none")]
    pub user_did: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,
}

impl ProofFilter {
    /// Whether a (refreshed) record satisfies every supplied filter.
    pub fn matches(&self, record: &ProofRecord) -> bool {
        self.user_did
            .as_ref()
            .map_or(true, |did| &record.user_did == did)
            && self
                .min_threshold
                .map_or(true, |min| record.threshold >= min)
            && self.is_valid.map_or(true, |v| record.is_valid == v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response() -> Value {
        json!({
            "proof": "0xdeadbeef",
            "publicOutputs": {
                "nullifier": "b".repeat(64),
                "timestamp": 1_700_000_000,
                "expiresAt": 1_702_592_000
            }
        })
    }

    #[test]
    fn test_valid_response_parses() {
        let proof = ZkProof::from_prover_response(&response(), 5000.0).unwrap();
        assert_eq!(proof.public_inputs, vec!["5000".to_string()]);
        assert_eq!(proof.public_outputs.nullifier, "b".repeat(64));
        assert_eq!(proof.threshold().unwrap(), 5000.0);
    }

    #[test]
    fn test_missing_proof_blob_rejected() {
        let mut r = response();
        r.as_object_mut().unwrap().remove("proof");
        assert!(matches!(
            ZkProof::from_prover_response(&r, 5000.0),
            Err(VouchError::MalformedProof(_))
        ));

        let mut r = response();
        r["proof"] = json!(42);
        assert!(ZkProof::from_prover_response(&r, 5000.0).is_err());
    }

    #[test]
    fn test_bad_nullifier_rejected() {
        let mut r = response();
        r["publicOutputs"]["nullifier"] = json!("abc");
        assert!(matches!(
            ZkProof::from_prover_response(&r, 5000.0),
            Err(VouchError::MalformedProof(_))
        ));
    }

    #[test]
    fn test_expiry_must_follow_timestamp() {
        let mut r = response();
        r["publicOutputs"]["expiresAt"] = json!(1_700_000_000);
        assert!(matches!(
            ZkProof::from_prover_response(&r, 5000.0),
            Err(VouchError::MalformedProof(_))
        ));

        let mut r = response();
        r["publicOutputs"]["timestamp"] = json!("1700000000");
        assert!(ZkProof::from_prover_response(&r, 5000.0).is_err());
    }

    #[test]
    fn test_echoed_inputs_must_match_threshold() {
        let mut r = response();
        r["publicInputs"] = json!(["4000"]);
        assert!(ZkProof::from_prover_response(&r, 5000.0).is_err());

        r["publicInputs"] = json!(["5000", "extra"]);
        let proof = ZkProof::from_prover_response(&r, 5000.0).unwrap();
        assert_eq!(proof.public_inputs.len(), 2);
    }

    #[test]
    fn test_uppercase_nullifier_is_normalized() {
        let n = parse_nullifier(&"AB".repeat(32)).unwrap();
        assert_eq!(n, "ab".repeat(32));
        assert!(parse_nullifier(&"g".repeat(64)).is_err());
    }

    #[test]
    fn test_signing_payload_layout() {
        let outputs = PublicOutputs {
            nullifier: "b".repeat(64),
            timestamp: 10,
            expires_at: 20,
        };
        let payload = signing_payload(&outputs, 5000.0).unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            format!("vouch-proof-v1|{}|5000|10|20", "b".repeat(64))
        );
        assert!(signing_payload(&outputs, -1.0).is_err());
    }

    #[test]
    fn test_status_transitions_are_one_way() {
        assert!(ProofStatus::Pending.can_transition_to(ProofStatus::Confirmed));
        assert!(ProofStatus::Pending.can_transition_to(ProofStatus::Failed));
        assert!(!ProofStatus::Confirmed.can_transition_to(ProofStatus::Pending));
        assert!(!ProofStatus::Confirmed.can_transition_to(ProofStatus::Failed));
        assert!(!ProofStatus::Failed.can_transition_to(ProofStatus::Confirmed));
    }

    #[test]
    fn test_confirm_sets_validity_window() {
        let proof = ZkProof::from_prover_response(&response(), 5000.0).unwrap();
        let mut sub = ProofSubmission::pending(&proof, 5000.0, "did:vouch:abc", 1_700_000_000);
        assert_eq!(sub.status, ProofStatus::Pending);
        assert!(sub.confirmed_at.is_none());

        sub.confirm(1_700_000_100, PROOF_VALIDITY_SECS).unwrap();
        assert_eq!(sub.confirmed_at, Some(1_700_000_100));
        assert_eq!(sub.expires_at - 1_700_000_100, 2_592_000);
        assert!(sub.fail("late").is_err());
        assert_eq!(sub.status, ProofStatus::Confirmed);
    }

    #[test]
    fn test_expiring_soon_window() {
        let proof = ZkProof::from_prover_response(&response(), 5000.0).unwrap();
        let mut sub = ProofSubmission::pending(&proof, 5000.0, "did:vouch:abc", 0);
        assert!(!sub.is_expiring_soon(0, 100));

        sub.confirm(1_000, 1_000).unwrap();
        assert_eq!(sub.remaining_validity(1_500), Some(500));
        assert!(!sub.is_expiring_soon(1_500, 100));
        assert!(sub.is_expiring_soon(1_950, 100));
        assert_eq!(sub.remaining_validity(2_000), None);
        assert!(!sub.is_expiring_soon(2_000, 100));
    }

    #[test]
    fn test_record_refresh_overrides_stale_flag() {
        let record = ProofRecord {
            nullifier: "b".repeat(64),
            threshold: 5000.0,
            timestamp: 100,
            expires_at: 200,
            user_did: "did:vouch:abc".to_string(),
            is_valid: true,
            is_expired: false,
        };
        let fresh = record.clone().refreshed(150);
        assert!(fresh.is_valid && !fresh.is_expired);
        let stale = record.refreshed(200);
        assert!(!stale.is_valid && stale.is_expired);
    }

    #[test]
    fn test_filter_is_conjunctive() {
        let record = ProofRecord {
            nullifier: "b".repeat(64),
            threshold: 5000.0,
            timestamp: 100,
            expires_at: 200,
            user_did: "did:vouch:abc".to_string(),
            is_valid: true,
            is_expired: false,
        };
        let filter = ProofFilter {
            user_did: Some("did:vouch:abc".to_string()),
            min_threshold: Some(4000.0),
            is_valid: Some(true),
        };
        assert!(filter.matches(&record));

        let filter = ProofFilter {
            min_threshold: Some(6000.0),
            ..filter
        };
        assert!(!filter.matches(&record));
        assert!(ProofFilter::default().matches(&record));
    }

    #[test]
    fn test_record_wire_names() {
        let json = json!({
            "nullifier": "b".repeat(64),
            "threshold": 5000,
            "timestamp": 1,
            "expiresAt": 2,
            "userDID": "did:vouch:abc",
            "isValid": true
        });
        let record: ProofRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.user_did, "did:vouch:abc");
        assert!(!record.is_expired);
    }
}
