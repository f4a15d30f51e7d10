use thiserror::Error;

/// Protocol-wide error types for Vouch.
///
/// Variants are grouped by the category a caller needs to branch on:
/// validation, absence, authorization, external faults, and integrity
/// violations. Callers match on variants; the message is for humans only.
#[derive(Debug, Error)]
pub enum VouchError {
    /// Malformed input detected before any network or storage side effect.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found (stored witness, proof id, nullifier).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not the owner of the requested record.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The user has no linked account for a required data source.
    #[error("No linked {data_source} source")]
    NoLinkedSource { data_source: String },

    /// A data source exists but could not be reached or answered with a fault.
    #[error("Data source {data_source} unavailable: {reason}")]
    SourceUnavailable { data_source: String, reason: String },

    /// The proving service refused the connection or could not be reached.
    #[error("Prover unreachable: {0}")]
    ProverUnreachable(String),

    /// The proving service did not answer within the configured bound.
    #[error("Prover timed out after {0} ms")]
    ProverTimeout(u64),

    /// The proving service answered with something that is not a proof.
    #[error("Malformed proof response: {0}")]
    MalformedProof(String),

    /// No wallet is connected to sign the submission.
    #[error("Wallet not connected")]
    WalletNotConnected,

    /// The wallet refused to sign or produced an unusable signature.
    #[error("Signature failed: {0}")]
    SignatureFailed(String),

    /// The ledger backend rejected the submission.
    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    /// A proof with this nullifier was already submitted.
    #[error("Replay detected: nullifier {nullifier} already submitted")]
    ReplayDetected { nullifier: String },

    /// Generic transport failure talking to a remote service.
    #[error("Network error: {0}")]
    Network(String),

    /// A remote call other than the prover exceeded its time bound.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Authenticated decryption or hash check failed.
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// Cryptographic error (key derivation, signing, key parsing).
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Storage layer error (RocksDB, in-memory backend).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid state transition.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl VouchError {
    /// Whether this error means "absent" rather than "broken".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VouchError::NotFound(_) | VouchError::NoLinkedSource { .. }
        )
    }

    /// Whether this error originates in an external dependency
    /// (prover, ledger backend, indexer, data source).
    pub fn is_external_fault(&self) -> bool {
        matches!(
            self,
            VouchError::ProverUnreachable(_)
                | VouchError::ProverTimeout(_)
                | VouchError::SourceUnavailable { .. }
                | VouchError::Network(_)
                | VouchError::Timeout(_)
        )
    }

    /// Stable machine-readable code, used on the JSON-RPC wire so clients can
    /// rebuild the same variant on their side.
    pub fn code(&self) -> &'static str {
        match self {
            VouchError::Validation(_) => "validation",
            VouchError::NotFound(_) => "not_found",
            VouchError::Unauthorized(_) => "unauthorized",
            VouchError::NoLinkedSource { .. } => "no_linked_source",
            VouchError::SourceUnavailable { .. } => "source_unavailable",
            VouchError::ProverUnreachable(_) => "prover_unreachable",
            VouchError::ProverTimeout(_) => "prover_timeout",
            VouchError::MalformedProof(_) => "malformed_proof",
            VouchError::WalletNotConnected => "wallet_not_connected",
            VouchError::SignatureFailed(_) => "signature_failed",
            VouchError::SubmissionRejected(_) => "submission_rejected",
            VouchError::ReplayDetected { .. } => "replay_detected",
            VouchError::Network(_) => "network",
            VouchError::Timeout(_) => "timeout",
            VouchError::Integrity(_) => "integrity",
            VouchError::Crypto(_) => "crypto",
            VouchError::Storage(_) => "storage",
            VouchError::Serialization(_) => "serialization",
            VouchError::InvalidState(_) => "invalid_state",
        }
    }

    /// Rebuild an error from a wire code and message.
    ///
    /// Unknown codes map to `SubmissionRejected`: the remote side refused the
    /// request for a reason this client does not know how to categorize.
    pub fn from_code(code: &str, message: String) -> Self {
        match code {
            "validation" => VouchError::Validation(message),
            "not_found" => VouchError::NotFound(message),
            "unauthorized" => VouchError::Unauthorized(message),
            "malformed_proof" => VouchError::MalformedProof(message),
            "signature_failed" => VouchError::SignatureFailed(message),
            "replay_detected" => {
                let found = message
                    .split_whitespace()
                    .find(|word| crate::witness::is_hex_digest(word))
                    .map(str::to_string);
                VouchError::ReplayDetected {
                    nullifier: found.unwrap_or(message),
                }
            }
            "network" => VouchError::Network(message),
            "timeout" => VouchError::Timeout(message),
            "integrity" => VouchError::Integrity(message),
            "storage" => VouchError::Storage(message),
            "invalid_state" => VouchError::InvalidState(message),
            _ => VouchError::SubmissionRejected(message),
        }
    }
}

impl From<serde_json::Error> for VouchError {
    fn from(e: serde_json::Error) -> Self {
        VouchError::Serialization(e.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for VouchError {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        VouchError::Crypto(e.to_string())
    }
}
