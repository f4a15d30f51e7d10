// crates/vouch-core/src/traits.rs
//
// Collaborator interfaces. Components receive these as `Arc<dyn Trait>`
// at construction so tests can substitute in-memory fakes.

use async_trait::async_trait;

use crate::api::{ProveRequest, SubmissionReceipt, SubmitProofRequest};
use crate::error::VouchError;
use crate::proof::{ProofFilter, ProofRecord, ProofSubmission};
use crate::store::{IndexField, StoredWitness};

/// Key-value persistence for encrypted witness records.
///
/// Implemented by vouch-store (in-memory and RocksDB backends).
#[async_trait]
pub trait WitnessKv: Send + Sync {
    /// Write a record under its id. Overwrites if the id already exists.
    async fn put(&self, record: &StoredWitness) -> Result<(), VouchError>;

    /// Retrieve a record by id.
    async fn get(&self, id: &str) -> Result<Option<StoredWitness>, VouchError>;

    /// List every record whose indexed field equals `value`.
    async fn query_by_index(
        &self,
        field: IndexField,
        value: &str,
    ) -> Result<Vec<StoredWitness>, VouchError>;

    /// Delete a record by id. Deleting a missing id is not an error.
    async fn delete(&self, id: &str) -> Result<(), VouchError>;
}

/// The external proving black box.
///
/// Returns the raw JSON response; shape validation is the caller's job so
/// that a malformed answer is never trusted by construction. Implementations
/// must distinguish `ProverUnreachable`, `ProverTimeout` and `MalformedProof`.
#[async_trait]
pub trait Prover: Send + Sync {
    async fn prove(&self, request: &ProveRequest) -> Result<serde_json::Value, VouchError>;
}

/// A wallet able to sign submission payloads.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// The connected wallet's address, or `None` when no wallet is connected.
    fn address(&self) -> Option<String>;

    /// Sign `payload`, returning the signature as hex.
    async fn sign(&self, payload: &[u8]) -> Result<String, VouchError>;
}

/// The ledger-facing backend that records submissions.
///
/// Implemented over HTTP by vouch-prover and in-process by vouch-ledger.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Submit a signed proof. Duplicate nullifiers fail with `ReplayDetected`.
    async fn submit(&self, request: &SubmitProofRequest) -> Result<SubmissionReceipt, VouchError>;

    /// Current view of a submission. Unknown ids fail with `NotFound`.
    async fn status(&self, proof_id: &str) -> Result<ProofSubmission, VouchError>;
}

/// Read-only query layer over ledger-recorded proofs.
///
/// Implemented over HTTP by vouch-verifier and in-process by vouch-ledger.
#[async_trait]
pub trait IndexerQuery: Send + Sync {
    async fn proof_by_nullifier(&self, nullifier: &str) -> Result<Option<ProofRecord>, VouchError>;

    async fn proofs_by_user(&self, user_did: &str) -> Result<Vec<ProofRecord>, VouchError>;

    async fn proofs_filtered(&self, filter: &ProofFilter) -> Result<Vec<ProofRecord>, VouchError>;
}
