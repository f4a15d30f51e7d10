// crates/vouch-core/src/lib.rs
//
// vouch-core: Core types, traits, and crypto primitives for Vouch.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the witness and proof data model, the canonical witness hash,
// the protocol-wide error type, wallet signature helpers, and the trait
// interfaces behind which every external collaborator sits.

pub mod api;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod identity;
pub mod proof;
pub mod store;
pub mod time;
pub mod traits;
pub mod witness;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use vouch_core::Witness;`

// Witness types
pub use hash::{canonical_json, hash_employer, hash_witness, WitnessHash};
pub use witness::Witness;

// Proof types
pub use proof::{
    Circuit, ProofFilter, ProofRecord, ProofStatus, ProofSubmission, PublicOutputs, ZkProof,
    PROOF_VALIDITY_SECS,
};

// Persisted witness records
pub use store::{EncryptionScheme, IndexField, StoredWitness, StoredWitnessSummary};

// Identity types
pub use identity::{OwnerIdentity, UserContext};

// Clock
pub use time::{Clock, ManualClock, SystemClock};

// Error type
pub use error::VouchError;

// Traits
pub use traits::{IndexerQuery, LedgerBackend, Prover, WalletSigner, WitnessKv};
