// crates/vouch-verifier/src/lib.rs
//
// vouch-verifier: Read-only proof verification for third parties.
//
// Lenders and other relying parties check that a proof exists, has not
// expired and clears a threshold, using only the indexer's read model.
// Nothing here touches witnesses or the submission path.

pub mod client;
pub mod indexer;

pub use client::{ProofVerification, VerifierClient};
pub use indexer::{HttpIndexer, IndexerConfig};
