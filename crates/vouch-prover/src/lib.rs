// crates/vouch-prover/src/lib.rs
//
// vouch-prover: From witness to ledger-recorded proof.
//
// Modules:
//   - pipeline: ProofPipeline (prove, validate, sign, submit)
//   - tracker:  StatusTracker and its cancellable tracking task
//   - http:     HttpProver and HttpLedgerClient
//   - wallet:   Ed25519Wallet

pub mod http;
pub mod pipeline;
pub mod tracker;
pub mod wallet;

pub use http::{HttpClientConfig, HttpLedgerClient, HttpProver};
pub use pipeline::{PendingWitness, PipelineConfig, ProofPipeline};
pub use tracker::{StatusTracker, TrackOutcome, TrackerConfig, TrackingHandle};
pub use wallet::Ed25519Wallet;
