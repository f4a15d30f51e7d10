// crates/vouch-ledger/src/lib.rs
//
// vouch-ledger: Ledger-facing backend for Vouch.
//
// Accepts signed proofs, enforces global nullifier uniqueness, tracks each
// submission through pending -> confirmed | failed, and serves the
// confirmed proofs through the same read model the indexer exposes.

pub mod broadcaster;
pub mod dispatch;
pub mod service;
pub mod submissions;

pub use broadcaster::{LedgerBroadcaster, LocalLedger, TxState};
pub use dispatch::{dispatch, dispatch_operator};
pub use service::{LedgerConfig, LedgerService, SyncReport};
pub use submissions::{MemorySubmissionStore, RocksSubmissionStore, SubmissionStore};
