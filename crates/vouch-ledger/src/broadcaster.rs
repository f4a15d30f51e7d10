// crates/vouch-ledger/src/broadcaster.rs
//
// The external ledger, seen from the backend: transactions go out, and
// their inclusion state is read back later.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use vouch_core::{ProofSubmission, VouchError};

/// Inclusion state of a ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "reason")]
pub enum TxState {
    Pending,
    Confirmed,
    Failed(String),
}

#[async_trait]
pub trait LedgerBroadcaster: Send + Sync {
    /// Send the proof to the ledger, returning the transaction hash.
    async fn broadcast(&self, submission: &ProofSubmission) -> Result<String, VouchError>;

    async fn tx_status(&self, tx_hash: &str) -> Result<TxState, VouchError>;
}

/// Local stand-in for a ledger: transactions stay pending until settled.
///
/// Transaction hashes are `0x` + SHA-256 of the nullifier.
#[derive(Debug, Default)]
pub struct LocalLedger {
    txs: RwLock<HashMap<String, TxState>>,
}

impl LocalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tx_hash_for(nullifier: &str) -> String {
        format!("0x{}", hex::encode(Sha256::digest(nullifier.as_bytes())))
    }

    /// Record the final state of a transaction.
    pub async fn settle(&self, tx_hash: &str, state: TxState) -> Result<(), VouchError> {
        let mut txs = self.txs.write().await;
        match txs.get_mut(tx_hash) {
            Some(current) => {
                *current = state;
                Ok(())
            }
            None => Err(VouchError::NotFound(format!("Transaction {} not found", tx_hash))),
        }
    }
}

#[async_trait]
impl LedgerBroadcaster for LocalLedger {
    async fn broadcast(&self, submission: &ProofSubmission) -> Result<String, VouchError> {
        let tx_hash = Self::tx_hash_for(&submission.nullifier);
        self.txs
            .write()
            .await
            .insert(tx_hash.clone(), TxState::Pending);
        tracing::debug!("Broadcast {} for proof {}", tx_hash, submission.proof_id);
        Ok(tx_hash)
    }

    async fn tx_status(&self, tx_hash: &str) -> Result<TxState, VouchError> {
        self.txs
            .read()
            .await
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| VouchError::NotFound(format!("Transaction {} not found", tx_hash)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_state_wire_format() {
        assert_eq!(
            serde_json::to_string(&TxState::Failed("reverted".into())).unwrap(),
            r#"{"state":"failed","reason":"reverted"}"#
        );
        assert_eq!(
            serde_json::to_string(&TxState::Confirmed).unwrap(),
            r#"{"state":"confirmed"}"#
        );
    }

    #[tokio::test]
    async fn test_settle_unknown_tx_fails() {
        let ledger = LocalLedger::new();
        assert!(ledger
            .settle("0xnope", TxState::Confirmed)
            .await
            .unwrap_err()
            .is_not_found());
    }
}
