// crates/vouch-verifier/src/client.rs
//
// VerifierClient: read-only proof checks for third parties.
//
// Validity and expiry are always recomputed against the local clock. The
// indexer's `isValid` flag is only trusted as an upper bound since it is
// written once and never revisited when a proof expires.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use vouch_core::proof::parse_nullifier;
use vouch_core::{Clock, IndexerQuery, ProofFilter, ProofRecord, VouchError};

/// Outcome of checking a single nullifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofVerification {
    pub is_valid: bool,
    pub threshold: f64,
    pub timestamp: i64,
    pub expires_at: i64,
    #[serde(rename = "userDID")]
    pub user_did: String,
}

pub struct VerifierClient {
    indexer: Arc<dyn IndexerQuery>,
    clock: Arc<dyn Clock>,
}

impl VerifierClient {
    pub fn new(indexer: Arc<dyn IndexerQuery>, clock: Arc<dyn Clock>) -> Self {
        Self { indexer, clock }
    }

    /// Look up a proof by nullifier. Unknown nullifiers are `NotFound`.
    pub async fn verify_proof(&self, nullifier: &str) -> Result<ProofVerification, VouchError> {
        let nullifier = parse_nullifier(nullifier)?;
        let record = self
            .indexer
            .proof_by_nullifier(&nullifier)
            .await?
            .ok_or_else(|| VouchError::NotFound(format!("proof {}", nullifier)))?;

        let now = self.clock.now_secs();
        let verification = ProofVerification {
            is_valid: now < record.expires_at,
            threshold: record.threshold,
            timestamp: record.timestamp,
            expires_at: record.expires_at,
            user_did: record.user_did,
        };
        debug!(
            nullifier = %nullifier,
            is_valid = verification.is_valid,
            "Verified proof"
        );
        Ok(verification)
    }

    /// Every proof the user ever produced, expired ones included.
    pub async fn get_user_proofs(&self, user_did: &str) -> Result<Vec<ProofRecord>, VouchError> {
        let now = self.clock.now_secs();
        let records = self.indexer.proofs_by_user(user_did).await?;
        Ok(records.into_iter().map(|r| r.refreshed(now)).collect())
    }

    pub async fn get_proofs_with_filters(
        &self,
        filter: &ProofFilter,
    ) -> Result<Vec<ProofRecord>, VouchError> {
        // A stale indexer still reports expired proofs as valid, so asking it
        // for `isValid = false` would miss them. Fetch both and decide here.
        let mut server_filter = filter.clone();
        if filter.is_valid == Some(false) {
            server_filter.is_valid = None;
        }

        let now = self.clock.now_secs();
        let records = self.indexer.proofs_filtered(&server_filter).await?;
        Ok(records
            .into_iter()
            .map(|r| r.refreshed(now))
            .filter(|r| filter.matches(r))
            .collect())
    }

    /// Convenience check that never fails: any error reads as "not valid".
    pub async fn is_proof_valid(&self, nullifier: &str) -> bool {
        match self.verify_proof(nullifier).await {
            Ok(verification) => verification.is_valid,
            Err(e) => {
                warn!(nullifier = %nullifier, error = %e, "Proof validity check failed");
                false
            }
        }
    }

    pub async fn get_valid_proof_count(&self, user_did: &str) -> Result<usize, VouchError> {
        let proofs = self.get_user_proofs(user_did).await?;
        Ok(proofs.iter().filter(|p| p.is_valid).count())
    }
}
