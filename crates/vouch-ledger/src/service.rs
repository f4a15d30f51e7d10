// crates/vouch-ledger/src/service.rs
//
// LedgerService: the backend behind `proof/submit` and `proof/status`.
//
// Submission lifecycle:
//
//   submit ──► Pending ──(tx confirmed)──► Confirmed   expires_at = confirmed_at + window
//                 │
//                 └──────(tx failed)─────► Failed
//
// Both terminal states are final. The validity window starts at
// confirmation, not at proof generation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use vouch_core::api::{SubmissionReceipt, SubmitProofRequest};
use vouch_core::crypto::verify_signature;
use vouch_core::identity::did_from_wallet;
use vouch_core::proof::{parse_nullifier, signing_payload};
use vouch_core::{
    Clock, IndexerQuery, LedgerBackend, ProofFilter, ProofRecord, ProofStatus, ProofSubmission,
    VouchError, ZkProof, PROOF_VALIDITY_SECS,
};

use crate::broadcaster::{LedgerBroadcaster, TxState};
use crate::submissions::SubmissionStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Seconds a confirmed proof stays valid.
    #[serde(default = "default_validity_secs")]
    pub validity_secs: i64,
}

fn default_validity_secs() -> i64 {
    PROOF_VALIDITY_SECS
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            validity_secs: default_validity_secs(),
        }
    }
}

/// Counts from one `sync_pending` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub confirmed: usize,
    pub failed: usize,
    pub still_pending: usize,
    pub errors: usize,
}

pub struct LedgerService {
    submissions: Arc<dyn SubmissionStore>,
    broadcaster: Arc<dyn LedgerBroadcaster>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

impl LedgerService {
    pub fn new(
        submissions: Arc<dyn SubmissionStore>,
        broadcaster: Arc<dyn LedgerBroadcaster>,
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            submissions,
            broadcaster,
            clock,
            config,
        }
    }

    /// Accept a signed proof.
    ///
    /// Order matters: shape and signature are checked before the nullifier is
    /// reserved, and a failed broadcast releases the reservation again.
    pub async fn submit(&self, request: &SubmitProofRequest) -> Result<SubmissionReceipt, VouchError> {
        let proof = ZkProof {
            proof: request.proof.clone(),
            public_inputs: request.public_inputs.clone(),
            public_outputs: request.public_outputs.clone(),
        };
        if proof.proof.is_empty() {
            return Err(VouchError::Validation("Proof blob is empty".to_string()));
        }
        proof.public_outputs.validate()?;
        if parse_nullifier(&proof.public_outputs.nullifier)? != proof.public_outputs.nullifier {
            return Err(VouchError::Validation("Nullifier must be lowercase hex".to_string()));
        }
        let threshold = proof.threshold()?;

        let payload = signing_payload(&proof.public_outputs, threshold)?;
        match verify_signature(&request.wallet_address, &payload, &request.wallet_signature) {
            Ok(true) => {}
            Ok(false) => {
                return Err(VouchError::SignatureFailed(
                    "Wallet signature does not match the proof".to_string(),
                ))
            }
            Err(e) => return Err(VouchError::SignatureFailed(e.to_string())),
        }

        let user_did = did_from_wallet(&request.wallet_address);
        let mut submission =
            ProofSubmission::pending(&proof, threshold, &user_did, self.clock.now_secs());

        self.submissions.insert_unique(&submission).await.map_err(|e| {
            if let VouchError::ReplayDetected { nullifier } = &e {
                tracing::warn!("Rejected replayed nullifier {}", nullifier);
            }
            e
        })?;

        let tx_hash = match self.broadcaster.broadcast(&submission).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                tracing::warn!("Broadcast of proof {} failed: {}", submission.proof_id, e);
                self.submissions.remove(&submission.proof_id).await?;
                return Err(e);
            }
        };

        submission.tx_hash = Some(tx_hash.clone());
        self.submissions
            .transition(ProofStatus::Pending, &submission)
            .await?;

        tracing::info!(
            "Accepted proof {} (nullifier {}, tx {})",
            submission.proof_id,
            submission.nullifier,
            tx_hash
        );

        Ok(SubmissionReceipt {
            proof_id: submission.proof_id,
            tx_hash,
            status: ProofStatus::Pending,
        })
    }

    /// Current view of a submission. Never mutates anything.
    pub async fn status(&self, proof_id: &str) -> Result<ProofSubmission, VouchError> {
        self.submissions
            .get(proof_id)
            .await?
            .ok_or_else(|| VouchError::NotFound(format!("Proof {} not found", proof_id)))
    }

    /// Mark a submission confirmed. Confirming twice is a no-op, and only a
    /// submission that was broadcast can be confirmed.
    pub async fn confirm(&self, proof_id: &str) -> Result<ProofSubmission, VouchError> {
        let now = self.clock.now_secs();
        let validity = self.config.validity_secs;
        let submission = self
            .settle(proof_id, ProofStatus::Confirmed, |s| {
                if s.tx_hash.is_none() {
                    return Err(VouchError::InvalidState(format!(
                        "Proof {} was never broadcast",
                        s.proof_id
                    )));
                }
                s.confirm(now, validity)
            })
            .await?;
        tracing::info!(
            "Proof {} confirmed, valid until {}",
            proof_id,
            submission.expires_at
        );
        Ok(submission)
    }

    /// Mark a submission failed. Failing twice is a no-op.
    pub async fn fail(&self, proof_id: &str, reason: &str) -> Result<ProofSubmission, VouchError> {
        let submission = self
            .settle(proof_id, ProofStatus::Failed, |s| s.fail(reason))
            .await?;
        tracing::info!("Proof {} failed: {}", proof_id, reason);
        Ok(submission)
    }

    /// Move a submission to `target` with a compare-and-write against the
    /// status that was read. Losing a race to the same target is a no-op;
    /// losing it to the other terminal state is `InvalidState`.
    async fn settle<F>(
        &self,
        proof_id: &str,
        target: ProofStatus,
        apply: F,
    ) -> Result<ProofSubmission, VouchError>
    where
        F: FnOnce(&mut ProofSubmission) -> Result<(), VouchError>,
    {
        let current = self.status(proof_id).await?;
        if current.status == target {
            return Ok(current);
        }
        let mut next = current.clone();
        apply(&mut next)?;

        match self.submissions.transition(current.status, &next).await {
            Ok(()) => Ok(next),
            Err(VouchError::InvalidState(reason)) => {
                let stored = self.status(proof_id).await?;
                if stored.status == target {
                    Ok(stored)
                } else {
                    Err(VouchError::InvalidState(reason))
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Read back the ledger state of every pending submission and apply it.
    pub async fn sync_pending(&self) -> Result<SyncReport, VouchError> {
        let mut report = SyncReport::default();

        for submission in self.submissions.list_by_status(ProofStatus::Pending).await? {
            let Some(tx_hash) = submission.tx_hash.as_deref() else {
                report.still_pending += 1;
                continue;
            };
            match self.broadcaster.tx_status(tx_hash).await {
                Ok(TxState::Pending) => report.still_pending += 1,
                Ok(TxState::Confirmed) => {
                    self.confirm(&submission.proof_id).await?;
                    report.confirmed += 1;
                }
                Ok(TxState::Failed(reason)) => {
                    self.fail(&submission.proof_id, &reason).await?;
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!("Could not read tx {}: {}", tx_hash, e);
                    report.errors += 1;
                }
            }
        }

        tracing::debug!("Ledger sync: {:?}", report);
        Ok(report)
    }

    fn to_record(&self, submission: ProofSubmission) -> Option<ProofRecord> {
        let confirmed_at = submission.confirmed_at?;
        Some(
            ProofRecord {
                nullifier: submission.nullifier,
                threshold: submission.threshold,
                timestamp: confirmed_at,
                expires_at: submission.expires_at,
                user_did: submission.user_did,
                is_valid: true,
                is_expired: false,
            }
            .refreshed(self.clock.now_secs()),
        )
    }

    async fn confirmed_records(&self) -> Result<Vec<ProofRecord>, VouchError> {
        Ok(self
            .submissions
            .list_by_status(ProofStatus::Confirmed)
            .await?
            .into_iter()
            .filter_map(|s| self.to_record(s))
            .collect())
    }
}

#[async_trait]
impl LedgerBackend for LedgerService {
    async fn submit(&self, request: &SubmitProofRequest) -> Result<SubmissionReceipt, VouchError> {
        LedgerService::submit(self, request).await
    }

    async fn status(&self, proof_id: &str) -> Result<ProofSubmission, VouchError> {
        LedgerService::status(self, proof_id).await
    }
}

/// Read model over confirmed submissions, shaped like the indexer's.
#[async_trait]
impl IndexerQuery for LedgerService {
    async fn proof_by_nullifier(&self, nullifier: &str) -> Result<Option<ProofRecord>, VouchError> {
        Ok(self
            .submissions
            .get_by_nullifier(nullifier)
            .await?
            .filter(|s| s.status == ProofStatus::Confirmed)
            .and_then(|s| self.to_record(s)))
    }

    async fn proofs_by_user(&self, user_did: &str) -> Result<Vec<ProofRecord>, VouchError> {
        let mut records: Vec<ProofRecord> = self
            .submissions
            .list_by_did(user_did)
            .await?
            .into_iter()
            .filter(|s| s.status == ProofStatus::Confirmed)
            .filter_map(|s| self.to_record(s))
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    async fn proofs_filtered(&self, filter: &ProofFilter) -> Result<Vec<ProofRecord>, VouchError> {
        let mut records: Vec<ProofRecord> = self
            .confirmed_records()
            .await?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::broadcaster::LocalLedger;
    use crate::submissions::MemorySubmissionStore;
    use vouch_core::crypto::Keypair;
    use vouch_core::{ManualClock, PublicOutputs};

    pub(crate) const NOW: i64 = 1_700_000_000;

    pub(crate) struct Harness {
        pub service: Arc<LedgerService>,
        pub ledger: Arc<LocalLedger>,
        pub clock: Arc<ManualClock>,
        pub wallet: Keypair,
    }

    pub(crate) fn harness() -> Harness {
        let ledger = Arc::new(LocalLedger::new());
        let clock = Arc::new(ManualClock::at_secs(NOW));
        let service = Arc::new(LedgerService::new(
            Arc::new(MemorySubmissionStore::new()),
            ledger.clone(),
            clock.clone(),
            LedgerConfig::default(),
        ));
        Harness {
            service,
            ledger,
            clock,
            wallet: Keypair::generate(),
        }
    }

    pub(crate) fn signed_request(wallet: &Keypair, nullifier: &str, threshold: &str) -> SubmitProofRequest {
        let outputs = PublicOutputs {
            nullifier: nullifier.to_string(),
            timestamp: NOW,
            expires_at: NOW + PROOF_VALIDITY_SECS,
        };
        let payload = signing_payload(&outputs, threshold.parse().unwrap()).unwrap();
        SubmitProofRequest {
            proof: "0xdeadbeef".to_string(),
            public_inputs: vec![threshold.to_string()],
            public_outputs: outputs,
            wallet_signature: wallet.sign_hex(&payload),
            wallet_address: wallet.address(),
        }
    }

    #[tokio::test]
    async fn test_submit_then_confirm_starts_validity_window() {
        let h = harness();
        let receipt = h
            .service
            .submit(&signed_request(&h.wallet, &"b".repeat(64), "5000"))
            .await
            .unwrap();
        assert_eq!(receipt.status, ProofStatus::Pending);
        assert_eq!(receipt.tx_hash, LocalLedger::tx_hash_for(&"b".repeat(64)));

        let pending = h.service.status(&receipt.proof_id).await.unwrap();
        assert_eq!(pending.status, ProofStatus::Pending);
        assert_eq!(pending.user_did, did_from_wallet(&h.wallet.address()));

        h.clock.advance_secs(60);
        let confirmed = h.service.confirm(&receipt.proof_id).await.unwrap();
        assert_eq!(confirmed.confirmed_at, Some(NOW + 60));
        assert_eq!(confirmed.expires_at - NOW - 60, PROOF_VALIDITY_SECS);
    }

    #[tokio::test]
    async fn test_duplicate_nullifier_is_replay() {
        let h = harness();
        let nullifier = "c".repeat(64);
        let first = h
            .service
            .submit(&signed_request(&h.wallet, &nullifier, "5000"))
            .await
            .unwrap();

        let other_wallet = Keypair::generate();
        let err = h
            .service
            .submit(&signed_request(&other_wallet, &nullifier, "100"))
            .await
            .unwrap_err();
        assert!(matches!(err, VouchError::ReplayDetected { .. }));

        let original = h.service.status(&first.proof_id).await.unwrap();
        assert_eq!(original.threshold, 5000.0);
        assert_eq!(original.user_did, did_from_wallet(&h.wallet.address()));
    }

    #[tokio::test]
    async fn test_bad_signature_rejected_without_reserving_nullifier() {
        let h = harness();
        let mut request = signed_request(&h.wallet, &"d".repeat(64), "5000");
        request.public_inputs = vec!["9000".to_string()];

        let err = h.service.submit(&request).await.unwrap_err();
        assert!(matches!(err, VouchError::SignatureFailed(_)));

        // Nullifier still free.
        h.service
            .submit(&signed_request(&h.wallet, &"d".repeat(64), "5000"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_terminal_states_are_final() {
        let h = harness();
        let receipt = h
            .service
            .submit(&signed_request(&h.wallet, &"e".repeat(64), "1"))
            .await
            .unwrap();

        h.service.fail(&receipt.proof_id, "reverted").await.unwrap();
        h.service.fail(&receipt.proof_id, "reverted").await.unwrap();
        let err = h.service.confirm(&receipt.proof_id).await.unwrap_err();
        assert!(matches!(err, VouchError::InvalidState(_)));
        assert_eq!(
            h.service.status(&receipt.proof_id).await.unwrap().status,
            ProofStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_unknown_proof_is_not_found() {
        let h = harness();
        assert!(h.service.status("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_sync_pending_applies_ledger_state() {
        let h = harness();
        let a = h
            .service
            .submit(&signed_request(&h.wallet, &"1".repeat(64), "10"))
            .await
            .unwrap();
        let b = h
            .service
            .submit(&signed_request(&h.wallet, &"2".repeat(64), "20"))
            .await
            .unwrap();
        h.service
            .submit(&signed_request(&h.wallet, &"3".repeat(64), "30"))
            .await
            .unwrap();

        h.ledger.settle(&a.tx_hash, TxState::Confirmed).await.unwrap();
        h.ledger
            .settle(&b.tx_hash, TxState::Failed("out of gas".into()))
            .await
            .unwrap();

        let report = h.service.sync_pending().await.unwrap();
        assert_eq!(report.confirmed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.still_pending, 1);
        assert_eq!(
            h.service.status(&b.proof_id).await.unwrap().failure_reason.as_deref(),
            Some("out of gas")
        );
    }

    #[tokio::test]
    async fn test_indexer_view_tracks_expiry() {
        let h = harness();
        let nullifier = "f".repeat(64);
        let receipt = h
            .service
            .submit(&signed_request(&h.wallet, &nullifier, "5000"))
            .await
            .unwrap();

        // Pending proofs are not indexed yet.
        assert!(h.service.proof_by_nullifier(&nullifier).await.unwrap().is_none());

        h.service.confirm(&receipt.proof_id).await.unwrap();
        let record = h.service.proof_by_nullifier(&nullifier).await.unwrap().unwrap();
        assert!(record.is_valid);

        h.clock.advance_secs(PROOF_VALIDITY_SECS);
        let record = h.service.proof_by_nullifier(&nullifier).await.unwrap().unwrap();
        assert!(record.is_expired);
        assert!(!record.is_valid);
    }

    /// Store that yields after every read so concurrent settles interleave
    /// between their read and their write.
    struct YieldingStore(MemorySubmissionStore);

    #[async_trait]
    impl SubmissionStore for YieldingStore {
        async fn insert_unique(&self, submission: &ProofSubmission) -> Result<(), VouchError> {
            self.0.insert_unique(submission).await
        }

        async fn get(&self, proof_id: &str) -> Result<Option<ProofSubmission>, VouchError> {
            let found = self.0.get(proof_id).await;
            tokio::task::yield_now().await;
            found
        }

        async fn get_by_nullifier(&self, nullifier: &str) -> Result<Option<ProofSubmission>, VouchError> {
            self.0.get_by_nullifier(nullifier).await
        }

        async fn transition(
            &self,
            expected: ProofStatus,
            next: &ProofSubmission,
        ) -> Result<(), VouchError> {
            self.0.transition(expected, next).await
        }

        async fn remove(&self, proof_id: &str) -> Result<(), VouchError> {
            self.0.remove(proof_id).await
        }

        async fn list_by_status(&self, status: ProofStatus) -> Result<Vec<ProofSubmission>, VouchError> {
            self.0.list_by_status(status).await
        }

        async fn list_by_did(&self, user_did: &str) -> Result<Vec<ProofSubmission>, VouchError> {
            self.0.list_by_did(user_did).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_confirm_and_fail_settle_once() {
        let wallet = Keypair::generate();
        let service = LedgerService::new(
            Arc::new(YieldingStore(MemorySubmissionStore::new())),
            Arc::new(LocalLedger::new()),
            Arc::new(ManualClock::at_secs(NOW)),
            LedgerConfig::default(),
        );
        let receipt = service
            .submit(&signed_request(&wallet, &"9".repeat(64), "5000"))
            .await
            .unwrap();

        let (confirmed, failed) = tokio::join!(
            service.confirm(&receipt.proof_id),
            service.fail(&receipt.proof_id, "reverted")
        );
        assert!(confirmed.is_ok() != failed.is_ok());

        let stored = service.status(&receipt.proof_id).await.unwrap();
        match (confirmed, failed) {
            (Ok(winner), Err(e)) | (Err(e), Ok(winner)) => {
                assert!(matches!(e, VouchError::InvalidState(_)));
                assert_eq!(stored.status, winner.status);
                assert_eq!(stored.confirmed_at, winner.confirmed_at);
                assert_eq!(stored.failure_reason, winner.failure_reason);
            }
            _ => unreachable!(),
        }
        // Never a confirmed row that also carries a failure reason.
        assert!(!(stored.status == ProofStatus::Confirmed && stored.failure_reason.is_some()));
    }

    #[tokio::test]
    async fn test_unbroadcast_submission_cannot_be_confirmed() {
        let store = Arc::new(MemorySubmissionStore::new());
        let service = LedgerService::new(
            store.clone(),
            Arc::new(LocalLedger::new()),
            Arc::new(ManualClock::at_secs(NOW)),
            LedgerConfig::default(),
        );
        let submission = ProofSubmission {
            proof_id: "unsent".to_string(),
            nullifier: "7".repeat(64),
            tx_hash: None,
            threshold: 5000.0,
            status: ProofStatus::Pending,
            submitted_at: NOW,
            confirmed_at: None,
            expires_at: NOW + PROOF_VALIDITY_SECS,
            user_did: "did:vouch:aa".to_string(),
            failure_reason: None,
        };
        store.insert_unique(&submission).await.unwrap();

        let err = service.confirm("unsent").await.unwrap_err();
        assert!(matches!(err, VouchError::InvalidState(_)));
        assert_eq!(service.status("unsent").await.unwrap().status, ProofStatus::Pending);

        let failed = service.fail("unsent", "never broadcast").await.unwrap();
        assert_eq!(failed.status, ProofStatus::Failed);
    }
}
