// crates/vouch-prover/tests/submit_and_track.rs
//
// Pipeline + tracker against an in-process ledger backend: submit a proof,
// watch it go pending -> confirmed, and check the validity window.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use vouch_core::api::ProveRequest;
use vouch_core::crypto::Keypair;
use vouch_core::{
    Circuit, ManualClock, ProofStatus, Prover, VouchError, Witness, PROOF_VALIDITY_SECS,
};
use vouch_ledger::{LedgerConfig, LedgerService, LocalLedger, MemorySubmissionStore, TxState};
use vouch_prover::{Ed25519Wallet, PipelineConfig, ProofPipeline, StatusTracker, TrackOutcome, TrackerConfig};

const NOW: i64 = 1_700_000_000;

struct FixedNullifierProver;

#[async_trait]
impl Prover for FixedNullifierProver {
    async fn prove(&self, request: &ProveRequest) -> Result<Value, VouchError> {
        Ok(json!({
            "proof": "0x5afe",
            "publicInputs": [request.public_inputs.threshold.to_string()],
            "publicOutputs": {
                "nullifier": "b".repeat(64),
                "timestamp": NOW,
                "expiresAt": NOW + PROOF_VALIDITY_SECS
            }
        }))
    }
}

fn witness() -> Witness {
    Witness {
        income: 5000.0,
        employment_months: 12,
        employer_hash: "a".repeat(64),
        assets: 50000.0,
        liabilities: 10000.0,
        credit_score: 720.0,
        ssn_verified: true,
        selfie_verified: true,
        document_verified: true,
        timestamp: 1_234_567_890_000,
    }
}

struct Setup {
    clock: Arc<ManualClock>,
    ledger: Arc<LocalLedger>,
    service: Arc<LedgerService>,
    pipeline: ProofPipeline,
}

fn setup() -> Setup {
    let clock = Arc::new(ManualClock::at_secs(NOW));
    let ledger = Arc::new(LocalLedger::new());
    let service = Arc::new(LedgerService::new(
        Arc::new(MemorySubmissionStore::new()),
        ledger.clone(),
        clock.clone(),
        LedgerConfig::default(),
    ));
    let pipeline = ProofPipeline::new(
        Arc::new(FixedNullifierProver),
        Arc::new(Ed25519Wallet::new(Keypair::generate())),
        service.clone(),
        PipelineConfig::default(),
    );
    Setup {
        clock,
        ledger,
        service,
        pipeline,
    }
}

#[tokio::test(start_paused = true)]
async fn submitted_proof_confirms_with_thirty_day_window() {
    let s = setup();

    let receipt = s
        .pipeline
        .generate_and_submit(Circuit::Income, &witness(), 5000.0)
        .await
        .unwrap();
    assert_eq!(receipt.status, ProofStatus::Pending);

    let tracker = StatusTracker::new(s.service.clone(), s.clock.clone(), TrackerConfig::default()).unwrap();
    let handle = tracker.spawn(receipt.proof_id.clone());

    // A few polls see the proof pending.
    tokio::time::sleep(Duration::from_secs(7)).await;
    assert!(!handle.is_finished());

    s.clock.advance_secs(30);
    s.ledger
        .settle(&receipt.tx_hash, TxState::Confirmed)
        .await
        .unwrap();
    let report = s.service.sync_pending().await.unwrap();
    assert_eq!(report.confirmed, 1);

    let submission = match handle.wait().await.unwrap() {
        TrackOutcome::Confirmed(submission) => submission,
        other => panic!("expected confirmation, got {:?}", other),
    };
    let confirmed_at = submission.confirmed_at.unwrap();
    assert_eq!(confirmed_at, NOW + 30);
    assert_eq!(submission.expires_at - confirmed_at, 2_592_000);
    assert!(tracker.remaining_validity(&submission).is_some());

    // Status stays terminal on repeated queries.
    let again = tracker.poll_once(&receipt.proof_id).await.unwrap();
    assert_eq!(again, submission);
}

#[tokio::test]
async fn second_submission_of_same_nullifier_is_replay() {
    let s = setup();
    let first = s
        .pipeline
        .generate_and_submit(Circuit::Income, &witness(), 5000.0)
        .await
        .unwrap();

    let err = s
        .pipeline
        .generate_and_submit(Circuit::Income, &witness(), 5000.0)
        .await
        .unwrap_err();
    assert!(matches!(err, VouchError::ReplayDetected { ref nullifier } if *nullifier == "b".repeat(64)));

    let original = s.service.status(&first.proof_id).await.unwrap();
    assert_eq!(original.status, ProofStatus::Pending);
    assert_eq!(original.tx_hash.as_deref(), Some(first.tx_hash.as_str()));
}
