// crates/vouch-cli/src/commands/status.rs
//
// `vouch status <proof-id> [--wait]`: one status query, or follow the proof
// until it settles.

use std::sync::Arc;

use vouch_core::{LedgerBackend, ProofSubmission, SystemClock};
use vouch_prover::{HttpLedgerClient, StatusTracker, TrackOutcome};

use super::Context;
use crate::output::{emit, SubmissionRow};

pub async fn run(ctx: &Context, proof_id: &str, wait: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ledger: Arc<dyn LedgerBackend> = Arc::new(HttpLedgerClient::new(ctx.config.ledger.clone()));
    if wait {
        follow(ctx, ledger, proof_id).await
    } else {
        let submission = ledger.status(proof_id).await?;
        print_submission(ctx, &submission);
        Ok(())
    }
}

/// Track `proof_id` until it settles, the deadline passes, or Ctrl-C.
pub async fn follow(
    ctx: &Context,
    ledger: Arc<dyn LedgerBackend>,
    proof_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = StatusTracker::new(ledger, Arc::new(SystemClock), ctx.config.tracker.clone())?;
    eprintln!("Waiting for {} to settle (Ctrl-C to stop)...", proof_id);

    // Dropping the handle on Ctrl-C aborts the polling task.
    let outcome = tokio::select! {
        outcome = tracker.spawn(proof_id).wait() => outcome?,
        _ = tokio::signal::ctrl_c() => TrackOutcome::Cancelled,
    };

    match outcome {
        TrackOutcome::Confirmed(submission) => {
            print_submission(ctx, &submission);
            if tracker.is_expiring_soon(&submission) {
                eprintln!("Note: this proof expires soon.");
            }
            Ok(())
        }
        TrackOutcome::Failed(submission) => {
            print_submission(ctx, &submission);
            Err(format!("proof {} failed", submission.proof_id).into())
        }
        TrackOutcome::StillPending { last } => {
            if let Some(submission) = last {
                print_submission(ctx, &submission);
            }
            Err(format!("proof {} still pending; check again with `vouch status`", proof_id).into())
        }
        TrackOutcome::Cancelled => {
            eprintln!("Stopped tracking {}", proof_id);
            Ok(())
        }
    }
}

fn print_submission(ctx: &Context, submission: &ProofSubmission) {
    emit(ctx.format, submission, &[SubmissionRow::from(submission)]);
}
