// crates/vouch-prover/src/tracker.rs
//
// StatusTracker: polls a submitted proof until it settles or time runs out.
//
// A single task owns both the poll interval and the overall deadline, so
// cancelling that one task stops every timer at once. Running out of time
// is reported as `StillPending`, not as a failure: confirmation may simply
// be slow, and the caller can resume tracking later.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use vouch_core::{Clock, LedgerBackend, ProofStatus, ProofSubmission, VouchError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_overall_timeout_ms")]
    pub overall_timeout_ms: u64,
    /// Confirmed proofs with less validity left than this are "expiring soon".
    #[serde(default = "default_expiring_soon_secs")]
    pub expiring_soon_secs: i64,
}

fn default_poll_interval_ms() -> u64 {
    3_000
}

fn default_overall_timeout_ms() -> u64 {
    120_000
}

fn default_expiring_soon_secs() -> i64 {
    7 * 24 * 60 * 60
}

impl TrackerConfig {
    /// Both timers must be non-zero; a zero period would panic in the poll loop.
    pub fn validate(&self) -> Result<(), VouchError> {
        if self.poll_interval_ms == 0 {
            return Err(VouchError::Validation(
                "tracker.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.overall_timeout_ms == 0 {
            return Err(VouchError::Validation(
                "tracker.overall_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            overall_timeout_ms: default_overall_timeout_ms(),
            expiring_soon_secs: default_expiring_soon_secs(),
        }
    }
}

/// How tracking ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    Confirmed(ProofSubmission),
    Failed(ProofSubmission),
    /// The deadline passed before a terminal state was observed.
    StillPending { last: Option<ProofSubmission> },
    /// The tracking task was cancelled.
    Cancelled,
}

#[derive(Clone)]
pub struct StatusTracker {
    ledger: Arc<dyn LedgerBackend>,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
}

impl StatusTracker {
    pub fn new(
        ledger: Arc<dyn LedgerBackend>,
        clock: Arc<dyn Clock>,
        config: TrackerConfig,
    ) -> Result<Self, VouchError> {
        config.validate()?;
        Ok(Self {
            ledger,
            clock,
            config,
        })
    }

    /// Single side-effect-free status query.
    pub async fn poll_once(&self, proof_id: &str) -> Result<ProofSubmission, VouchError> {
        self.ledger.status(proof_id).await
    }

    /// Poll now and then every interval until a terminal state or the deadline.
    ///
    /// An unknown proof id ends tracking with `NotFound`. Any other poll
    /// error is logged and polling continues.
    pub async fn track(&self, proof_id: &str) -> Result<TrackOutcome, VouchError> {
        let deadline = Instant::now() + Duration::from_millis(self.config.overall_timeout_ms);
        let mut interval = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = None;

        tracing::debug!("Tracking proof {}", proof_id);

        loop {
            tokio::select! {
                biased;
                _ = tokio::time::sleep_until(deadline) => {
                    tracing::info!("Proof {} still pending after {} ms", proof_id, self.config.overall_timeout_ms);
                    return Ok(TrackOutcome::StillPending { last });
                }
                _ = interval.tick() => {}
            }

            // The poll itself must not outlive the deadline either.
            let polled = match tokio::time::timeout_at(deadline, self.ledger.status(proof_id)).await {
                Ok(polled) => polled,
                Err(_) => continue,
            };

            match polled {
                Ok(submission) => match submission.status {
                    ProofStatus::Confirmed => {
                        tracing::info!("Proof {} confirmed", proof_id);
                        return Ok(TrackOutcome::Confirmed(submission));
                    }
                    ProofStatus::Failed => {
                        tracing::info!("Proof {} failed", proof_id);
                        return Ok(TrackOutcome::Failed(submission));
                    }
                    ProofStatus::Pending => {
                        tracing::trace!("Proof {} pending", proof_id);
                        last = Some(submission);
                    }
                },
                Err(e) if e.is_not_found() => return Err(e),
                Err(e) => tracing::warn!("Status poll for {} failed: {}", proof_id, e),
            }
        }
    }

    /// Track in a background task.
    pub fn spawn(&self, proof_id: impl Into<String>) -> TrackingHandle {
        let tracker = self.clone();
        let proof_id = proof_id.into();
        TrackingHandle {
            task: Some(tokio::spawn(async move { tracker.track(&proof_id).await })),
        }
    }

    /// Seconds of validity left, or `None` if not confirmed or expired.
    pub fn remaining_validity(&self, submission: &ProofSubmission) -> Option<i64> {
        submission.remaining_validity(self.clock.now_secs())
    }

    pub fn is_expiring_soon(&self, submission: &ProofSubmission) -> bool {
        submission.is_expiring_soon(self.clock.now_secs(), self.config.expiring_soon_secs)
    }
}

/// Owner of a background tracking task. Dropping the handle cancels it.
pub struct TrackingHandle {
    task: Option<JoinHandle<Result<TrackOutcome, VouchError>>>,
}

impl TrackingHandle {
    /// Stop tracking. No poll is issued after this returns.
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the outcome. A cancelled task yields `Cancelled`.
    pub async fn wait(mut self) -> Result<TrackOutcome, VouchError> {
        let Some(task) = self.task.take() else {
            return Ok(TrackOutcome::Cancelled);
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(TrackOutcome::Cancelled),
            Err(e) => Err(VouchError::InvalidState(format!("Tracking task panicked: {}", e))),
        }
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;
    use vouch_core::api::{SubmissionReceipt, SubmitProofRequest};
    use vouch_core::{ManualClock, PROOF_VALIDITY_SECS};

    const NOW: i64 = 1_700_000_000;

    /// Ledger that replays a script of poll results, then stays pending.
    #[derive(Default)]
    struct ScriptedLedger {
        script: Mutex<VecDeque<Result<ProofStatus, VouchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedLedger {
        fn with(script: Vec<Result<ProofStatus, VouchError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn submission(status: ProofStatus) -> ProofSubmission {
        let mut s = ProofSubmission {
            proof_id: "proof-1".to_string(),
            nullifier: "b".repeat(64),
            tx_hash: Some("0xabc".to_string()),
            threshold: 5000.0,
            status: ProofStatus::Pending,
            submitted_at: NOW,
            confirmed_at: None,
            expires_at: NOW + PROOF_VALIDITY_SECS,
            user_did: "did:vouch:ab".to_string(),
            failure_reason: None,
        };
        match status {
            ProofStatus::Confirmed => s.confirm(NOW + 10, PROOF_VALIDITY_SECS).unwrap(),
            ProofStatus::Failed => s.fail("reverted").unwrap(),
            ProofStatus::Pending => {}
        }
        s
    }

    #[async_trait]
    impl LedgerBackend for ScriptedLedger {
        async fn submit(&self, _request: &SubmitProofRequest) -> Result<SubmissionReceipt, VouchError> {
            Err(VouchError::SubmissionRejected("read-only".to_string()))
        }

        async fn status(&self, _proof_id: &str) -> Result<ProofSubmission, VouchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().await.pop_front();
            match next {
                Some(Ok(status)) => Ok(submission(status)),
                Some(Err(e)) => Err(e),
                None => Ok(submission(ProofStatus::Pending)),
            }
        }
    }

    fn tracker(ledger: Arc<ScriptedLedger>) -> StatusTracker {
        StatusTracker::new(
            ledger,
            Arc::new(ManualClock::at_secs(NOW)),
            TrackerConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_first_confirmation() {
        let ledger = ScriptedLedger::with(vec![
            Ok(ProofStatus::Pending),
            Ok(ProofStatus::Pending),
            Ok(ProofStatus::Confirmed),
        ]);
        let t = tracker(ledger.clone());

        let outcome = t.track("proof-1").await.unwrap();
        assert!(matches!(outcome, TrackOutcome::Confirmed(ref s) if s.confirmed_at.is_some()));
        assert_eq!(ledger.calls(), 3);

        // No poll fires once tracking is over.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ledger.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_is_terminal() {
        let ledger = ScriptedLedger::with(vec![Ok(ProofStatus::Failed)]);
        let outcome = tracker(ledger.clone()).track("proof-1").await.unwrap();
        assert!(matches!(outcome, TrackOutcome::Failed(_)));
        assert_eq!(ledger.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_reports_still_pending() {
        let ledger = ScriptedLedger::with(vec![]);
        let started = Instant::now();

        let outcome = tracker(ledger.clone()).track("proof-1").await.unwrap();
        assert!(matches!(outcome, TrackOutcome::StillPending { last: Some(_) }));
        assert_eq!(started.elapsed(), Duration::from_millis(120_000));
        assert!(ledger.calls() >= 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_keep_polling() {
        let ledger = ScriptedLedger::with(vec![
            Err(VouchError::Network("reset".to_string())),
            Err(VouchError::Timeout("slow".to_string())),
            Ok(ProofStatus::Confirmed),
        ]);
        let outcome = tracker(ledger).track("proof-1").await.unwrap();
        assert!(matches!(outcome, TrackOutcome::Confirmed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_proof_ends_tracking() {
        let ledger = ScriptedLedger::with(vec![Err(VouchError::NotFound("proof-1".to_string()))]);
        let err = tracker(ledger.clone()).track("proof-1").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(ledger.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling() {
        let ledger = ScriptedLedger::with(vec![]);
        let handle = tracker(ledger.clone()).spawn("proof-1");

        tokio::time::sleep(Duration::from_millis(4_500)).await;
        assert_eq!(ledger.calls(), 2);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ledger.calls(), 2);
        assert_eq!(handle.wait().await.unwrap(), TrackOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels() {
        let ledger = ScriptedLedger::with(vec![]);
        let handle = tracker(ledger.clone()).spawn("proof-1");

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        drop(handle);
        let seen = ledger.calls();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ledger.calls(), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_outcome() {
        let ledger = ScriptedLedger::with(vec![Ok(ProofStatus::Pending), Ok(ProofStatus::Confirmed)]);
        let handle = tracker(ledger).spawn("proof-1");
        assert!(matches!(handle.wait().await.unwrap(), TrackOutcome::Confirmed(_)));
    }

    #[test]
    fn test_expiry_helpers() {
        let clock = Arc::new(ManualClock::at_secs(NOW + 10));
        let t = StatusTracker::new(ScriptedLedger::with(vec![]), clock.clone(), TrackerConfig::default())
            .unwrap();
        let confirmed = submission(ProofStatus::Confirmed);

        assert_eq!(t.remaining_validity(&confirmed), Some(PROOF_VALIDITY_SECS));
        assert!(!t.is_expiring_soon(&confirmed));

        clock.advance_secs(PROOF_VALIDITY_SECS - 3_600);
        assert!(t.is_expiring_soon(&confirmed));

        clock.advance_secs(3_600);
        assert_eq!(t.remaining_validity(&confirmed), None);
        assert!(!t.is_expiring_soon(&submission(ProofStatus::Pending)));
    }

    #[test]
    fn test_zero_timers_rejected() {
        let clock = Arc::new(ManualClock::at_secs(NOW));
        let config: TrackerConfig =
            serde_json::from_str(r#"{"poll_interval_ms": 0, "overall_timeout_ms": 1000}"#).unwrap();
        let err = StatusTracker::new(ScriptedLedger::with(vec![]), clock.clone(), config)
            .err()
            .unwrap();
        assert!(matches!(err, VouchError::Validation(_)));

        let config = TrackerConfig {
            overall_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(VouchError::Validation(_))));
        assert!(TrackerConfig::default().validate().is_ok());
    }
}
