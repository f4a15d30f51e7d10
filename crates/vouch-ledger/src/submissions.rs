// crates/vouch-ledger/src/submissions.rs
//
// Submission registry. Nullifier uniqueness is enforced here, inside the
// storage layer, so two concurrent submissions of the same nullifier can
// never both be accepted regardless of how many service instances race.
//
// RocksDB key format:
//   - Primary:   `submission:{proof_id}` -> JSON-serialized ProofSubmission
//   - Unique:    `nullifier:{nullifier}` -> proof_id
//   - Secondary: `status:{status}:{proof_id}` -> empty value
//   - Secondary: `did:{user_did}:{proof_id}` -> empty value

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::WriteBatch;
use tokio::sync::{Mutex, RwLock};

use vouch_core::{ProofStatus, ProofSubmission, VouchError};
use vouch_store::RocksDb;

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Insert a new submission, failing with `ReplayDetected` if its
    /// nullifier is already registered. The existing row is left untouched.
    async fn insert_unique(&self, submission: &ProofSubmission) -> Result<(), VouchError>;

    async fn get(&self, proof_id: &str) -> Result<Option<ProofSubmission>, VouchError>;

    async fn get_by_nullifier(&self, nullifier: &str) -> Result<Option<ProofSubmission>, VouchError>;

    /// Replace an existing submission, but only while its stored status is
    /// still `expected`. The check and the write happen under one lock.
    /// Fails with `NotFound` if absent and `InvalidState` on a status mismatch.
    async fn transition(
        &self,
        expected: ProofStatus,
        next: &ProofSubmission,
    ) -> Result<(), VouchError>;

    /// Remove a submission and release its nullifier.
    async fn remove(&self, proof_id: &str) -> Result<(), VouchError>;

    async fn list_by_status(&self, status: ProofStatus) -> Result<Vec<ProofSubmission>, VouchError>;

    async fn list_by_did(&self, user_did: &str) -> Result<Vec<ProofSubmission>, VouchError>;
}

fn check_expected(existing: &ProofSubmission, expected: ProofStatus) -> Result<(), VouchError> {
    if existing.status == expected {
        Ok(())
    } else {
        Err(VouchError::InvalidState(format!(
            "Submission {} is {}, expected {}",
            existing.proof_id, existing.status, expected
        )))
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Registry {
    by_id: HashMap<String, ProofSubmission>,
    /// nullifier -> proof_id
    by_nullifier: HashMap<String, String>,
}

/// In-memory registry. One lock covers both maps.
#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    inner: RwLock<Registry>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn insert_unique(&self, submission: &ProofSubmission) -> Result<(), VouchError> {
        let mut registry = self.inner.write().await;
        if registry.by_nullifier.contains_key(&submission.nullifier) {
            return Err(VouchError::ReplayDetected {
                nullifier: submission.nullifier.clone(),
            });
        }
        registry
            .by_nullifier
            .insert(submission.nullifier.clone(), submission.proof_id.clone());
        registry
            .by_id
            .insert(submission.proof_id.clone(), submission.clone());
        Ok(())
    }

    async fn get(&self, proof_id: &str) -> Result<Option<ProofSubmission>, VouchError> {
        Ok(self.inner.read().await.by_id.get(proof_id).cloned())
    }

    async fn get_by_nullifier(&self, nullifier: &str) -> Result<Option<ProofSubmission>, VouchError> {
        let registry = self.inner.read().await;
        Ok(registry
            .by_nullifier
            .get(nullifier)
            .and_then(|id| registry.by_id.get(id))
            .cloned())
    }

    async fn transition(
        &self,
        expected: ProofStatus,
        next: &ProofSubmission,
    ) -> Result<(), VouchError> {
        let mut registry = self.inner.write().await;
        let existing = registry.by_id.get_mut(&next.proof_id).ok_or_else(|| {
            VouchError::NotFound(format!("Submission {} not found", next.proof_id))
        })?;
        check_expected(existing, expected)?;
        *existing = next.clone();
        Ok(())
    }

    async fn remove(&self, proof_id: &str) -> Result<(), VouchError> {
        let mut registry = self.inner.write().await;
        if let Some(removed) = registry.by_id.remove(proof_id) {
            registry.by_nullifier.remove(&removed.nullifier);
        }
        Ok(())
    }

    async fn list_by_status(&self, status: ProofStatus) -> Result<Vec<ProofSubmission>, VouchError> {
        Ok(self
            .inner
            .read()
            .await
            .by_id
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect())
    }

    async fn list_by_did(&self, user_did: &str) -> Result<Vec<ProofSubmission>, VouchError> {
        Ok(self
            .inner
            .read()
            .await
            .by_id
            .values()
            .filter(|s| s.user_did == user_did)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// RocksDB backend
// ---------------------------------------------------------------------------

/// RocksDB registry. Writers serialize on a lock so the nullifier check and
/// the batch insert happen as one step.
pub struct RocksSubmissionStore {
    db: Arc<RocksDb>,
    write_lock: Mutex<()>,
}

impl RocksSubmissionStore {
    pub fn open(path: &str) -> Result<Self, VouchError> {
        Ok(Self {
            db: Arc::new(RocksDb::open(path)?),
            write_lock: Mutex::new(()),
        })
    }

    fn submission_key(proof_id: &str) -> Vec<u8> {
        format!("submission:{}", proof_id).into_bytes()
    }

    fn nullifier_key(nullifier: &str) -> Vec<u8> {
        format!("nullifier:{}", nullifier).into_bytes()
    }

    fn status_key(status: ProofStatus, proof_id: &str) -> Vec<u8> {
        format!("status:{}:{}", status, proof_id).into_bytes()
    }

    fn did_key(user_did: &str, proof_id: &str) -> Vec<u8> {
        format!("did:{}:{}", user_did, proof_id).into_bytes()
    }

    fn read(&self, proof_id: &str) -> Result<Option<ProofSubmission>, VouchError> {
        match self.db.get_bytes(&Self::submission_key(proof_id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn list_prefix(&self, prefix: &str) -> Result<Vec<ProofSubmission>, VouchError> {
        let mut out = Vec::new();
        for proof_id in self.db.scan_suffixes(prefix)? {
            if let Some(submission) = self.read(&proof_id)? {
                out.push(submission);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl SubmissionStore for RocksSubmissionStore {
    async fn insert_unique(&self, submission: &ProofSubmission) -> Result<(), VouchError> {
        let _guard = self.write_lock.lock().await;

        if self
            .db
            .get_bytes(&Self::nullifier_key(&submission.nullifier))?
            .is_some()
        {
            return Err(VouchError::ReplayDetected {
                nullifier: submission.nullifier.clone(),
            });
        }

        let mut batch = WriteBatch::default();
        batch.put(
            Self::submission_key(&submission.proof_id),
            serde_json::to_vec(submission)?,
        );
        batch.put(
            Self::nullifier_key(&submission.nullifier),
            submission.proof_id.as_bytes(),
        );
        batch.put(Self::status_key(submission.status, &submission.proof_id), b"");
        batch.put(Self::did_key(&submission.user_did, &submission.proof_id), b"");
        self.db.write(batch)
    }

    async fn get(&self, proof_id: &str) -> Result<Option<ProofSubmission>, VouchError> {
        self.read(proof_id)
    }

    async fn get_by_nullifier(&self, nullifier: &str) -> Result<Option<ProofSubmission>, VouchError> {
        match self.db.get_bytes(&Self::nullifier_key(nullifier))? {
            Some(id) => {
                let proof_id = String::from_utf8(id)
                    .map_err(|e| VouchError::Storage(format!("Corrupt nullifier entry: {}", e)))?;
                self.read(&proof_id)
            }
            None => Ok(None),
        }
    }

    async fn transition(
        &self,
        expected: ProofStatus,
        next: &ProofSubmission,
    ) -> Result<(), VouchError> {
        let _guard = self.write_lock.lock().await;

        let existing = self.read(&next.proof_id)?.ok_or_else(|| {
            VouchError::NotFound(format!("Submission {} not found", next.proof_id))
        })?;
        check_expected(&existing, expected)?;

        let mut batch = WriteBatch::default();
        if existing.status != next.status {
            batch.delete(Self::status_key(existing.status, &next.proof_id));
            batch.put(Self::status_key(next.status, &next.proof_id), b"");
        }
        batch.put(Self::submission_key(&next.proof_id), serde_json::to_vec(next)?);
        self.db.write(batch)
    }

    async fn remove(&self, proof_id: &str) -> Result<(), VouchError> {
        let _guard = self.write_lock.lock().await;

        let Some(existing) = self.read(proof_id)? else {
            return Ok(());
        };
        let mut batch = WriteBatch::default();
        batch.delete(Self::submission_key(proof_id));
        batch.delete(Self::nullifier_key(&existing.nullifier));
        batch.delete(Self::status_key(existing.status, proof_id));
        batch.delete(Self::did_key(&existing.user_did, proof_id));
        self.db.write(batch)
    }

    async fn list_by_status(&self, status: ProofStatus) -> Result<Vec<ProofSubmission>, VouchError> {
        self.list_prefix(&format!("status:{}:", status))
    }

    async fn list_by_did(&self, user_did: &str) -> Result<Vec<ProofSubmission>, VouchError> {
        // DIDs contain ':', so a prefix can also match a longer DID.
        Ok(self
            .list_prefix(&format!("did:{}:", user_did))?
            .into_iter()
            .filter(|s| s.user_did == user_did)
            .collect())
    }
}
