// crates/vouch-store/src/encrypted.rs
//
// EncryptedWitnessStore: per-user witness persistence, encrypted at rest.
//
// Records are append-only. Storing a witness always inserts a new record;
// "latest" is the record with the greatest witness timestamp. Ownership is
// checked on the plaintext `user_id` before any key derivation happens, and
// every decrypted witness is re-hashed against the stored hash.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use vouch_core::{
    hash_witness, IndexField, OwnerIdentity, StoredWitness, StoredWitnessSummary, VouchError,
    Witness, WitnessHash, WitnessKv,
};

use crate::cipher::{KdfParams, WitnessCipher};

/// Configuration for the local encrypted store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Argon2id parameters for newly written records.
    #[serde(default)]
    pub kdf: KdfParams,
}

pub struct EncryptedWitnessStore {
    kv: Arc<dyn WitnessKv>,
    cipher: WitnessCipher,
}

impl EncryptedWitnessStore {
    pub fn new(kv: Arc<dyn WitnessKv>, config: StoreConfig) -> Result<Self, VouchError> {
        Ok(Self {
            kv,
            cipher: WitnessCipher::new(config.kdf)?,
        })
    }

    /// Encrypt and persist `witness` for `owner`. Returns the new record id.
    pub async fn store(&self, witness: &Witness, owner: &OwnerIdentity) -> Result<String, VouchError> {
        let hash = hash_witness(witness)?;
        let id = format!("{}:{}", owner.user_id, Uuid::now_v7());
        let aad = associated_data(&id, &owner.user_id, witness.timestamp, &hash);
        let plaintext = Zeroizing::new(serde_json::to_vec(witness)?);

        let cipher = self.cipher.clone();
        let key_owner = owner.clone();
        let sealed = tokio::task::spawn_blocking(move || cipher.seal(&key_owner, &aad, &plaintext))
            .await
            .map_err(|e| VouchError::Crypto(format!("Encryption task failed: {}", e)))??;

        let record = StoredWitness {
            id: id.clone(),
            user_id: owner.user_id.clone(),
            encrypted_payload: sealed.ciphertext,
            iv: sealed.iv,
            salt: sealed.salt,
            timestamp: witness.timestamp,
            hash,
            scheme: sealed.scheme,
        };
        self.kv.put(&record).await?;

        tracing::info!("Stored witness {} ({})", record.id, record.hash);
        Ok(id)
    }

    /// Decrypt a record owned by `owner`.
    pub async fn retrieve(&self, id: &str, owner: &OwnerIdentity) -> Result<Witness, VouchError> {
        let record = self
            .kv
            .get(id)
            .await?
            .ok_or_else(|| VouchError::NotFound(format!("Witness {} not found", id)))?;

        if record.user_id != owner.user_id {
            tracing::warn!("Rejected access to witness {} by user {}", id, owner.user_id);
            return Err(VouchError::Unauthorized(
                "Witness is not owned by the requesting user".to_string(),
            ));
        }

        self.open(record, owner).await
    }

    /// Decrypt the owner's most recent witness (greatest timestamp).
    pub async fn get_latest(&self, owner: &OwnerIdentity) -> Result<Witness, VouchError> {
        let records = self
            .kv
            .query_by_index(IndexField::UserId, &owner.user_id)
            .await?;

        // Ids carry a v7 uuid, so they break timestamp ties by insertion order.
        let latest = records
            .into_iter()
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)))
            .ok_or_else(|| {
                VouchError::NotFound(format!("No stored witness for user {}", owner.user_id))
            })?;

        self.open(latest, owner).await
    }

    /// Delete one record. Deleting a missing record is not an error.
    pub async fn delete(&self, id: &str) -> Result<(), VouchError> {
        self.kv.delete(id).await?;
        tracing::info!("Deleted witness {}", id);
        Ok(())
    }

    /// Delete every record owned by `user_id`, returning how many were removed.
    pub async fn delete_all(&self, user_id: &str) -> Result<usize, VouchError> {
        let records = self.kv.query_by_index(IndexField::UserId, user_id).await?;
        for record in &records {
            self.kv.delete(&record.id).await?;
        }
        tracing::info!("Deleted {} witnesses for user {}", records.len(), user_id);
        Ok(records.len())
    }

    pub async fn has_any(&self, user_id: &str) -> Result<bool, VouchError> {
        Ok(!self
            .kv
            .query_by_index(IndexField::UserId, user_id)
            .await?
            .is_empty())
    }

    /// Metadata of a user's records, newest first. Nothing is decrypted.
    pub async fn list(&self, user_id: &str) -> Result<Vec<StoredWitnessSummary>, VouchError> {
        let mut summaries: Vec<StoredWitnessSummary> = self
            .kv
            .query_by_index(IndexField::UserId, user_id)
            .await?
            .iter()
            .map(StoredWitnessSummary::from)
            .collect();
        summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        Ok(summaries)
    }

    /// Ids of the user's records whose witness hashes to `hash`.
    pub async fn find_by_hash(
        &self,
        user_id: &str,
        hash: &WitnessHash,
    ) -> Result<Vec<String>, VouchError> {
        Ok(self
            .kv
            .query_by_index(IndexField::Hash, hash.as_str())
            .await?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.id)
            .collect())
    }

    async fn open(&self, record: StoredWitness, owner: &OwnerIdentity) -> Result<Witness, VouchError> {
        let aad = associated_data(&record.id, &record.user_id, record.timestamp, &record.hash);
        let cipher = self.cipher.clone();
        let key_owner = owner.clone();
        let (record, plaintext) = tokio::task::spawn_blocking(move || {
            cipher
                .open(&key_owner, &aad, &record)
                .map(|plaintext| (record, plaintext))
        })
        .await
        .map_err(|e| VouchError::Crypto(format!("Decryption task failed: {}", e)))??;

        let witness: Witness = serde_json::from_slice(&plaintext).map_err(|e| {
            VouchError::Integrity(format!("Decrypted witness {} is malformed: {}", record.id, e))
        })?;

        let recomputed = hash_witness(&witness)?;
        if recomputed != record.hash {
            tracing::warn!("Hash mismatch on witness {}", record.id);
            return Err(VouchError::Integrity(format!(
                "Witness {} does not match its stored hash",
                record.id
            )));
        }

        Ok(witness)
    }
}

fn associated_data(id: &str, user_id: &str, timestamp: u64, hash: &WitnessHash) -> Vec<u8> {
    format!("vouch-witness-v1|{}|{}|{}|{}", id, user_id, timestamp, hash).into_bytes()
}
