// crates/vouch-store/src/memory.rs
//
// In-memory `WitnessKv` for tests and ephemeral sessions.
// Index queries scan the map; per-user record counts stay small.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use vouch_core::{IndexField, StoredWitness, VouchError, WitnessKv};

#[derive(Debug, Default)]
pub struct MemoryWitnessKv {
    records: RwLock<HashMap<String, StoredWitness>>,
}

impl MemoryWitnessKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> VouchError {
    VouchError::Storage("Witness map lock poisoned".to_string())
}

#[async_trait]
impl WitnessKv for MemoryWitnessKv {
    async fn put(&self, record: &StoredWitness) -> Result<(), VouchError> {
        self.records
            .write()
            .map_err(|_| poisoned())?
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredWitness>, VouchError> {
        Ok(self.records.read().map_err(|_| poisoned())?.get(id).cloned())
    }

    async fn query_by_index(
        &self,
        field: IndexField,
        value: &str,
    ) -> Result<Vec<StoredWitness>, VouchError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records
            .values()
            .filter(|r| field.value_of(r) == value)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<(), VouchError> {
        self.records.write().map_err(|_| poisoned())?.remove(id);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use vouch_core::{EncryptionScheme, WitnessHash};

    pub(crate) fn sample_record(user: &str, id: &str, timestamp: u64, hash_char: char) -> StoredWitness {
        StoredWitness {
            id: id.to_string(),
            user_id: user.to_string(),
            encrypted_payload: "AAAA".to_string(),
            iv: "AAAA".to_string(),
            salt: "AAAA".to_string(),
            timestamp,
            hash: WitnessHash::parse(&hash_char.to_string().repeat(64)).unwrap(),
            scheme: EncryptionScheme {
                version: 1,
                cipher: "chacha20poly1305".to_string(),
                kdf: "argon2id".to_string(),
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
            },
        }
    }

    #[tokio::test]
    async fn test_query_by_owner_and_hash() {
        let kv = MemoryWitnessKv::new();
        kv.put(&sample_record("alice", "alice:1", 1, 'a')).await.unwrap();
        kv.put(&sample_record("alice", "alice:2", 2, 'b')).await.unwrap();
        kv.put(&sample_record("bob", "bob:1", 3, 'a')).await.unwrap();

        assert_eq!(kv.len(), 3);
        assert_eq!(
            kv.query_by_index(IndexField::UserId, "alice").await.unwrap().len(),
            2
        );
        assert_eq!(
            kv.query_by_index(IndexField::Hash, &"a".repeat(64))
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let kv = MemoryWitnessKv::new();
        kv.delete("nope").await.unwrap();
        assert!(kv.is_empty());
    }
}
