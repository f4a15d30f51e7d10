// crates/vouch-core/src/store.rs
//
// Persisted shape of a locally stored witness. This is the one bit-exact
// persisted format: records written by older builds must stay decryptable,
// so the encryption scheme travels with every record.

use serde::{Deserialize, Serialize};

use crate::hash::WitnessHash;

/// Encryption scheme and key-derivation parameters used for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionScheme {
    /// Scheme version. Bumped whenever the cipher or KDF changes.
    pub version: u32,
    /// AEAD algorithm name (e.g., "chacha20poly1305").
    pub cipher: String,
    /// KDF algorithm name (e.g., "argon2id").
    pub kdf: String,
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

/// An encrypted witness at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredWitness {
    /// Opaque unique id, prefixed with the owner's user id.
    pub id: String,
    /// Ownership key, checked before any decryption attempt.
    pub user_id: String,
    /// Base64 ciphertext (including the AEAD tag) of the serialized witness.
    pub encrypted_payload: String,
    /// Base64 nonce.
    pub iv: String,
    /// Base64 key-derivation salt.
    pub salt: String,
    /// Copied from the witness (Unix ms); drives "latest" queries.
    pub timestamp: u64,
    /// Witness hash, checkable without decryption.
    pub hash: WitnessHash,
    pub scheme: EncryptionScheme,
}

/// Secondary indexes every `WitnessKv` backend maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexField {
    UserId,
    Hash,
}

impl IndexField {
    /// Short tag used in backend index keys.
    pub fn tag(&self) -> &'static str {
        match self {
            IndexField::UserId => "owner",
            IndexField::Hash => "hash",
        }
    }

    /// The value of this field on a record.
    pub fn value_of<'a>(&self, record: &'a StoredWitness) -> &'a str {
        match self {
            IndexField::UserId => &record.user_id,
            IndexField::Hash => record.hash.as_str(),
        }
    }
}

/// Metadata-only view of a stored witness (no decryption needed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredWitnessSummary {
    pub id: String,
    pub timestamp: u64,
    pub hash: WitnessHash,
}

impl From<&StoredWitness> for StoredWitnessSummary {
    fn from(record: &StoredWitness) -> Self {
        Self {
            id: record.id.clone(),
            timestamp: record.timestamp,
            hash: record.hash.clone(),
        }
    }
}
