// crates/vouch-store/src/rocks.rs
//
// RocksDB-backed persistent storage for encrypted witnesses.
//
// Key format:
//   - Primary:   `witness:{id}` -> JSON-serialized StoredWitness
//   - Secondary: `owner:{user_id}:{id}` -> empty value (index only)
//   - Secondary: `hash:{witness_hash}:{id}` -> empty value (index only)
//
// A record and its index entries are written in a single WriteBatch so a
// crash never leaves an index pointing at a half-written record.

use async_trait::async_trait;
use rocksdb::{DBWithThreadMode, MultiThreaded, Options, WriteBatch};

use vouch_core::{IndexField, StoredWitness, VouchError, WitnessKv};

/// Thin RocksDB handle with errors mapped to `VouchError::Storage`.
///
/// Shared by the witness store and the ledger's submission store.
#[derive(Debug)]
pub struct RocksDb {
    db: DBWithThreadMode<MultiThreaded>,
}

impl RocksDb {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, VouchError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path)
            .map_err(|e| VouchError::Storage(format!("Failed to open RocksDB at {}: {}", path, e)))?;

        Ok(Self { db })
    }

    pub fn get_bytes(&self, key: &[u8]) -> Result<Option<Vec<u8>>, VouchError> {
        self.db
            .get(key)
            .map_err(|e| VouchError::Storage(format!("RocksDB get failed: {}", e)))
    }

    pub fn put_bytes(&self, key: &[u8], value: &[u8]) -> Result<(), VouchError> {
        self.db
            .put(key, value)
            .map_err(|e| VouchError::Storage(format!("RocksDB put failed: {}", e)))
    }

    /// Apply a batch of writes atomically.
    pub fn write(&self, batch: WriteBatch) -> Result<(), VouchError> {
        self.db
            .write(batch)
            .map_err(|e| VouchError::Storage(format!("RocksDB batch write failed: {}", e)))
    }

    /// Return the key suffixes (after `prefix`) of every key starting with `prefix`.
    pub fn scan_suffixes(&self, prefix: &str) -> Result<Vec<String>, VouchError> {
        let prefix = prefix.as_bytes();
        let mut suffixes = Vec::new();

        for item in self.db.prefix_iterator(prefix) {
            let (key, _value) = item
                .map_err(|e| VouchError::Storage(format!("RocksDB iteration error: {}", e)))?;

            // Without a prefix extractor the iterator runs past the prefix.
            if !key.starts_with(prefix) {
                break;
            }

            if let Ok(suffix) = std::str::from_utf8(&key[prefix.len()..]) {
                suffixes.push(suffix.to_string());
            }
        }

        Ok(suffixes)
    }
}

/// RocksDB implementation of `WitnessKv`.
#[derive(Debug)]
pub struct RocksWitnessKv {
    db: RocksDb,
}

impl RocksWitnessKv {
    pub fn open(path: &str) -> Result<Self, VouchError> {
        Ok(Self {
            db: RocksDb::open(path)?,
        })
    }

    /// Build the primary key for a record: `witness:{id}`.
    fn record_key(id: &str) -> Vec<u8> {
        format!("witness:{}", id).into_bytes()
    }

    /// Build a secondary index key: `{tag}:{value}:{id}`.
    fn index_key(field: IndexField, value: &str, id: &str) -> Vec<u8> {
        format!("{}:{}:{}", field.tag(), value, id).into_bytes()
    }

    fn get_record(&self, id: &str) -> Result<Option<StoredWitness>, VouchError> {
        match self.db.get_bytes(&Self::record_key(id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn remove_indexes(batch: &mut WriteBatch, record: &StoredWitness) {
        for field in [IndexField::UserId, IndexField::Hash] {
            batch.delete(Self::index_key(field, field.value_of(record), &record.id));
        }
    }
}

#[async_trait]
impl WitnessKv for RocksWitnessKv {
    async fn put(&self, record: &StoredWitness) -> Result<(), VouchError> {
        let json = serde_json::to_vec(record)?;
        let mut batch = WriteBatch::default();

        // Overwrites drop the previous index entries; their values may differ.
        if let Some(existing) = self.get_record(&record.id)? {
            Self::remove_indexes(&mut batch, &existing);
        }

        batch.put(Self::record_key(&record.id), json);
        for field in [IndexField::UserId, IndexField::Hash] {
            // Empty value: existence is the signal.
            batch.put(Self::index_key(field, field.value_of(record), &record.id), b"");
        }
        self.db.write(batch)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredWitness>, VouchError> {
        self.get_record(id)
    }

    async fn query_by_index(
        &self,
        field: IndexField,
        value: &str,
    ) -> Result<Vec<StoredWitness>, VouchError> {
        let prefix = format!("{}:{}:", field.tag(), value);
        let mut records = Vec::new();

        for id in self.db.scan_suffixes(&prefix)? {
            if let Some(record) = self.get_record(&id)? {
                // Values containing ':' can share a prefix with longer values.
                if field.value_of(&record) == value {
                    records.push(record);
                }
            }
        }

        Ok(records)
    }

    async fn delete(&self, id: &str) -> Result<(), VouchError> {
        let Some(existing) = self.get_record(id)? else {
            return Ok(());
        };
        let mut batch = WriteBatch::default();
        Self::remove_indexes(&mut batch, &existing);
        batch.delete(Self::record_key(id));
        self.db.write(batch)
    }
}
