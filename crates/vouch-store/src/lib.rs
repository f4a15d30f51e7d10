// crates/vouch-store/src/lib.rs
//
// vouch-store: Local encrypted witness storage for Vouch.
//
// Modules:
//   - cipher:    Argon2id key derivation + ChaCha20-Poly1305 sealing
//   - encrypted: EncryptedWitnessStore, the per-user append-only store
//   - memory:    in-memory WitnessKv backend
//   - rocks:     RocksDB WitnessKv backend and the shared RocksDb handle

pub mod cipher;
pub mod encrypted;
pub mod memory;
pub mod rocks;

pub use cipher::{KdfParams, WitnessCipher};
pub use encrypted::{EncryptedWitnessStore, StoreConfig};
pub use memory::MemoryWitnessKv;
pub use rocks::{RocksDb, RocksWitnessKv};
