// crates/vouch-store/src/cipher.rs
//
// WitnessCipher: authenticated encryption of witness payloads.
//
// Key:   Argon2id(owner key material, random 16-byte salt) -> 32 bytes
// AEAD:  ChaCha20-Poly1305 with a fresh random 12-byte nonce per write
// AAD:   record id, owner id, timestamp and witness hash, so a ciphertext
//        cannot be replayed under another record's metadata
//
// Salt, nonce and ciphertext are stored base64-encoded next to the scheme
// parameters. Decryption always uses the parameters recorded on the record,
// never the current defaults.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use vouch_core::{EncryptionScheme, OwnerIdentity, StoredWitness, VouchError};

pub const SCHEME_VERSION: u32 = 1;
pub const CIPHER_ALGORITHM: &str = "chacha20poly1305";
pub const KDF_ALGORITHM: &str = "argon2id";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Argon2id cost parameters used for new records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_memory_kib() -> u32 {
    19 * 1024
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

impl KdfParams {
    fn to_argon2(self) -> Result<Params, VouchError> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|e| VouchError::Crypto(format!("Invalid KDF parameters: {}", e)))
    }

    fn scheme(self) -> EncryptionScheme {
        EncryptionScheme {
            version: SCHEME_VERSION,
            cipher: CIPHER_ALGORITHM.to_string(),
            kdf: KDF_ALGORITHM.to_string(),
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }
}

/// Output of [`WitnessCipher::seal`], all binary fields base64-encoded.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub ciphertext: String,
    pub iv: String,
    pub salt: String,
    pub scheme: EncryptionScheme,
}

/// Encrypts and decrypts witness payloads for a given owner.
#[derive(Debug, Clone)]
pub struct WitnessCipher {
    params: KdfParams,
}

impl WitnessCipher {
    pub fn new(params: KdfParams) -> Result<Self, VouchError> {
        params.to_argon2()?;
        Ok(Self { params })
    }

    /// Encrypt `plaintext` for `owner`, binding it to `aad`.
    pub fn seal(
        &self,
        owner: &OwnerIdentity,
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Sealed, VouchError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let key = derive_key(owner, &salt, &self.params.to_argon2()?)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_ref()));
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|e| VouchError::Crypto(format!("Encryption failed: {}", e)))?;

        Ok(Sealed {
            ciphertext: BASE64.encode(ciphertext),
            iv: BASE64.encode(nonce),
            salt: BASE64.encode(salt),
            scheme: self.params.scheme(),
        })
    }

    /// Decrypt a stored record for `owner`.
    ///
    /// Any tampering with ciphertext, nonce, salt or associated data, as well
    /// as a key derived for a different owner, fails with `Integrity`.
    pub fn open(
        &self,
        owner: &OwnerIdentity,
        aad: &[u8],
        record: &StoredWitness,
    ) -> Result<Zeroizing<Vec<u8>>, VouchError> {
        let scheme = &record.scheme;
        if scheme.version != SCHEME_VERSION
            || scheme.cipher != CIPHER_ALGORITHM
            || scheme.kdf != KDF_ALGORITHM
        {
            return Err(VouchError::Crypto(format!(
                "Unsupported encryption scheme v{} ({}/{})",
                scheme.version, scheme.cipher, scheme.kdf
            )));
        }

        let salt = decode_fixed::<SALT_LEN>("salt", &record.salt)?;
        let nonce = decode_fixed::<NONCE_LEN>("iv", &record.iv)?;
        let ciphertext = BASE64
            .decode(&record.encrypted_payload)
            .map_err(|e| VouchError::Integrity(format!("Invalid ciphertext encoding: {}", e)))?;

        let params = KdfParams {
            memory_kib: scheme.memory_kib,
            iterations: scheme.iterations,
            parallelism: scheme.parallelism,
        }
        .to_argon2()?;
        let key = derive_key(owner, &salt, &params)?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_ref()));
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: ciphertext.as_ref(),
                    aad,
                },
            )
            .map_err(|_| VouchError::Integrity("Witness authentication failed".to_string()))?;

        Ok(Zeroizing::new(plaintext))
    }
}

fn derive_key(
    owner: &OwnerIdentity,
    salt: &[u8; SALT_LEN],
    params: &Params,
) -> Result<Zeroizing<[u8; KEY_LEN]>, VouchError> {
    let material = Zeroizing::new(owner.key_material());
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
        .hash_password_into(material.as_ref(), salt, key.as_mut())
        .map_err(|e| VouchError::Crypto(format!("Key derivation failed: {}", e)))?;
    Ok(key)
}

fn decode_fixed<const N: usize>(field: &str, encoded: &str) -> Result<[u8; N], VouchError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| VouchError::Integrity(format!("Invalid {} encoding: {}", field, e)))?;
    bytes.as_slice().try_into().map_err(|_| {
        VouchError::Integrity(format!(
            "Invalid {} length: expected {}, found {}",
            field,
            N,
            bytes.len()
        ))
    })
}
