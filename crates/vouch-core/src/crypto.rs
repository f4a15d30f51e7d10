// crates/vouch-core/src/crypto.rs
//
// Wallet signatures. A wallet address is the hex-encoded ed25519 public
// key; signatures travel as hex as well.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::VouchError;

/// An ed25519 keypair for signing and verification.
pub struct Keypair {
    pub signing_key: SigningKey,
    pub verifying_key: VerifyingKey,
}

impl Keypair {
    /// Generate a new random ed25519 keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Keypair {
            signing_key,
            verifying_key,
        }
    }

    /// Rebuild a keypair from a hex-encoded 32-byte secret key.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, VouchError> {
        let bytes = hex::decode(secret_hex.trim())
            .map_err(|e| VouchError::Crypto(format!("Invalid secret key hex: {}", e)))?;
        let secret: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| VouchError::Crypto("Secret key must be exactly 32 bytes".to_string()))?;
        let signing_key = SigningKey::from_bytes(&secret);
        let verifying_key = signing_key.verifying_key();
        Ok(Keypair {
            signing_key,
            verifying_key,
        })
    }

    /// Wallet address: the public key as lowercase hex.
    pub fn address(&self) -> String {
        hex::encode(self.verifying_key.to_bytes())
    }

    /// Hex-encoded secret key, for writing key files.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Sign a message and return the signature as hex.
    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(self.signing_key.sign(message).to_bytes())
    }
}

/// Verify a hex ed25519 signature against a wallet address.
///
/// Returns `Ok(false)` for a well-formed but wrong signature and an error
/// when the address or signature cannot be decoded.
pub fn verify_signature(
    wallet_address: &str,
    message: &[u8],
    signature_hex: &str,
) -> Result<bool, VouchError> {
    let key_bytes = hex::decode(wallet_address)
        .map_err(|e| VouchError::Crypto(format!("Invalid wallet address: {}", e)))?;
    let key_array: [u8; 32] = key_bytes
        .as_slice()
        .try_into()
        .map_err(|_| VouchError::Crypto("Wallet address must be 32 bytes".to_string()))?;
    let verifying_key = VerifyingKey::from_bytes(&key_array)?;

    let sig_bytes = hex::decode(signature_hex)
        .map_err(|e| VouchError::Crypto(format!("Invalid signature hex: {}", e)))?;
    let sig_array: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| VouchError::Crypto("Signature must be exactly 64 bytes".to_string()))?;
    let signature = ed25519_dalek::Signature::from_bytes(&sig_array);

    Ok(verifying_key.verify(message, &signature).is_ok())
}
