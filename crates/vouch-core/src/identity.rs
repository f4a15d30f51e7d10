// crates/vouch-core/src/identity.rs

use serde::{Deserialize, Serialize};

use crate::error::VouchError;

/// DID method used for wallet-derived identities.
pub const DID_METHOD: &str = "did:vouch";

/// Authenticated caller on whose behalf external data is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    /// Backend account id.
    pub user_id: String,
    /// Bearer token forwarded to data-source clients, if they need one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: None,
        }
    }
}

/// Stable identity attributes of the owner of locally stored witnesses.
///
/// The local store derives its encryption key from these attributes, so the
/// same owner re-derives the same key on any device without a server round
/// trip. `user_id` doubles as the ownership key checked before decryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerIdentity {
    pub user_id: String,
    pub email: String,
}

impl OwnerIdentity {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Result<Self, VouchError> {
        let owner = Self {
            user_id: user_id.into(),
            email: email.into(),
        };
        if owner.user_id.trim().is_empty() {
            return Err(VouchError::Validation("Owner user id is empty".to_string()));
        }
        if owner.email.trim().is_empty() {
            return Err(VouchError::Validation("Owner email is empty".to_string()));
        }
        Ok(owner)
    }

    /// Canonical key material: `vouch-owner-v1 \0 user_id \0 lowercase(email)`.
    ///
    /// Callers should wipe the returned buffer once the key is derived.
    pub fn key_material(&self) -> Vec<u8> {
        let mut material = Vec::with_capacity(16 + self.user_id.len() + self.email.len());
        material.extend_from_slice(b"vouch-owner-v1");
        material.push(0);
        material.extend_from_slice(self.user_id.as_bytes());
        material.push(0);
        material.extend_from_slice(self.email.trim().to_lowercase().as_bytes());
        material
    }
}

/// Derive the DID for a wallet address (hex ed25519 public key).
pub fn did_from_wallet(wallet_address: &str) -> String {
    format!("{}:{}", DID_METHOD, wallet_address.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_material_is_stable() {
        let a = OwnerIdentity::new("user-1", "Alice@Example.com").unwrap();
        let b = OwnerIdentity::new("user-1", "alice@example.com ").unwrap();
        assert_eq!(a.key_material(), b.key_material());

        let c = OwnerIdentity::new("user-2", "alice@example.com").unwrap();
        assert_ne!(a.key_material(), c.key_material());
    }

    #[test]
    fn test_empty_owner_rejected() {
        assert!(OwnerIdentity::new("", "a@b.c").is_err());
        assert!(OwnerIdentity::new("user-1", " ").is_err());
    }

    #[test]
    fn test_did_from_wallet() {
        assert_eq!(did_from_wallet("ABCDEF"), "did:vouch:abcdef");
    }
}
