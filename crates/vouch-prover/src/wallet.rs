// crates/vouch-prover/src/wallet.rs
//
// Local ed25519 wallet. The address is the hex public key, which is also
// what the ledger backend verifies signatures against.

use async_trait::async_trait;

use vouch_core::crypto::Keypair;
use vouch_core::{VouchError, WalletSigner};

/// A wallet backed by a local ed25519 keypair, or a disconnected slot.
pub struct Ed25519Wallet {
    keypair: Option<Keypair>,
}

impl Ed25519Wallet {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Some(keypair),
        }
    }

    /// A wallet with no key connected. Every signing attempt fails.
    pub fn disconnected() -> Self {
        Self { keypair: None }
    }

    /// Load a wallet from a file holding the hex-encoded 32-byte secret key.
    pub fn from_key_file(path: &str) -> Result<Self, VouchError> {
        let secret = std::fs::read_to_string(path)
            .map_err(|e| VouchError::Crypto(format!("Failed to read key file {}: {}", path, e)))?;
        Ok(Self::new(Keypair::from_secret_hex(&secret)?))
    }
}

#[async_trait]
impl WalletSigner for Ed25519Wallet {
    fn address(&self) -> Option<String> {
        self.keypair.as_ref().map(Keypair::address)
    }

    async fn sign(&self, payload: &[u8]) -> Result<String, VouchError> {
        let keypair = self.keypair.as_ref().ok_or(VouchError::WalletNotConnected)?;
        Ok(keypair.sign_hex(payload))
    }
}
