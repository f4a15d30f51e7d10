// crates/vouch-prover/src/pipeline.rs
//
// ProofPipeline: witness -> prover -> wallet signature -> ledger backend.
//
// Steps, in order:
//   1. validate witness and threshold (no side effects yet)
//   2. call the prover, bounded by `prover_timeout_ms`
//   3. strictly validate the prover's answer
//   4. sign the canonical payload with the connected wallet
//   5. submit to the ledger backend
//   6. on success only, clear the staged witness
//
// Nothing here retries. A blind resubmission of a financial proof risks a
// nullifier conflict, so every failure goes straight back to the caller.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use vouch_core::api::{ProveRequest, ProverPublicInputs, SubmissionReceipt, SubmitProofRequest};
use vouch_core::proof::{signing_payload, threshold_string};
use vouch_core::{
    hash_witness, Circuit, LedgerBackend, Prover, VouchError, WalletSigner, Witness, WitnessHash,
    ZkProof,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on a single prover call, in milliseconds.
    #[serde(default = "default_prover_timeout_ms")]
    pub prover_timeout_ms: u64,
}

fn default_prover_timeout_ms() -> u64 {
    60_000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prover_timeout_ms: default_prover_timeout_ms(),
        }
    }
}

/// A witness staged for proving, together with its hash.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWitness {
    pub witness: Witness,
    pub hash: WitnessHash,
}

pub struct ProofPipeline {
    prover: Arc<dyn Prover>,
    wallet: Arc<dyn WalletSigner>,
    ledger: Arc<dyn LedgerBackend>,
    config: PipelineConfig,
    pending: Mutex<Option<PendingWitness>>,
}

impl ProofPipeline {
    pub fn new(
        prover: Arc<dyn Prover>,
        wallet: Arc<dyn WalletSigner>,
        ledger: Arc<dyn LedgerBackend>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            prover,
            wallet,
            ledger,
            config,
            pending: Mutex::new(None),
        }
    }

    /// Stage a witness for a later `submit_staged`, replacing any previous one.
    pub async fn stage(&self, witness: Witness) -> Result<WitnessHash, VouchError> {
        let hash = hash_witness(&witness)?;
        *self.pending.lock().await = Some(PendingWitness {
            witness,
            hash: hash.clone(),
        });
        tracing::debug!("Staged witness {}", hash);
        Ok(hash)
    }

    pub async fn pending(&self) -> Option<PendingWitness> {
        self.pending.lock().await.clone()
    }

    /// Prove and submit the staged witness.
    pub async fn submit_staged(
        &self,
        circuit: Circuit,
        threshold: f64,
    ) -> Result<SubmissionReceipt, VouchError> {
        let staged = self
            .pending()
            .await
            .ok_or_else(|| VouchError::Validation("No witness is staged".to_string()))?;
        self.generate_and_submit(circuit, &staged.witness, threshold)
            .await
    }

    pub async fn generate_and_submit(
        &self,
        circuit: Circuit,
        witness: &Witness,
        threshold: f64,
    ) -> Result<SubmissionReceipt, VouchError> {
        let hash = hash_witness(witness)?;
        if !threshold.is_finite() {
            return Err(VouchError::Validation("Threshold must be finite".to_string()));
        }
        threshold_string(threshold)?;

        let proof = self.prove(circuit, witness, threshold).await?;

        let wallet_address = self.wallet.address().ok_or(VouchError::WalletNotConnected)?;
        let payload = signing_payload(&proof.public_outputs, threshold)?;
        let wallet_signature = match self.wallet.sign(&payload).await {
            Ok(signature) if !signature.trim().is_empty() => signature,
            Ok(_) => {
                return Err(VouchError::SignatureFailed(
                    "Wallet returned an empty signature".to_string(),
                ))
            }
            Err(VouchError::WalletNotConnected) => return Err(VouchError::WalletNotConnected),
            Err(e) => return Err(VouchError::SignatureFailed(e.to_string())),
        };

        let request = SubmitProofRequest {
            proof: proof.proof,
            public_inputs: proof.public_inputs,
            public_outputs: proof.public_outputs,
            wallet_signature,
            wallet_address,
        };
        let receipt = self.ledger.submit(&request).await?;

        tracing::info!(
            "Submitted {} proof {} (nullifier {}, tx {})",
            circuit,
            receipt.proof_id,
            request.public_outputs.nullifier,
            receipt.tx_hash
        );

        let mut pending = self.pending.lock().await;
        if pending.as_ref().map(|p| &p.hash) == Some(&hash) {
            *pending = None;
        }

        Ok(receipt)
    }

    async fn prove(
        &self,
        circuit: Circuit,
        witness: &Witness,
        threshold: f64,
    ) -> Result<ZkProof, VouchError> {
        let request = ProveRequest {
            circuit,
            witness: witness.clone(),
            public_inputs: ProverPublicInputs { threshold },
        };

        let bound = Duration::from_millis(self.config.prover_timeout_ms);
        tracing::debug!("Requesting {} proof (timeout {:?})", circuit, bound);

        let response = match tokio::time::timeout(bound, self.prover.prove(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!("Prover did not answer within {:?}", bound);
                return Err(VouchError::ProverTimeout(self.config.prover_timeout_ms));
            }
        };

        ZkProof::from_prover_response(&response, threshold).map_err(|e| {
            tracing::warn!("Rejected prover response: {}", e);
            e
        })
    }
}
