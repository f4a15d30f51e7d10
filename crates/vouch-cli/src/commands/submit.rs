// crates/vouch-cli/src/commands/submit.rs
//
// `vouch submit`: prove a witness, sign with the local wallet, submit to the
// ledger backend and optionally wait for confirmation.

use std::sync::Arc;

use clap::Args;

use vouch_core::{Circuit, LedgerBackend};
use vouch_prover::{Ed25519Wallet, HttpLedgerClient, HttpProver, ProofPipeline};

use super::{read_witness, status, wallet, Context};
use crate::output::{emit, FieldRow};

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Witness JSON file.
    #[arg(long)]
    witness: String,
    /// Circuit to prove: income, assets, credit_score or employment.
    #[arg(long, default_value = "income")]
    circuit: Circuit,
    /// Public threshold the witness must clear.
    #[arg(long)]
    threshold: f64,
    /// Hex secret key file for the signing wallet.
    #[arg(long)]
    key: Option<String>,
    /// Keep polling until the proof is confirmed or failed.
    #[arg(long)]
    wait: bool,
}

pub async fn run(ctx: &Context, args: &SubmitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let witness = read_witness(&args.witness)?;
    let key_path = wallet::key_path(ctx, args.key.as_deref());
    let wallet = Ed25519Wallet::from_key_file(&key_path.to_string_lossy())?;

    let ledger: Arc<dyn LedgerBackend> = Arc::new(HttpLedgerClient::new(ctx.config.ledger.clone()));
    let pipeline = ProofPipeline::new(
        Arc::new(HttpProver::new(ctx.config.prover.clone())),
        Arc::new(wallet),
        ledger.clone(),
        ctx.config.pipeline.clone(),
    );

    let receipt = pipeline
        .generate_and_submit(args.circuit, &witness, args.threshold)
        .await?;
    emit(
        ctx.format,
        &receipt,
        &[
            FieldRow::new("Proof ID", &receipt.proof_id),
            FieldRow::new("Tx", &receipt.tx_hash),
            FieldRow::new("Status", receipt.status),
        ],
    );

    if args.wait {
        status::follow(ctx, ledger, &receipt.proof_id).await?;
    }
    Ok(())
}
