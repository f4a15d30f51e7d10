// crates/vouch-cli/src/commands/proofs.rs
//
// Verifier-side queries: `vouch verify`, `vouch proofs`, `vouch count`.

use std::sync::Arc;

use serde_json::json;

use vouch_core::{ProofFilter, SystemClock};
use vouch_verifier::{HttpIndexer, VerifierClient};

use super::Context;
use crate::output::{emit, format_secs, FieldRow, ProofRow};

fn verifier(ctx: &Context) -> VerifierClient {
    VerifierClient::new(
        Arc::new(HttpIndexer::new(ctx.config.indexer.clone())),
        Arc::new(SystemClock),
    )
}

pub async fn verify(ctx: &Context, nullifier: &str) -> Result<(), Box<dyn std::error::Error>> {
    let v = verifier(ctx).verify_proof(nullifier).await?;
    emit(
        ctx.format,
        &v,
        &[
            FieldRow::flag("Valid", v.is_valid),
            FieldRow::new("Threshold", v.threshold),
            FieldRow::new("Issued", format_secs(v.timestamp)),
            FieldRow::new("Expires", format_secs(v.expires_at)),
            FieldRow::new("User DID", &v.user_did),
        ],
    );
    Ok(())
}

pub async fn list(ctx: &Context, filter: ProofFilter) -> Result<(), Box<dyn std::error::Error>> {
    let proofs = verifier(ctx).get_proofs_with_filters(&filter).await?;
    let rows: Vec<ProofRow> = proofs.iter().map(ProofRow::from).collect();
    emit(ctx.format, &proofs, &rows);
    Ok(())
}

pub async fn count(ctx: &Context, user_did: &str) -> Result<(), Box<dyn std::error::Error>> {
    let count = verifier(ctx).get_valid_proof_count(user_did).await?;
    emit(
        ctx.format,
        &json!({ "userDID": user_did, "validProofs": count }),
        &[FieldRow::new("User DID", user_did), FieldRow::new("Valid proofs", count)],
    );
    Ok(())
}
