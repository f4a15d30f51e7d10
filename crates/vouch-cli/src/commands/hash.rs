// crates/vouch-cli/src/commands/hash.rs
//
// `vouch hash <witness.json>`: print the canonical form and its digest.

use serde_json::json;

use vouch_core::{canonical_json, hash_witness};

use super::{read_witness, Context};
use crate::output::{emit, FieldRow};

pub async fn run(ctx: &Context, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let witness = read_witness(path)?;
    let canonical = canonical_json(&witness)?;
    let hash = hash_witness(&witness)?;

    emit(
        ctx.format,
        &json!({ "canonical": canonical, "hash": hash }),
        &[
            FieldRow::new("Canonical", &canonical),
            FieldRow::new("Hash", &hash),
        ],
    );
    Ok(())
}
