// crates/vouch-cli/src/commands/witness.rs
//
// `vouch witness {store, latest, list, clear}` against the local encrypted
// store in the data directory.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde_json::json;

use vouch_core::{canonical_json, hash_witness, OwnerIdentity, Witness};
use vouch_store::{EncryptedWitnessStore, RocksWitnessKv};

use super::{read_witness, Context};
use crate::output::{emit, format_millis, FieldRow, WitnessRow};

/// Owner identity the witness key is derived from.
#[derive(Debug, Args)]
pub struct OwnerArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    email: String,
}

impl OwnerArgs {
    fn identity(&self) -> Result<OwnerIdentity, Box<dyn std::error::Error>> {
        Ok(OwnerIdentity::new(&self.user, &self.email)?)
    }
}

#[derive(Debug, Subcommand)]
pub enum WitnessCmd {
    /// Encrypt and store a witness from a JSON file.
    Store {
        file: String,
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// Decrypt and print the most recent witness.
    Latest {
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// List stored witnesses (metadata only, nothing is decrypted).
    List {
        #[arg(long)]
        user: String,
    },
    /// Delete every stored witness of a user.
    Clear {
        #[arg(long)]
        user: String,
    },
}

pub async fn run(ctx: &Context, cmd: &WitnessCmd) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(ctx)?;
    match cmd {
        WitnessCmd::Store { file, owner } => {
            let witness = read_witness(file)?;
            let hash = hash_witness(&witness)?;
            let id = store.store(&witness, &owner.identity()?).await?;
            emit(
                ctx.format,
                &json!({ "id": id, "hash": hash }),
                &[FieldRow::new("ID", &id), FieldRow::new("Hash", &hash)],
            );
        }
        WitnessCmd::Latest { owner } => {
            let witness = store.get_latest(&owner.identity()?).await?;
            print_witness(ctx, &witness)?;
        }
        WitnessCmd::List { user } => {
            let summaries = store.list(user).await?;
            let rows: Vec<WitnessRow> = summaries.iter().map(WitnessRow::from).collect();
            emit(ctx.format, &summaries, &rows);
        }
        WitnessCmd::Clear { user } => {
            let removed = store.delete_all(user).await?;
            println!("Removed {} witness record(s) for {}", removed, user);
        }
    }
    Ok(())
}

fn open_store(ctx: &Context) -> Result<EncryptedWitnessStore, Box<dyn std::error::Error>> {
    let path = ctx.config.witness_db_path();
    std::fs::create_dir_all(&path)?;
    let kv = RocksWitnessKv::open(&path.to_string_lossy())?;
    Ok(EncryptedWitnessStore::new(Arc::new(kv), ctx.config.store.clone())?)
}

fn print_witness(ctx: &Context, witness: &Witness) -> Result<(), Box<dyn std::error::Error>> {
    let rows = [
        FieldRow::new("Income", witness.income),
        FieldRow::new("Employment months", witness.employment_months),
        FieldRow::new("Employer hash", &witness.employer_hash),
        FieldRow::new("Assets", witness.assets),
        FieldRow::new("Liabilities", witness.liabilities),
        FieldRow::new("Credit score", witness.credit_score),
        FieldRow::flag("SSN verified", witness.ssn_verified),
        FieldRow::flag("Selfie verified", witness.selfie_verified),
        FieldRow::flag("Document verified", witness.document_verified),
        FieldRow::new("Created", format_millis(witness.timestamp)),
        FieldRow::new("Hash", hash_witness(witness)?),
    ];
    let value: serde_json::Value = serde_json::from_str(&canonical_json(witness)?)?;
    emit(ctx.format, &value, &rows);
    Ok(())
}
