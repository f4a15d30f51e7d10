// crates/vouch-cli/src/commands/wallet.rs
//
// `vouch wallet {create, address}`: local signing key management.

use std::fs;
use std::path::PathBuf;

use clap::Subcommand;

use vouch_core::crypto::Keypair;
use vouch_core::identity::did_from_wallet;

use super::Context;
use crate::config::expand_home;

#[derive(Debug, Subcommand)]
pub enum WalletCmd {
    /// Generate a new ed25519 key and write its secret to a file.
    Create {
        /// Destination for the hex-encoded secret key.
        #[arg(long)]
        out: Option<String>,
        /// Overwrite an existing key file.
        #[arg(long)]
        force: bool,
    },
    /// Print the wallet address and DID for a key file.
    Address {
        #[arg(long)]
        key: Option<String>,
    },
}

pub async fn run(ctx: &Context, cmd: &WalletCmd) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        WalletCmd::Create { out, force } => create(ctx, out.as_deref(), *force),
        WalletCmd::Address { key } => address(ctx, key.as_deref()),
    }
}

/// Key path from the flag, the config, or `~/.vouch/keys/wallet.secret`.
pub fn key_path(ctx: &Context, flag: Option<&str>) -> PathBuf {
    flag.map(expand_home)
        .or_else(|| ctx.config.wallet_key.as_deref().map(expand_home))
        .unwrap_or_else(|| expand_home("~/.vouch/keys/wallet.secret"))
}

fn create(ctx: &Context, out: Option<&str>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = key_path(ctx, out);
    if path.exists() && !force {
        return Err(format!("{} already exists; pass --force to replace it", path.display()).into());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let keypair = Keypair::generate();
    fs::write(&path, keypair.secret_hex())?;

    println!("Wallet created.");
    println!("  Address: {}", keypair.address());
    println!("  DID:     {}", did_from_wallet(&keypair.address()));
    println!("  Secret:  {}", path.display());
    println!();
    println!("Back up the secret key file; proofs are bound to this address.");
    Ok(())
}

fn address(ctx: &Context, key: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let path = key_path(ctx, key);
    let secret = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read key file {}: {}", path.display(), e))?;
    let keypair = Keypair::from_secret_hex(&secret)?;
    println!("Address: {}", keypair.address());
    println!("DID:     {}", did_from_wallet(&keypair.address()));
    Ok(())
}
