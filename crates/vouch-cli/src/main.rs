// crates/vouch-cli/src/main.rs
//
// CLI entrypoint for Vouch.
//
// Provides subcommands for hashing and storing witnesses locally, submitting
// proofs through the prover and ledger backend, tracking their status, and
// verifying proofs against the indexer.

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::submit::SubmitArgs;
use commands::wallet::WalletCmd;
use commands::witness::WitnessCmd;
use commands::Context;
use config::VouchConfig;
use output::OutputFormat;

use vouch_core::ProofFilter;

/// Vouch: private income and identity proofs.
#[derive(Parser, Debug)]
#[command(
    name = "vouch",
    version = "0.1.0",
    about = "Build, store, prove and verify income attestations"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the prover endpoint.
    #[arg(long, global = true)]
    prover: Option<String>,

    /// Override the ledger backend endpoint.
    #[arg(long, global = true)]
    ledger: Option<String>,

    /// Override the indexer endpoint.
    #[arg(long, global = true)]
    indexer: Option<String>,

    /// Override the local data directory.
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Emit JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a witness file's canonical JSON and hash.
    Hash {
        /// Witness JSON file.
        file: String,
    },

    /// Local encrypted witness store.
    #[command(subcommand)]
    Witness(WitnessCmd),

    /// Signing key management.
    #[command(subcommand)]
    Wallet(WalletCmd),

    /// Prove a witness and submit the proof to the ledger backend.
    Submit(SubmitArgs),

    /// Show the status of a submitted proof.
    Status {
        proof_id: String,
        /// Poll until the proof is confirmed or failed.
        #[arg(long)]
        wait: bool,
    },

    /// Check a proof by nullifier.
    Verify { nullifier: String },

    /// List proofs from the indexer.
    Proofs {
        #[arg(long)]
        did: Option<String>,
        #[arg(long)]
        min_threshold: Option<f64>,
        /// Only valid (`true`) or only invalid (`false`) proofs.
        #[arg(long)]
        valid: Option<bool>,
    },

    /// Count a user's currently valid proofs.
    Count {
        #[arg(long)]
        did: String,
    },
}

impl Cli {
    fn load_config(&self) -> Result<VouchConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => VouchConfig::load(path)?,
            None => VouchConfig::load_or_default(&config::default_config_path())?,
        };
        if let Some(url) = &self.prover {
            config.prover.url = url.clone();
        }
        if let Some(url) = &self.ledger {
            config.ledger.url = url.clone();
        }
        if let Some(url) = &self.indexer {
            config.indexer.url = url.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let ctx = Context {
        config,
        format: OutputFormat::from_flag(cli.json),
    };

    match &cli.command {
        Commands::Hash { file } => commands::hash::run(&ctx, file).await?,
        Commands::Witness(cmd) => commands::witness::run(&ctx, cmd).await?,
        Commands::Wallet(cmd) => commands::wallet::run(&ctx, cmd).await?,
        Commands::Submit(args) => commands::submit::run(&ctx, args).await?,
        Commands::Status { proof_id, wait } => commands::status::run(&ctx, proof_id, *wait).await?,
        Commands::Verify { nullifier } => commands::proofs::verify(&ctx, nullifier).await?,
        Commands::Proofs {
            did,
            min_threshold,
            valid,
        } => {
            let filter = ProofFilter {
                user_did: did.clone(),
                min_threshold: *min_threshold,
                is_valid: *valid,
            };
            commands::proofs::list(&ctx, filter).await?
        }
        Commands::Count { did } => commands::proofs::count(&ctx, did).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_endpoint_flags_override_config() {
        let cli = Cli::parse_from([
            "vouch",
            "--config",
            "/nonexistent/vouch.toml",
            "count",
            "--did",
            "did:vouch:ab",
        ]);
        assert!(cli.load_config().is_err());

        let nullifier = "a".repeat(64);
        let cli = Cli::parse_from([
            "vouch",
            "--indexer",
            "http://indexer.test/graphql",
            "--data-dir",
            "/tmp/vouch-test",
            "verify",
            nullifier.as_str(),
        ]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.indexer.url, "http://indexer.test/graphql");
        assert_eq!(config.data_dir, "/tmp/vouch-test");
    }

    #[test]
    fn test_submit_parses_circuit() {
        let cli = Cli::parse_from([
            "vouch",
            "submit",
            "--witness",
            "w.json",
            "--circuit",
            "credit_score",
            "--threshold",
            "700",
        ]);
        match cli.command {
            Commands::Submit(_) => {}
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from([
            "vouch",
            "submit",
            "--witness",
            "w.json",
            "--circuit",
            "mortgage",
            "--threshold",
            "700",
        ])
        .is_err());
    }
}
