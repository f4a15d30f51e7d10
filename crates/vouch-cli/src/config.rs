// crates/vouch-cli/src/config.rs
//
// Runtime configuration for the `vouch` binary.
// Loaded from a TOML file or populated with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use vouch_prover::{HttpClientConfig, PipelineConfig, TrackerConfig};
use vouch_store::StoreConfig;
use vouch_verifier::IndexerConfig;

/// Everything the CLI needs to reach the outside world.
#[derive(Debug, Clone, Deserialize)]
pub struct VouchConfig {
    /// Directory holding the local witness database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Hex-encoded ed25519 secret key file used to sign submissions.
    #[serde(default)]
    pub wallet_key: Option<String>,

    #[serde(default = "default_prover")]
    pub prover: HttpClientConfig,

    #[serde(default = "default_ledger")]
    pub ledger: HttpClientConfig,

    #[serde(default = "default_indexer")]
    pub indexer: IndexerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,
}

fn default_data_dir() -> String {
    "~/.vouch/data".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_prover() -> HttpClientConfig {
    HttpClientConfig::new("http://127.0.0.1:8545/prove")
}

fn default_ledger() -> HttpClientConfig {
    HttpClientConfig::new("http://127.0.0.1:8080/rpc")
}

fn default_indexer() -> IndexerConfig {
    IndexerConfig::new("http://127.0.0.1:8000/graphql")
}

impl Default for VouchConfig {
    fn default() -> Self {
        let mut config = Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            wallet_key: None,
            prover: default_prover(),
            ledger: default_ledger(),
            indexer: default_indexer(),
            store: StoreConfig::default(),
            pipeline: PipelineConfig::default(),
            tracker: TrackerConfig::default(),
        };
        config.align_timeouts();
        config
    }
}

impl VouchConfig {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse TOML, then apply the cross-section rules and reject values the
    /// runtime cannot work with.
    pub fn from_toml(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config: VouchConfig = toml::from_str(contents)?;
        config.align_timeouts();
        config.tracker.validate()?;
        Ok(config)
    }

    /// The prover's HTTP timeout never undercuts the pipeline's proving bound.
    fn align_timeouts(&mut self) {
        if self.prover.request_timeout_ms < self.pipeline.prover_timeout_ms {
            self.prover.request_timeout_ms = self.pipeline.prover_timeout_ms;
        }
    }

    /// Like [`VouchConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Location of the local witness database.
    pub fn witness_db_path(&self) -> PathBuf {
        expand_home(&self.data_dir).join("witnesses")
    }
}

/// `~/.vouch/config.toml`, or a relative fallback when no home is known.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".vouch").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("vouch.toml"))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if path == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    }
}
