// crates/vouch-cli/src/commands/mod.rs
//
// Command module declarations for the Vouch CLI.

pub mod hash;
pub mod proofs;
pub mod status;
pub mod submit;
pub mod wallet;
pub mod witness;

use crate::config::VouchConfig;
use crate::output::OutputFormat;

/// Shared state every command runs with.
pub struct Context {
    pub config: VouchConfig,
    pub format: OutputFormat,
}

/// Read a witness JSON file, rejecting incomplete or mistyped records.
pub fn read_witness(path: &str) -> Result<vouch_core::Witness, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read witness file {}: {}", path, e))?;
    Ok(vouch_core::Witness::from_json(&contents)?)
}
