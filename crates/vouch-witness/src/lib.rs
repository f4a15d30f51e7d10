// crates/vouch-witness/src/lib.rs
//
// vouch-witness: Witness construction for Vouch.
//
// Defines the data contracts of the external income, asset, liability,
// signal, and identity-verification sources, and the builder that merges
// them into a single canonical Witness.

pub mod builder;
pub mod sources;

pub use builder::{BuilderConfig, BuiltWitness, WitnessBuilder, WitnessSources};
pub use sources::{
    AssetRecord, AssetSource, CheckStatus, IdentitySource, IdentityStatus, IncomeRecord,
    IncomeSource, LiabilityRecord, LiabilitySource, SignalRecord, SignalSource, SourceError,
};
