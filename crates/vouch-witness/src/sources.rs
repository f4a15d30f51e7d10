// crates/vouch-witness/src/sources.rs
//
// Data contracts of the external sources the witness builder consumes.
// Only the fields the builder needs are modeled; the providers' own wire
// formats stay inside their client implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vouch_core::UserContext;

/// Failure reported by a data-source client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The user has never linked an account with this provider.
    #[error("no linked account")]
    NotLinked,
    /// The provider could not be reached or answered with a fault.
    #[error("{0}")]
    Unavailable(String),
}

/// Income and employment view from the bank-data aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeRecord {
    pub monthly_income: f64,
    pub employment_months: u32,
    /// Raw employer name. Hashed by the builder, never stored.
    pub employer_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub total_assets: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiabilityRecord {
    pub total_liabilities: f64,
}

/// Credit/risk signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalRecord {
    pub credit_score: f64,
}

/// Outcome of one identity-verification sub-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Verified,
    /// No result from the provider yet.
    #[default]
    Pending,
    /// The provider ran the check and it did not pass.
    Failed,
}

impl CheckStatus {
    pub fn is_verified(&self) -> bool {
        matches!(self, CheckStatus::Verified)
    }
}

/// Identity-verification status. Sub-checks complete independently, so a
/// user may have a verified document but a pending selfie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityStatus {
    #[serde(default)]
    pub ssn: CheckStatus,
    #[serde(default)]
    pub selfie: CheckStatus,
    #[serde(default)]
    pub document: CheckStatus,
}

impl IdentityStatus {
    /// Whether any sub-check explicitly failed, as opposed to still pending.
    pub fn has_failure(&self) -> bool {
        [self.ssn, self.selfie, self.document]
            .iter()
            .any(|c| *c == CheckStatus::Failed)
    }
}

#[async_trait]
pub trait IncomeSource: Send + Sync {
    async fn income(&self, user: &UserContext) -> Result<IncomeRecord, SourceError>;
}

#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn assets(&self, user: &UserContext) -> Result<AssetRecord, SourceError>;
}

#[async_trait]
pub trait LiabilitySource: Send + Sync {
    async fn liabilities(&self, user: &UserContext) -> Result<LiabilityRecord, SourceError>;
}

#[async_trait]
pub trait SignalSource: Send + Sync {
    async fn signal(&self, user: &UserContext) -> Result<SignalRecord, SourceError>;
}

#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn identity_status(&self, user: &UserContext) -> Result<IdentityStatus, SourceError>;
}
