// crates/vouch-witness/src/builder.rs
//
// WitnessBuilder: merges the five external data views into one Witness.
//
// All views are fetched concurrently and the construction is all-or-nothing:
// a witness with silently zeroed fields would misstate the user's financial
// standing, so the first failing source aborts the whole build.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use vouch_core::hash::hash_employer;
use vouch_core::{Clock, UserContext, VouchError, Witness};

use crate::sources::{
    AssetSource, IdentitySource, IdentityStatus, IncomeSource, LiabilitySource, SignalSource,
    SourceError,
};

/// Configuration for the witness builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Upper bound on each individual source call, in milliseconds.
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,
}

fn default_source_timeout_ms() -> u64 {
    15_000
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            source_timeout_ms: default_source_timeout_ms(),
        }
    }
}

/// The external clients a builder reads from.
#[derive(Clone)]
pub struct WitnessSources {
    pub income: Arc<dyn IncomeSource>,
    pub assets: Arc<dyn AssetSource>,
    pub liabilities: Arc<dyn LiabilitySource>,
    pub signal: Arc<dyn SignalSource>,
    pub identity: Arc<dyn IdentitySource>,
}

/// A witness together with the identity checks it was derived from. The
/// witness flags collapse `Pending` and `Failed` into `false`; `identity`
/// keeps them apart.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltWitness {
    pub witness: Witness,
    pub identity: IdentityStatus,
}

/// Builds canonical witnesses from live data sources.
pub struct WitnessBuilder {
    sources: WitnessSources,
    clock: Arc<dyn Clock>,
    config: BuilderConfig,
}

impl WitnessBuilder {
    pub fn new(sources: WitnessSources, clock: Arc<dyn Clock>, config: BuilderConfig) -> Self {
        Self {
            sources,
            clock,
            config,
        }
    }

    /// Construct a fresh witness for `user`.
    ///
    /// Fails with `NoLinkedSource` when the user never linked one of the
    /// financial sources, `SourceUnavailable` when a source is down or slow,
    /// and `Validation` when the merged values break witness invariants.
    /// A user without any identity-verification session yet gets all three
    /// verification flags set to `false`.
    pub async fn construct_witness(&self, user: &UserContext) -> Result<Witness, VouchError> {
        Ok(self.construct_witness_with_identity(user).await?.witness)
    }

    /// Same as [`WitnessBuilder::construct_witness`], but also returns the
    /// per-check identity status so callers can tell a failed check from one
    /// that is still pending.
    pub async fn construct_witness_with_identity(
        &self,
        user: &UserContext,
    ) -> Result<BuiltWitness, VouchError> {
        let bound = Duration::from_millis(self.config.source_timeout_ms);

        tracing::debug!("Building witness for user {}", user.user_id);

        let (income, assets, liabilities, signal, identity) = tokio::try_join!(
            fetch("income", bound, self.sources.income.income(user)),
            fetch("assets", bound, self.sources.assets.assets(user)),
            fetch("liabilities", bound, self.sources.liabilities.liabilities(user)),
            fetch("signal", bound, self.sources.signal.signal(user)),
            fetch_identity(bound, self.sources.identity.identity_status(user)),
        )?;

        if identity.has_failure() {
            tracing::info!(
                "Identity verification reported a failed check for user {}",
                user.user_id
            );
        }

        let witness = Witness {
            income: income.monthly_income,
            employment_months: income.employment_months,
            employer_hash: hash_employer(&income.employer_name),
            assets: assets.total_assets,
            liabilities: liabilities.total_liabilities,
            credit_score: signal.credit_score,
            ssn_verified: identity.ssn.is_verified(),
            selfie_verified: identity.selfie.is_verified(),
            document_verified: identity.document.is_verified(),
            timestamp: u64::try_from(self.clock.now_millis()).map_err(|_| {
                VouchError::Validation("Clock returned a pre-epoch time".to_string())
            })?,
        };

        witness.validate()?;

        tracing::info!(
            "Built witness for user {} (fully verified: {})",
            user.user_id,
            witness.is_fully_verified()
        );

        Ok(BuiltWitness { witness, identity })
    }
}

/// Await one source call under `bound`, mapping its failure into the
/// protocol error taxonomy.
async fn fetch<T>(
    source: &'static str,
    bound: Duration,
    call: impl Future<Output = Result<T, SourceError>>,
) -> Result<T, VouchError> {
    match tokio::time::timeout(bound, call).await {
        Ok(Ok(record)) => Ok(record),
        Ok(Err(SourceError::NotLinked)) => {
            tracing::debug!("No linked {} source", source);
            Err(VouchError::NoLinkedSource {
                data_source: source.to_string(),
            })
        }
        Ok(Err(SourceError::Unavailable(reason))) => {
            tracing::warn!("Data source {} unavailable: {}", source, reason);
            Err(VouchError::SourceUnavailable {
                data_source: source.to_string(),
                reason,
            })
        }
        Err(_) => {
            tracing::warn!("Data source {} timed out after {:?}", source, bound);
            Err(VouchError::SourceUnavailable {
                data_source: source.to_string(),
                reason: format!("timed out after {} ms", bound.as_millis()),
            })
        }
    }
}

/// Identity status is optional: no verification session means nothing is
/// verified yet, not that the build failed.
async fn fetch_identity(
    bound: Duration,
    call: impl Future<Output = Result<IdentityStatus, SourceError>>,
) -> Result<IdentityStatus, VouchError> {
    match fetch("identity", bound, call).await {
        Err(VouchError::NoLinkedSource { .. }) => Ok(IdentityStatus::default()),
        other => other,
    }
}
