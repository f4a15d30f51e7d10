// crates/vouch-core/src/witness.rs

use serde::{Deserialize, Serialize};

use crate::error::VouchError;

/// Length of a SHA-256 digest rendered as lowercase hex.
pub const HEX_DIGEST_LEN: usize = 64;

/// The private financial/identity record a user proves facts about.
///
/// A witness is built fresh from live data sources, hashed, and never
/// mutated afterwards. A newer view of the same user is a new witness with
/// a newer `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Witness {
    /// Monthly income.
    pub income: f64,
    /// Months with the current employer.
    pub employment_months: u32,
    /// SHA-256 of the normalized employer name. Never the raw name.
    pub employer_hash: String,
    /// Total assets.
    pub assets: f64,
    /// Total liabilities. Negative values are rejected.
    pub liabilities: f64,
    /// Credit/risk score from the signal provider.
    pub credit_score: f64,
    pub ssn_verified: bool,
    pub selfie_verified: bool,
    pub document_verified: bool,
    /// Creation time, Unix milliseconds.
    pub timestamp: u64,
}

impl Witness {
    /// Parse a witness from JSON, requiring every field with the right type.
    ///
    /// Missing fields, unknown fields, and type mismatches are validation
    /// errors. The parsed witness is also run through [`Witness::validate`].
    pub fn from_json(json: &str) -> Result<Self, VouchError> {
        let witness: Witness = serde_json::from_str(json)
            .map_err(|e| VouchError::Validation(format!("Malformed witness: {}", e)))?;
        witness.validate()?;
        Ok(witness)
    }

    /// Check every field against the domain rules.
    pub fn validate(&self) -> Result<(), VouchError> {
        check_amount("income", self.income)?;
        check_amount("assets", self.assets)?;
        check_amount("liabilities", self.liabilities)?;
        check_amount("creditScore", self.credit_score)?;

        if !is_hex_digest(&self.employer_hash) {
            return Err(VouchError::Validation(format!(
                "employerHash must be {} lowercase hex characters",
                HEX_DIGEST_LEN
            )));
        }

        if self.timestamp == 0 {
            return Err(VouchError::Validation(
                "timestamp must be a positive Unix millisecond value".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether all three identity sub-checks have been confirmed.
    pub fn is_fully_verified(&self) -> bool {
        self.ssn_verified && self.selfie_verified && self.document_verified
    }
}

fn check_amount(field: &str, value: f64) -> Result<(), VouchError> {
    if !value.is_finite() {
        return Err(VouchError::Validation(format!(
            "{} must be a finite number",
            field
        )));
    }
    if value < 0.0 {
        return Err(VouchError::Validation(format!(
            "{} must not be negative (got {})",
            field, value
        )));
    }
    Ok(())
}

/// Whether `s` is exactly 64 lowercase hex characters.
pub fn is_hex_digest(s: &str) -> bool {
    s.len() == HEX_DIGEST_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}


#[cfg(test)]
mod tests {
    use super::fixtures::reference_witness;
    use super::*;

    #[test]
    fn test_reference_witness_is_valid() {
        assert!(reference_witness().validate().is_ok());
    }

    #[test]
    fn test_negative_liabilities_rejected() {
        let mut w = reference_witness();
        w.liabilities = -1.0;
        assert!(matches!(w.validate(), Err(VouchError::Validation(_))));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut w = reference_witness();
        w.income = f64::NAN;
        assert!(matches!(w.validate(), Err(VouchError::Validation(_))));

        let mut w = reference_witness();
        w.assets = f64::INFINITY;
        assert!(matches!(w.validate(), Err(VouchError::Validation(_))));
    }

    #[test]
    fn test_employer_hash_must_be_digest() {
        let mut w = reference_witness();
        w.employer_hash = "Acme Corp".to_string();
        assert!(w.validate().is_err());

        w.employer_hash = "A".repeat(64);
        assert!(w.validate().is_err(), "uppercase hex is not canonical");
    }

    #[test]
    fn test_from_json_requires_every_field() {
        let json = r#"{
            "income": 5000, "employmentMonths": 12,
            "employerHash": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "assets": 50000, "liabilities": 10000, "creditScore": 720,
            "ssnVerified": true, "selfieVerified": true,
            "timestamp": 1234567890000
        }"#;
        let err = Witness::from_json(json).unwrap_err();
        assert!(matches!(err, VouchError::Validation(_)));
        assert!(err.to_string().contains("documentVerified"));
    }

    #[test]
    fn test_from_json_rejects_type_mismatch() {
        let json = r#"{
            "income": "5000", "employmentMonths": 12,
            "employerHash": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "assets": 50000, "liabilities": 10000, "creditScore": 720,
            "ssnVerified": true, "selfieVerified": true, "documentVerified": false,
            "timestamp": 1234567890000
        }"#;
        assert!(matches!(
            Witness::from_json(json),
            Err(VouchError::Validation(_))
        ));
    }

    #[test]
    fn test_from_json_accepts_complete_record() {
        let json = serde_json::to_string(&reference_witness()).unwrap();
        assert_eq!(Witness::from_json(&json).unwrap(), reference_witness());
    }
}
