// crates/vouch-core/src/hash.rs
//
// Canonical witness hashing.
//
// The canonical form is a compact JSON object with keys in lexicographic
// order and one textual representation per number. The backend and every
// client compute this independently, so the byte layout is a compatibility
// contract: changing it breaks hash agreement across deployments.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

use crate::error::VouchError;
use crate::witness::{is_hex_digest, Witness};

/// 2^53. At or above this magnitude the float formatter switches to
/// exponent or `.0` forms that JavaScript writes differently.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Below this non-zero magnitude the float formatter writes `9.9e-6` where
/// JavaScript writes `0.0000099`.
const MIN_PLAIN_DECIMAL: f64 = 1e-5;

/// SHA-256 over a witness's canonical serialization, as 64 lowercase hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WitnessHash(String);

impl WitnessHash {
    /// Parse a hash from hex text, rejecting anything that is not a digest.
    pub fn parse(s: &str) -> Result<Self, VouchError> {
        if is_hex_digest(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(VouchError::Validation(format!(
                "Invalid witness hash: {:?}",
                s
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WitnessHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for WitnessHash {
    type Error = VouchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        WitnessHash::parse(&value)
    }
}

impl From<WitnessHash> for String {
    fn from(hash: WitnessHash) -> Self {
        hash.0
    }
}

/// Render a number in its single canonical textual form.
///
/// Integral values print without a fraction (`5000`, and `-0` as `0`);
/// everything else prints as the shortest decimal that round-trips.
/// Non-finite values are rejected, and so are magnitudes of 2^53 and above
/// or non-zero magnitudes below 1e-5, where the text would differ from the
/// `JSON.stringify` form other clients hash.
pub fn canonical_number(value: f64) -> Result<Value, VouchError> {
    if !value.is_finite() {
        return Err(VouchError::Validation(format!(
            "Cannot canonicalize non-finite number {}",
            value
        )));
    }
    let magnitude = value.abs();
    if magnitude >= MAX_SAFE_INTEGER || (magnitude != 0.0 && magnitude < MIN_PLAIN_DECIMAL) {
        return Err(VouchError::Validation(format!(
            "Number {} is outside the canonical range",
            value
        )));
    }
    if value.fract() == 0.0 {
        return Ok(Value::Number(Number::from(value as i64)));
    }
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| VouchError::Validation(format!("Unrepresentable number {}", value)))
}

/// Canonical JSON text for a witness. Validates the witness first.
pub fn canonical_json(witness: &Witness) -> Result<String, VouchError> {
    witness.validate()?;

    // BTreeMap keeps keys sorted regardless of serde_json feature flags.
    let mut fields: BTreeMap<&'static str, Value> = BTreeMap::new();
    fields.insert("assets", canonical_number(witness.assets)?);
    fields.insert("creditScore", canonical_number(witness.credit_score)?);
    fields.insert("documentVerified", Value::Bool(witness.document_verified));
    fields.insert("employerHash", Value::String(witness.employer_hash.clone()));
    fields.insert(
        "employmentMonths",
        Value::Number(Number::from(witness.employment_months)),
    );
    fields.insert("income", canonical_number(witness.income)?);
    fields.insert("liabilities", canonical_number(witness.liabilities)?);
    fields.insert("selfieVerified", Value::Bool(witness.selfie_verified));
    fields.insert("ssnVerified", Value::Bool(witness.ssn_verified));
    fields.insert("timestamp", Value::Number(Number::from(witness.timestamp)));

    Ok(serde_json::to_string(&fields)?)
}

/// Compute the content hash of a witness.
pub fn hash_witness(witness: &Witness) -> Result<WitnessHash, VouchError> {
    let canonical = canonical_json(witness)?;
    Ok(WitnessHash(sha256_hex(canonical.as_bytes())))
}

/// One-way hash of an employer name, used in place of the name itself.
///
/// The name is trimmed and lowercased first so that cosmetic differences
/// between data providers do not break equality checks.
pub fn hash_employer(name: &str) -> String {
    sha256_hex(name.trim().to_lowercase().as_bytes())
}

/// SHA-256 of the given bytes as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
