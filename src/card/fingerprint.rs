/// Content fingerprints for card records
///
/// The fingerprint is a SHA-256 digest over the canonical JSON form of the
/// extracted fields. Raw HTML never enters the hash, so markup churn that
/// does not change any field keeps the fingerprint stable.
use crate::card::CardRecord;
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest
pub const FINGERPRINT_LEN: usize = 64;

/// Computes the content fingerprint of a record
///
/// # Arguments
///
/// * `record` - The extracted card record
///
/// # Returns
///
/// * `Ok(String)` - Lowercase hex SHA-256 digest
/// * `Err(serde_json::Error)` - The record could not be serialized
pub fn fingerprint(record: &CardRecord) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_vec(record)?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}

/// Returns true if `value` looks like a fingerprint produced by [`fingerprint`]
pub fn is_valid_fingerprint(value: &str) -> bool {
    value.len() == FINGERPRINT_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
