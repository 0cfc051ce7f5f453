//! Content hashing and version tokens for optimistic concurrency.

use crate::error::{CandidateError, Mismatch, Result};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a digest of `text`, rendered as 16 lowercase hex digits.
///
/// Order-sensitive and deterministic across runs and platforms. Not a
/// cryptographic hash; it only has to catch a stale `beforeHash`.
pub fn compute_hash(text: &str) -> String {
    let digest = text.bytes().fold(FNV_OFFSET_BASIS, |acc, b| {
        (acc ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    });
    format!("{digest:016x}")
}

/// Checks a caller's contract against the buffer's current state.
///
/// Both comparisons always run so the error names every stale field.
pub fn verify_apply_contract(
    incoming_version_id: &str,
    incoming_before_hash: &str,
    current_version_id: &str,
    current_text: &str,
) -> Result<()> {
    let current_hash = compute_hash(current_text);

    let version = (incoming_version_id != current_version_id).then(|| Mismatch {
        incoming: incoming_version_id.to_owned(),
        current: current_version_id.to_owned(),
    });
    let hash = (incoming_before_hash != current_hash).then(|| Mismatch {
        incoming: incoming_before_hash.to_owned(),
        current: current_hash,
    });

    match (version, hash) {
        (None, None) => Ok(()),
        (Some(version), None) => Err(CandidateError::VersionMismatch(version)),
        (None, Some(hash)) => Err(CandidateError::HashMismatch(hash)),
        (Some(version), Some(hash)) => Err(CandidateError::ContractMismatch { version, hash }),
    }
}

/// Mints the version that follows `prev`.
///
/// A trailing run of digits is incremented in place (`v9` → `v10`,
/// `r-007` → `r-008`); anything else gets `-1` appended. Numeric suffixes only
/// grow, so ids never repeat within a session.
pub fn mint_next_version_id(prev: &str) -> String {
    let digits_start = prev
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);

    let Some(start) = digits_start else {
        return format!("{prev}-1");
    };

    let (prefix, digits) = prev.split_at(start);
    format!("{prefix}{}", increment_decimal(digits))
}

/// Adds one to an ASCII decimal string of arbitrary length, keeping its width
/// unless it carries out (`099` → `100`, `99` → `100`).
fn increment_decimal(digits: &str) -> String {
    let mut bytes = digits.as_bytes().to_vec();
    for b in bytes.iter_mut().rev() {
        if *b == b'9' {
            *b = b'0';
        } else {
            *b += 1;
            return String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    format!("1{}", String::from_utf8_lossy(&bytes))
}
