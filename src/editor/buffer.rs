//! The authoritative, versioned editor buffer.

use super::safe_apply::{SafeApplyOptions, apply_code_edits_safely};
use super::types::{AppliedEdit, ApplyContract, CodeEdit, VersionedText};
use super::version::{compute_hash, mint_next_version_id, verify_apply_contract};
use crate::error::Result;
use tracing::{info, warn};

/// Owns one file's text and version.
///
/// The only writer path is [`EditorBuffer::try_apply`], which accepts a batch
/// only when the caller's contract matches the current state. On any failure
/// both `text` and `version_id` are left exactly as they were.
#[derive(Debug, Clone)]
pub struct EditorBuffer {
    text: String,
    version_id: String,
    allowlist: Vec<String>,
}

impl EditorBuffer {
    pub fn new(
        text: impl Into<String>,
        version_id: impl Into<String>,
        allowlist: Vec<String>,
    ) -> Self {
        Self {
            text: text.into(),
            version_id: version_id.into(),
            allowlist,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version_id(&self) -> &str {
        &self.version_id
    }

    pub fn hash(&self) -> String {
        compute_hash(&self.text)
    }

    /// Files this buffer accepts edits for.
    pub fn allowlist(&self) -> &[String] {
        &self.allowlist
    }

    pub fn snapshot(&self) -> VersionedText {
        VersionedText {
            text: self.text.clone(),
            version_id: self.version_id.clone(),
        }
    }

    /// Contract that would currently be accepted.
    pub fn contract(&self) -> ApplyContract {
        ApplyContract::new(self.version_id.clone(), self.hash())
    }

    /// Applies `edits` if `contract` matches the current version and hash.
    ///
    /// # Errors
    ///
    /// Stale contracts fail with a version/hash mismatch; invalid edits fail
    /// with the safe-apply reason. The buffer is unchanged in both cases.
    pub fn try_apply(&mut self, contract: &ApplyContract, edits: &[CodeEdit]) -> Result<AppliedEdit> {
        if let Err(e) = verify_apply_contract(
            &contract.version_id,
            &contract.before_hash,
            &self.version_id,
            &self.text,
        ) {
            warn!(version_id = %self.version_id, "edit batch rejected: {e}");
            return Err(e);
        }

        let next_text = apply_code_edits_safely(
            &self.text,
            edits,
            SafeApplyOptions {
                allowlist: Some(&self.allowlist),
            },
        )
        .inspect_err(|e| warn!(version_id = %self.version_id, "edit batch rejected: {e}"))?;

        let next_version = mint_next_version_id(&self.version_id);
        self.text = next_text;
        self.version_id = next_version;

        let hash = self.hash();
        info!(
            version_id = %self.version_id,
            hash = %hash,
            edits = edits.len(),
            "applied edit batch"
        );

        Ok(AppliedEdit {
            version_id: self.version_id.clone(),
            hash,
            text: self.text.clone(),
        })
    }
}
