//! Data types shared by the editor buffer and edit model.

use serde::{Deserialize, Serialize};

/// Half-open character range `[start, end)` into the pre-edit text.
///
/// Offsets count Unicode scalar values, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRange {
    pub start: usize,
    pub end: usize,
}

impl EditRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of characters the range covers, zero for inverted ranges.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `start <= end <= text_len`.
    pub fn fits(&self, text_len: usize) -> bool {
        self.start <= self.end && self.end <= text_len
    }
}

/// A single proposed change to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEdit {
    pub file: String,
    pub range: EditRange,
    pub replacement: String,
}

impl CodeEdit {
    pub fn new(
        file: impl Into<String>,
        start: usize,
        end: usize,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            range: EditRange::new(start, end),
            replacement: replacement.into(),
        }
    }
}

/// Primitive keyboard operation produced by expanding an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeystrokeOp {
    /// Remove `count` characters at the cursor; the cursor stays put.
    Delete { count: usize },
    /// Insert `text` at the cursor and advance past it.
    Insert { text: String },
}

/// Optimistic-concurrency token a caller presents with an edit batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyContract {
    pub version_id: String,
    pub before_hash: String,
}

impl ApplyContract {
    pub fn new(version_id: impl Into<String>, before_hash: impl Into<String>) -> Self {
        Self {
            version_id: version_id.into(),
            before_hash: before_hash.into(),
        }
    }
}

/// Snapshot of the authoritative shared buffer.
///
/// The content hash is derived from `text` on demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedText {
    pub text: String,
    pub version_id: String,
}

impl VersionedText {
    pub fn content_hash(&self) -> String {
        super::version::compute_hash(&self.text)
    }

    /// Contract a caller would present to edit this exact snapshot.
    pub fn contract(&self) -> ApplyContract {
        ApplyContract::new(self.version_id.clone(), self.content_hash())
    }
}

/// Result of a successful `try_apply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedEdit {
    pub version_id: String,
    pub hash: String,
    pub text: String,
}

/// Buffer state a caller hydrates before asking the agent for edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateContext {
    pub file: String,
    pub version_id: String,
    pub before_hash: String,
    pub text: String,
}

impl CandidateContext {
    pub fn contract(&self) -> ApplyContract {
        ApplyContract::new(self.version_id.clone(), self.before_hash.clone())
    }
}
