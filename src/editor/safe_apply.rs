//! Pre-flight validation in front of the keystroke model.

use super::keystroke::fast_forward_apply_edits;
use super::types::CodeEdit;
use crate::error::{CandidateError, Result};
use tracing::debug;

/// Options for [`apply_code_edits_safely`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeApplyOptions<'a> {
    /// Files edits may target. `None` allows any file.
    pub allowlist: Option<&'a [String]>,
}

/// Validates every edit, then applies the batch all-or-nothing.
///
/// No edit is applied unless all of them pass: the file must be on the
/// allowlist (when one is given) and the range must fit `current_text`.
///
/// # Errors
///
/// [`CandidateError::FileNotAllowed`] or [`CandidateError::RangeOutOfBounds`]
/// for the first failing edit; [`CandidateError::Apply`] if application
/// itself fails.
pub fn apply_code_edits_safely(
    current_text: &str,
    edits: &[CodeEdit],
    options: SafeApplyOptions<'_>,
) -> Result<String> {
    let len = current_text.chars().count();

    for edit in edits {
        if let Some(allowlist) = options.allowlist
            && !allowlist.iter().any(|f| f == &edit.file)
        {
            debug!(file = %edit.file, "edit rejected: file not on allowlist");
            return Err(CandidateError::FileNotAllowed {
                file: edit.file.clone(),
            });
        }
        if !edit.range.fits(len) {
            debug!(
                start = edit.range.start,
                end = edit.range.end,
                len,
                "edit rejected: range out of bounds"
            );
            return Err(CandidateError::RangeOutOfBounds {
                start: edit.range.start,
                end: edit.range.end,
                len,
            });
        }
    }

    fast_forward_apply_edits(current_text, edits).map_err(|e| match e {
        CandidateError::Apply(_) => e,
        other => CandidateError::Apply(other.to_string()),
    })
}
