//! Deterministic keystroke model for applying code edits.
//!
//! An edit is "select range, type replacement": it expands to at most one
//! delete followed by at most one insert. Applying is instantaneous
//! (fast-forward); nothing here simulates real-time typing.

use super::types::{CodeEdit, EditRange, KeystrokeOp};
use crate::error::{CandidateError, Result};

/// Expands one edit into primitive operations against `before`.
///
/// # Errors
///
/// Returns [`CandidateError::RangeOutOfBounds`] unless
/// `start <= end <= chars(before)`.
pub fn expand_edit_to_keystrokes(before: &str, edit: &CodeEdit) -> Result<Vec<KeystrokeOp>> {
    check_range(&edit.range, before.chars().count())?;

    let mut ops = Vec::with_capacity(2);
    if !edit.range.is_empty() {
        ops.push(KeystrokeOp::Delete {
            count: edit.range.len(),
        });
    }
    if !edit.replacement.is_empty() {
        ops.push(KeystrokeOp::Insert {
            text: edit.replacement.clone(),
        });
    }
    Ok(ops)
}

/// Replays `ops` on `before` with the cursor starting at `start_index`.
///
/// Deletes past the end of the text are truncated; a start index past the end
/// is clamped to the end.
pub fn apply_keystrokes_to_text(before: &str, start_index: usize, ops: &[KeystrokeOp]) -> String {
    let mut chars: Vec<char> = before.chars().collect();
    let mut cursor = start_index.min(chars.len());

    for op in ops {
        match op {
            KeystrokeOp::Delete { count } => {
                let end = cursor.saturating_add(*count).min(chars.len());
                chars.drain(cursor..end);
            }
            KeystrokeOp::Insert { text } => {
                let inserted: Vec<char> = text.chars().collect();
                let advance = inserted.len();
                chars.splice(cursor..cursor, inserted);
                cursor += advance;
            }
        }
    }

    chars.into_iter().collect()
}

/// Applies a batch of edits in one pass.
///
/// Edits are given in the coordinate space of the original `before` text.
/// They are applied in ascending `range.start` order (stable, so ties keep
/// their input order) with a running offset that shifts later edits by the
/// net length change of earlier ones. Overlapping ranges are not supported.
///
/// # Errors
///
/// Returns [`CandidateError::RangeOutOfBounds`] if a shifted range no longer
/// fits the intermediate text, which can only happen for overlapping input.
pub fn fast_forward_apply_edits(before: &str, edits: &[CodeEdit]) -> Result<String> {
    let mut ordered: Vec<&CodeEdit> = edits.iter().collect();
    ordered.sort_by_key(|edit| edit.range.start);

    let mut text = before.to_owned();
    let mut delta: isize = 0;

    for edit in ordered {
        let start = shift(edit.range.start, delta)?;
        let end = shift(edit.range.end, delta)?;
        let shifted = CodeEdit {
            file: edit.file.clone(),
            range: EditRange::new(start, end),
            replacement: edit.replacement.clone(),
        };

        let ops = expand_edit_to_keystrokes(&text, &shifted)?;
        text = apply_keystrokes_to_text(&text, start, &ops);

        let inserted = edit.replacement.chars().count() as isize;
        delta += inserted - edit.range.len() as isize;
    }

    Ok(text)
}

fn check_range(range: &EditRange, len: usize) -> Result<()> {
    if range.fits(len) {
        Ok(())
    } else {
        Err(CandidateError::RangeOutOfBounds {
            start: range.start,
            end: range.end,
            len,
        })
    }
}

fn shift(offset: usize, delta: isize) -> Result<usize> {
    offset
        .checked_add_signed(delta)
        .ok_or_else(|| CandidateError::Apply(format!("offset {offset} shifted below zero")))
}
