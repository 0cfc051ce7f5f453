//! Shared code buffer: hashing, the keystroke edit model, safe application
//! and the optimistic-concurrency buffer manager.

pub mod buffer;
pub mod keystroke;
pub mod safe_apply;
pub mod types;
pub mod version;

pub use buffer::EditorBuffer;
pub use keystroke::{apply_keystrokes_to_text, expand_edit_to_keystrokes, fast_forward_apply_edits};
pub use safe_apply::{SafeApplyOptions, apply_code_edits_safely};
pub use types::{
    AppliedEdit, ApplyContract, CandidateContext, CodeEdit, EditRange, KeystrokeOp, VersionedText,
};
pub use version::{compute_hash, mint_next_version_id, verify_apply_contract};
