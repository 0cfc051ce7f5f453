//! Runtime events emitted by the orchestrator for UI and observability.
//!
//! Events are lightweight and sent best-effort: with no subscribers they are
//! simply dropped.

use crate::tts::SpeechOutcome;

/// What the simulated candidate just did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateEvent {
    /// An utterance was handed to the speech queue.
    SpeechStarted { text: String },
    /// The utterance finished (played, failed or cancelled).
    SpeechFinished { outcome: SpeechOutcome },
    /// An edit batch was applied to the buffer.
    EditsApplied { version_id: String, hash: String },
    /// An edit batch was refused; the buffer is unchanged.
    EditsRejected {
        /// Stable error code (see [`crate::error::error_codes`]).
        code: &'static str,
        reason: String,
    },
}
