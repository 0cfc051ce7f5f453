//! Drives one candidate response: speak first, then type.

use super::messages::{CandidateOutcome, CandidateResponse};
use super::turns::{TurnMode, TurnTaking};
use crate::editor::{AppliedEdit, ApplyContract, CodeEdit, EditorBuffer, VersionedText};
use crate::error::{CandidateError, Result};
use crate::runtime::CandidateEvent;
use crate::tts::{SpeechOutcome, TtsQueue};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Composes the turn coordinator, speech queue and editor buffer.
///
/// Within one [`CandidateOrchestrator::handle_candidate_response`] call the
/// speech is fully flushed before any edit is attempted, and edits are only
/// attempted when the caller explicitly allows them. Edits wait for the
/// typing turn; if another caller is speaking they land only after it stops.
pub struct CandidateOrchestrator {
    tts: TtsQueue,
    turns: Arc<TurnTaking>,
    buffer: Arc<Mutex<EditorBuffer>>,
    runtime_tx: Option<broadcast::Sender<CandidateEvent>>,
}

impl CandidateOrchestrator {
    pub fn new(tts: TtsQueue, turns: Arc<TurnTaking>, buffer: Arc<Mutex<EditorBuffer>>) -> Self {
        Self {
            tts,
            turns,
            buffer,
            runtime_tx: None,
        }
    }

    /// Broadcast [`CandidateEvent`]s on `tx`.
    pub fn with_runtime_events(mut self, tx: broadcast::Sender<CandidateEvent>) -> Self {
        self.runtime_tx = Some(tx);
        self
    }

    pub fn tts(&self) -> &TtsQueue {
        &self.tts
    }

    pub fn turns(&self) -> &Arc<TurnTaking> {
        &self.turns
    }

    pub fn buffer(&self) -> &Arc<Mutex<EditorBuffer>> {
        &self.buffer
    }

    /// Current buffer text and version.
    pub fn snapshot(&self) -> Result<VersionedText> {
        let buffer = self.buffer.lock().map_err(|_| poisoned())?;
        Ok(buffer.snapshot())
    }

    /// Runs one instruction to completion.
    ///
    /// # Errors
    ///
    /// - [`CandidateError::CodeEditsNotAllowed`] when edits are present but
    ///   `controls.allow_code_edits` is false.
    /// - Any rejection from [`EditorBuffer::try_apply`], unchanged.
    ///
    /// Speech failures are not errors; they are reported in the outcome.
    pub async fn handle_candidate_response(
        &self,
        response: &CandidateResponse,
    ) -> Result<CandidateOutcome> {
        let mut outcome = CandidateOutcome::default();

        if let Some(text) = response.respond.spoken_text() {
            outcome.speech = Some(self.speak(text).await);
        }

        let edits = &response.respond.code_edits;
        if edits.is_empty() {
            return Ok(outcome);
        }

        if !response.controls.allow_code_edits {
            let err = CandidateError::CodeEditsNotAllowed;
            warn!(edits = edits.len(), "refusing candidate edits: {err}");
            self.emit_rejected(&err);
            return Err(err);
        }

        let Some(contract) = response.apply.as_ref() else {
            let err = CandidateError::Apply("no apply contract supplied with code edits".into());
            self.emit_rejected(&err);
            return Err(err);
        };

        // Typing never overlaps speech: wait for any other speaker to stop.
        let claim = self.turns.acquire(TurnMode::Typing).await;
        let applied = self.apply(contract, edits);
        self.turns.release(TurnMode::Typing, claim);

        match applied {
            Ok(applied) => {
                self.emit(CandidateEvent::EditsApplied {
                    version_id: applied.version_id.clone(),
                    hash: applied.hash.clone(),
                });
                outcome.applied = Some(applied);
                Ok(outcome)
            }
            Err(err) => {
                self.emit_rejected(&err);
                Err(err)
            }
        }
    }

    async fn speak(&self, text: &str) -> SpeechOutcome {
        // Even if typing holds the turn and this request is only queued, the
        // utterance still goes through the speech queue and is awaited.
        let claim = self.turns.claim(TurnMode::Speaking);
        self.emit(CandidateEvent::SpeechStarted {
            text: text.to_owned(),
        });

        let spoken = self.tts.speak(text).await;
        self.turns.release(TurnMode::Speaking, claim);

        if !spoken.is_played() {
            warn!(?spoken, "candidate speech did not play");
        }
        self.emit(CandidateEvent::SpeechFinished {
            outcome: spoken.clone(),
        });
        spoken
    }

    fn apply(&self, contract: &ApplyContract, edits: &[CodeEdit]) -> Result<AppliedEdit> {
        let mut buffer = self.buffer.lock().map_err(|_| poisoned())?;
        let applied = buffer.try_apply(contract, edits)?;
        info!(version_id = %applied.version_id, "candidate edits applied");
        Ok(applied)
    }

    fn emit(&self, event: CandidateEvent) {
        if let Some(tx) = &self.runtime_tx {
            let _ = tx.send(event);
        }
    }

    fn emit_rejected(&self, err: &CandidateError) {
        self.emit(CandidateEvent::EditsRejected {
            code: err.code(),
            reason: err.to_string(),
        });
    }
}

fn poisoned() -> CandidateError {
    CandidateError::Apply("editor buffer lock poisoned".into())
}
