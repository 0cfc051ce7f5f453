//! Instructions consumed by the orchestrator and the outcomes it returns.

use crate::editor::{AppliedEdit, ApplyContract, CodeEdit};
use crate::tts::SpeechOutcome;
use serde::{Deserialize, Serialize};

/// What the candidate should say and type in one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondWithCandidate {
    /// Spoken content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Edits in the coordinate space of the buffer the contract names.
    #[serde(default)]
    pub code_edits: Vec<CodeEdit>,
}

impl RespondWithCandidate {
    pub fn speech(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            code_edits: Vec::new(),
        }
    }

    pub fn with_edits(mut self, edits: Vec<CodeEdit>) -> Self {
        self.code_edits = edits;
        self
    }

    /// Spoken text, if there is anything to say.
    pub fn spoken_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Policy switches for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CandidateControls {
    /// Edits are refused unless this is explicitly `true`.
    pub allow_code_edits: bool,
}

/// One complete orchestration request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResponse {
    pub respond: RespondWithCandidate,
    #[serde(default)]
    pub controls: CandidateControls,
    /// Contract for `respond.code_edits`; required when edits are present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply: Option<ApplyContract>,
}

/// What one orchestration cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateOutcome {
    /// Set when the instruction carried speech.
    pub speech: Option<SpeechOutcome>,
    /// Set when an edit batch was applied.
    pub applied: Option<AppliedEdit>,
}
