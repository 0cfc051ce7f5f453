//! Candidate persona and system prompt assembly.
//!
//! The system prompt is assembled from four layers:
//!
//! 1. **Core prompt** ([`CORE_PROMPT`]): who the candidate is and how it talks.
//! 2. **Persona**: trait sliders rendered as a short description.
//! 3. **Behaviour rules** ([`BEHAVIOR_RULES`]): the speech/code separation.
//! 4. **Few-shot examples**: interviewer lines with natural-language guidance.
//!
//! Few-shot guidance is prose only. Code reaches the editor exclusively
//! through structured `codeEdits`, so guidance that looks like code is a
//! prompt-authoring bug and fails construction.

use crate::code_guard::looks_like_code;
use crate::editor::CodeEdit;
use crate::error::{CandidateError, Result};
use serde::{Deserialize, Serialize};

/// Minimal rules for the simulated candidate's voice.
pub const CORE_PROMPT: &str = "\
You are a software engineering candidate in a live technical interview.\n\
Answer out loud in 1-3 short sentences, the way a person thinks aloud.\n\
Never read code aloud. Describe what you would change in plain words.";

/// Rules appended after the persona.
pub const BEHAVIOR_RULES: [&str; 4] = [
    "Spoken replies contain no code, no backticks and no markup.",
    "Code changes are proposed only as structured edits, never in speech.",
    "Ask a clarifying question when the task is ambiguous.",
    "Stay in character; do not mention being an AI.",
];

fn default_slider() -> f64 {
    50.0
}

/// Persona sliders, each on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateTraits {
    #[serde(default = "default_slider")]
    pub confidence: f64,
    #[serde(default = "default_slider")]
    pub verbosity: f64,
    #[serde(default = "default_slider")]
    pub technical_depth: f64,
    #[serde(default = "default_slider")]
    pub nervousness: f64,
    #[serde(default = "default_slider")]
    pub collaboration: f64,
}

impl Default for CandidateTraits {
    fn default() -> Self {
        Self {
            confidence: 50.0,
            verbosity: 50.0,
            technical_depth: 50.0,
            nervousness: 50.0,
            collaboration: 50.0,
        }
    }
}

impl CandidateTraits {
    /// Returns a copy with every slider clamped to `[0, 100]` (NaN → 0).
    pub fn clamped(&self) -> Self {
        Self {
            confidence: clamp_trait(self.confidence),
            verbosity: clamp_trait(self.verbosity),
            technical_depth: clamp_trait(self.technical_depth),
            nervousness: clamp_trait(self.nervousness),
            collaboration: clamp_trait(self.collaboration),
        }
    }

    /// One-paragraph persona description from clamped values.
    pub fn describe(&self) -> String {
        let t = self.clamped();
        let lines = [
            describe_slider("Confidence", t.confidence, ["hesitant", "steady", "assured"]),
            describe_slider("Verbosity", t.verbosity, ["terse", "balanced", "expansive"]),
            describe_slider(
                "Technical depth",
                t.technical_depth,
                ["surface-level", "practical", "deep"],
            ),
            describe_slider("Nervousness", t.nervousness, ["calm", "slightly tense", "anxious"]),
            describe_slider(
                "Collaboration",
                t.collaboration,
                ["works alone", "checks in occasionally", "thinks out loud with the interviewer"],
            ),
        ];
        lines.join("\n")
    }
}

/// Clamps a slider to `[0, 100]`; NaN becomes 0.
pub fn clamp_trait(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn describe_slider(label: &str, value: f64, levels: [&str; 3]) -> String {
    let level = match value {
        v if v < 34.0 => levels[0],
        v if v < 67.0 => levels[1],
        _ => levels[2],
    };
    format!("{label}: {value:.0}/100 ({level})")
}

/// One worked example for the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FewShot {
    /// What the interviewer said.
    pub interviewer: String,
    /// How the candidate should respond, in prose.
    pub guidance: String,
    /// Edits that accompany the reply, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_edits: Vec<CodeEdit>,
}

impl FewShot {
    pub fn new(interviewer: impl Into<String>, guidance: impl Into<String>) -> Self {
        Self {
            interviewer: interviewer.into(),
            guidance: guidance.into(),
            code_edits: Vec::new(),
        }
    }
}

/// Assembled prompt and its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePrompt {
    pub system: String,
    pub persona: String,
    pub behavior_rules: Vec<String>,
    pub few_shots: Vec<FewShot>,
}

/// Builds the candidate system prompt.
///
/// # Errors
///
/// Returns [`CandidateError::Prompt`] if any few-shot guidance looks like
/// code. Nothing is assembled in that case.
pub fn build_candidate_prompt(
    traits: &CandidateTraits,
    few_shots: &[FewShot],
) -> Result<CandidatePrompt> {
    validate_few_shots(few_shots)?;

    let persona = traits.describe();
    let behavior_rules: Vec<String> = BEHAVIOR_RULES.iter().map(|r| (*r).to_owned()).collect();

    let mut parts: Vec<String> = Vec::with_capacity(3 + few_shots.len());
    parts.push(CORE_PROMPT.to_owned());
    parts.push(format!("Persona:\n{persona}"));
    parts.push(format!(
        "Rules:\n{}",
        behavior_rules
            .iter()
            .map(|r| format!("- {r}"))
            .collect::<Vec<_>>()
            .join("\n")
    ));
    for (i, shot) in few_shots.iter().enumerate() {
        let mut example = format!(
            "Example {}:\nInterviewer: {}\nCandidate: {}",
            i + 1,
            shot.interviewer.trim(),
            shot.guidance.trim()
        );
        if !shot.code_edits.is_empty() {
            example.push_str(&format!(
                "\n(accompanied by {} structured edit(s))",
                shot.code_edits.len()
            ));
        }
        parts.push(example);
    }

    Ok(CandidatePrompt {
        system: parts.join("\n\n"),
        persona,
        behavior_rules,
        few_shots: few_shots.to_vec(),
    })
}

fn validate_few_shots(few_shots: &[FewShot]) -> Result<()> {
    for (i, shot) in few_shots.iter().enumerate() {
        if looks_like_code(&shot.guidance) {
            return Err(CandidateError::Prompt(format!(
                "few-shot example {} puts code in its guidance; use codeEdits instead",
                i + 1
            )));
        }
    }
    Ok(())
}
