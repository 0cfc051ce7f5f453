//! Mirrors interview state to the remote conversational agent.
//!
//! The agent receives `KB_UPDATE: <json>` messages carrying the current
//! [`KbVariables`] and, once per detected AI-assisted change, a hidden
//! instruction to ask one follow-up question. Neither kind is shown in any
//! visible transcript.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Prefix of every state-sync message.
pub const KB_UPDATE_PREFIX: &str = "KB_UPDATE: ";

/// Hidden instruction sent on the `using_ai` rising edge.
pub const AI_USAGE_NUDGE: &str = "\
The candidate's code was just changed with AI assistance. Ask exactly one short \
follow-up question about the newly added code, then continue the interview as before.";

const SUMMARY_MAX_CHARS: usize = 500;

/// Session state mirrored to the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbVariables {
    pub candidate_name: String,
    pub is_coding: bool,
    pub using_ai: bool,
    pub current_code_summary: String,
    pub has_submitted: bool,
}

impl KbVariables {
    pub fn new(candidate_name: impl Into<String>) -> Self {
        Self {
            candidate_name: candidate_name.into(),
            ..Self::default()
        }
    }

    /// Renders the `KB_UPDATE: <json>` message.
    pub fn to_update_message(&self) -> String {
        // Serializing plain strings and bools cannot fail.
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_owned());
        format!("{KB_UPDATE_PREFIX}{json}")
    }
}

/// Partial update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KbPatch {
    pub candidate_name: Option<String>,
    pub is_coding: Option<bool>,
    pub using_ai: Option<bool>,
    pub current_code_summary: Option<String>,
    /// Ignored by [`KnowledgeBaseSync`] except through
    /// [`KnowledgeBaseSync::handle_submission`].
    pub has_submitted: Option<bool>,
}

impl KbPatch {
    /// Builds a patch from loosely typed JSON, coercing flag values to real booleans.
    ///
    /// `true`/`false`, non-zero numbers and the strings `"true"`, `"1"`,
    /// `"yes"` and `"on"` (any case) are accepted; `null` or a missing key
    /// leaves the field alone; anything else counts as `false`.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let text = |key: &str| {
            value.get(key).and_then(|v| match v {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
        };
        let flag = |key: &str| value.get(key).and_then(coerce_bool);
        Self {
            candidate_name: text("candidate_name"),
            is_coding: flag("is_coding"),
            using_ai: flag("using_ai"),
            current_code_summary: text("current_code_summary"),
            has_submitted: flag("has_submitted"),
        }
    }

    fn apply_to(self, vars: &mut KbVariables) {
        if let Some(v) = self.candidate_name {
            vars.candidate_name = v;
        }
        if let Some(v) = self.is_coding {
            vars.is_coding = v;
        }
        if let Some(v) = self.using_ai {
            vars.using_ai = v;
        }
        if let Some(v) = self.current_code_summary {
            vars.current_code_summary = v;
        }
        if let Some(v) = self.has_submitted {
            vars.has_submitted = v;
        }
    }
}

fn coerce_bool(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        serde_json::Value::String(s) => Some(matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )),
        _ => Some(false),
    }
}

/// Shortens code to a summary suitable for the knowledge base.
pub fn summarize_code(code: &str) -> String {
    let trimmed = code.trim();
    let lines = trimmed.lines().count();
    let mut preview: String = trimmed.chars().take(SUMMARY_MAX_CHARS).collect();
    if trimmed.chars().count() > SUMMARY_MAX_CHARS {
        preview.push_str("\n[truncated]");
    }
    format!("{lines} line(s):\n{preview}")
}

/// Message sink for the remote conversational agent.
#[async_trait]
pub trait AgentChannel: Send + Sync {
    /// Delivers a `KB_UPDATE: <json>` state-sync message.
    async fn update_knowledge_base(&self, message: &str) -> Result<()>;

    /// Delivers an instruction the agent acts on but never displays.
    async fn send_hidden_message(&self, message: &str) -> Result<()>;
}

#[derive(Debug)]
struct KbState {
    vars: KbVariables,
    submitted: bool,
}

/// Per-session knowledge-base state machine.
///
/// Updates are serialized; delivery failures are logged and never roll back
/// local state.
pub struct KnowledgeBaseSync {
    channel: Arc<dyn AgentChannel>,
    state: Mutex<KbState>,
}

impl std::fmt::Debug for KnowledgeBaseSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBaseSync").finish_non_exhaustive()
    }
}

impl KnowledgeBaseSync {
    pub fn new(channel: Arc<dyn AgentChannel>, candidate_name: impl Into<String>) -> Self {
        Self {
            channel,
            state: Mutex::new(KbState {
                vars: KbVariables::new(candidate_name),
                submitted: false,
            }),
        }
    }

    /// Current variables.
    pub async fn variables(&self) -> KbVariables {
        self.state.lock().await.vars.clone()
    }

    /// Merges `patch`, syncs the result and fires the AI-usage nudge on a
    /// `using_ai` rising edge.
    ///
    /// After a nudge `using_ai` is reset to `false` and synced again, so each
    /// detection produces exactly one follow-up.
    pub async fn update_kb_variables(&self, patch: KbPatch) -> KbVariables {
        let mut state = self.state.lock().await;
        let was_using_ai = state.vars.using_ai;
        patch.apply_to(&mut state.vars);
        // Only handle_submission moves this flag, and only once.
        if state.vars.has_submitted != state.submitted {
            debug!(
                requested = state.vars.has_submitted,
                "ignoring has_submitted outside submission"
            );
            state.vars.has_submitted = state.submitted;
        }
        self.sync(&state.vars).await;

        if !was_using_ai && state.vars.using_ai {
            info!("AI-assisted change detected; nudging agent for one follow-up");
            if let Err(e) = self.channel.send_hidden_message(AI_USAGE_NUDGE).await {
                warn!(code = e.code(), "failed to send AI usage nudge: {e}");
            }
            state.vars.using_ai = false;
            self.sync(&state.vars).await;
        }
        state.vars.clone()
    }

    /// Marks whether the candidate is actively coding.
    pub async fn set_coding_state(&self, is_coding: bool) -> KbVariables {
        self.update_kb_variables(KbPatch {
            is_coding: Some(is_coding),
            ..KbPatch::default()
        })
        .await
    }

    /// Reports code that was produced with AI assistance.
    pub async fn report_ai_usage(&self, code: &str) -> KbVariables {
        self.update_kb_variables(KbPatch {
            using_ai: Some(true),
            current_code_summary: Some(summarize_code(code)),
            ..KbPatch::default()
        })
        .await
    }

    /// Records the final submission. Only the first call has any effect.
    ///
    /// Returns `true` if this call performed the submission.
    pub async fn handle_submission(&self, code: &str) -> bool {
        {
            let mut state = self.state.lock().await;
            if state.submitted {
                debug!("submission already recorded; ignoring");
                return false;
            }
            state.submitted = true;
        }
        self.update_kb_variables(KbPatch {
            is_coding: Some(false),
            current_code_summary: Some(summarize_code(code)),
            has_submitted: Some(true),
            ..KbPatch::default()
        })
        .await;
        info!("submission synced to agent");
        true
    }

    async fn sync(&self, vars: &KbVariables) {
        let message = vars.to_update_message();
        debug!(
            is_coding = vars.is_coding,
            using_ai = vars.using_ai,
            has_submitted = vars.has_submitted,
            "syncing knowledge base"
        );
        if let Err(e) = self.channel.update_knowledge_base(&message).await {
            warn!(code = e.code(), "knowledge base sync failed: {e}");
        }
    }
}
