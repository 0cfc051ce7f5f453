//! Candidate agent: turns interviewer input into spoken replies and
//! structured code edits by calling a chat completion provider.
//!
//! Spoken replies never carry code. Anything code-shaped in a reply is
//! sanitized before it is returned; code reaches the editor only through
//! [`CandidateAgent::generate_code_edits`].

pub mod message;
pub mod openai;

pub use message::{ChatMessage, Role, bounded_history};
pub use openai::{CompletionClient, CompletionRequest, OpenAiClient, OpenAiConfig};

use crate::code_guard::{looks_like_code, sanitize_spoken_text};
use crate::config::LlmConfig;
use crate::editor::{CandidateContext, CodeEdit};
use crate::error::CandidateError;
use crate::persona::CandidatePrompt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reply returned when no API key is configured.
pub const MISSING_KEY_REPLY: &str = "Error: no API key is configured for the candidate.";

/// Reply returned when the completion call fails.
pub const FAILED_REPLY: &str = "Error: the candidate could not generate a reply.";

const EDIT_INSTRUCTIONS: &str = "\
You are editing the candidate's code. Respond with a single JSON object of the form \
{\"codeEdits\": [{\"file\": string, \"range\": {\"start\": integer, \"end\": integer}, \
\"replacement\": string}]}. Ranges are half-open character offsets into the file text \
exactly as shown, and must not overlap. Use an empty array if no change is needed. \
Do not include any other keys or any prose.";

/// Sampling and context limits for the agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentLimits {
    pub reply_temperature: f32,
    pub edit_temperature: f32,
    pub max_history_messages: usize,
    pub max_context_chars: usize,
}

impl Default for AgentLimits {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for AgentLimits {
    fn from(llm: &LlmConfig) -> Self {
        Self {
            reply_temperature: llm.reply_temperature,
            edit_temperature: llm.edit_temperature,
            max_history_messages: llm.max_history_messages,
            max_context_chars: llm.max_context_chars,
        }
    }
}

/// LLM-backed candidate.
#[derive(Clone)]
pub struct CandidateAgent {
    client: Arc<dyn CompletionClient>,
    system_prompt: String,
    limits: AgentLimits,
}

impl std::fmt::Debug for CandidateAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateAgent")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl CandidateAgent {
    pub fn new(client: Arc<dyn CompletionClient>, prompt: &CandidatePrompt) -> Self {
        Self {
            client,
            system_prompt: prompt.system.clone(),
            limits: AgentLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: AgentLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Produces the candidate's next spoken reply.
    ///
    /// Always returns displayable text: provider failures come back as
    /// [`MISSING_KEY_REPLY`] or [`FAILED_REPLY`].
    pub async fn generate_candidate_reply(
        &self,
        input: &str,
        history: &[ChatMessage],
        context: Option<&CandidateContext>,
    ) -> String {
        let mut messages = vec![ChatMessage::system(self.system_prompt.clone())];
        if let Some(ctx) = context {
            messages.push(ChatMessage::system(self.file_context(ctx)));
        }
        messages.extend_from_slice(bounded_history(history, self.limits.max_history_messages));
        messages.push(ChatMessage::user(input));

        let request = CompletionRequest::new(messages, self.limits.reply_temperature);
        match self.client.complete(&request).await {
            Ok(text) => {
                let text = text.trim();
                if looks_like_code(text) {
                    debug!("reply contained code; sanitizing before speech");
                    sanitize_spoken_text(text)
                } else {
                    text.to_owned()
                }
            }
            Err(CandidateError::MissingApiKey) => {
                warn!("candidate reply skipped: no API key configured");
                MISSING_KEY_REPLY.to_owned()
            }
            Err(e) => {
                warn!(code = e.code(), "candidate reply failed: {e}");
                FAILED_REPLY.to_owned()
            }
        }
    }

    /// Asks the model for structured edits against `context`.
    ///
    /// Returns only the well-formed edits. Provider failures and unparseable
    /// output yield an empty list.
    pub async fn generate_code_edits(
        &self,
        context: &CandidateContext,
        history: &[ChatMessage],
        task: &str,
        plan: Option<&str>,
    ) -> Vec<CodeEdit> {
        let mut messages = vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::system(EDIT_INSTRUCTIONS),
            ChatMessage::system(format!(
                "File: {}\n---\n{}\n---",
                context.file, context.text
            )),
        ];
        messages.extend_from_slice(bounded_history(history, self.limits.max_history_messages));
        let mut ask = format!("Task: {}", task.trim());
        if let Some(plan) = plan.map(str::trim).filter(|p| !p.is_empty()) {
            ask.push_str(&format!("\nPlan: {plan}"));
        }
        messages.push(ChatMessage::user(ask));

        let request =
            CompletionRequest::new(messages, self.limits.edit_temperature).with_json_mode(true);
        match self.client.complete(&request).await {
            Ok(raw) => parse_code_edits(&raw),
            Err(e) => {
                warn!(code = e.code(), "code edit generation failed: {e}");
                Vec::new()
            }
        }
    }

    fn file_context(&self, ctx: &CandidateContext) -> String {
        let limit = self.limits.max_context_chars;
        let mut text: String = ctx.text.chars().take(limit).collect();
        if ctx.text.chars().count() > limit {
            text.push_str("\n[truncated]");
        }
        format!(
            "Current contents of {} (version {}):\n{}",
            ctx.file, ctx.version_id, text
        )
    }
}

/// Extracts `codeEdits` from a model response, dropping malformed items.
pub fn parse_code_edits(raw: &str) -> Vec<CodeEdit> {
    let body = strip_json_fence(raw);
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            warn!("code edit response is not JSON: {e}");
            return Vec::new();
        }
    };
    let Some(items) = value.get("codeEdits").and_then(|v| v.as_array()) else {
        warn!("code edit response has no codeEdits array");
        return Vec::new();
    };

    let edits: Vec<CodeEdit> = items
        .iter()
        .filter_map(|item| serde_json::from_value::<CodeEdit>(item.clone()).ok())
        .collect();
    if edits.len() < items.len() {
        debug!(
            dropped = items.len() - edits.len(),
            kept = edits.len(),
            "dropped malformed code edits"
        );
    }
    edits
}

fn strip_json_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
