//! Configuration types for the candidate subsystem.

use crate::error::{CandidateError, Result};
use crate::persona::{CandidateTraits, FewShot};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for one interview deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateConfig {
    /// Completion provider settings.
    pub llm: LlmConfig,
    /// Editable file and allowlist.
    pub editor: EditorConfig,
    /// Persona sliders and candidate identity.
    pub persona: PersonaConfig,
    /// Speech queue settings.
    pub tts: TtsConfig,
}

/// OpenAI-compatible completion provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider base URL, with or without a trailing `/v1`.
    pub api_url: String,
    /// Model identifier sent with each request.
    pub api_model: String,
    /// Inline API key. Prefer `api_key_env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Sampling temperature for spoken replies.
    pub reply_temperature: f32,
    /// Sampling temperature for structured code edits.
    pub edit_temperature: f32,
    /// Conversation messages kept in each request (0 = unbounded).
    pub max_history_messages: usize,
    /// Maximum characters of file context included in a request.
    pub max_context_chars: usize,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com".to_owned(),
            api_model: "gpt-4o-mini".to_owned(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_owned(),
            reply_temperature: 0.7,
            edit_temperature: 0.2,
            max_history_messages: 12,
            max_context_chars: 6000,
            request_timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    /// Resolves the API key: inline value first, then the environment.
    ///
    /// Blank values count as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }
}

/// The shared file the candidate edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// File name edits must target.
    pub file: String,
    /// Files edits may touch.
    pub allowlist: Vec<String>,
    /// Version id the buffer starts at.
    pub initial_version: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            file: "solution.ts".to_owned(),
            allowlist: vec!["solution.ts".to_owned()],
            initial_version: "v1".to_owned(),
        }
    }
}

/// Candidate identity and persona sliders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Name mirrored to the conversational agent.
    pub candidate_name: String,
    /// Persona sliders (0-100).
    pub traits: CandidateTraits,
    /// Worked examples appended to the system prompt.
    pub few_shots: Vec<FewShot>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            candidate_name: "Candidate".to_owned(),
            traits: CandidateTraits::default(),
            few_shots: Vec::new(),
        }
    }
}

/// Speech queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Log playback failures at warn level.
    pub log_failures: bool,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self { log_failures: true }
    }
}

impl CandidateConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CandidateError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CandidateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/sfinx/candidate.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("sfinx").join("candidate.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("sfinx")
                .join("candidate.toml")
        } else {
            PathBuf::from("/tmp/sfinx-config/candidate.toml")
        }
    }

    /// Checks values serde cannot constrain.
    ///
    /// # Errors
    ///
    /// Returns [`CandidateError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_url.trim().is_empty() {
            return Err(CandidateError::Config("llm.api_url is empty".to_owned()));
        }
        if self.llm.api_model.trim().is_empty() {
            return Err(CandidateError::Config("llm.api_model is empty".to_owned()));
        }
        for (name, value) in [
            ("llm.reply_temperature", self.llm.reply_temperature),
            ("llm.edit_temperature", self.llm.edit_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(CandidateError::Config(format!(
                    "{name} must be within [0, 2], got {value}"
                )));
            }
        }
        if !self.editor.allowlist.contains(&self.editor.file) {
            return Err(CandidateError::Config(format!(
                "editor.allowlist does not contain editor.file '{}'",
                self.editor.file
            )));
        }
        Ok(())
    }
}
