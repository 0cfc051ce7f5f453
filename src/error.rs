//! Error types for the candidate-response subsystem.
//!
//! Each variant carries a stable error code (SCREAMING_SNAKE_CASE) accessible
//! via [`CandidateError::code()`]. Codes are part of the public contract; UI
//! layers should branch on [`CandidateError::kind()`] or the code rather than
//! on Display output.

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// Caller presented a stale `versionId`.
    pub const VERSION_MISMATCH: &str = "VERSION_MISMATCH";
    /// Caller presented a `beforeHash` that does not match the buffer text.
    pub const HASH_MISMATCH: &str = "HASH_MISMATCH";
    /// Both the version and the hash were stale.
    pub const CONTRACT_MISMATCH: &str = "CONTRACT_MISMATCH";
    /// Edit targets a file outside the allowlist.
    pub const FILE_NOT_ALLOWED: &str = "FILE_NOT_ALLOWED";
    /// Edit range falls outside the pre-edit text.
    pub const RANGE_OUT_OF_BOUNDS: &str = "RANGE_OUT_OF_BOUNDS";
    /// Code edits were supplied without `allow_code_edits`.
    pub const CODE_EDITS_NOT_ALLOWED: &str = "CODE_EDITS_NOT_ALLOWED";
    /// Applying an already validated batch failed.
    pub const APPLY_FAILED: &str = "APPLY_FAILED";
    /// Prompt construction rejected its inputs.
    pub const PROMPT_INVALID: &str = "PROMPT_INVALID";
    /// No API key is configured for the completion provider.
    pub const MISSING_API_KEY: &str = "MISSING_API_KEY";
    /// Provider rejected the credentials.
    pub const AUTH_FAILED: &str = "AUTH_FAILED";
    /// Request to the provider failed (network, rate limit).
    pub const REQUEST_FAILED: &str = "REQUEST_FAILED";
    /// Provider returned an error status not covered above.
    pub const PROVIDER_ERROR: &str = "PROVIDER_ERROR";
    /// Provider response did not have the expected shape.
    pub const RESPONSE_INVALID: &str = "RESPONSE_INVALID";
    /// Speech playback failed.
    pub const SPEECH_FAILED: &str = "SPEECH_FAILED";
    /// Conversational agent channel rejected a message.
    pub const AGENT_CHANNEL: &str = "AGENT_CHANNEL";
    /// Invalid or missing configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
    /// Filesystem error.
    pub const IO_ERROR: &str = "IO_ERROR";
}

/// A single stale field in an apply contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Value the caller presented.
    pub incoming: String,
    /// Value the buffer currently holds.
    pub current: String,
}

/// Coarse classification used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller error; nothing changed, re-fetch state and retry.
    Contract,
    /// Caller attempted a disallowed operation.
    Policy,
    /// A remote service failed; try later.
    External,
    /// Programming error in prompt authoring.
    Construction,
    /// Invalid configuration or local I/O.
    Config,
}

/// Top-level error type for the candidate subsystem.
#[derive(Debug, thiserror::Error)]
pub enum CandidateError {
    #[error("VersionMismatch: expected {}, got {}", .0.current, .0.incoming)]
    VersionMismatch(Mismatch),

    #[error("HashMismatch: expected {}, got {}", .0.current, .0.incoming)]
    HashMismatch(Mismatch),

    /// Both contract fields were stale.
    #[error(
        "VersionMismatch: expected {}, got {}; HashMismatch: expected {}, got {}",
        .version.current, .version.incoming, .hash.current, .hash.incoming
    )]
    ContractMismatch { version: Mismatch, hash: Mismatch },

    #[error("file not allowed")]
    FileNotAllowed { file: String },

    #[error("edit range out of bounds")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    #[error("code edits not allowed")]
    CodeEditsNotAllowed,

    #[error("apply failed: {0}")]
    Apply(String),

    #[error("invalid prompt: {0}")]
    Prompt(String),

    #[error("no API key configured for the completion provider")]
    MissingApiKey,

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("speech playback error: {0}")]
    Speech(String),

    #[error("agent channel error: {0}")]
    AgentChannel(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CandidateError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        use error_codes::*;
        match self {
            Self::VersionMismatch(_) => VERSION_MISMATCH,
            Self::HashMismatch(_) => HASH_MISMATCH,
            Self::ContractMismatch { .. } => CONTRACT_MISMATCH,
            Self::FileNotAllowed { .. } => FILE_NOT_ALLOWED,
            Self::RangeOutOfBounds { .. } => RANGE_OUT_OF_BOUNDS,
            Self::CodeEditsNotAllowed => CODE_EDITS_NOT_ALLOWED,
            Self::Apply(_) => APPLY_FAILED,
            Self::Prompt(_) => PROMPT_INVALID,
            Self::MissingApiKey => MISSING_API_KEY,
            Self::Auth(_) => AUTH_FAILED,
            Self::Request(_) => REQUEST_FAILED,
            Self::Provider(_) => PROVIDER_ERROR,
            Self::InvalidResponse(_) => RESPONSE_INVALID,
            Self::Speech(_) => SPEECH_FAILED,
            Self::AgentChannel(_) => AGENT_CHANNEL,
            Self::Config(_) => CONFIG_INVALID,
            Self::Io(_) => IO_ERROR,
        }
    }

    /// Classifies the error for the consuming layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::VersionMismatch(_)
            | Self::HashMismatch(_)
            | Self::ContractMismatch { .. }
            | Self::FileNotAllowed { .. }
            | Self::RangeOutOfBounds { .. }
            | Self::Apply(_) => ErrorKind::Contract,
            Self::CodeEditsNotAllowed => ErrorKind::Policy,
            Self::MissingApiKey
            | Self::Auth(_)
            | Self::Request(_)
            | Self::Provider(_)
            | Self::InvalidResponse(_)
            | Self::Speech(_)
            | Self::AgentChannel(_) => ErrorKind::External,
            Self::Prompt(_) => ErrorKind::Construction,
            Self::Config(_) | Self::Io(_) => ErrorKind::Config,
        }
    }

    /// True when retrying can succeed without changing code or config.
    ///
    /// Stale contracts succeed after the caller re-reads the buffer; request
    /// and provider errors are usually transient (timeouts, 429, 5xx).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::VersionMismatch(_) | Self::HashMismatch(_) | Self::ContractMismatch { .. } => {
                true
            }
            Self::Request(_) | Self::Provider(_) | Self::AgentChannel(_) => true,
            _ => false,
        }
    }

    /// True for any stale-version or stale-hash rejection.
    pub fn is_stale_contract(&self) -> bool {
        matches!(
            self,
            Self::VersionMismatch(_) | Self::HashMismatch(_) | Self::ContractMismatch { .. }
        )
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, CandidateError>;
