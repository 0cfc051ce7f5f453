//! Sfinx candidate: the simulated interview candidate's response pipeline.
//!
//! An instruction to respond ([`pipeline::CandidateResponse`]) flows through
//! turn-taking, the speech queue and the shared editor buffer:
//!
//! Interviewer turn → Agent → Orchestrator → Speech → Code edits → Buffer
//!
//! # Architecture
//!
//! - **Editor**: versioned text, keystroke edit model, optimistic-concurrency apply
//! - **Pipeline**: turn coordinator and the orchestrator that speaks before it types
//! - **TTS**: FIFO playback queue over an injected [`tts::SpeechPlayer`]
//! - **Agent**: completion calls for spoken replies and structured edits
//! - **Knowledge base**: state mirrored to the remote conversational agent
//! - **Session**: per-interview composition of all of the above

pub mod agent;
pub mod code_guard;
pub mod config;
pub mod editor;
pub mod error;
pub mod knowledge_base;
pub mod persona;
pub mod pipeline;
pub mod runtime;
pub mod session;
pub mod tts;

pub use agent::{CandidateAgent, CompletionClient, OpenAiClient, OpenAiConfig};
pub use config::CandidateConfig;
pub use editor::{ApplyContract, CandidateContext, CodeEdit, EditorBuffer};
pub use error::{CandidateError, ErrorKind, Result};
pub use knowledge_base::{AgentChannel, KbVariables, KnowledgeBaseSync};
pub use pipeline::{CandidateOrchestrator, CandidateResponse, TurnTaking};
pub use runtime::CandidateEvent;
pub use session::CandidateSession;
pub use tts::{SpeechPlayer, TtsQueue};
