//! Speech output for the simulated candidate.
//!
//! Synthesis and audio output live outside this crate; they are reached
//! through the [`SpeechPlayer`] trait. [`TtsQueue`] serializes calls into it.

mod queue;

pub use queue::{SpeechOutcome, TtsQueue, UtteranceHandle};

use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Plays one utterance to completion.
///
/// Implementations may call a browser audio API, a remote TTS endpoint or
/// anything else; the queue only needs to know when playback finished and
/// whether it failed.
#[async_trait]
pub trait SpeechPlayer: Send + Sync + 'static {
    async fn play(&self, text: &str) -> Result<()>;
}

/// Player that writes utterances to the log instead of producing audio.
///
/// Used by the replay harness and for headless sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPlayer;

#[async_trait]
impl SpeechPlayer for LogPlayer {
    async fn play(&self, text: &str) -> Result<()> {
        info!(target: "sfinx_candidate::speech", "candidate says: {text}");
        Ok(())
    }
}
