//! Shared helpers for integration tests.

use async_trait::async_trait;
use serde_json::json;
use sfinx_candidate::agent::{OpenAiClient, OpenAiConfig};
use sfinx_candidate::knowledge_base::{AgentChannel, KB_UPDATE_PREFIX, KbVariables};
use sfinx_candidate::tts::SpeechPlayer;
use std::sync::{Arc, Mutex};

/// Speech player that records every utterance.
#[derive(Default)]
pub(crate) struct RecordingPlayer {
    pub spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechPlayer for RecordingPlayer {
    async fn play(&self, text: &str) -> sfinx_candidate::Result<()> {
        self.spoken.lock().unwrap().push(text.to_owned());
        Ok(())
    }
}

impl RecordingPlayer {
    pub(crate) fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

/// Message delivered to the conversational agent.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AgentMessage {
    Kb(KbVariables),
    Hidden(String),
}

/// Agent channel that records every message.
#[derive(Default)]
pub(crate) struct RecordingChannel {
    pub sent: Mutex<Vec<AgentMessage>>,
}

#[async_trait]
impl AgentChannel for RecordingChannel {
    async fn update_knowledge_base(&self, message: &str) -> sfinx_candidate::Result<()> {
        let json = message
            .strip_prefix(KB_UPDATE_PREFIX)
            .expect("KB_UPDATE prefix");
        let vars = serde_json::from_str(json).expect("KB_UPDATE payload");
        self.sent.lock().unwrap().push(AgentMessage::Kb(vars));
        Ok(())
    }

    async fn send_hidden_message(&self, message: &str) -> sfinx_candidate::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push(AgentMessage::Hidden(message.to_owned()));
        Ok(())
    }
}

impl RecordingChannel {
    pub(crate) fn sent(&self) -> Vec<AgentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

/// `OpenAiClient` pointed at a mock server.
pub(crate) fn openai_client(base_url: &str) -> Arc<OpenAiClient> {
    let config = OpenAiConfig::new("test-key", "gpt-4o-mini").with_base_url(base_url);
    Arc::new(OpenAiClient::new(config).expect("build client"))
}

/// A chat completion response body carrying `content`.
pub(crate) fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}
