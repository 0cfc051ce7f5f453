//! Per-interview composition root.
//!
//! A [`CandidateSession`] owns everything one interview needs: the editor
//! buffer, turn coordinator, speech queue, orchestrator, agent and
//! knowledge-base sync. All one-shot flags live on the session, so a new
//! interview always starts clean.

use crate::agent::{
    AgentLimits, CandidateAgent, ChatMessage, CompletionClient, FAILED_REPLY, MISSING_KEY_REPLY,
};
use crate::code_guard::sanitize_spoken_text;
use crate::config::CandidateConfig;
use crate::editor::{CandidateContext, EditorBuffer};
use crate::error::Result;
use crate::knowledge_base::{AgentChannel, KbPatch, KbVariables, KnowledgeBaseSync, summarize_code};
use crate::persona::build_candidate_prompt;
use crate::pipeline::{
    CandidateControls, CandidateOrchestrator, CandidateOutcome, CandidateResponse,
    RespondWithCandidate, TurnTaking,
};
use crate::runtime::CandidateEvent;
use crate::tts::{SpeechPlayer, TtsQueue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 64;

/// One interview's candidate.
pub struct CandidateSession {
    file: String,
    max_history: usize,
    allow_code_edits: AtomicBool,
    orchestrator: CandidateOrchestrator,
    agent: CandidateAgent,
    kb: KnowledgeBaseSync,
    history: tokio::sync::Mutex<Vec<ChatMessage>>,
    events: broadcast::Sender<CandidateEvent>,
}

impl std::fmt::Debug for CandidateSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateSession")
            .field("file", &self.file)
            .field("allow_code_edits", &self.allow_code_edits())
            .finish_non_exhaustive()
    }
}

impl CandidateSession {
    /// Builds a session around `initial_text`.
    ///
    /// # Errors
    ///
    /// [`crate::CandidateError::Config`] if the config does not validate and
    /// [`crate::CandidateError::Prompt`] if a configured few-shot contains code.
    pub fn new(
        config: CandidateConfig,
        player: Arc<dyn SpeechPlayer>,
        agent_channel: Arc<dyn AgentChannel>,
        completion_client: Arc<dyn CompletionClient>,
        initial_text: impl Into<String>,
    ) -> Result<Self> {
        config.validate()?;
        let prompt = build_candidate_prompt(&config.persona.traits, &config.persona.few_shots)?;

        let buffer = EditorBuffer::new(
            initial_text,
            config.editor.initial_version.clone(),
            config.editor.allowlist.clone(),
        );
        let tts = if config.tts.log_failures {
            TtsQueue::new(player)
        } else {
            TtsQueue::with_error_handler(player, |_, _| {})
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let orchestrator = CandidateOrchestrator::new(
            tts,
            Arc::new(TurnTaking::new()),
            Arc::new(Mutex::new(buffer)),
        )
        .with_runtime_events(events.clone());

        let agent = CandidateAgent::new(completion_client, &prompt)
            .with_limits(AgentLimits::from(&config.llm));
        let kb = KnowledgeBaseSync::new(agent_channel, config.persona.candidate_name.clone());

        info!(
            file = %config.editor.file,
            version_id = %config.editor.initial_version,
            model = %config.llm.api_model,
            "candidate session started"
        );

        Ok(Self {
            file: config.editor.file,
            max_history: config.llm.max_history_messages,
            allow_code_edits: AtomicBool::new(false),
            orchestrator,
            agent,
            kb,
            history: tokio::sync::Mutex::new(Vec::new()),
            events,
        })
    }

    /// Lets subsequent [`propose_edits`](Self::propose_edits) calls touch the buffer.
    pub fn set_allow_code_edits(&self, allow: bool) {
        self.allow_code_edits.store(allow, Ordering::SeqCst);
    }

    pub fn allow_code_edits(&self) -> bool {
        self.allow_code_edits.load(Ordering::SeqCst)
    }

    pub fn orchestrator(&self) -> &CandidateOrchestrator {
        &self.orchestrator
    }

    pub fn knowledge_base(&self) -> &KnowledgeBaseSync {
        &self.kb
    }

    /// Subscribes to speech and edit events.
    pub fn subscribe(&self) -> broadcast::Receiver<CandidateEvent> {
        self.events.subscribe()
    }

    /// Conversation so far, oldest first.
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().await.clone()
    }

    /// Hydrates the context the agent and callers need for the next edit.
    pub fn context(&self) -> Result<CandidateContext> {
        let snapshot = self.orchestrator.snapshot()?;
        Ok(CandidateContext {
            file: self.file.clone(),
            before_hash: snapshot.content_hash(),
            version_id: snapshot.version_id,
            text: snapshot.text,
        })
    }

    /// Answers the interviewer out loud.
    ///
    /// # Errors
    ///
    /// Only buffer access failures; provider problems surface as spoken
    /// error text.
    pub async fn respond_to_interviewer(&self, input: &str) -> Result<CandidateOutcome> {
        let context = self.context()?;
        let history = self.history().await;
        let reply = self
            .agent
            .generate_candidate_reply(input, &history, Some(&context))
            .await;

        if reply != MISSING_KEY_REPLY && reply != FAILED_REPLY {
            self.remember([ChatMessage::user(input), ChatMessage::assistant(reply.clone())])
                .await;
        }

        let response = CandidateResponse {
            respond: RespondWithCandidate::speech(reply),
            ..CandidateResponse::default()
        };
        self.orchestrator.handle_candidate_response(&response).await
    }

    /// Asks the agent for edits and applies them under the current contract.
    ///
    /// A non-empty `plan` is spoken first as a lead-in. When the agent
    /// returns no usable edits nothing is spoken or applied.
    ///
    /// # Errors
    ///
    /// [`crate::CandidateError::CodeEditsNotAllowed`] unless
    /// [`set_allow_code_edits`](Self::set_allow_code_edits) was enabled, and
    /// any contract or bounds rejection from the buffer.
    pub async fn propose_edits(&self, task: &str, plan: Option<&str>) -> Result<CandidateOutcome> {
        let context = self.context()?;
        let history = self.history().await;
        let edits = self
            .agent
            .generate_code_edits(&context, &history, task, plan)
            .await;
        if edits.is_empty() {
            debug!(task, "agent proposed no edits");
            return Ok(CandidateOutcome::default());
        }

        let lead_in = plan
            .map(sanitize_spoken_text)
            .filter(|p| !p.trim().is_empty());
        let response = CandidateResponse {
            respond: RespondWithCandidate {
                text: lead_in,
                code_edits: edits,
            },
            controls: CandidateControls {
                allow_code_edits: self.allow_code_edits(),
            },
            apply: Some(context.contract()),
        };
        let outcome = self.orchestrator.handle_candidate_response(&response).await?;

        if let Some(applied) = &outcome.applied {
            self.kb
                .update_kb_variables(KbPatch {
                    current_code_summary: Some(summarize_code(&applied.text)),
                    ..KbPatch::default()
                })
                .await;
        }
        Ok(outcome)
    }

    pub async fn set_coding_state(&self, is_coding: bool) -> KbVariables {
        self.kb.set_coding_state(is_coding).await
    }

    pub async fn report_ai_usage(&self, code: &str) -> KbVariables {
        self.kb.report_ai_usage(code).await
    }

    /// Records the final submission; later calls are ignored.
    pub async fn submit(&self, code: &str) -> bool {
        self.kb.handle_submission(code).await
    }

    async fn remember(&self, messages: impl IntoIterator<Item = ChatMessage>) {
        let mut history = self.history.lock().await;
        history.extend(messages);
        if self.max_history > 0 && history.len() > self.max_history {
            let excess = history.len() - self.max_history;
            history.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::agent::CompletionRequest;
    use crate::error::CandidateError;
    use crate::persona::FewShot;
    use crate::tts::LogPlayer;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    struct QueueClient(StdMutex<VecDeque<Result<String>>>);

    impl QueueClient {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self(StdMutex::new(replies.into())))
        }
    }

    #[async_trait]
    impl CompletionClient for QueueClient {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CandidateError::Provider("exhausted".into())))
        }
    }

    #[derive(Default)]
    struct NullChannel;

    #[async_trait]
    impl AgentChannel for NullChannel {
        async fn update_knowledge_base(&self, _message: &str) -> Result<()> {
            Ok(())
        }

        async fn send_hidden_message(&self, _message: &str) -> Result<()> {
            Ok(())
        }
    }

    fn session(replies: Vec<Result<String>>) -> CandidateSession {
        CandidateSession::new(
            CandidateConfig::default(),
            Arc::new(LogPlayer),
            Arc::new(NullChannel),
            QueueClient::new(replies),
            "let x = 1;",
        )
        .unwrap()
    }

    #[test]
    fn code_in_few_shot_fails_construction() {
        let mut config = CandidateConfig::default();
        config
            .persona
            .few_shots
            .push(FewShot::new("Show me", "```ts\nlet y = 2;\n```"));
        let err = CandidateSession::new(
            config,
            Arc::new(LogPlayer),
            Arc::new(NullChannel),
            QueueClient::new(vec![]),
            "",
        )
        .unwrap_err();
        assert_eq!(err.code(), "PROMPT_INVALID");
    }

    #[tokio::test]
    async fn context_tracks_buffer() {
        let s = session(vec![]);
        let ctx = s.context().unwrap();
        assert_eq!(ctx.file, "solution.ts");
        assert_eq!(ctx.version_id, "v1");
        assert_eq!(ctx.before_hash, crate::editor::compute_hash("let x = 1;"));
    }

    #[tokio::test]
    async fn reply_is_spoken_and_remembered() {
        let s = session(vec![Ok("I'd use a set.".into())]);
        let outcome = s.respond_to_interviewer("Any ideas?").await.unwrap();
        assert!(outcome.speech.unwrap().is_played());
        let history = s.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "I'd use a set.");
    }

    #[tokio::test]
    async fn failed_reply_is_not_remembered() {
        let s = session(vec![Err(CandidateError::Provider("down".into()))]);
        s.respond_to_interviewer("hello").await.unwrap();
        assert!(s.history().await.is_empty());
    }

    #[tokio::test]
    async fn edits_need_permission() {
        let edits = r#"{"codeEdits":[{"file":"solution.ts","range":{"start":8,"end":9},"replacement":"2"}]}"#;
        let s = session(vec![Ok(edits.into()), Ok(edits.into())]);

        let err = s.propose_edits("bump the value", None).await.unwrap_err();
        assert!(matches!(err, CandidateError::CodeEditsNotAllowed));
        assert_eq!(s.context().unwrap().text, "let x = 1;");

        s.set_allow_code_edits(true);
        let outcome = s
            .propose_edits("bump the value", Some("I'll change the literal."))
            .await
            .unwrap();
        assert_eq!(outcome.applied.unwrap().text, "let x = 2;");
        assert!(outcome.speech.unwrap().is_played());
        assert_eq!(s.context().unwrap().version_id, "v2");
        assert!(
            s.knowledge_base()
                .variables()
                .await
                .current_code_summary
                .contains("let x = 2;")
        );
    }

    #[tokio::test]
    async fn no_edits_is_a_quiet_no_op() {
        let s = session(vec![Ok(r#"{"codeEdits":[]}"#.into())]);
        s.set_allow_code_edits(true);
        let outcome = s.propose_edits("nothing", Some("Looks fine.")).await.unwrap();
        assert_eq!(outcome, CandidateOutcome::default());
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let mut config = CandidateConfig::default();
        config.llm.max_history_messages = 2;
        let s = CandidateSession::new(
            config,
            Arc::new(LogPlayer),
            Arc::new(NullChannel),
            QueueClient::new(vec![Ok("one".into()), Ok("two".into())]),
            "",
        )
        .unwrap();
        s.respond_to_interviewer("a").await.unwrap();
        s.respond_to_interviewer("b").await.unwrap();
        let history = s.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "b");
        assert_eq!(history[1].content, "two");
    }

    #[tokio::test]
    async fn submit_is_one_shot_per_session() {
        let s = session(vec![]);
        assert!(s.submit("done").await);
        assert!(!s.submit("done again").await);
        let fresh = session(vec![]);
        assert!(fresh.submit("done").await);
    }
}
