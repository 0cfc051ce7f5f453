//! Full interview sessions against a mock completion provider.

use crate::helpers::{AgentMessage, RecordingChannel, RecordingPlayer, completion_body, openai_client};
use serde_json::json;
use sfinx_candidate::agent::{FAILED_REPLY, OpenAiClient, OpenAiConfig};
use sfinx_candidate::code_guard::CODE_PLACEHOLDER;
use sfinx_candidate::knowledge_base::AI_USAGE_NUDGE;
use sfinx_candidate::{CandidateConfig, CandidateError, CandidateSession};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SOURCE: &str = "const xs = [3, 1, 2];\n";

struct Harness {
    session: CandidateSession,
    player: Arc<RecordingPlayer>,
    channel: Arc<RecordingChannel>,
}

fn harness(server: &MockServer) -> Harness {
    let player = Arc::new(RecordingPlayer::default());
    let channel = Arc::new(RecordingChannel::default());
    let session = CandidateSession::new(
        CandidateConfig::default(),
        player.clone(),
        channel.clone(),
        openai_client(&server.uri()),
        SOURCE,
    )
    .unwrap();
    Harness {
        session,
        player,
        channel,
    }
}

#[tokio::test]
async fn spoken_reply_is_scrubbed_of_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "I'd sort it first:\n```ts\nxs.sort();\n```\nthen scan once.",
        )))
        .mount(&server)
        .await;

    let h = harness(&server);
    let outcome = h
        .session
        .respond_to_interviewer("How would you find the median?")
        .await
        .unwrap();
    assert!(outcome.speech.unwrap().is_played());

    let spoken = h.player.spoken();
    assert_eq!(spoken.len(), 1);
    assert!(spoken[0].contains(CODE_PLACEHOLDER));
    assert!(!spoken[0].contains("xs.sort"));
}

#[tokio::test]
async fn provider_outage_is_spoken_as_error_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let h = harness(&server);
    h.session.respond_to_interviewer("Hello?").await.unwrap();
    assert_eq!(h.player.spoken(), vec![FAILED_REPLY]);
    assert!(h.session.history().await.is_empty());
}

#[tokio::test]
async fn missing_key_never_reaches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let config = OpenAiConfig::new("", "gpt-4o-mini").with_base_url(server.uri());
    assert!(config.api_key.is_none());
    let client = Arc::new(OpenAiClient::new(config).unwrap());
    let session = CandidateSession::new(
        CandidateConfig::default(),
        Arc::new(RecordingPlayer::default()),
        Arc::new(RecordingChannel::default()),
        client,
        SOURCE,
    )
    .unwrap();
    session.respond_to_interviewer("hi").await.unwrap();
}

#[tokio::test]
async fn proposed_edits_apply_under_current_contract() {
    let server = MockServer::start().await;
    let edits = json!({
        "codeEdits": [
            {"file": "solution.ts", "range": {"start": 0, "end": 5}, "replacement": "let"},
            {"file": "solution.ts", "range": {"start": "x", "end": 1}, "replacement": "bad"}
        ]
    })
    .to_string();
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"response_format": {"type": "json_object"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&edits)))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    h.session.set_allow_code_edits(true);
    let outcome = h
        .session
        .propose_edits("make the binding mutable", Some("I'll switch it to a let."))
        .await
        .unwrap();

    let applied = outcome.applied.unwrap();
    assert_eq!(applied.text, "let xs = [3, 1, 2];\n");
    assert_eq!(applied.version_id, "v2");
    assert_eq!(h.session.context().unwrap().before_hash, applied.hash);
    assert_eq!(h.player.spoken(), vec!["I'll switch it to a let."]);
}

#[tokio::test]
async fn edits_without_permission_leave_buffer_untouched() {
    let server = MockServer::start().await;
    let edits = json!({
        "codeEdits": [{"file": "solution.ts", "range": {"start": 0, "end": 0}, "replacement": "// hi\n"}]
    })
    .to_string();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&edits)))
        .mount(&server)
        .await;

    let h = harness(&server);
    let err = h.session.propose_edits("comment it", None).await.unwrap_err();
    assert!(matches!(err, CandidateError::CodeEditsNotAllowed));
    assert_eq!(h.session.context().unwrap().text, SOURCE);
    assert_eq!(h.session.context().unwrap().version_id, "v1");
}

#[tokio::test]
async fn knowledge_base_lifecycle() {
    let server = MockServer::start().await;
    let h = harness(&server);

    h.session.set_coding_state(true).await;
    h.session.report_ai_usage("xs.sort((a, b) => a - b);").await;
    assert!(h.session.submit(SOURCE).await);
    assert!(!h.session.submit(SOURCE).await);

    let sent = h.channel.sent();
    let hidden: Vec<&AgentMessage> = sent
        .iter()
        .filter(|m| matches!(m, AgentMessage::Hidden(_)))
        .collect();
    assert_eq!(hidden, vec![&AgentMessage::Hidden(AI_USAGE_NUDGE.to_owned())]);

    let Some(AgentMessage::Kb(last)) = sent.last() else {
        panic!("last message should be a KB update");
    };
    assert!(last.has_submitted);
    assert!(!last.is_coding);
    assert!(!last.using_ai);
    assert_eq!(last.candidate_name, "Candidate");
}
