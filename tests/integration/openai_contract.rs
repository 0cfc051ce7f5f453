//! HTTP contract tests for the OpenAI-compatible completion client.

use crate::helpers::{completion_body, openai_client};
use serde_json::json;
use sfinx_candidate::CandidateError;
use sfinx_candidate::agent::{ChatMessage, CompletionClient, CompletionRequest};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ────────────────────────────────────────────────────────────────────────────
// Request format
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn request_carries_model_messages_and_temperature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "Hello"}
            ],
            "temperature": 0.5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hi")))
        .expect(1)
        .mount(&server)
        .await;

    let client = openai_client(&server.uri());
    let request = CompletionRequest::new(
        vec![ChatMessage::system("be brief"), ChatMessage::user("Hello")],
        0.5,
    );
    assert_eq!(client.complete(&request).await.unwrap(), "Hi");
}

#[tokio::test]
async fn json_mode_sets_response_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "response_format": {"type": "json_object"}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_body(r#"{"codeEdits":[]}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = openai_client(&format!("{}/v1/", server.uri()));
    let request = CompletionRequest::new(vec![ChatMessage::user("edit")], 0.2).with_json_mode(true);
    assert_eq!(
        client.complete(&request).await.unwrap(),
        r#"{"codeEdits":[]}"#
    );
}

// ────────────────────────────────────────────────────────────────────────────
// Error mapping
// ────────────────────────────────────────────────────────────────────────────

async fn error_for(status: u16, body: serde_json::Value) -> CandidateError {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    openai_client(&server.uri())
        .complete(&CompletionRequest::new(vec![ChatMessage::user("x")], 0.7))
        .await
        .unwrap_err()
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let err = error_for(401, json!({"error": {"message": "Incorrect API key"}})).await;
    assert!(matches!(err, CandidateError::Auth(ref m) if m.contains("Incorrect API key")));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn rate_limit_maps_to_retryable_request_error() {
    let err = error_for(429, json!({"error": {"message": "slow down"}})).await;
    assert_eq!(err.code(), "REQUEST_FAILED");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn server_error_maps_to_provider_error() {
    let err = error_for(503, json!({"error": {"message": "overloaded"}})).await;
    assert!(matches!(err, CandidateError::Provider(ref m) if m.contains("503")));
}

#[tokio::test]
async fn missing_choices_is_invalid_response() {
    let err = error_for(200, json!({"id": "x", "choices": []})).await;
    assert_eq!(err.code(), "RESPONSE_INVALID");
}
