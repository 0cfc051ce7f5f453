//! End-to-end orchestration against a real buffer and speech queue.

use crate::helpers::RecordingPlayer;
use sfinx_candidate::editor::{CodeEdit, EditorBuffer};
use sfinx_candidate::pipeline::{
    CandidateControls, CandidateOrchestrator, CandidateResponse, RespondWithCandidate, TurnMode,
    TurnTaking,
};
use sfinx_candidate::runtime::CandidateEvent;
use sfinx_candidate::tts::TtsQueue;
use sfinx_candidate::CandidateError;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

const SOURCE: &str = "function add(a, b) {\n  return a - b;\n}\n";

fn orchestrator(player: Arc<RecordingPlayer>) -> CandidateOrchestrator {
    let buffer = EditorBuffer::new(SOURCE, "v1", vec!["solution.ts".to_owned()]);
    CandidateOrchestrator::new(
        TtsQueue::new(player),
        Arc::new(TurnTaking::new()),
        Arc::new(Mutex::new(buffer)),
    )
}

fn allowed(respond: RespondWithCandidate, orchestrator: &CandidateOrchestrator) -> CandidateResponse {
    CandidateResponse {
        respond,
        controls: CandidateControls {
            allow_code_edits: true,
        },
        apply: Some(orchestrator.snapshot().unwrap().contract()),
    }
}

fn minus_offset() -> usize {
    SOURCE.find('-').unwrap()
}

#[tokio::test]
async fn events_follow_speech_then_edit_order() {
    let player = Arc::new(RecordingPlayer::default());
    let (tx, mut rx) = broadcast::channel(16);
    let orch = orchestrator(player.clone()).with_runtime_events(tx);

    let at = minus_offset();
    let response = allowed(
        RespondWithCandidate::speech("That minus should be a plus.")
            .with_edits(vec![CodeEdit::new("solution.ts", at, at + 1, "+")]),
        &orch,
    );
    let outcome = orch.handle_candidate_response(&response).await.unwrap();
    let applied = outcome.applied.unwrap();
    assert!(applied.text.contains("return a + b;"));

    let events: Vec<CandidateEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], CandidateEvent::SpeechStarted { .. }));
    assert!(matches!(events[1], CandidateEvent::SpeechFinished { .. }));
    assert!(
        matches!(&events[2], CandidateEvent::EditsApplied { version_id, .. } if version_id == "v2")
    );
    assert_eq!(player.spoken(), vec!["That minus should be a plus."]);
}

#[tokio::test]
async fn second_writer_with_stale_contract_is_rejected() {
    let player = Arc::new(RecordingPlayer::default());
    let orch = orchestrator(player);
    let at = minus_offset();

    let first = allowed(
        RespondWithCandidate::default().with_edits(vec![CodeEdit::new(
            "solution.ts",
            at,
            at + 1,
            "+",
        )]),
        &orch,
    );
    let second = allowed(
        RespondWithCandidate::default().with_edits(vec![CodeEdit::new(
            "solution.ts",
            0,
            0,
            "// fixed\n",
        )]),
        &orch,
    );

    orch.handle_candidate_response(&first).await.unwrap();
    let err = orch.handle_candidate_response(&second).await.unwrap_err();
    assert!(err.is_stale_contract());

    let state = orch.snapshot().unwrap();
    assert_eq!(state.version_id, "v2");
    assert!(!state.text.starts_with("// fixed"));
}

#[tokio::test]
async fn disallowed_file_rejects_whole_batch() {
    let player = Arc::new(RecordingPlayer::default());
    let (tx, mut rx) = broadcast::channel(16);
    let orch = orchestrator(player).with_runtime_events(tx);

    let response = allowed(
        RespondWithCandidate::default().with_edits(vec![
            CodeEdit::new("solution.ts", 0, 0, "// ok\n"),
            CodeEdit::new(".env", 0, 0, "SECRET=1"),
        ]),
        &orch,
    );
    let err = orch.handle_candidate_response(&response).await.unwrap_err();
    assert_eq!(err.to_string(), "file not allowed");
    assert_eq!(orch.snapshot().unwrap().text, SOURCE);

    match rx.try_recv().unwrap() {
        CandidateEvent::EditsRejected { code, .. } => assert_eq!(code, "FILE_NOT_ALLOWED"),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn multi_edit_batch_applies_in_original_coordinates() {
    let player = Arc::new(RecordingPlayer::default());
    let orch = orchestrator(player);
    let at = minus_offset();
    // Given out of order; both offsets refer to the original text.
    let response = allowed(
        RespondWithCandidate::default().with_edits(vec![
            CodeEdit::new("solution.ts", at, at + 1, "+"),
            CodeEdit::new("solution.ts", 9, 12, "sum"),
        ]),
        &orch,
    );
    let applied = orch
        .handle_candidate_response(&response)
        .await
        .unwrap()
        .applied
        .unwrap();
    assert_eq!(applied.text, "function sum(a, b) {\n  return a + b;\n}\n");
}

#[tokio::test]
async fn concurrent_responses_speak_in_order_and_release_turns() {
    let player = Arc::new(RecordingPlayer::default());
    let orch = Arc::new(orchestrator(player.clone()));

    let a = {
        let orch = orch.clone();
        tokio::spawn(async move {
            let response = CandidateResponse {
                respond: RespondWithCandidate::speech("first"),
                ..CandidateResponse::default()
            };
            orch.handle_candidate_response(&response).await
        })
    };
    let b = {
        let orch = orch.clone();
        tokio::spawn(async move {
            let response = CandidateResponse {
                respond: RespondWithCandidate::speech("second"),
                ..CandidateResponse::default()
            };
            orch.handle_candidate_response(&response).await
        })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let mut spoken = player.spoken();
    spoken.sort();
    assert_eq!(spoken, vec!["first", "second"]);
    assert_eq!(orch.turns().mode(), TurnMode::Idle);
    assert!(!orch.tts().busy());
}

#[tokio::test]
async fn cleared_queue_still_lets_edits_through() {
    let player = Arc::new(RecordingPlayer::default());
    let orch = orchestrator(player.clone());
    orch.tts().clear();

    let response = allowed(
        RespondWithCandidate::speech("never heard")
            .with_edits(vec![CodeEdit::new("solution.ts", 0, 0, "// ")]),
        &orch,
    );
    let outcome = orch.handle_candidate_response(&response).await.unwrap();
    assert!(!outcome.speech.unwrap().is_played());
    assert!(outcome.applied.is_some());
    assert!(player.spoken().is_empty());
}

#[tokio::test]
async fn policy_gate_holds_even_with_valid_contract() {
    let player = Arc::new(RecordingPlayer::default());
    let orch = orchestrator(player);
    let mut response = allowed(
        RespondWithCandidate::default().with_edits(vec![CodeEdit::new("solution.ts", 0, 0, "x")]),
        &orch,
    );
    response.controls.allow_code_edits = false;
    let err = orch.handle_candidate_response(&response).await.unwrap_err();
    assert!(matches!(err, CandidateError::CodeEditsNotAllowed));
}
