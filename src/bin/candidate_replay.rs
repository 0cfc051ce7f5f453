//! Offline replay of scripted candidate responses.
//!
//! Usage: `sfinx-candidate-replay <initial-file> <script.json>`
//!
//! The script is a JSON array of candidate responses. Steps without an
//! `apply` contract are applied against the buffer as it stands when the step
//! runs. Speech goes to the log; per-step results and the final buffer text
//! go to stdout.

use anyhow::Context;
use sfinx_candidate::pipeline::{CandidateOrchestrator, CandidateResponse, TurnTaking};
use sfinx_candidate::tts::{LogPlayer, TtsQueue};
use sfinx_candidate::{CandidateConfig, EditorBuffer};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sfinx_candidate=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(initial), Some(script)) = (args.next(), args.next()) else {
        anyhow::bail!("usage: sfinx-candidate-replay <initial-file> <script.json>");
    };
    let initial = PathBuf::from(initial);
    let script = PathBuf::from(script);

    let config_path = CandidateConfig::default_config_path();
    let config = if config_path.exists() {
        CandidateConfig::from_file(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?
    } else {
        CandidateConfig::default()
    };

    let text = std::fs::read_to_string(&initial)
        .with_context(|| format!("reading {}", initial.display()))?;
    let steps: Vec<CandidateResponse> = serde_json::from_str(
        &std::fs::read_to_string(&script)
            .with_context(|| format!("reading {}", script.display()))?,
    )
    .with_context(|| format!("parsing {}", script.display()))?;

    // Replays target the file they were given.
    let file = initial
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.editor.file.clone());
    let mut allowlist = config.editor.allowlist.clone();
    if !allowlist.contains(&file) {
        allowlist.push(file.clone());
    }

    let buffer = EditorBuffer::new(text, config.editor.initial_version.clone(), allowlist);
    tracing::debug!(allowlist = ?buffer.allowlist(), "editor allowlist");
    let orchestrator = CandidateOrchestrator::new(
        TtsQueue::new(Arc::new(LogPlayer)),
        Arc::new(TurnTaking::new()),
        Arc::new(Mutex::new(buffer)),
    );
    tracing::info!(file = %file, steps = steps.len(), "replay starting");

    let mut failures = 0usize;
    for (i, mut step) in steps.into_iter().enumerate() {
        if step.apply.is_none() && !step.respond.code_edits.is_empty() {
            step.apply = Some(orchestrator.snapshot()?.contract());
        }
        match orchestrator.handle_candidate_response(&step).await {
            Ok(outcome) => {
                let applied = outcome
                    .applied
                    .map(|a| format!("applied -> {} ({})", a.version_id, a.hash))
                    .unwrap_or_else(|| "no edits".to_owned());
                println!("step {}: ok, {applied}", i + 1);
            }
            Err(e) => {
                failures += 1;
                println!("step {}: {} {e}", i + 1, e.code());
            }
        }
    }

    let final_state = orchestrator.snapshot()?;
    println!("--- {} @ {} ---", file, final_state.version_id);
    println!("{}", final_state.text);
    tracing::info!(failures, "replay finished");
    Ok(())
}
