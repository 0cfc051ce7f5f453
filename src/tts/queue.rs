//! FIFO playback queue with per-item completion.

use super::SpeechPlayer;
use crate::error::CandidateError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// How a queued utterance ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// The player finished the utterance.
    Played,
    /// The player returned an error; the message was also passed to the
    /// error handler.
    Failed(String),
    /// The queue was cleared before the utterance started.
    Cancelled,
}

impl SpeechOutcome {
    pub fn is_played(&self) -> bool {
        matches!(self, Self::Played)
    }
}

/// Awaitable completion of one enqueued utterance.
#[derive(Debug)]
pub struct UtteranceHandle {
    rx: oneshot::Receiver<SpeechOutcome>,
}

impl UtteranceHandle {
    /// Waits until the utterance has played, failed or been cancelled.
    pub async fn wait(self) -> SpeechOutcome {
        // A dropped sender means the drain task went away without reaching
        // this item (e.g. runtime shutdown); nothing was played.
        self.rx.await.unwrap_or(SpeechOutcome::Cancelled)
    }
}

type ErrorHandler = dyn Fn(&CandidateError, &str) + Send + Sync;

struct Pending {
    text: String,
    done: oneshot::Sender<SpeechOutcome>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Pending>,
    draining: bool,
    playing: bool,
    cancelled: bool,
}

struct QueueInner {
    player: Arc<dyn SpeechPlayer>,
    on_error: Box<ErrorHandler>,
    state: Mutex<QueueState>,
}

impl QueueInner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Serializes speech playback.
///
/// Utterances play strictly in enqueue order, one at a time. A failing item
/// is reported to the error handler and the queue moves on. [`TtsQueue::clear`]
/// is sticky: once called, nothing further plays on this queue.
///
/// Cloning is cheap and every clone drives the same queue.
#[derive(Clone)]
pub struct TtsQueue {
    inner: Arc<QueueInner>,
}

impl std::fmt::Debug for TtsQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("TtsQueue")
            .field("pending", &state.pending.len())
            .field("playing", &state.playing)
            .field("cancelled", &state.cancelled)
            .finish()
    }
}

impl TtsQueue {
    /// Creates a queue whose playback failures are logged.
    pub fn new(player: Arc<dyn SpeechPlayer>) -> Self {
        Self::with_error_handler(player, |error, text| {
            warn!("speech playback failed for {text:?}: {error}");
        })
    }

    /// Creates a queue that reports playback failures to `on_error`.
    pub fn with_error_handler(
        player: Arc<dyn SpeechPlayer>,
        on_error: impl Fn(&CandidateError, &str) + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                player,
                on_error: Box::new(on_error),
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// Appends `text` and starts draining if the queue is idle.
    ///
    /// Must be called from within a Tokio runtime. On a cleared queue the
    /// returned handle resolves to [`SpeechOutcome::Cancelled`] immediately.
    pub fn enqueue(&self, text: impl Into<String>) -> UtteranceHandle {
        let (done, rx) = oneshot::channel();
        let mut state = self.inner.lock();

        if state.cancelled {
            let _ = done.send(SpeechOutcome::Cancelled);
            return UtteranceHandle { rx };
        }

        state.pending.push_back(Pending {
            text: text.into(),
            done,
        });
        debug!(pending = state.pending.len(), "utterance queued");

        if !state.draining {
            state.draining = true;
            tokio::spawn(drain(Arc::clone(&self.inner)));
        }

        UtteranceHandle { rx }
    }

    /// Enqueues `text` and waits for that utterance to finish.
    pub async fn speak(&self, text: impl Into<String>) -> SpeechOutcome {
        self.enqueue(text).wait().await
    }

    /// Drops every pending utterance and cancels the queue for good.
    ///
    /// The utterance currently playing, if any, runs to completion.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.cancelled = true;
        let dropped = state.pending.len();
        for item in state.pending.drain(..) {
            let _ = item.done.send(SpeechOutcome::Cancelled);
        }
        debug!(dropped, "speech queue cleared");
    }

    /// True while an utterance is playing or waiting.
    pub fn busy(&self) -> bool {
        let state = self.inner.lock();
        state.playing || !state.pending.is_empty()
    }

    /// True once [`TtsQueue::clear`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }
}

async fn drain(inner: Arc<QueueInner>) {
    let _guard = DrainGuard(Arc::clone(&inner));
    loop {
        let item = {
            let mut state = inner.lock();
            match state.pending.pop_front() {
                Some(item) => {
                    state.playing = true;
                    item
                }
                None => {
                    state.playing = false;
                    state.draining = false;
                    return;
                }
            }
        };

        let outcome = match play_isolated(&inner.player, &item.text).await {
            Ok(()) => SpeechOutcome::Played,
            Err(e) => {
                (inner.on_error)(&e, &item.text);
                SpeechOutcome::Failed(e.to_string())
            }
        };

        inner.lock().playing = false;
        let _ = item.done.send(outcome);
    }
}

/// Runs one `play` call in its own task so a panicking player fails the
/// item instead of the drain loop.
async fn play_isolated(
    player: &Arc<dyn SpeechPlayer>,
    text: &str,
) -> Result<(), CandidateError> {
    let player = Arc::clone(player);
    let text = text.to_owned();
    match tokio::spawn(async move { player.play(&text).await }).await {
        Ok(result) => result,
        Err(join) => Err(CandidateError::Speech(format!("speech player panicked: {join}"))),
    }
}

/// Clears the drain flags if the loop unwinds, so the next enqueue restarts it.
struct DrainGuard(Arc<QueueInner>);

impl Drop for DrainGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut state = self.0.lock();
            state.playing = false;
            state.draining = false;
        }
    }
}
