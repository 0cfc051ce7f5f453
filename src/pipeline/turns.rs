//! Turn-taking between speaking and typing.
//!
//! The simulated candidate is a single actor: it never speaks and types at
//! the same time. A request for the other mode while one is active is parked
//! in a single-slot queue and promoted when the active mode stops. The slot
//! only ever holds the mode opposite the active one, so repeated requests
//! simply re-park the same mode.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::debug;

/// What the candidate is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnMode {
    #[default]
    Idle,
    Speaking,
    Typing,
}

/// Outcome of [`TurnTaking::claim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnClaim {
    /// The coordinator was idle and this call entered the mode.
    Acquired,
    /// The mode was already active under another caller.
    Joined,
    /// The other mode is active; this request waits in the queue slot.
    Queued,
}

impl TurnClaim {
    /// Whether the caller may proceed right away (`beginX` semantics).
    pub fn may_proceed(self) -> bool {
        !matches!(self, Self::Queued)
    }
}

#[derive(Debug, Default)]
struct TurnState {
    mode: TurnMode,
    queued: Option<TurnMode>,
}

/// Single-slot turn coordinator.
///
/// All transitions are synchronous and hold the internal lock only for the
/// transition itself, never across an await. [`TurnTaking::acquire`] waits
/// between transitions for a queued request to be promoted.
#[derive(Debug, Default)]
pub struct TurnTaking {
    state: Mutex<TurnState>,
    changed: Notify,
}

impl TurnTaking {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TurnState> {
        // Transitions cannot leave the state half-written, so a poisoned lock
        // still holds a consistent value.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mode(&self) -> TurnMode {
        self.lock().mode
    }

    pub fn queued(&self) -> Option<TurnMode> {
        self.lock().queued
    }

    pub fn is_speaking(&self) -> bool {
        self.mode() == TurnMode::Speaking
    }

    pub fn is_typing(&self) -> bool {
        self.mode() == TurnMode::Typing
    }

    /// Enters speaking mode. Returns `false` if typing is active and the
    /// request was queued instead.
    pub fn begin_speaking(&self) -> bool {
        self.claim(TurnMode::Speaking).may_proceed()
    }

    /// Enters typing mode. Returns `false` if speaking is active and the
    /// request was queued instead.
    pub fn begin_typing(&self) -> bool {
        self.claim(TurnMode::Typing).may_proceed()
    }

    /// Requests `mode` and reports how the request was handled.
    ///
    /// Claiming [`TurnMode::Idle`] is equivalent to [`TurnTaking::stop`] and
    /// reports `Acquired`.
    pub fn claim(&self, mode: TurnMode) -> TurnClaim {
        if mode == TurnMode::Idle {
            self.stop();
            return TurnClaim::Acquired;
        }

        let mut state = self.lock();
        let claim = if state.mode == mode {
            TurnClaim::Joined
        } else if state.mode == TurnMode::Idle {
            state.mode = mode;
            TurnClaim::Acquired
        } else {
            if let Some(previous) = state.queued.replace(mode)
                && previous != mode
            {
                debug!(?previous, ?mode, "queued turn replaced");
            }
            TurnClaim::Queued
        };
        debug!(?mode, ?claim, current = ?state.mode, "turn claimed");
        claim
    }

    /// Claims `mode`, waiting while the other mode holds the turn.
    ///
    /// Returns once the caller may proceed. A request that had to wait comes
    /// back as [`TurnClaim::Queued`] after its promotion, so
    /// [`TurnTaking::release`] still undoes exactly what it holds.
    pub async fn acquire(&self, mode: TurnMode) -> TurnClaim {
        let claim = self.claim(mode);
        if claim.may_proceed() {
            return claim;
        }

        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.lock();
                if state.mode == mode {
                    debug!(?mode, "queued turn promoted");
                    return TurnClaim::Queued;
                }
                if state.mode == TurnMode::Idle {
                    state.mode = mode;
                    debug!(?mode, "turn acquired after wait");
                    return TurnClaim::Acquired;
                }
                // Still blocked; make sure the request stays parked.
                state.queued = Some(mode);
            }
            notified.await;
        }
    }

    /// Leaves the active mode and promotes the queued request, if any.
    ///
    /// Calling `stop` while idle is a harmless no-op apart from promotion.
    pub fn stop(&self) {
        {
            let mut state = self.lock();
            state.mode = state.queued.take().unwrap_or(TurnMode::Idle);
            debug!(mode = ?state.mode, "turn stopped");
        }
        self.changed.notify_waiters();
    }

    /// Undoes a [`TurnClaim::Queued`] claim once the caller is done.
    ///
    /// If the request is still parked it is dropped; if it was promoted while
    /// the caller worked, that mode is stopped.
    pub fn withdraw(&self, mode: TurnMode) {
        {
            let mut state = self.lock();
            if state.queued == Some(mode) {
                state.queued = None;
                debug!(?mode, "queued turn withdrawn");
            } else if state.mode == mode {
                state.mode = state.queued.take().unwrap_or(TurnMode::Idle);
                debug!(?mode, next = ?state.mode, "promoted turn withdrawn");
            }
        }
        self.changed.notify_waiters();
    }

    /// Releases a claim made by the same logical caller.
    pub fn release(&self, mode: TurnMode, claim: TurnClaim) {
        match claim {
            TurnClaim::Acquired => self.stop(),
            TurnClaim::Joined => {}
            TurnClaim::Queued => self.withdraw(mode),
        }
    }
}
