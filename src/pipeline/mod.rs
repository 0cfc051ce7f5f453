//! Candidate response pipeline: turn-taking and orchestration.

pub mod messages;
pub mod orchestrator;
pub mod turns;

pub use messages::{CandidateControls, CandidateOutcome, CandidateResponse, RespondWithCandidate};
pub use orchestrator::CandidateOrchestrator;
pub use turns::{TurnClaim, TurnMode, TurnTaking};
