//! Simulation errors
//!
//! Only programming errors and setup mistakes surface as `SimError`.
//! Out-of-range intents are clamped rather than rejected so the simulation
//! stays live.

use thiserror::Error;

use crate::sim::{ActorId, RacePhase};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// An actor id that is not in the store
    #[error("actor {0} not found")]
    NotFound(ActorId),

    /// Race start requested before a track was supplied
    #[error("cannot start race: no track loaded")]
    TrackDataMissing,

    /// Race start requires exactly one player-controlled actor
    #[error("race needs exactly one player actor, found {0}")]
    NoPlayer(usize),

    /// Operation not allowed in the current race phase
    #[error("{op} not allowed while race is {phase:?}")]
    InvalidPhase { op: &'static str, phase: RacePhase },

    /// Track data failed validation
    #[error("invalid track: {0}")]
    InvalidTrack(&'static str),

    /// Integration produced NaN or infinity for an actor
    #[error("actor {0} reached a non-finite state")]
    NonFinite(ActorId),
}
