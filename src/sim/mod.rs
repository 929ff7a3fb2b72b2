//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by actor ID)
//! - No rendering or platform dependencies

pub mod ai;
pub mod collision;
pub mod intent;
pub mod physics;
pub mod race;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod tick;
pub mod track;

pub use ai::{AiDecision, AiView, decide};
pub use collision::{ActorContact, CollisionResult, circle_circle};
pub use intent::Intent;
pub use physics::{Resolution, resolve_tick};
pub use race::{
    AbortReason, FinishReason, RaceOutcome, RacePhase, RaceResult, RaceState, compute_standings,
};
pub use snapshot::{GameEvent, Snapshot};
pub use state::{ActionState, Actor, ActorId, ActorKind, AiMemory, AiMode, RngState, Strike};
pub use store::ActorStore;
pub use tick::{FixedTimestep, Simulation, TickInput};
pub use track::{Obstacle, ObstacleKind, Segment, Track, TrackParams};
