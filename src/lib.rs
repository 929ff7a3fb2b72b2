//! Road Rash Sim - deterministic race-and-combat core for a side-scrolling bike game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (actors, physics, combat, AI, race state)
//! - `persistence`: Versioned snapshot save/load
//! - `tuning`: Data-driven game balance
//! - `setup`: Race presets (opponent personality, field size, seed)

pub mod error;
pub mod persistence;
pub mod setup;
pub mod sim;
pub mod tuning;

pub use error::SimError;
pub use setup::{Personality, RaceSetup};
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f64 = 1.0 / 60.0;
    /// Ticks per simulated second
    pub const TICKS_PER_SECOND: u32 = 60;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Default road layout
    pub const DEFAULT_LANES: u32 = 3;
    pub const LANE_WIDTH: f64 = 4.0;

    /// Bike body radius
    pub const BIKE_RADIUS: f64 = 1.0;
}

/// Convert a duration in seconds to whole ticks (at least one)
#[inline]
pub fn secs_to_ticks(secs: f64) -> u32 {
    ((secs * consts::TICKS_PER_SECOND as f64).round() as u32).max(1)
}

/// Move `current` toward `target` by at most `max_delta`
#[inline]
pub fn approach(current: f64, target: f64, max_delta: f64) -> f64 {
    current + (target - current).clamp(-max_delta, max_delta)
}
