//! Race presets
//!
//! Opponent personality, field size and seed. A [`RaceSetup`] builds a ready
//! to start [`Simulation`] on a procedurally generated track.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::sim::{Actor, ActorKind, RngState, Simulation, Track, TrackParams};
use crate::tuning::Tuning;

/// Opponent AI preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Personality {
    /// Fights often, rarely backs off
    Aggressive,
    #[default]
    Balanced,
    /// Erratic riding
    Random,
}

impl Personality {
    pub const ALL: [Personality; 3] = [
        Personality::Aggressive,
        Personality::Balanced,
        Personality::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Personality::Aggressive => "Aggressive",
            Personality::Balanced => "Balanced",
            Personality::Random => "Random",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "aggressive" | "aggro" => Some(Personality::Aggressive),
            "balanced" => Some(Personality::Balanced),
            "random" => Some(Personality::Random),
            _ => None,
        }
    }
}

/// Gap between grid rows at the start
const GRID_ROW_GAP: f64 = 3.0;

/// Everything needed to build a race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSetup {
    pub seed: u64,
    pub opponent: Personality,
    pub rivals: u32,
    /// Background bikers scattered along the track
    pub neutrals: u32,
    pub track: TrackParams,
}

impl Default for RaceSetup {
    fn default() -> Self {
        Self {
            seed: 0,
            opponent: Personality::Balanced,
            rivals: 1,
            neutrals: 5,
            track: TrackParams::default(),
        }
    }
}

impl RaceSetup {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Generate the track this setup races on
    pub fn track(&self) -> Result<Track, SimError> {
        Track::generate(&RngState::new(self.seed), &self.track)
    }

    /// Build a simulation with the player, rivals and neutrals on the grid
    pub fn build(&self, tuning: &Tuning) -> Result<Simulation, SimError> {
        let track = self.track()?;
        let lanes = track.lanes();
        let length = track.length();
        let mut sim = Simulation::new(self.seed, tuning.clone());

        // Start grid: middle lane first, then alternating outward, row by row
        let mid = lanes / 2;
        let lane_order: Vec<u32> = (0..lanes)
            .map(|i| {
                let offset = i.div_ceil(2);
                if i % 2 == 1 {
                    mid.saturating_sub(offset)
                } else {
                    (mid + offset).min(lanes - 1)
                }
            })
            .collect();
        let slot = |n: u32| {
            let lane = lane_order[(n % lanes) as usize];
            let distance = (n / lanes) as f64 * GRID_ROW_GAP;
            (track.lane_center(lane, distance), distance)
        };

        let (lateral, distance) = slot(0);
        sim.add_actor(Actor::new(ActorKind::Player, lateral, distance, tuning))?;
        for i in 0..self.rivals {
            let (lateral, distance) = slot(i + 1);
            sim.add_actor(Actor::new(
                ActorKind::Rival(self.opponent),
                lateral,
                distance,
                tuning,
            ))?;
        }

        let mut rng = RngState::new(self.seed).setup_rng();
        let lo = 10.0_f64.min(length);
        let hi = (length - 30.0).max(lo);
        for _ in 0..self.neutrals {
            let distance = rng.random_range(lo..=hi);
            let lane = rng.random_range(0..lanes);
            let top_speed = rng.random_range(tuning.neutral_speed_min..=tuning.neutral_speed_max);
            let neutral = Actor::new(
                ActorKind::Neutral,
                track.lane_center(lane, distance),
                distance,
                tuning,
            )
            .with_top_speed(top_speed)
            .with_speed(top_speed);
            sim.add_actor(neutral)?;
        }

        log::info!(
            "Built race: seed {}, {} {} rival(s), {} neutral(s), {:.0} m track",
            self.seed,
            self.rivals,
            self.opponent.as_str(),
            self.neutrals,
            length
        );
        sim.set_track(Arc::new(track))?;
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RacePhase;

    #[test]
    fn test_personality_round_trip() {
        for p in Personality::ALL {
            assert_eq!(Personality::from_str(p.as_str()), Some(p));
        }
        assert_eq!(Personality::from_str("AGGRO"), Some(Personality::Aggressive));
        assert_eq!(Personality::from_str("timid"), None);
    }

    #[test]
    fn test_build_places_field() {
        let setup = RaceSetup {
            rivals: 4,
            neutrals: 6,
            ..RaceSetup::with_seed(3)
        };
        let tuning = Tuning::default();
        let sim = setup.build(&tuning).unwrap();
        let actors = sim.store().as_slice();
        assert_eq!(actors.len(), 11);
        assert!(actors[0].is_player());
        assert_eq!(actors.iter().filter(|a| a.is_rival()).count(), 4);
        for a in actors.iter().filter(|a| a.kind == ActorKind::Neutral) {
            assert!(a.top_speed >= tuning.neutral_speed_min);
            assert!(a.top_speed <= tuning.neutral_speed_max);
        }
        // Grid slots never overlap
        let grid: Vec<_> = actors.iter().take(5).collect();
        for (i, a) in grid.iter().enumerate() {
            for b in &grid[i + 1..] {
                assert!(a.pos.distance(b.pos) >= a.radius + b.radius);
            }
        }
        assert_eq!(sim.race().phase, RacePhase::NotStarted);
    }

    #[test]
    fn test_build_is_seeded() {
        let tuning = Tuning::default();
        let a = RaceSetup::with_seed(21).build(&tuning).unwrap();
        let b = RaceSetup::with_seed(21).build(&tuning).unwrap();
        assert_eq!(a.store(), b.store());
        assert_eq!(a.track(), b.track());
    }

    #[test]
    fn test_built_race_starts() {
        let mut sim = RaceSetup::with_seed(8).build(&Tuning::default()).unwrap();
        assert!(sim.start().is_ok());
    }
}
