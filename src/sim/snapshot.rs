//! Immutable per-tick output for render and audio consumers

use serde::{Deserialize, Serialize};

use super::race::{AbortReason, FinishReason, RaceState};
use super::state::{Actor, ActorId, Strike};

/// One-shot events, emitted once on the tick they happen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Two bikes touched (one per overlapping pair per tick)
    Collision {
        a: ActorId,
        b: ActorId,
        approach_speed: f64,
    },
    HitLanded {
        attacker: ActorId,
        defender: ActorId,
        strike: Strike,
        damage: u16,
    },
    /// Defender's own strike was cancelled by an incoming hit
    StrikeInterrupted { id: ActorId, by: ActorId },
    /// Rider went down on an obstacle
    Knockdown {
        id: ActorId,
        obstacle: u32,
        damage: u16,
    },
    /// Rider hit an oil slick
    Slipped { id: ActorId, obstacle: u32 },
    /// Rider is back up after a knockdown
    Recovered { id: ActorId },
    BoostStarted { id: ActorId },
    /// Actor reached zero health
    ActorEliminated { id: ActorId },
    ActorFinished { id: ActorId },
    RaceStarted,
    Paused,
    Resumed,
    RaceFinished { reason: FinishReason },
    RaceAborted { reason: AbortReason },
}

/// Tick-stamped copy of everything a consumer may read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    /// Actors in ascending id order
    pub actors: Vec<Actor>,
    pub race: RaceState,
    pub events: Vec<GameEvent>,
}

impl Snapshot {
    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors
            .binary_search_by_key(&id, |a| a.id)
            .ok()
            .map(|idx| &self.actors[idx])
    }

    pub fn player(&self) -> Option<&Actor> {
        self.race.player.and_then(|id| self.actor(id))
    }

    /// Number of `Collision` events involving the given pair this tick
    pub fn collisions_between(&self, a: ActorId, b: ActorId) -> usize {
        let (lo, hi) = (a.min(b), a.max(b));
        self.events
            .iter()
            .filter(|e| matches!(e, GameEvent::Collision { a, b, .. } if *a == lo && *b == hi))
            .count()
    }
}
