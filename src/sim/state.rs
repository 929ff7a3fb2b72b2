//! Actor state and core simulation types
//!
//! All state that must be persisted for resume/determinism lives here.

use glam::DVec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::BIKE_RADIUS;
use crate::setup::Personality;
use crate::tuning::Tuning;

/// Stable actor identifier, allocated in ascending order by the store
pub type ActorId = u32;

/// Who (or what) drives an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    /// Human-controlled rider
    Player,
    /// Racing opponent
    Rival(Personality),
    /// Background biker sharing the road
    Neutral,
}

/// Melee strike types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strike {
    Punch,
    Kick,
}

/// Combat action state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionState {
    #[default]
    Idle,
    /// Punch hitbox is live; `landed` once it connected
    Punching { ticks_left: u32, landed: bool },
    /// Kick hitbox is live; `landed` once it connected
    Kicking { ticks_left: u32, landed: bool },
    /// Post-strike recovery, no new strike allowed
    Recovering { ticks_left: u32 },
    /// Knocked down: no control, no movement, no damage taken
    Downed { ticks_left: u32 },
}

impl ActionState {
    pub fn is_downed(&self) -> bool {
        matches!(self, ActionState::Downed { .. })
    }

    /// A strike whose hitbox is live and has not connected yet
    pub fn live_strike(&self) -> Option<Strike> {
        match *self {
            ActionState::Punching { landed: false, .. } => Some(Strike::Punch),
            ActionState::Kicking { landed: false, .. } => Some(Strike::Kick),
            _ => None,
        }
    }

    /// Strike in progress, landed or not
    pub fn strike(&self) -> Option<Strike> {
        match self {
            ActionState::Punching { .. } => Some(Strike::Punch),
            ActionState::Kicking { .. } => Some(Strike::Kick),
            _ => None,
        }
    }

    pub fn is_striking(&self) -> bool {
        self.strike().is_some()
    }

    pub fn mark_landed(&mut self) {
        match self {
            ActionState::Punching { landed, .. } | ActionState::Kicking { landed, .. } => {
                *landed = true
            }
            _ => {}
        }
    }
}

/// AI policy states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AiMode {
    #[default]
    Cruise,
    Overtake,
    Attack,
    Evade,
    Recover,
}

/// What the AI remembers between ticks (written back by the loop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AiMemory {
    pub mode: AiMode,
    /// Lane the AI is steering for
    pub target_lane: Option<u32>,
    /// Tick of the last random lane change (neutral bikers)
    pub last_lane_change: u64,
}

/// A rider+bike unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub kind: ActorKind,
    /// `x` = lateral offset from centerline, `y` = distance along the track
    pub pos: DVec2,
    /// `x` = lateral velocity, `y` = forward speed (never negative)
    pub vel: DVec2,
    /// Lean in [-1, 1], negative = left
    pub lean: f64,
    pub health: u16,
    pub action: ActionState,
    pub radius: f64,
    /// Unboosted top speed for this bike
    pub top_speed: f64,
    pub boosts_left: u8,
    /// Remaining boost ticks (0 = not boosting)
    pub boost_ticks: u32,
    /// Obstacle ids currently overlapped (contacts trigger on entry only)
    #[serde(default)]
    pub obstacle_contacts: Vec<u32>,
    #[serde(default)]
    pub ai: AiMemory,
    /// Race tick at which the actor crossed the finish line
    pub finished_at: Option<u64>,
}

impl Actor {
    pub fn new(kind: ActorKind, lateral: f64, distance: f64, tuning: &Tuning) -> Self {
        Self {
            id: 0,
            kind,
            pos: DVec2::new(lateral, distance),
            vel: DVec2::ZERO,
            lean: 0.0,
            health: tuning.max_health,
            action: ActionState::Idle,
            radius: BIKE_RADIUS,
            top_speed: tuning.max_speed,
            boosts_left: if kind == ActorKind::Player {
                tuning.player_boosts
            } else {
                0
            },
            boost_ticks: 0,
            obstacle_contacts: Vec::new(),
            ai: AiMemory::default(),
            finished_at: None,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.vel.y = speed.max(0.0);
        self
    }

    pub fn with_top_speed(mut self, top_speed: f64) -> Self {
        self.top_speed = top_speed;
        self
    }

    pub fn with_health(mut self, health: u16) -> Self {
        self.health = health;
        self
    }

    #[inline]
    pub fn distance(&self) -> f64 {
        self.pos.y
    }

    #[inline]
    pub fn lateral(&self) -> f64 {
        self.pos.x
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.vel.y
    }

    pub fn is_player(&self) -> bool {
        self.kind == ActorKind::Player
    }

    pub fn is_rival(&self) -> bool {
        matches!(self.kind, ActorKind::Rival(_))
    }

    pub fn is_eliminated(&self) -> bool {
        self.health == 0
    }

    pub fn is_downed(&self) -> bool {
        self.action.is_downed()
    }

    pub fn is_boosting(&self) -> bool {
        self.boost_ticks > 0
    }

    /// Current speed cap including boost
    pub fn speed_cap(&self, tuning: &Tuning) -> f64 {
        if self.is_boosting() {
            self.top_speed * tuning.boost_multiplier
        } else {
            self.top_speed
        }
    }

    pub fn health_fraction(&self, tuning: &Tuning) -> f64 {
        self.health as f64 / tuning.max_health as f64
    }

    /// Apply damage, returning the amount actually taken.
    /// Downed and eliminated actors take nothing.
    pub fn take_damage(&mut self, amount: u16) -> u16 {
        if self.is_downed() || self.is_eliminated() {
            return 0;
        }
        let taken = amount.min(self.health);
        self.health -= taken;
        taken
    }

    /// Knock the rider down: forward speed and lean zeroed, strike cancelled
    pub fn knock_down(&mut self, ticks: u32) {
        self.vel = DVec2::ZERO;
        self.lean = 0.0;
        self.boost_ticks = 0;
        self.action = ActionState::Downed { ticks_left: ticks };
    }
}

/// Seeded RNG source for the race
///
/// Generators are derived from (seed, tick, salt) rather than carried as
/// mutable state, so a restored snapshot replays the same rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Independent generator for one consumer on one tick. The salt picks
    /// the high half of the PCG stream selector and the tick the low half.
    pub fn stream(&self, tick: u64, salt: u64) -> Pcg32 {
        Pcg32::new(self.seed, (salt << 32) ^ tick)
    }

    /// Generator used once at race setup
    pub fn setup_rng(&self) -> Pcg32 {
        Pcg32::seed_from_u64(self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_downed_actor_takes_no_damage() {
        let tuning = Tuning::default();
        let mut actor = Actor::new(ActorKind::Neutral, 0.0, 0.0, &tuning);
        actor.knock_down(10);
        assert_eq!(actor.take_damage(50), 0);
        assert_eq!(actor.health, tuning.max_health);
    }

    #[test]
    fn test_damage_saturates_at_zero() {
        let tuning = Tuning::default();
        let mut actor = Actor::new(ActorKind::Neutral, 0.0, 0.0, &tuning).with_health(5);
        assert_eq!(actor.take_damage(12), 5);
        assert!(actor.is_eliminated());
        assert_eq!(actor.take_damage(12), 0);
    }

    #[test]
    fn test_live_strike_clears_when_landed() {
        let mut action = ActionState::Kicking {
            ticks_left: 4,
            landed: false,
        };
        assert_eq!(action.live_strike(), Some(Strike::Kick));
        action.mark_landed();
        assert_eq!(action.live_strike(), None);
        assert!(action.is_striking());
    }

    #[test]
    fn test_rng_streams_are_reproducible() {
        let rng = RngState::new(42);
        let a: u32 = rng.stream(10, 3).random();
        let b: u32 = rng.stream(10, 3).random();
        let c: u32 = rng.stream(11, 3).random();
        let d: u32 = rng.stream(10, 4).random();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_only_player_gets_boosts() {
        let tuning = Tuning::default();
        let player = Actor::new(ActorKind::Player, 0.0, 0.0, &tuning);
        let rival = Actor::new(ActorKind::Rival(Personality::Balanced), 0.0, 0.0, &tuning);
        assert_eq!(player.boosts_left, tuning.player_boosts);
        assert_eq!(rival.boosts_left, 0);
    }
}
