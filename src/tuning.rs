//! Data-driven game balance
//!
//! Every gameplay number lives in [`Tuning`]. Defaults are playable; a JSON
//! file may override any subset of fields.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::secs_to_ticks;
use crate::setup::Personality;
use crate::sim::Strike;

/// Errors loading or validating a tuning file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read tuning file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed tuning json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning: {0}")]
    Invalid(&'static str),
}

/// Parameters of one strike type (punch or kick)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeTuning {
    /// Health removed when the strike lands
    pub damage: u16,
    /// Hitbox reach beyond the attacker's body radius
    pub reach: f64,
    /// How long the hitbox stays live (seconds)
    pub active_secs: f64,
    /// Recovery after the strike ends, doubles as cooldown (seconds)
    pub recover_secs: f64,
    /// Lateral shove applied to the defender on a landed hit (m/s)
    pub shove: f64,
}

impl StrikeTuning {
    pub fn active_ticks(&self) -> u32 {
        secs_to_ticks(self.active_secs)
    }

    pub fn recover_ticks(&self) -> u32 {
        secs_to_ticks(self.recover_secs)
    }
}

/// Behaviour knobs for one AI personality
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AiProfile {
    /// Chance per tick of starting an attack on a target in range
    pub aggression: f64,
    /// Health fraction below which the rider avoids fights
    pub evade_below: f64,
    /// Cruising speed as a fraction of top speed
    pub cruise_pace: f64,
    /// Chance per tick of a random input instead of the planned one
    pub jitter: f64,
}

impl AiProfile {
    fn validate(&self) -> Result<(), ConfigError> {
        let chances = [self.aggression, self.evade_below, self.jitter];
        if chances.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::Invalid("ai chances must be within 0..=1"));
        }
        if !(self.cruise_pace.is_finite() && self.cruise_pace > 0.0) {
            return Err(ConfigError::Invalid("ai cruise_pace must be positive"));
        }
        Ok(())
    }
}

/// One [`AiProfile`] per personality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiProfiles {
    pub aggressive: AiProfile,
    pub balanced: AiProfile,
    pub random: AiProfile,
}

impl Default for AiProfiles {
    fn default() -> Self {
        Self {
            aggressive: AiProfile {
                aggression: 0.5,
                evade_below: 0.15,
                cruise_pace: 0.95,
                jitter: 0.05,
            },
            balanced: AiProfile {
                aggression: 0.2,
                evade_below: 0.35,
                cruise_pace: 0.9,
                jitter: 0.1,
            },
            random: AiProfile {
                aggression: 0.35,
                evade_below: 0.25,
                cruise_pace: 0.85,
                jitter: 0.35,
            },
        }
    }
}

/// Game balance constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Health ===
    pub max_health: u16,

    // === Riding ===
    /// Top speed without boost (m/s)
    pub max_speed: f64,
    /// Forward acceleration at full throttle (m/s²)
    pub accel: f64,
    /// Deceleration at full brake (m/s²)
    pub brake: f64,
    /// Coasting deceleration with no throttle (m/s²)
    pub drag: f64,
    /// Lean change per second toward the steer input
    pub lean_rate: f64,
    /// Lateral speed at full lean and full speed (m/s)
    pub lateral_speed: f64,
    /// Fraction of lateral control available when stopped
    pub min_steer_authority: f64,
    /// How fast lateral velocity settles to the steered value (m/s²)
    pub lateral_grip: f64,
    /// Outward drift per unit curvature per speed²
    pub curve_drift: f64,

    // === Boost ===
    pub boost_multiplier: f64,
    pub boost_secs: f64,
    /// Boosts granted to the player at race start
    pub player_boosts: u8,

    // === Combat ===
    pub punch: StrikeTuning,
    pub kick: StrikeTuning,
    /// Health lost by both riders in a hard bike-bike bump
    pub bump_damage: u16,
    /// Minimum approach speed for a bump to hurt (m/s)
    pub bump_speed: f64,
    /// Bike-bike bounce (0 = plastic, 1 = elastic)
    pub restitution: f64,

    // === Obstacles ===
    pub pothole_damage: u16,
    pub barrier_damage: u16,
    /// Knockdown recovery time (seconds)
    pub downed_secs: f64,
    /// Speed multiplier on entering an oil slick
    pub oil_slip_factor: f64,

    // === Race ===
    /// Race is called at this clock time (seconds)
    pub max_race_secs: f64,

    // === AI ===
    /// Distance inside which an AI may start a strike
    pub combat_range: f64,
    /// Gap to a rival ahead that triggers an overtake
    pub overtake_window: f64,
    /// Obstacle scan distance ahead of an AI rider
    pub lookahead: f64,
    /// Top speed range for neutral bikers
    pub neutral_speed_min: f64,
    pub neutral_speed_max: f64,
    pub ai_profiles: AiProfiles,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_health: 100,

            max_speed: 60.0,
            accel: 12.0,
            brake: 30.0,
            drag: 1.5,
            lean_rate: 4.0,
            lateral_speed: 8.0,
            min_steer_authority: 0.25,
            lateral_grip: 30.0,
            curve_drift: 0.5,

            boost_multiplier: 1.5,
            boost_secs: 2.0,
            player_boosts: 1,

            punch: StrikeTuning {
                damage: 12,
                reach: 1.6,
                active_secs: 0.2,
                recover_secs: 0.6,
                shove: 0.0,
            },
            kick: StrikeTuning {
                damage: 18,
                reach: 2.0,
                active_secs: 0.3,
                recover_secs: 1.0,
                shove: 6.0,
            },
            bump_damage: 2,
            bump_speed: 4.0,
            restitution: 0.5,

            pothole_damage: 5,
            barrier_damage: 15,
            downed_secs: 1.5,
            oil_slip_factor: 0.55,

            max_race_secs: 600.0,

            combat_range: 3.5,
            overtake_window: 20.0,
            lookahead: 30.0,
            neutral_speed_min: 15.0,
            neutral_speed_max: 35.0,
            ai_profiles: AiProfiles::default(),
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) tuning document and validate it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_health == 0 {
            return Err(ConfigError::Invalid("max_health must be positive"));
        }
        let positive = [
            self.max_speed,
            self.accel,
            self.brake,
            self.lean_rate,
            self.lateral_grip,
            self.boost_multiplier,
            self.max_race_secs,
            self.downed_secs,
            self.punch.active_secs,
            self.kick.active_secs,
        ];
        if positive.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(ConfigError::Invalid("rates and durations must be positive"));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(ConfigError::Invalid("restitution must be within 0..=1"));
        }
        if !(0.0..=1.0).contains(&self.oil_slip_factor) {
            return Err(ConfigError::Invalid("oil_slip_factor must be within 0..=1"));
        }
        if !(self.neutral_speed_min.is_finite() && self.neutral_speed_max.is_finite())
            || self.neutral_speed_min > self.neutral_speed_max
        {
            return Err(ConfigError::Invalid("neutral speed range is inverted"));
        }
        self.ai_profiles.aggressive.validate()?;
        self.ai_profiles.balanced.validate()?;
        self.ai_profiles.random.validate()
    }

    pub fn ai_profile(&self, personality: Personality) -> &AiProfile {
        match personality {
            Personality::Aggressive => &self.ai_profiles.aggressive,
            Personality::Balanced => &self.ai_profiles.balanced,
            Personality::Random => &self.ai_profiles.random,
        }
    }

    pub fn strike(&self, strike: Strike) -> &StrikeTuning {
        match strike {
            Strike::Punch => &self.punch,
            Strike::Kick => &self.kick,
        }
    }

    pub fn boost_ticks(&self) -> u32 {
        secs_to_ticks(self.boost_secs)
    }

    pub fn downed_ticks(&self) -> u32 {
        secs_to_ticks(self.downed_secs)
    }

    pub fn max_race_ticks(&self) -> u64 {
        secs_to_ticks(self.max_race_secs) as u64
    }
}
