//! Per-tick control input
//!
//! An [`Intent`] comes from the human-input collaborator or the AI
//! controller, is consumed once by the resolver, then discarded.

use serde::{Deserialize, Serialize};

use super::state::Strike;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Intent {
    /// 0..=1
    pub throttle: f64,
    /// 0..=1
    pub brake: f64,
    /// -1 (left) ..= 1 (right)
    pub steer: f64,
    /// Requested strike, honored only when the rider is idle
    pub action: Option<Strike>,
    /// Fire a boost if one is available
    pub boost: bool,
}

impl Intent {
    /// No throttle, no steer, no action
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn throttle(throttle: f64) -> Self {
        Self {
            throttle,
            ..Default::default()
        }
    }

    pub fn with_steer(mut self, steer: f64) -> Self {
        self.steer = steer;
        self
    }

    pub fn with_action(mut self, strike: Strike) -> Self {
        self.action = Some(strike);
        self
    }

    pub fn with_boost(mut self) -> Self {
        self.boost = true;
        self
    }

    /// True if every axis is finite and within range
    pub fn is_valid(&self) -> bool {
        let unit = 0.0..=1.0;
        unit.contains(&self.throttle)
            && unit.contains(&self.brake)
            && (-1.0..=1.0).contains(&self.steer)
    }

    /// Clamp out-of-range axes; NaN becomes zero
    pub fn sanitized(self) -> Self {
        fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
            if v.is_nan() { 0.0 } else { v.clamp(lo, hi) }
        }
        Self {
            throttle: clamp(self.throttle, 0.0, 1.0),
            brake: clamp(self.brake, 0.0, 1.0),
            steer: clamp(self.steer, -1.0, 1.0),
            ..self
        }
    }
}
