//! Per-tick physics and the resolver entry point
//!
//! [`resolve_tick`] takes the previous tick's actors plus this tick's intents
//! and produces the next tick's actors. It works on a copy: if anything fails
//! partway the caller still holds the untouched previous state.

use std::collections::BTreeMap;

use glam::DVec2;

use super::collision::{
    ActorContact, detect_actor_contacts, resolve_actor_contacts, resolve_obstacles,
    resolve_strikes,
};
use super::intent::Intent;
use super::snapshot::GameEvent;
use super::state::{ActionState, Actor, ActorId, Strike};
use super::store::ActorStore;
use super::track::Track;
use crate::approach;
use crate::error::SimError;
use crate::tuning::Tuning;

/// Output of one resolved tick
#[derive(Debug, Clone)]
pub struct Resolution {
    pub store: ActorStore,
    pub events: Vec<GameEvent>,
    /// Bike-bike overlaps found this tick, ascending by id pair
    pub contacts: Vec<ActorContact>,
}

/// Count down action and boost timers
pub fn advance_timers(actor: &mut Actor, tuning: &Tuning, events: &mut Vec<GameEvent>) {
    actor.action = match actor.action {
        ActionState::Idle => ActionState::Idle,
        ActionState::Downed { ticks_left } if ticks_left <= 1 => {
            events.push(GameEvent::Recovered { id: actor.id });
            ActionState::Idle
        }
        ActionState::Downed { ticks_left } => ActionState::Downed {
            ticks_left: ticks_left - 1,
        },
        ActionState::Punching { ticks_left, .. } if ticks_left <= 1 => ActionState::Recovering {
            ticks_left: tuning.punch.recover_ticks(),
        },
        ActionState::Kicking { ticks_left, .. } if ticks_left <= 1 => ActionState::Recovering {
            ticks_left: tuning.kick.recover_ticks(),
        },
        ActionState::Punching { ticks_left, landed } => ActionState::Punching {
            ticks_left: ticks_left - 1,
            landed,
        },
        ActionState::Kicking { ticks_left, landed } => ActionState::Kicking {
            ticks_left: ticks_left - 1,
            landed,
        },
        ActionState::Recovering { ticks_left } if ticks_left <= 1 => ActionState::Idle,
        ActionState::Recovering { ticks_left } => ActionState::Recovering {
            ticks_left: ticks_left - 1,
        },
    };
    actor.boost_ticks = actor.boost_ticks.saturating_sub(1);
}

/// Start requested strikes and boosts. Downed riders ignore input.
pub fn apply_intent(actor: &mut Actor, intent: &Intent, tuning: &Tuning, events: &mut Vec<GameEvent>) {
    if actor.is_downed() {
        return;
    }

    if intent.boost && actor.boosts_left > 0 && !actor.is_boosting() {
        actor.boosts_left -= 1;
        actor.boost_ticks = tuning.boost_ticks();
        events.push(GameEvent::BoostStarted { id: actor.id });
    }

    if let (Some(strike), ActionState::Idle) = (intent.action, actor.action) {
        let ticks_left = tuning.strike(strike).active_ticks();
        actor.action = match strike {
            Strike::Punch => ActionState::Punching {
                ticks_left,
                landed: false,
            },
            Strike::Kick => ActionState::Kicking {
                ticks_left,
                landed: false,
            },
        };
    }
}

/// Advance velocity and position by one timestep
pub fn integrate(actor: &mut Actor, intent: &Intent, track: &Track, tuning: &Tuning, dt: f64) {
    if actor.is_downed() {
        actor.vel = DVec2::ZERO;
        return;
    }

    // Forward
    let boost = if actor.is_boosting() {
        tuning.boost_multiplier
    } else {
        1.0
    };
    let accel = intent.throttle * tuning.accel * boost
        - intent.brake * tuning.brake
        - (1.0 - intent.throttle) * tuning.drag;
    let speed = (actor.vel.y + accel * dt).clamp(0.0, actor.speed_cap(tuning));

    // Lateral: lean-driven drift, weaker at low speed, plus outward pull in curves
    actor.lean = approach(actor.lean, intent.steer, tuning.lean_rate * dt);
    let authority = tuning.min_steer_authority
        + (1.0 - tuning.min_steer_authority) * (speed / tuning.max_speed).min(1.0);
    let curve = -track.curvature_at(actor.pos.y) * speed * speed * tuning.curve_drift;
    let target_lateral = actor.lean * tuning.lateral_speed * authority + curve;
    let lateral = approach(actor.vel.x, target_lateral, tuning.lateral_grip * dt);

    actor.vel = DVec2::new(lateral, speed);
    actor.pos += actor.vel * dt;
}

/// Keep the bike on the road; hitting the edge kills outward lateral speed
pub fn clamp_to_track(actor: &mut Actor, track: &Track) {
    let limit = (track.half_width_at(actor.pos.y) - actor.radius).max(0.0);
    if actor.pos.x > limit {
        actor.pos.x = limit;
        actor.vel.x = actor.vel.x.min(0.0);
    } else if actor.pos.x < -limit {
        actor.pos.x = -limit;
        actor.vel.x = actor.vel.x.max(0.0);
    }
}

fn check_finite(actor: &Actor) -> Result<(), SimError> {
    if actor.pos.is_finite() && actor.vel.is_finite() && actor.lean.is_finite() {
        Ok(())
    } else {
        Err(SimError::NonFinite(actor.id))
    }
}

/// Produce the next tick's actor states from the previous ones.
///
/// Order: timers and intents, integration, obstacles, bike-bike contacts,
/// strikes, track clamping. Every stage walks actors in ascending id order.
pub fn resolve_tick(
    prev: &ActorStore,
    intents: &BTreeMap<ActorId, Intent>,
    track: &Track,
    tuning: &Tuning,
    tick: u64,
    dt: f64,
) -> Result<Resolution, SimError> {
    if let Some(&unknown) = intents.keys().find(|id| !prev.contains(**id)) {
        return Err(SimError::NotFound(unknown));
    }

    let mut store = prev.clone();
    let mut events = Vec::new();

    for actor in store.iter_mut() {
        if actor.is_eliminated() {
            continue;
        }
        let intent = intents
            .get(&actor.id)
            .copied()
            .unwrap_or_default()
            .sanitized();
        advance_timers(actor, tuning, &mut events);
        apply_intent(actor, &intent, tuning, &mut events);
        integrate(actor, &intent, track, tuning, dt);

        if actor.finished_at.is_none() && actor.pos.y >= track.length() {
            actor.finished_at = Some(tick);
            events.push(GameEvent::ActorFinished { id: actor.id });
        }
    }

    for actor in store.iter_mut() {
        resolve_obstacles(actor, track, tuning, &mut events);
    }

    let contacts = detect_actor_contacts(store.as_slice());
    resolve_actor_contacts(&mut store, &contacts, tuning, &mut events)?;
    resolve_strikes(&mut store, tuning, &mut events)?;

    for actor in store.iter_mut() {
        clamp_to_track(actor, track);
        check_finite(actor)?;
    }

    Ok(Resolution {
        store,
        events,
        contacts,
    })
}
