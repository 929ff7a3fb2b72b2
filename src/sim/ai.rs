//! Rival and neutral rider AI
//!
//! A pure policy: [`decide`] reads an [`AiView`] of the previous tick and
//! returns an intent plus the memory to carry forward. It never touches the
//! store; the simulation loop writes the memory back after the tick commits.
//!
//! Rolls come from a per-(tick, actor) stream, so the same view always
//! yields the same decision.

use rand::Rng;
use rand_pcg::Pcg32;

use super::intent::Intent;
use super::state::{ActionState, Actor, ActorKind, AiMemory, AiMode, RngState, Strike};
use super::track::Track;
use crate::secs_to_ticks;
use crate::setup::Personality;
use crate::tuning::{AiProfile, Tuning};

/// Stream salt for AI rolls, offset by actor id
const AI_SALT: u64 = 0xa1_0000;

/// Read-only world as seen by the AI on one tick
#[derive(Debug, Clone, Copy)]
pub struct AiView<'a> {
    pub tick: u64,
    pub track: &'a Track,
    pub actors: &'a [Actor],
    pub tuning: &'a Tuning,
    pub rng: RngState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiDecision {
    pub memory: AiMemory,
    pub intent: Intent,
}

/// Decide one actor's intent for this tick
pub fn decide(view: &AiView, actor: &Actor) -> AiDecision {
    let mut rng = view.rng.stream(view.tick, AI_SALT + actor.id as u64);
    match actor.kind {
        ActorKind::Neutral => decide_neutral(view, actor, &mut rng),
        ActorKind::Rival(personality) => {
            decide_racer(view, actor, view.tuning.ai_profile(personality), &mut rng)
        }
        // Autopilot drives the player like a balanced rival
        ActorKind::Player => decide_racer(
            view,
            actor,
            view.tuning.ai_profile(Personality::Balanced),
            &mut rng,
        ),
    }
}

/// Background bikers: hold a lane at their own pace, drift at random
fn decide_neutral(view: &AiView, actor: &Actor, rng: &mut Pcg32) -> AiDecision {
    let track = view.track;
    let mut memory = actor.ai;
    memory.mode = if actor.is_downed() {
        AiMode::Recover
    } else {
        AiMode::Cruise
    };
    let current = track.lane_of(actor.lateral(), actor.distance());
    let mut lane = memory.target_lane.unwrap_or(current);

    let since_change = view.tick.saturating_sub(memory.last_lane_change);
    if since_change >= secs_to_ticks(0.6) as u64 && rng.random_bool(0.25) {
        let shift: i64 = rng.random_range(-1..=1);
        lane = (lane as i64 + shift).clamp(0, track.lanes() as i64 - 1) as u32;
        memory.last_lane_change = view.tick;
    }
    memory.target_lane = Some(lane);

    let intent = Intent::throttle(rng.random_range(0.3..0.7))
        .with_steer(steer_to_lane(track, actor, lane));
    AiDecision { memory, intent }
}

fn decide_racer(
    view: &AiView,
    actor: &Actor,
    profile: &AiProfile,
    rng: &mut Pcg32,
) -> AiDecision {
    let track = view.track;
    let tuning = view.tuning;
    let mut memory = actor.ai;
    let current = track.lane_of(actor.lateral(), actor.distance());
    let lane = memory.target_lane.unwrap_or(current);

    let recovering = actor.is_downed()
        || (memory.mode == AiMode::Recover && actor.speed() < 0.5 * actor.top_speed);
    let threat = nearest_opponent(view, actor, tuning.combat_range * 2.0);
    let target = nearest_opponent(view, actor, tuning.combat_range)
        .filter(|t| !t.is_downed());

    let (mode, mut intent, lane) = if recovering {
        let lane = safest_lane(view, actor, lane);
        (AiMode::Recover, Intent::throttle(1.0), lane)
    } else if actor.health_fraction(tuning) < profile.evade_below {
        (AiMode::Evade, Intent::throttle(1.0), safest_lane(view, actor, lane))
    } else if let Some(target) = target.filter(|_| {
        memory.mode == AiMode::Attack || rng.random_bool(profile.aggression)
    }) {
        let mut intent = Intent::throttle(throttle_for(actor, target.speed()))
            .with_steer(steer_to_lateral(track, actor, target.lateral()));
        if actor.action == ActionState::Idle {
            intent = intent.with_action(pick_strike(tuning, actor, target, rng));
        }
        (AiMode::Attack, intent, current)
    } else if let Some(lane) = overtake_lane(view, actor, current) {
        let mut intent = Intent::throttle(1.0);
        if actor.is_player() && actor.boosts_left > 0 {
            intent = intent.with_boost();
        }
        (AiMode::Overtake, intent, lane)
    } else {
        let lane = safest_lane(view, actor, lane);
        let pace = profile.cruise_pace * actor.top_speed;
        (AiMode::Cruise, Intent::throttle(throttle_for(actor, pace)), lane)
    };

    if let (AiMode::Evade, Some(threat)) = (mode, threat) {
        // Sidestep away from the closest threat
        let away = actor.lateral() - threat.lateral();
        intent.steer = if away == 0.0 { 1.0 } else { away.signum() };
    } else if mode != AiMode::Attack {
        intent.steer = steer_to_lane(track, actor, lane);
        if lane_blocked(view, actor, lane, tuning.lookahead * 0.3) && !actor.is_downed() {
            intent.throttle = 0.0;
            intent.brake = 0.5;
        }
    }

    if rng.random_bool(profile.jitter) {
        intent = jitter(intent, rng);
    }

    if memory.target_lane != Some(lane) {
        memory.last_lane_change = view.tick;
    }
    memory.mode = mode;
    memory.target_lane = Some(lane);
    AiDecision {
        memory,
        intent: intent.sanitized(),
    }
}

/// Whether `other` races against `actor`
fn is_opponent(actor: &Actor, other: &Actor) -> bool {
    other.id != actor.id
        && !other.is_eliminated()
        && match actor.kind {
            ActorKind::Player => other.is_rival(),
            ActorKind::Rival(_) => other.is_player() || other.is_rival(),
            ActorKind::Neutral => false,
        }
}

fn nearest_opponent<'a>(view: &AiView<'a>, actor: &Actor, range: f64) -> Option<&'a Actor> {
    view.actors
        .iter()
        .filter(|o| is_opponent(actor, o))
        .map(|o| (actor.pos.distance(o.pos), o))
        .filter(|(d, _)| *d <= range)
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)))
        .map(|(_, o)| o)
}

fn pick_strike(tuning: &Tuning, actor: &Actor, target: &Actor, rng: &mut Pcg32) -> Strike {
    let gap = actor.pos.distance(target.pos);
    let punch_range = actor.radius + tuning.punch.reach + target.radius;
    if gap < punch_range && rng.random_bool(0.6) {
        Strike::Punch
    } else {
        Strike::Kick
    }
}

/// Throttle that settles speed near `pace`
fn throttle_for(actor: &Actor, pace: f64) -> f64 {
    ((pace - actor.speed()) / 5.0 + 0.15).clamp(0.0, 1.0)
}

/// Steer toward a lateral offset, damped by current lateral speed
fn steer_to_lateral(track: &Track, actor: &Actor, lateral: f64) -> f64 {
    let lane_width = track.lane_width_at(actor.distance());
    let error = (lateral - actor.lateral()) / lane_width;
    (error * 2.0 - actor.vel.x * 0.15).clamp(-1.0, 1.0)
}

fn steer_to_lane(track: &Track, actor: &Actor, lane: u32) -> f64 {
    steer_to_lateral(track, actor, track.lane_center(lane, actor.distance()))
}

/// True if an obstacle sits in `lane` within `reach` ahead of the actor
fn lane_blocked(view: &AiView, actor: &Actor, lane: u32, reach: f64) -> bool {
    let track = view.track;
    let from = actor.distance();
    track.obstacles_between(from, from + reach).iter().any(|o| {
        o.pos.y >= from - o.radius
            && (o.pos.x - track.lane_center(lane, o.pos.y)).abs()
                < o.radius + actor.radius + track.lane_width_at(o.pos.y) * 0.25
    })
}

/// Keep the preferred lane unless an obstacle is coming up in it; then take
/// the nearest clear lane (lower lane on ties)
fn safest_lane(view: &AiView, actor: &Actor, preferred: u32) -> u32 {
    let reach = view.tuning.lookahead;
    if !lane_blocked(view, actor, preferred, reach) {
        return preferred;
    }
    (0..view.track.lanes())
        .filter(|&l| !lane_blocked(view, actor, l, reach))
        .min_by_key(|&l| (l.abs_diff(preferred), l))
        .unwrap_or(preferred)
}

/// Adjacent clear lane to pass a slower racer ahead in the same lane
fn overtake_lane(view: &AiView, actor: &Actor, current: u32) -> Option<u32> {
    let track = view.track;
    let window = view.tuning.overtake_window;
    let blocker = view.actors.iter().any(|o| {
        let gap = o.distance() - actor.distance();
        o.id != actor.id
            && !o.is_eliminated()
            && gap > 0.0
            && gap < window
            && o.speed() <= actor.speed()
            && track.lane_of(o.lateral(), o.distance()) == current
    });
    if !blocker {
        return None;
    }
    let lanes = track.lanes();
    [current.checked_sub(1), Some(current + 1).filter(|&l| l < lanes)]
        .into_iter()
        .flatten()
        .find(|&l| !lane_blocked(view, actor, l, view.tuning.lookahead))
}

/// Replace the plan with a random tweak
fn jitter(mut intent: Intent, rng: &mut Pcg32) -> Intent {
    match rng.random_range(0..3) {
        0 => intent.steer = rng.random_range(-1.0..=1.0),
        1 => {
            intent.throttle = rng.random_range(0.0..=1.0);
            intent.brake = 0.0;
        }
        _ => intent.action = None,
    }
    intent
}
