//! Collision detection and response
//!
//! Bikes and obstacles are circles on the road plane (`x` lateral, `y`
//! distance). Contacts are detected once per tick after integration and
//! resolved in ascending actor id order, so a pair is resolved exactly once
//! and tie-breaks are deterministic.

use glam::DVec2;

use super::snapshot::GameEvent;
use super::state::{Actor, ActionState, ActorId};
use super::store::ActorStore;
use super::track::{ObstacleKind, Track};
use crate::error::SimError;
use crate::tuning::Tuning;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point (if hit)
    pub point: DVec2,
    /// Unit normal pointing from the first body toward the second
    pub normal: DVec2,
    /// Penetration depth (for position correction)
    pub penetration: f64,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: DVec2::ZERO,
            normal: DVec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check overlap between two circles.
///
/// Coincident centers get a lateral normal (`+x`) so the first body is pushed
/// left and the second right.
pub fn circle_circle(a_pos: DVec2, a_radius: f64, b_pos: DVec2, b_radius: f64) -> CollisionResult {
    let delta = b_pos - a_pos;
    let dist = delta.length();
    let reach = a_radius + b_radius;
    if dist >= reach {
        return CollisionResult::miss();
    }
    let normal = if dist > 1e-9 { delta / dist } else { DVec2::X };
    CollisionResult {
        hit: true,
        point: a_pos + normal * a_radius,
        normal,
        penetration: reach - dist,
    }
}

/// An overlapping actor pair, `a < b`
#[derive(Debug, Clone, PartialEq)]
pub struct ActorContact {
    pub a: ActorId,
    pub b: ActorId,
    pub normal: DVec2,
    pub penetration: f64,
}

/// Find every overlapping pair of live actors, ordered by (a, b)
pub fn detect_actor_contacts(actors: &[Actor]) -> Vec<ActorContact> {
    let mut contacts = Vec::new();
    for (i, a) in actors.iter().enumerate() {
        if a.is_eliminated() {
            continue;
        }
        for b in &actors[i + 1..] {
            if b.is_eliminated() {
                continue;
            }
            let result = circle_circle(a.pos, a.radius, b.pos, b.radius);
            if result.hit {
                let (first, second, normal) = if a.id < b.id {
                    (a.id, b.id, result.normal)
                } else {
                    (b.id, a.id, -result.normal)
                };
                contacts.push(ActorContact {
                    a: first,
                    b: second,
                    normal,
                    penetration: result.penetration,
                });
            }
        }
    }
    contacts.sort_by_key(|c| (c.a, c.b));
    contacts
}

/// Resolve one bike-bike contact: impulse, lateral separation, bump damage.
///
/// Downed riders act as immovable bodies. Separation is lateral only so
/// nobody is pushed backwards along the track.
pub fn resolve_actor_contact(
    a: &mut Actor,
    b: &mut Actor,
    contact: &ActorContact,
    tuning: &Tuning,
    events: &mut Vec<GameEvent>,
) {
    let n = contact.normal;
    let approach_speed = (a.vel - b.vel).dot(n).max(0.0);

    let a_moves = !a.is_downed();
    let b_moves = !b.is_downed();
    let (a_share, b_share) = match (a_moves, b_moves) {
        (true, true) => (0.5, 0.5),
        (true, false) => (1.0, 0.0),
        (false, true) => (0.0, 1.0),
        (false, false) => (0.0, 0.0),
    };

    if approach_speed > 0.0 {
        let impulse = (1.0 + tuning.restitution) * approach_speed;
        a.vel -= n * impulse * a_share;
        b.vel += n * impulse * b_share;
        a.vel.y = a.vel.y.max(0.0);
        b.vel.y = b.vel.y.max(0.0);
    }

    // Separate along the lateral axis; a purely longitudinal overlap still
    // splits sideways with the lower id going left
    let side = if n.x.abs() > 1e-9 { n.x.signum() } else { 1.0 };
    let push = contact.penetration * n.x.abs().max(0.5);
    a.pos.x -= side * push * a_share;
    b.pos.x += side * push * b_share;

    if approach_speed >= tuning.bump_speed && tuning.bump_damage > 0 {
        a.take_damage(tuning.bump_damage);
        b.take_damage(tuning.bump_damage);
    }

    log::debug!(
        "Collision {} <-> {} (approach {:.2} m/s)",
        a.id,
        b.id,
        approach_speed
    );
    events.push(GameEvent::Collision {
        a: a.id,
        b: b.id,
        approach_speed,
    });
}

/// Resolve all bike-bike contacts in order
pub fn resolve_actor_contacts(
    store: &mut ActorStore,
    contacts: &[ActorContact],
    tuning: &Tuning,
    events: &mut Vec<GameEvent>,
) -> Result<(), SimError> {
    for contact in contacts {
        let (a, b) = store.pair_mut(contact.a, contact.b)?;
        resolve_actor_contact(a, b, contact, tuning, events);
    }
    Ok(())
}

/// Check obstacles under an actor; knockdowns and slips trigger on entry only
pub fn resolve_obstacles(
    actor: &mut Actor,
    track: &Track,
    tuning: &Tuning,
    events: &mut Vec<GameEvent>,
) {
    if actor.is_eliminated() {
        return;
    }
    let mut touching = Vec::new();
    for obstacle in track.obstacles_near(actor.pos.y, actor.radius) {
        if !circle_circle(actor.pos, actor.radius, obstacle.pos, obstacle.radius).hit {
            continue;
        }
        touching.push(obstacle.id);
        if actor.obstacle_contacts.contains(&obstacle.id) || actor.is_downed() {
            continue;
        }

        if obstacle.kind.knocks_down() {
            let damage = match obstacle.kind {
                ObstacleKind::Barrier => tuning.barrier_damage,
                _ => tuning.pothole_damage,
            };
            // Damage lands before the rider goes down (downed riders are immune)
            let damage = actor.take_damage(damage);
            actor.knock_down(tuning.downed_ticks());
            log::debug!(
                "Actor {} knocked down by {:?} {} ({} damage)",
                actor.id,
                obstacle.kind,
                obstacle.id,
                damage
            );
            events.push(GameEvent::Knockdown {
                id: actor.id,
                obstacle: obstacle.id,
                damage,
            });
        } else {
            actor.vel.y *= tuning.oil_slip_factor;
            events.push(GameEvent::Slipped {
                id: actor.id,
                obstacle: obstacle.id,
            });
        }
    }
    actor.obstacle_contacts = touching;
}

/// Nearest valid defender inside the attacker's hitbox, ties by lower id
fn pick_defender(actors: &[Actor], attacker: &Actor, reach: f64) -> Option<ActorId> {
    actors
        .iter()
        .filter(|d| d.id != attacker.id && !d.is_eliminated() && !d.is_downed())
        .filter_map(|d| {
            let hit = circle_circle(attacker.pos, attacker.radius + reach, d.pos, d.radius);
            hit.hit.then(|| (attacker.pos.distance_squared(d.pos), d.id))
        })
        .min_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)))
        .map(|(_, id)| id)
}

/// Land live strikes, attackers in ascending id order.
///
/// A strike connects at most once. A defender caught mid-strike has its own
/// strike interrupted, so two riders swinging at each other on the same tick
/// resolve with the lower id landing.
pub fn resolve_strikes(
    store: &mut ActorStore,
    tuning: &Tuning,
    events: &mut Vec<GameEvent>,
) -> Result<(), SimError> {
    for attacker_id in store.ids() {
        let attacker = store.get(attacker_id)?;
        if attacker.is_eliminated() {
            continue;
        }
        let Some(strike) = attacker.action.live_strike() else {
            continue;
        };
        let params = tuning.strike(strike);
        let Some(defender_id) = pick_defender(store.as_slice(), attacker, params.reach) else {
            continue;
        };

        let (attacker, defender) = store.pair_mut(attacker_id, defender_id)?;
        attacker.action.mark_landed();
        let damage = defender.take_damage(params.damage);

        if params.shove > 0.0 {
            let side = (defender.pos.x - attacker.pos.x).signum();
            let side = if side == 0.0 || side.is_nan() { 1.0 } else { side };
            defender.vel.x += side * params.shove;
        }

        if let Some(interrupted) = defender.action.strike() {
            let recover = tuning.strike(interrupted).recover_ticks();
            defender.action = ActionState::Recovering {
                ticks_left: recover,
            };
            events.push(GameEvent::StrikeInterrupted {
                id: defender_id,
                by: attacker_id,
            });
        }

        log::debug!(
            "{:?} {} -> {} for {} damage",
            strike,
            attacker_id,
            defender_id,
            damage
        );
        events.push(GameEvent::HitLanded {
            attacker: attacker_id,
            defender: defender_id,
            strike,
            damage,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ActorKind;
    use crate::sim::track::{Obstacle, ObstacleKind, Segment};

    fn rider(store: &mut ActorStore, lateral: f64, distance: f64, speed: f64) -> ActorId {
        store.add(
            Actor::new(ActorKind::Neutral, lateral, distance, &Tuning::default()).with_speed(speed),
        )
    }

    fn punching() -> ActionState {
        ActionState::Punching {
            ticks_left: 5,
            landed: false,
        }
    }

    #[test]
    fn test_circle_circle() {
        assert!(!circle_circle(DVec2::ZERO, 1.0, DVec2::new(3.0, 0.0), 1.0).hit);
        let hit = circle_circle(DVec2::ZERO, 1.0, DVec2::new(0.0, 1.5), 1.0);
        assert!(hit.hit);
        assert!((hit.penetration - 0.5).abs() < 1e-12);
        assert!((hit.normal - DVec2::Y).length() < 1e-12);
        // Coincident centers fall back to a lateral normal
        let hit = circle_circle(DVec2::ONE, 1.0, DVec2::ONE, 1.0);
        assert_eq!(hit.normal, DVec2::X);
    }

    #[test]
    fn test_each_pair_detected_once() {
        let mut store = ActorStore::new();
        let a = rider(&mut store, 0.0, 10.0, 0.0);
        let b = rider(&mut store, 0.5, 10.5, 0.0);
        let c = rider(&mut store, -0.5, 10.2, 0.0);
        rider(&mut store, 0.0, 50.0, 0.0);
        let contacts = detect_actor_contacts(store.as_slice());
        let pairs: Vec<_> = contacts.iter().map(|c| (c.a, c.b)).collect();
        assert_eq!(pairs, vec![(a, b), (a, c), (b, c)]);
    }

    #[test]
    fn test_rear_end_bump_transfers_speed_without_going_backwards() {
        let tuning = Tuning::default();
        let mut store = ActorStore::new();
        let slow = rider(&mut store, 0.0, 11.5, 10.0);
        let fast = rider(&mut store, 0.0, 10.0, 30.0);
        let contacts = detect_actor_contacts(store.as_slice());
        assert_eq!(contacts.len(), 1);
        let before: Vec<f64> = store.iter().map(|a| a.distance()).collect();

        let mut events = Vec::new();
        resolve_actor_contacts(&mut store, &contacts, &tuning, &mut events).unwrap();

        let slow = store.get(slow).unwrap();
        let fast = store.get(fast).unwrap();
        assert!(slow.speed() > 10.0);
        assert!(fast.speed() < 30.0);
        assert!(fast.speed() >= 0.0);
        let after: Vec<f64> = store.iter().map(|a| a.distance()).collect();
        assert_eq!(before, after);
        // Pushed apart sideways
        assert!((slow.lateral() - fast.lateral()).abs() > 0.0);
        // Hard bump hurts both
        assert_eq!(slow.health, tuning.max_health - tuning.bump_damage);
        assert_eq!(fast.health, tuning.max_health - tuning.bump_damage);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_downed_rider_is_immovable_and_immune() {
        let tuning = Tuning::default();
        let mut store = ActorStore::new();
        let down = rider(&mut store, 0.0, 10.0, 0.0);
        let moving = rider(&mut store, 0.0, 9.0, 40.0);
        store.get_mut(down).unwrap().knock_down(30);
        let contacts = detect_actor_contacts(store.as_slice());
        let mut events = Vec::new();
        resolve_actor_contacts(&mut store, &contacts, &tuning, &mut events).unwrap();
        let down = store.get(down).unwrap();
        assert_eq!(down.pos, DVec2::new(0.0, 10.0));
        assert_eq!(down.health, tuning.max_health);
        assert!(store.get(moving).unwrap().health < tuning.max_health);
    }

    #[test]
    fn test_mutual_strikes_lower_id_wins() {
        let tuning = Tuning::default();
        let mut store = ActorStore::new();
        let a = rider(&mut store, 0.0, 10.0, 20.0);
        let b = rider(&mut store, 0.0, 10.0, 20.0);
        store.get_mut(a).unwrap().action = punching();
        store.get_mut(b).unwrap().action = punching();

        let mut events = Vec::new();
        resolve_strikes(&mut store, &tuning, &mut events).unwrap();

        assert_eq!(store.get(a).unwrap().health, tuning.max_health);
        assert_eq!(
            store.get(b).unwrap().health,
            tuning.max_health - tuning.punch.damage
        );
        assert!(matches!(
            store.get(b).unwrap().action,
            ActionState::Recovering { .. }
        ));
        let hits = events
            .iter()
            .filter(|e| matches!(e, GameEvent::HitLanded { .. }))
            .count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_strike_lands_once_and_picks_nearest() {
        let tuning = Tuning::default();
        let mut store = ActorStore::new();
        let attacker = rider(&mut store, 0.0, 10.0, 20.0);
        let far = rider(&mut store, 2.5, 10.0, 20.0);
        let near = rider(&mut store, -2.0, 10.0, 20.0);
        store.get_mut(attacker).unwrap().action = punching();

        let mut events = Vec::new();
        resolve_strikes(&mut store, &tuning, &mut events).unwrap();
        resolve_strikes(&mut store, &tuning, &mut events).unwrap();

        assert_eq!(store.get(far).unwrap().health, tuning.max_health);
        assert_eq!(
            store.get(near).unwrap().health,
            tuning.max_health - tuning.punch.damage
        );
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_strike_ignores_downed_rider() {
        let tuning = Tuning::default();
        let mut store = ActorStore::new();
        let attacker = rider(&mut store, 0.0, 10.0, 20.0);
        let victim = rider(&mut store, 1.0, 10.0, 0.0);
        store.get_mut(attacker).unwrap().action = punching();
        store.get_mut(victim).unwrap().knock_down(30);

        let mut events = Vec::new();
        resolve_strikes(&mut store, &tuning, &mut events).unwrap();
        assert!(events.is_empty());
        assert_eq!(store.get(victim).unwrap().health, tuning.max_health);
    }

    #[test]
    fn test_kick_shoves_defender_away() {
        let tuning = Tuning::default();
        let mut store = ActorStore::new();
        let attacker = rider(&mut store, 0.0, 10.0, 20.0);
        let victim = rider(&mut store, 1.5, 10.0, 20.0);
        store.get_mut(attacker).unwrap().action = ActionState::Kicking {
            ticks_left: 5,
            landed: false,
        };
        let mut events = Vec::new();
        resolve_strikes(&mut store, &tuning, &mut events).unwrap();
        assert_eq!(store.get(victim).unwrap().vel.x, tuning.kick.shove);
    }

    #[test]
    fn test_obstacle_triggers_on_entry_only() {
        let tuning = Tuning::default();
        let mut seg = Segment::straight(100.0, 12.0);
        seg.obstacles.push(Obstacle::new(ObstacleKind::OilSlick, 0.0, 50.0));
        seg.obstacles.push(Obstacle::new(ObstacleKind::Barrier, 4.0, 80.0));
        let track = Track::new(3, vec![seg]).unwrap();

        let mut actor =
            Actor::new(ActorKind::Neutral, 0.0, 49.0, &tuning).with_speed(20.0);
        let mut events = Vec::new();
        resolve_obstacles(&mut actor, &track, &tuning, &mut events);
        assert!((actor.speed() - 20.0 * tuning.oil_slip_factor).abs() < 1e-12);
        resolve_obstacles(&mut actor, &track, &tuning, &mut events);
        assert_eq!(events.len(), 1);

        actor.pos = DVec2::new(4.0, 79.5);
        resolve_obstacles(&mut actor, &track, &tuning, &mut events);
        assert!(actor.is_downed());
        assert_eq!(actor.speed(), 0.0);
        assert_eq!(actor.health, tuning.max_health - tuning.barrier_damage);
        assert_eq!(actor.obstacle_contacts, vec![1]);
    }
}
