//! End-to-end race scenarios

use std::sync::Arc;

use glam::DVec2;
use road_rash_sim::persistence::SaveEnvelope;
use road_rash_sim::sim::{
    AbortReason, ActionState, Actor, ActorId, ActorKind, FinishReason, GameEvent, Intent,
    Obstacle, ObstacleKind, RacePhase, Segment, Simulation, Snapshot, Strike, TickInput, Track,
};
use road_rash_sim::{Personality, RaceSetup, Tuning};

fn race_on(track: Track) -> (Simulation, ActorId, ActorId) {
    let tuning = Tuning::default();
    let mut sim = Simulation::new(17, tuning.clone());
    sim.set_track(Arc::new(track)).unwrap();
    let player = sim
        .add_actor(Actor::new(ActorKind::Player, 0.0, 0.0, &tuning))
        .unwrap();
    let rival = sim
        .add_actor(Actor::new(
            ActorKind::Rival(Personality::Aggressive),
            -4.0,
            0.0,
            &tuning,
        ))
        .unwrap();
    sim.start().unwrap();
    (sim, player, rival)
}

fn healths(snapshot: &Snapshot) -> Vec<(ActorId, u16)> {
    snapshot.actors.iter().map(|a| (a.id, a.health)).collect()
}

#[test]
fn player_reaching_the_line_finishes_within_one_tick() {
    let (mut sim, player, _) = race_on(Track::straight(1000.0, 3).unwrap());
    sim.update_actor(player, |a| {
        a.pos.y = 1000.0;
        a.vel.y = 10.0;
    })
    .unwrap();
    let snapshot = sim.tick(&TickInput::default()).unwrap();
    assert_eq!(snapshot.race.phase, RacePhase::Finished);
    assert_eq!(
        snapshot.events.last(),
        Some(&GameEvent::RaceFinished {
            reason: FinishReason::PlayerCrossedLine
        })
    );
    assert_eq!(snapshot.race.outcome.unwrap().winner, Some(player));
}

#[test]
fn player_knocked_to_zero_aborts_and_freezes_health() {
    let (mut sim, player, rival) = race_on(Track::straight(1000.0, 3).unwrap());
    let tuning = sim.tuning().clone();
    sim.update_actor(player, |a| a.health = tuning.kick.damage).unwrap();
    sim.update_actor(rival, |a| a.pos = DVec2::new(2.5, 0.0)).unwrap();

    let kick = TickInput::default()
        .with_intent(player, Intent::neutral())
        .with_intent(rival, Intent::neutral().with_action(Strike::Kick));
    let snapshot = sim.tick(&kick).unwrap();
    assert_eq!(snapshot.race.phase, RacePhase::Aborted);
    assert!(snapshot.events.contains(&GameEvent::ActorEliminated { id: player }));
    assert!(snapshot.events.contains(&GameEvent::RaceAborted {
        reason: AbortReason::PlayerEliminated
    }));

    let frozen = healths(&snapshot);
    for _ in 0..30 {
        let after = sim.tick(&kick).unwrap();
        assert_eq!(healths(&after), frozen);
        assert!(after.events.is_empty());
    }
}

#[test]
fn downed_rider_takes_no_damage_until_recovered() {
    let mut seg = Segment::straight(1000.0, 12.0);
    seg.obstacles
        .push(Obstacle::new(ObstacleKind::Pothole, 0.0, 5.0));
    let (mut sim, player, rival) = race_on(Track::new(3, vec![seg]).unwrap());
    let tuning = sim.tuning().clone();
    sim.update_actor(player, |a| {
        a.pos.y = 3.5;
        a.vel.y = 20.0;
    })
    .unwrap();

    let ride = TickInput::default().with_intent(player, Intent::throttle(1.0));
    let snapshot = sim.tick(&ride).unwrap();
    let downed = snapshot.actor(player).unwrap();
    assert!(downed.is_downed());
    let health_when_downed = downed.health;
    assert_eq!(health_when_downed, tuning.max_health - tuning.pothole_damage);

    // Rival parks alongside and kicks every tick it can
    let mut recovered = false;
    for _ in 0..tuning.downed_ticks() + 5 {
        let pos = sim.store().get(player).unwrap().pos;
        sim.update_actor(rival, |a| {
            a.pos = pos + DVec2::new(2.5, 0.0);
            a.vel = DVec2::ZERO;
            if matches!(a.action, ActionState::Recovering { .. }) {
                a.action = ActionState::Idle;
            }
        })
        .unwrap();
        let input = ride
            .clone()
            .with_intent(rival, Intent::neutral().with_action(Strike::Kick));
        let snapshot = sim.tick(&input).unwrap();
        let rider = snapshot.actor(player).unwrap();
        if rider.is_downed() {
            assert_eq!(rider.health, health_when_downed);
        } else {
            recovered = true;
            break;
        }
    }
    assert!(recovered);
}

#[test]
fn mutual_strikes_resolve_with_exactly_one_hit() {
    let tuning = Tuning::default();
    let mut sim = Simulation::new(3, tuning.clone());
    sim.set_track(Arc::new(Track::straight(1000.0, 3).unwrap()))
        .unwrap();
    let a = sim
        .add_actor(Actor::new(ActorKind::Player, 0.0, 50.0, &tuning).with_speed(20.0))
        .unwrap();
    let b = sim
        .add_actor(
            Actor::new(ActorKind::Rival(Personality::Balanced), 0.0, 50.0, &tuning)
                .with_speed(20.0),
        )
        .unwrap();
    sim.start().unwrap();

    let punch = Intent::throttle(0.2).with_action(Strike::Punch);
    let snapshot = sim
        .tick(&TickInput::default().with_intent(a, punch).with_intent(b, punch))
        .unwrap();

    let hits: Vec<_> = snapshot
        .events
        .iter()
        .filter_map(|e| match e {
            GameEvent::HitLanded {
                attacker, defender, ..
            } => Some((*attacker, *defender)),
            _ => None,
        })
        .collect();
    assert_eq!(hits, vec![(a, b)]);
    assert!(snapshot.events.contains(&GameEvent::StrikeInterrupted { id: b, by: a }));
    assert_eq!(snapshot.collisions_between(a, b), 1);
    assert_eq!(snapshot.actor(a).unwrap().health, tuning.max_health);
}

#[test]
fn saved_race_resumes_bit_identically() {
    let setup = RaceSetup {
        rivals: 3,
        neutrals: 6,
        ..RaceSetup::with_seed(1234)
    };
    let tuning = Tuning::default();
    let mut uninterrupted = setup.build(&tuning).unwrap();
    uninterrupted.start().unwrap();

    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };
    for _ in 0..240 {
        uninterrupted.tick(&input).unwrap();
    }

    let json = SaveEnvelope::new(setup, tuning, uninterrupted.snapshot())
        .to_json()
        .unwrap();
    let mut restored = SaveEnvelope::from_json(&json).unwrap().resume().unwrap();
    assert_eq!(restored.snapshot(), uninterrupted.snapshot());

    for _ in 0..600 {
        let expected = uninterrupted.tick(&input).unwrap();
        let actual = restored.tick(&input).unwrap();
        assert_eq!(actual, expected);
        if !expected.race.is_running() {
            break;
        }
    }
}

#[test]
fn cancelled_race_stays_aborted() {
    let (mut sim, _, _) = race_on(Track::straight(1000.0, 3).unwrap());
    let snapshot = sim
        .tick(&TickInput {
            cancel: true,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(
        snapshot.race.outcome.map(|o| o.result),
        Some(road_rash_sim::sim::RaceResult::Aborted(AbortReason::Cancelled))
    );
    assert!(sim.start().is_err());
    assert_eq!(sim.tick(&TickInput::default()).unwrap().race.phase, RacePhase::Aborted);
}

#[test]
fn autopilot_race_reaches_an_outcome() {
    let setup = RaceSetup {
        rivals: 2,
        neutrals: 4,
        track: road_rash_sim::sim::TrackParams {
            length: 600.0,
            ..Default::default()
        },
        ..RaceSetup::with_seed(99)
    };
    let tuning = Tuning::default();
    let mut sim = setup.build(&tuning).unwrap();
    sim.start().unwrap();
    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };
    while sim.race().is_running() {
        sim.tick(&input).unwrap();
        assert!(sim.tick_count() <= tuning.max_race_ticks());
    }
    assert!(sim.race().outcome.is_some());
}
