//! Race state machine
//!
//! `NotStarted -> Running -> {Finished, Aborted}`. Terminal phases are final.
//! While running, standings are recomputed every tick.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::snapshot::GameEvent;
use super::state::{Actor, ActorId, ActorKind};
use crate::tuning::Tuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RacePhase {
    #[default]
    NotStarted,
    Running,
    Finished,
    Aborted,
}

impl RacePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RacePhase::Finished | RacePhase::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// Player reached the end of the track
    PlayerCrossedLine,
    /// Every rival the race started with is out
    RivalsEliminated,
    /// Race clock ran out
    TimeLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    PlayerEliminated,
    Cancelled,
    /// A tick failed to resolve; its partial state was discarded
    Fault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceResult {
    Finished(FinishReason),
    Aborted(AbortReason),
}

/// How the race ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceOutcome {
    pub result: RaceResult,
    /// First racer across the line, else the leading racer still riding
    pub winner: Option<ActorId>,
    /// Player's 1-based place among racers (player and rivals)
    pub player_rank: Option<usize>,
}

/// The single race aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceState {
    pub phase: RacePhase,
    /// Ticks spent running (frozen while paused)
    pub clock_ticks: u64,
    /// Active actors, leader first
    pub standings: Vec<ActorId>,
    pub player: Option<ActorId>,
    pub seed: u64,
    /// Rivals present at the start
    pub initial_rivals: Vec<ActorId>,
    pub paused: bool,
    /// Actors in the order they crossed the line
    pub finish_order: Vec<ActorId>,
    pub outcome: Option<RaceOutcome>,
}

/// Leader first: distance descending, ties by ascending id
pub fn rank_order(a: &Actor, b: &Actor) -> Ordering {
    b.distance()
        .total_cmp(&a.distance())
        .then_with(|| a.id.cmp(&b.id))
}

/// Rank every live actor
pub fn compute_standings(actors: &[Actor]) -> Vec<ActorId> {
    let mut live: Vec<&Actor> = actors.iter().filter(|a| !a.is_eliminated()).collect();
    live.sort_by(|a, b| rank_order(a, b));
    live.into_iter().map(|a| a.id).collect()
}

impl RaceState {
    pub fn new(seed: u64) -> Self {
        Self {
            phase: RacePhase::NotStarted,
            clock_ticks: 0,
            standings: Vec::new(),
            player: None,
            seed,
            initial_rivals: Vec::new(),
            paused: false,
            finish_order: Vec::new(),
            outcome: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == RacePhase::Running
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// 1-based position in the current standings
    pub fn rank_of(&self, id: ActorId) -> Option<usize> {
        self.standings.iter().position(|&s| s == id).map(|i| i + 1)
    }

    /// Enter `Running`. Callers check preconditions first.
    pub fn start(&mut self, actors: &[Actor], events: &mut Vec<GameEvent>) {
        self.player = actors.iter().find(|a| a.is_player()).map(|a| a.id);
        self.initial_rivals = actors.iter().filter(|a| a.is_rival()).map(|a| a.id).collect();
        self.standings = compute_standings(actors);
        self.phase = RacePhase::Running;
        log::info!(
            "Race started (seed {}, {} rivals, {} actors)",
            self.seed,
            self.initial_rivals.len(),
            actors.len()
        );
        events.push(GameEvent::RaceStarted);
    }

    /// Toggle pause; only meaningful while running
    pub fn toggle_pause(&mut self, events: &mut Vec<GameEvent>) {
        if !self.is_running() {
            return;
        }
        self.paused = !self.paused;
        log::info!("Race {}", if self.paused { "paused" } else { "resumed" });
        events.push(if self.paused {
            GameEvent::Paused
        } else {
            GameEvent::Resumed
        });
    }

    /// Post-resolution bookkeeping for one running tick.
    ///
    /// Checks, in order: player eliminated, player across the line, rivals
    /// all out, clock expired.
    pub fn update(&mut self, actors: &[Actor], tuning: &Tuning, events: &mut Vec<GameEvent>) {
        if !self.is_running() {
            return;
        }
        self.clock_ticks += 1;
        self.standings = compute_standings(actors);

        let mut newly_finished: Vec<&Actor> = actors
            .iter()
            .filter(|a| a.finished_at.is_some() && !self.finish_order.contains(&a.id))
            .collect();
        newly_finished.sort_by(|a, b| rank_order(a, b));
        self.finish_order.extend(newly_finished.iter().map(|a| a.id));

        let player = self
            .player
            .and_then(|id| actors.iter().find(|a| a.id == id));
        match player {
            None => return self.abort(AbortReason::Fault, actors, events),
            Some(p) if p.is_eliminated() => {
                return self.abort(AbortReason::PlayerEliminated, actors, events);
            }
            Some(p) if p.finished_at.is_some() => {
                return self.finish(FinishReason::PlayerCrossedLine, actors, events);
            }
            Some(_) => {}
        }

        let rivals_out = !self.initial_rivals.is_empty()
            && self.initial_rivals.iter().all(|id| {
                actors
                    .iter()
                    .find(|a| a.id == *id)
                    .is_none_or(|a| a.is_eliminated())
            });
        if rivals_out {
            return self.finish(FinishReason::RivalsEliminated, actors, events);
        }
        if self.clock_ticks >= tuning.max_race_ticks() {
            self.finish(FinishReason::TimeLimit, actors, events);
        }
    }

    pub fn finish(&mut self, reason: FinishReason, actors: &[Actor], events: &mut Vec<GameEvent>) {
        if self.is_terminal() {
            return;
        }
        self.phase = RacePhase::Finished;
        self.paused = false;
        self.outcome = Some(self.outcome_for(RaceResult::Finished(reason), actors));
        log::info!("Race finished: {:?} after {} ticks", reason, self.clock_ticks);
        events.push(GameEvent::RaceFinished { reason });
    }

    pub fn abort(&mut self, reason: AbortReason, actors: &[Actor], events: &mut Vec<GameEvent>) {
        if self.is_terminal() {
            return;
        }
        self.phase = RacePhase::Aborted;
        self.paused = false;
        self.outcome = Some(self.outcome_for(RaceResult::Aborted(reason), actors));
        match reason {
            AbortReason::Fault => log::error!("Race aborted after a faulted tick"),
            _ => log::warn!("Race aborted: {:?}", reason),
        }
        events.push(GameEvent::RaceAborted { reason });
    }

    /// Racers (player and rivals) in final placing order: finishers by
    /// crossing order, then everyone still riding by standings
    fn racer_placings(&self, actors: &[Actor]) -> Vec<ActorId> {
        let is_racer = |id: &ActorId| {
            actors
                .iter()
                .find(|a| a.id == *id)
                .is_some_and(|a| !matches!(a.kind, ActorKind::Neutral) && !a.is_eliminated())
        };
        let mut placings: Vec<ActorId> =
            self.finish_order.iter().copied().filter(is_racer).collect();
        for id in compute_standings(actors) {
            if is_racer(&id) && !placings.contains(&id) {
                placings.push(id);
            }
        }
        placings
    }

    fn outcome_for(&self, result: RaceResult, actors: &[Actor]) -> RaceOutcome {
        let placings = self.racer_placings(actors);
        RaceOutcome {
            result,
            winner: placings.first().copied(),
            player_rank: self
                .player
                .and_then(|id| placings.iter().position(|&p| p == id))
                .map(|i| i + 1),
        }
    }
}
