//! Fixed timestep simulation tick
//!
//! [`Simulation`] owns the actor store and race state and advances them one
//! tick at a time. Each tick: gather intents (human input, else AI), resolve
//! on a working copy, commit, drop eliminated actors, update the race, emit a
//! [`Snapshot`].

use std::collections::BTreeMap;
use std::sync::Arc;

use super::ai::{AiView, decide};
use super::intent::Intent;
use super::physics::resolve_tick;
use super::race::{AbortReason, RacePhase, RaceState};
use super::snapshot::{GameEvent, Snapshot};
use super::state::{Actor, ActorId, AiMemory, RngState};
use super::store::ActorStore;
use super::track::Track;
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::error::SimError;
use crate::tuning::Tuning;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    /// Human intents by actor; any actor without one is driven by the AI
    /// (or coasts, for the player)
    pub intents: BTreeMap<ActorId, Intent>,
    /// Pause toggle
    pub pause: bool,
    /// Abandon the race
    pub cancel: bool,
    /// Demo mode - AI rides for the player too
    pub autopilot: bool,
}

impl TickInput {
    pub fn with_intent(mut self, id: ActorId, intent: Intent) -> Self {
        self.intents.insert(id, intent);
        self
    }
}

/// Deterministic race simulation
#[derive(Debug, Clone)]
pub struct Simulation {
    store: ActorStore,
    track: Option<Arc<Track>>,
    race: RaceState,
    rng: RngState,
    tuning: Tuning,
    /// Events raised by a tick that returned an error, delivered with the
    /// next snapshot
    pending_events: Vec<GameEvent>,
}

impl Simulation {
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        Self {
            store: ActorStore::new(),
            track: None,
            race: RaceState::new(seed),
            rng: RngState::new(seed),
            tuning,
            pending_events: Vec::new(),
        }
    }

    /// Rebuild a simulation from a snapshot so it continues exactly where
    /// the snapshot left off
    pub fn resume(track: Arc<Track>, tuning: Tuning, snapshot: Snapshot) -> Self {
        let race = snapshot.race;
        log::info!(
            "Resuming race (seed {}) at tick {} in phase {:?}",
            race.seed,
            race.clock_ticks,
            race.phase
        );
        Self {
            store: ActorStore::from_actors(snapshot.actors),
            track: Some(track),
            rng: RngState::new(race.seed),
            race,
            tuning,
            pending_events: Vec::new(),
        }
    }

    pub fn race(&self) -> &RaceState {
        &self.race
    }

    pub fn store(&self) -> &ActorStore {
        &self.store
    }

    pub fn track(&self) -> Option<&Arc<Track>> {
        self.track.as_ref()
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn rng(&self) -> RngState {
        self.rng
    }

    /// Ticks resolved so far
    pub fn tick_count(&self) -> u64 {
        self.race.clock_ticks
    }

    fn require_setup(&self, op: &'static str) -> Result<(), SimError> {
        if self.race.phase != RacePhase::NotStarted {
            return Err(SimError::InvalidPhase {
                op,
                phase: self.race.phase,
            });
        }
        Ok(())
    }

    /// Supply the track. Only before the race starts.
    pub fn set_track(&mut self, track: Arc<Track>) -> Result<(), SimError> {
        self.require_setup("set track")?;
        self.track = Some(track);
        Ok(())
    }

    /// Add an actor to the grid. Only before the race starts.
    pub fn add_actor(&mut self, actor: Actor) -> Result<ActorId, SimError> {
        self.require_setup("add actor")?;
        Ok(self.store.add(actor))
    }

    /// Apply an external effect to one actor between ticks
    pub fn update_actor<R>(
        &mut self,
        id: ActorId,
        f: impl FnOnce(&mut Actor) -> R,
    ) -> Result<R, SimError> {
        self.store.update(id, f)
    }

    /// Start the race
    pub fn start(&mut self) -> Result<Snapshot, SimError> {
        self.require_setup("start")?;
        if self.track.is_none() {
            return Err(SimError::TrackDataMissing);
        }
        let players = self.store.iter().filter(|a| a.is_player()).count();
        if players != 1 {
            return Err(SimError::NoPlayer(players));
        }
        let mut events = Vec::new();
        self.race.start(self.store.as_slice(), &mut events);
        Ok(self.emit(events))
    }

    /// Copy of the current state with no events
    pub fn snapshot(&self) -> Snapshot {
        self.emit(Vec::new())
    }

    fn emit(&self, events: Vec<GameEvent>) -> Snapshot {
        Snapshot {
            tick: self.race.clock_ticks,
            actors: self.store.as_slice().to_vec(),
            race: self.race.clone(),
            events,
        }
    }

    /// Intents for every live actor: human input first, else the AI
    fn gather_intents(
        &self,
        input: &TickInput,
        track: &Track,
    ) -> (BTreeMap<ActorId, Intent>, BTreeMap<ActorId, AiMemory>) {
        let view = AiView {
            tick: self.race.clock_ticks,
            track,
            actors: self.store.as_slice(),
            tuning: &self.tuning,
            rng: self.rng,
        };
        let mut intents = BTreeMap::new();
        let mut memories = BTreeMap::new();
        for actor in self.store.iter().filter(|a| !a.is_eliminated()) {
            if let Some(intent) = input.intents.get(&actor.id) {
                if !intent.is_valid() {
                    log::trace!("Clamping out-of-range intent for actor {}", actor.id);
                }
                intents.insert(actor.id, *intent);
            } else if actor.is_player() && !input.autopilot {
                intents.insert(actor.id, Intent::neutral());
            } else {
                let decision = decide(&view, actor);
                intents.insert(actor.id, decision.intent);
                memories.insert(actor.id, decision.memory);
            }
        }
        (intents, memories)
    }

    /// Advance one fixed timestep
    pub fn tick(&mut self, input: &TickInput) -> Result<Snapshot, SimError> {
        if let Some(&unknown) = input.intents.keys().find(|id| !self.store.contains(**id)) {
            return Err(SimError::NotFound(unknown));
        }
        match self.race.phase {
            RacePhase::NotStarted => {
                return Err(SimError::InvalidPhase {
                    op: "tick",
                    phase: RacePhase::NotStarted,
                });
            }
            RacePhase::Finished | RacePhase::Aborted => {
                let pending = std::mem::take(&mut self.pending_events);
                return Ok(self.emit(pending));
            }
            RacePhase::Running => {}
        }

        let mut events = Vec::new();
        if input.cancel {
            self.race
                .abort(AbortReason::Cancelled, self.store.as_slice(), &mut events);
            return Ok(self.emit(events));
        }
        if input.pause {
            self.race.toggle_pause(&mut events);
        }
        if self.race.paused {
            return Ok(self.emit(events));
        }

        let track = self.track.clone().ok_or(SimError::TrackDataMissing)?;
        let (intents, memories) = self.gather_intents(input, &track);
        let next_tick = self.race.clock_ticks + 1;

        let resolution = match resolve_tick(
            &self.store,
            &intents,
            &track,
            &self.tuning,
            next_tick,
            SIM_DT,
        ) {
            Ok(resolution) => resolution,
            Err(err) => {
                log::error!("Tick {} failed to resolve: {}", next_tick, err);
                self.race
                    .abort(AbortReason::Fault, self.store.as_slice(), &mut events);
                self.pending_events = events;
                return Err(err);
            }
        };
        events.extend(resolution.events);
        let mut store = resolution.store;

        for (id, memory) in memories {
            store.update(id, |a| a.ai = memory)?;
        }

        // Newly eliminated actors leave the road; the player stays so the
        // race can report on it
        let out: Vec<ActorId> = store
            .iter()
            .filter(|a| a.is_eliminated())
            .map(|a| a.id)
            .collect();
        for id in out {
            let already_out = self.store.get(id).is_ok_and(|prev| prev.is_eliminated());
            if already_out && Some(id) == self.race.player {
                continue;
            }
            log::info!("Actor {} eliminated at tick {}", id, next_tick);
            events.push(GameEvent::ActorEliminated { id });
            if Some(id) != self.race.player {
                store.remove(id)?;
            }
        }

        self.store = store;
        self.race.update(self.store.as_slice(), &self.tuning, &mut events);
        Ok(self.emit(events))
    }

    /// Run as many whole ticks as the frame's elapsed time allows.
    ///
    /// One-shot inputs (`pause`, `cancel`) apply to the first substep only.
    pub fn run_frame(
        &mut self,
        clock: &mut FixedTimestep,
        input: &TickInput,
        frame_secs: f64,
    ) -> Result<Vec<Snapshot>, SimError> {
        let steps = clock.advance(frame_secs);
        let mut input = input.clone();
        let mut snapshots = Vec::with_capacity(steps as usize);
        for _ in 0..steps {
            snapshots.push(self.tick(&input)?);
            input.pause = false;
            input.cancel = false;
        }
        Ok(snapshots)
    }
}

/// Fixed update / variable render accumulator
#[derive(Debug, Clone, PartialEq)]
pub struct FixedTimestep {
    accumulator: f64,
    dt: f64,
    max_substeps: u32,
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(SIM_DT)
    }
}

impl FixedTimestep {
    pub fn new(dt: f64) -> Self {
        Self {
            accumulator: 0.0,
            dt,
            max_substeps: MAX_SUBSTEPS,
        }
    }

    /// Bank a frame's elapsed time and return how many ticks to run.
    /// Long frames are capped so a stall cannot snowball.
    pub fn advance(&mut self, frame_secs: f64) -> u32 {
        let frame = if frame_secs.is_finite() {
            frame_secs.clamp(0.0, 0.1)
        } else {
            0.0
        };
        self.accumulator += frame;

        let mut substeps = 0;
        while self.accumulator >= self.dt && substeps < self.max_substeps {
            self.accumulator -= self.dt;
            substeps += 1;
        }
        if substeps == self.max_substeps {
            self.accumulator = self.accumulator.min(self.dt);
        }
        substeps
    }

    /// Fraction of a tick left over, for render interpolation
    pub fn alpha(&self) -> f64 {
        self.accumulator / self.dt
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
