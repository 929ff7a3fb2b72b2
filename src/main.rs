//! Road Rash Sim headless runner
//!
//! Runs a seeded race with the player on autopilot and prints the result as
//! JSON. Useful for balancing tuning files and checking determinism.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use road_rash_sim::persistence::{SaveEnvelope, load_snapshot, save_snapshot};
use road_rash_sim::sim::{ActorId, GameEvent, RaceOutcome, Simulation, TickInput};
use road_rash_sim::{Personality, RaceSetup, Tuning};

/// Run a headless race
#[derive(Parser)]
#[command(name = "road-rash-sim", version)]
struct Cli {
    /// Race seed (track, neutrals and AI rolls)
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Opponent personality: aggressive, balanced or random
    #[arg(long, default_value = "balanced", value_parser = parse_personality)]
    opponent: Personality,

    /// Number of rivals
    #[arg(long, default_value_t = 1)]
    rivals: u32,

    /// Number of neutral bikers
    #[arg(long, default_value_t = 5)]
    neutrals: u32,

    /// Track length in meters
    #[arg(long)]
    length: Option<f64>,

    /// Tuning overrides (JSON)
    #[arg(long, value_name = "FILE")]
    tuning: Option<PathBuf>,

    /// Continue a saved race instead of starting a new one
    #[arg(long, value_name = "FILE", conflicts_with_all = ["seed", "opponent", "rivals", "neutrals", "length", "tuning"])]
    resume: Option<PathBuf>,

    /// Stop after this many ticks (the race may still be running)
    #[arg(long)]
    ticks: Option<u64>,

    /// Write the final state to a save file
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,
}

fn parse_personality(s: &str) -> Result<Personality, String> {
    Personality::from_str(s).ok_or_else(|| format!("unknown opponent '{s}'"))
}

#[derive(Serialize)]
struct Summary {
    seed: u64,
    ticks: u64,
    phase: String,
    outcome: Option<RaceOutcome>,
    player: Option<ActorId>,
    player_health: Option<u16>,
    player_distance: Option<f64>,
    standings: Vec<ActorId>,
    hits_landed: usize,
    knockdowns: usize,
    eliminated: Vec<ActorId>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let (setup, tuning, mut sim) = match &cli.resume {
        Some(path) => {
            let envelope = load_snapshot(path)
                .with_context(|| format!("Failed to load save {}", path.display()))?;
            let setup = envelope.setup.clone();
            let tuning = envelope.tuning.clone();
            (setup, tuning, envelope.resume()?)
        }
        None => {
            let tuning = match &cli.tuning {
                Some(path) => Tuning::load(path)?,
                None => Tuning::default(),
            };
            let mut setup = RaceSetup {
                seed: cli.seed,
                opponent: cli.opponent,
                rivals: cli.rivals,
                neutrals: cli.neutrals,
                ..Default::default()
            };
            if let Some(length) = cli.length {
                setup.track.length = length;
            }
            let mut sim = setup.build(&tuning).context("Failed to build race")?;
            sim.start().context("Failed to start race")?;
            (setup, tuning, sim)
        }
    };

    let summary = run(&mut sim, cli.ticks)?;

    if let Some(path) = &cli.save {
        let envelope = SaveEnvelope::new(setup, tuning, sim.snapshot());
        save_snapshot(path, &envelope)
            .with_context(|| format!("Failed to write save {}", path.display()))?;
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run(sim: &mut Simulation, max_ticks: Option<u64>) -> Result<Summary> {
    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };
    let mut hits_landed = 0;
    let mut knockdowns = 0;
    let mut eliminated = Vec::new();
    let mut ran = 0;

    while sim.race().is_running() && max_ticks.is_none_or(|max| ran < max) {
        let snapshot = sim.tick(&input)?;
        ran += 1;
        for event in &snapshot.events {
            match event {
                GameEvent::HitLanded { .. } => hits_landed += 1,
                GameEvent::Knockdown { .. } => knockdowns += 1,
                GameEvent::ActorEliminated { id } => eliminated.push(*id),
                _ => {}
            }
        }
    }

    let snapshot = sim.snapshot();
    let race = &snapshot.race;
    let player = snapshot.player();
    Ok(Summary {
        seed: race.seed,
        ticks: snapshot.tick,
        phase: format!("{:?}", race.phase),
        outcome: race.outcome,
        player: race.player,
        player_health: player.map(|p| p.health),
        player_distance: player.map(|p| p.distance()),
        standings: race.standings.clone(),
        hits_landed,
        knockdowns,
        eliminated,
    })
}
