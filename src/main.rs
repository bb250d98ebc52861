//! Space Invaders headless runner
//!
//! Plays one match with the autopilot flying the defender and prints a JSON
//! summary.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use space_invaders::Settings;
use space_invaders::consts::{MAX_SUBSTEPS, SIM_DT};
use space_invaders::persistence::{FileScoreStore, MemoryScoreStore, ScoreStore};
use space_invaders::platform::{Collaborators, LogPresenter, LogSceneLoader};
use space_invaders::sim::{GameEvent, GamePhase, GameState, TemplateFactory, TickInput, tick};

/// Ten minutes of simulated time
const DEFAULT_MAX_TICKS: u64 = 60 * 60 * 10;
/// Simulated display refresh driving the fixed-step accumulator
const FRAME_DT: f32 = 1.0 / 30.0;

#[derive(Debug, Parser)]
#[command(name = "space-invaders")]
#[command(about = "Play one autopilot match and print a JSON summary")]
struct Args {
    /// Settings JSON file (defaults when omitted)
    settings: Option<PathBuf>,

    /// Leaderboard JSON file (in-memory high score when omitted)
    #[arg(long)]
    scores: Option<PathBuf>,

    /// Stop after this many simulation ticks
    #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
    max_ticks: u64,
}

#[derive(Debug, Default, Serialize)]
struct MatchSummary {
    seed: u64,
    ticks: u64,
    final_score: u64,
    lives_left: u32,
    squads: u32,
    units_destroyed: u32,
    defender_deaths: u32,
    breakaways: u32,
    match_ended: bool,
    new_high_score: bool,
    high_score: u64,
}

impl MatchSummary {
    fn record(&mut self, event: &GameEvent) {
        match event {
            GameEvent::UnitDestroyed { .. } => self.units_destroyed += 1,
            GameEvent::DefenderDestroyed { .. } => self.defender_deaths += 1,
            GameEvent::BreakawayStarted { .. } => self.breakaways += 1,
            GameEvent::MatchEnded { new_high_score, .. } => {
                self.match_ended = true;
                self.new_high_score = *new_high_score;
            }
            _ => {}
        }
    }
}

fn main() {
    env_logger::init();
    log::info!("Space Invaders (headless) starting...");

    let args = Args::parse();
    let settings = Settings::load_or_default(args.settings.as_deref());
    let max_ticks = args.max_ticks;

    let mut file_store;
    let mut memory_store;
    let scores: &mut dyn ScoreStore = match &args.scores {
        Some(path) => {
            file_store = FileScoreStore::open_or_empty(path);
            &mut file_store
        }
        None => {
            memory_store = MemoryScoreStore::default();
            &mut memory_store
        }
    };

    let mut presenter = LogPresenter;
    let mut scenes = LogSceneLoader::default();
    let mut factory = TemplateFactory;

    let mut state = GameState::new(settings);
    let mut summary = MatchSummary {
        seed: state.seed,
        ..MatchSummary::default()
    };
    let input = TickInput {
        idle_mode: true,
        ..TickInput::default()
    };

    let mut accumulator = 0.0;
    'frames: while state.time_ticks < max_ticks {
        accumulator += FRAME_DT;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let mut collab = Collaborators {
                presenter: &mut presenter,
                scores: &mut *scores,
                scenes: &mut scenes,
                factory: &mut factory,
            };
            tick(&mut state, &input, SIM_DT, &mut collab);
            accumulator -= SIM_DT;
            substeps += 1;

            for event in &state.events {
                log::trace!("{event:?}");
                summary.record(event);
            }
            if state.phase == GamePhase::GameOver {
                break 'frames;
            }
        }
    }

    summary.ticks = state.time_ticks;
    summary.final_score = state.score();
    summary.lives_left = state.defender.lives();
    summary.squads = state.controller.generation();
    summary.high_score = scores.high_score();

    log::info!(
        "Finished after {} ticks with {} points",
        summary.ticks,
        summary.final_score
    );
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Failed to serialize match summary: {e}"),
    }
}
