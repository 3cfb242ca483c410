//! Magrix headless runner
//!
//! Usage: `magrix [level.json|-] [tuning.json|-] [seconds]`
//!
//! Runs the simulation under a scripted autopilot, logs the event stream and
//! prints the final frame as JSON. `RUST_LOG=info` shows the log.

use std::path::Path;

use anyhow::Context;
use glam::DVec2;

use magrix::consts::{MAX_SUBSTEPS, SIM_DT};
use magrix::sim::{GameEvent, GameState, TickInput, tick};
use magrix::{LevelData, Tuning};

/// Simulated display refresh (deliberately not a multiple of the tick rate)
const FRAME_DT: f64 = 1.0 / 50.0;
const DEFAULT_SECONDS: f64 = 20.0;
const SEED: u64 = 0x6d61_6772;

/// Game instance holding the state and the frame accumulator
struct Game {
    state: GameState,
    accumulator: f64,
    input: TickInput,
    events: Vec<(u64, GameEvent)>,
}

impl Game {
    fn new(state: GameState) -> Self {
        Self {
            state,
            accumulator: 0.0,
            input: TickInput::default(),
            events: Vec::new(),
        }
    }

    /// Run simulation ticks for one frame
    fn update(&mut self, dt: f64) {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.autopilot();
            let input = self.input.clone();
            tick(&mut self.state, &input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            self.input.pause = false;
            self.input.interact = false;

            for event in &self.state.events {
                log::info!("tick {}: {:?}", self.state.time_ticks, event);
                self.events.push((self.state.time_ticks, *event));
            }
        }
    }

    /// Scripted input: walk right in bursts, pull toward the nearest enemy
    /// and poke anything interactive along the way
    fn autopilot(&mut self) {
        let state = &self.state;
        let t = state.time_ticks;
        let player = state.player.pos;

        let target = state
            .actors
            .enemies()
            .filter(|a| a.as_enemy().is_some_and(|e| e.alive))
            .filter_map(|a| a.position(&state.space))
            .min_by(|a, b| a.distance_squared(player).total_cmp(&b.distance_squared(player)));

        self.input.cursor = target.unwrap_or(player + DVec2::new(100.0, -40.0));
        self.input.move_right = t % 300 < 150;
        self.input.jump = t % 180 == 90;
        self.input.attract = target.is_some() && t % 240 < 90;
        self.input.repel = target.is_some() && (150..200).contains(&(t % 240));
        self.input.interact = t % 20 == 0;
    }
}

fn load_level(arg: Option<&str>) -> anyhow::Result<LevelData> {
    match arg {
        Some(path) if path != "-" => {
            LevelData::load(Path::new(path)).with_context(|| format!("loading level {path}"))
        }
        _ => Ok(LevelData::demo()),
    }
}

fn load_tuning(arg: Option<&str>) -> anyhow::Result<Tuning> {
    match arg {
        Some(path) if path != "-" => {
            Tuning::load(Path::new(path)).with_context(|| format!("loading tuning {path}"))
        }
        _ => Ok(Tuning::default()),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let level = load_level(args.first().map(String::as_str))?;
    let tuning = load_tuning(args.get(1).map(String::as_str))?;
    let seconds: f64 = match args.get(2) {
        Some(s) => s.parse().with_context(|| format!("invalid duration '{s}'"))?,
        None => DEFAULT_SECONDS,
    };

    log::info!("Magrix headless run: level '{}', {seconds}s", level.name);
    let state = GameState::new(level, tuning, SEED)?;
    let mut game = Game::new(state);

    let frames = (seconds / FRAME_DT).ceil() as u64;
    for _ in 0..frames {
        game.update(FRAME_DT);
    }

    let died = game
        .events
        .iter()
        .filter(|(_, e)| matches!(e, GameEvent::EnemyDied { .. }))
        .count();
    log::info!(
        "Finished after {} ticks: {} events, {} enemies died, {} restarts",
        game.state.time_ticks,
        game.events.len(),
        died,
        game.state.restarts
    );

    println!("{}", serde_json::to_string_pretty(&game.state.view())?);
    Ok(())
}
