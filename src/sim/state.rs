//! Game state and core simulation types
//!
//! Everything one round needs lives here: the physics world, the player, the
//! actor registry and the deferred-action queue. A restart rebuilds all of it
//! from the level data.

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::actor::{Actor, ActorId, ActorKind, Button, Enemy, Explosion, Rocket, Terminal, Wall};
use super::gun::RayHit;
use super::lifecycle::RocketHit;
use super::player::Player;
use super::registry::ActorRegistry;
use super::schedule::Scheduler;
use crate::error::{Error, Result};
use crate::level::{LevelData, Rect};
use crate::physics::{Geometry, Space};
use crate::tuning::Tuning;

/// Current phase of the round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Frozen; nothing advances, including deferred actions
    Paused,
    /// Out of lives, counting down to the restart
    GameOver,
}

/// HUD text currently on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prompt {
    Intro,
    Gate { gate: u32 },
    Button,
}

/// Things that happened during a tick, for logging and presentation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    EnemyDied { enemy: ActorId, pos: DVec2 },
    EnemyExploded { enemy: ActorId, pos: DVec2 },
    RocketFired { rocket: ActorId, pos: DVec2 },
    RocketExploded { rocket: ActorId, pos: DVec2 },
    PlayerHit { lives_remaining: u32 },
    LifeGained { lives: u32 },
    TerminalTriggered { terminal: ActorId },
    GateOpened { gate: u32 },
    ButtonPressed { button: ActorId },
    Paused,
    Resumed,
    GameOver,
    GameRestarted,
}

/// Complete simulation state of one round
pub struct GameState {
    pub tuning: Tuning,
    pub level: LevelData,
    /// Seed for the enemy cooldown jitter
    pub seed: u64,
    pub space: Space,
    pub player: Player,
    pub actors: ActorRegistry,
    pub scheduler: Scheduler,
    /// Gun ray result of the last tick
    pub ray_hit: RayHit,
    pub phase: GamePhase,
    /// Simulation tick counter (paused ticks are not counted)
    pub time_ticks: u64,
    /// Ticks spent in `GameOver`
    pub game_over_ticks: u64,
    pub prompts: Vec<Prompt>,
    /// Guidance arrows toward gate terminals are enabled
    pub show_guidance: bool,
    /// Events of the last tick
    pub events: Vec<GameEvent>,
    /// Rocket impacts of the last tick
    pub rocket_hits: Vec<RocketHit>,
    /// Rounds started after the first
    pub restarts: u32,
}

impl GameState {
    /// Validate inputs and build the first round
    pub fn new(level: LevelData, tuning: Tuning, seed: u64) -> Result<Self> {
        tuning.validate()?;
        level.validate()?;
        let state = Self::build(level, tuning, seed)?;
        log::info!(
            "Level '{}' ready: {} actors, {} bodies",
            state.level.name,
            state.actors.len(),
            state.space.body_count()
        );
        Ok(state)
    }

    fn build(level: LevelData, tuning: Tuning, seed: u64) -> Result<Self> {
        let mut space = Space::new(DVec2::new(0.0, tuning.gravity));
        let mut actors = ActorRegistry::new();
        let mut rng = Pcg32::seed_from_u64(seed);

        for rect in &level.walls {
            spawn_wall(&mut space, &mut actors, &tuning, rect, None);
        }
        for gate in &level.gates {
            spawn_wall(&mut space, &mut actors, &tuning, &gate.rect, Some(gate.id));
        }

        for placed in &level.terminals {
            let shape = if placed.blocking {
                static_rect(&mut space, &tuning, &placed.rect)
            } else {
                None
            };
            actors.insert(
                ActorKind::Terminal(Terminal {
                    pos: placed.rect.center(),
                    role: placed.role,
                    triggered: false,
                    pending: false,
                }),
                None,
                shape,
            );
        }
        for placed in &level.buttons {
            let shape = static_rect(&mut space, &tuning, &placed.rect);
            actors.insert(
                ActorKind::Button(Button {
                    pos: placed.rect.center(),
                    triggered: false,
                }),
                None,
                shape,
            );
        }

        for spawn in &level.enemies {
            let cooldown = if tuning.enemy_cooldown_jitter_sec > 0.0 {
                rng.random_range(0.0..tuning.enemy_cooldown_jitter_sec)
            } else {
                0.0
            };
            spawn_enemy(&mut space, &mut actors, &tuning, spawn.pos, spawn.turned_left, cooldown);
        }

        let player = Player::spawn(&mut space, level.player_spawn, &tuning)
            .ok_or_else(|| Error::InvalidLevel("player body could not be created".into()))?;

        Ok(Self {
            tuning,
            level,
            seed,
            space,
            player,
            actors,
            scheduler: Scheduler::new(),
            ray_hit: RayHit::none(),
            phase: GamePhase::Playing,
            time_ticks: 0,
            game_over_ticks: 0,
            prompts: Vec::new(),
            show_guidance: false,
            events: Vec::new(),
            rocket_hits: Vec::new(),
            restarts: 0,
        })
    }

    /// Throw the round away and rebuild it from the level data.
    /// Pending deferred actions are cancelled first.
    pub fn restart(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        let events = std::mem::take(&mut self.events);
        let restarts = self.restarts + 1;

        match Self::build(self.level.clone(), self.tuning.clone(), self.seed) {
            Ok(fresh) => {
                *self = fresh;
                self.restarts = restarts;
                self.events = events;
                self.emit(GameEvent::GameRestarted);
                log::info!("Round restarted ({cancelled} pending actions cancelled)");
            }
            Err(e) => {
                self.events = events;
                log::error!("Restart failed: {e}");
            }
        }
    }

    pub fn emit(&mut self, event: GameEvent) {
        log::debug!("tick {}: {:?}", self.time_ticks, event);
        self.events.push(event);
    }

    pub fn show_prompt(&mut self, prompt: Prompt) {
        if !self.prompts.contains(&prompt) {
            self.prompts.push(prompt);
        }
    }

    pub fn hide_prompt(&mut self, prompt: Prompt) {
        self.prompts.retain(|p| *p != prompt);
    }

    /// Launch a rocket from `pos` along `heading`
    pub fn spawn_rocket(&mut self, pos: DVec2, heading: f64) -> Option<ActorId> {
        let tuning = &self.tuning;
        let body = self.space.add_body(tuning.rocket_mass, tuning.rocket_moment);
        let velocity = DVec2::from_angle(heading) * tuning.rocket_speed;
        self.space.set_position(body, pos);
        self.space.set_angle(body, heading);
        self.space.set_velocity(body, velocity);
        self.space.set_gravity_scale(body, 0.0);
        self.space.enable_ccd(body);
        let Some(shape) = self
            .space
            .add_shape(body, Geometry::boxed(tuning.rocket_width, tuning.rocket_height))
        else {
            self.space.remove_body(body);
            return None;
        };
        let id = self.actors.insert(
            ActorKind::Rocket(Rocket {
                velocity,
                spawn_tick: self.time_ticks,
            }),
            Some(body),
            Some(shape),
        );
        self.emit(GameEvent::RocketFired { rocket: id, pos });
        Some(id)
    }

    pub fn spawn_explosion(&mut self, pos: DVec2) -> ActorId {
        self.actors
            .insert(ActorKind::Explosion(Explosion::new(pos, self.time_ticks)), None, None)
    }

    pub fn alive_enemies(&self) -> usize {
        self.actors
            .enemies()
            .filter_map(Actor::as_enemy)
            .filter(|e| e.alive)
            .count()
    }
}

/// Static capsule covering a map rectangle
fn static_rect(space: &mut Space, tuning: &Tuning, rect: &Rect) -> Option<crate::physics::ShapeHandle> {
    let (a, b, radius) = rect.to_capsule();
    let ground = space.static_body();
    let shape = space.add_shape(ground, Geometry::segment(a, b, radius))?;
    space.set_material(shape, tuning.wall_elasticity, tuning.wall_friction);
    Some(shape)
}

fn spawn_wall(
    space: &mut Space,
    actors: &mut ActorRegistry,
    tuning: &Tuning,
    rect: &Rect,
    gate: Option<u32>,
) -> ActorId {
    let shape = static_rect(space, tuning, rect);
    actors.insert(ActorKind::Wall(Wall { gate }), None, shape)
}

fn spawn_enemy(
    space: &mut Space,
    actors: &mut ActorRegistry,
    tuning: &Tuning,
    pos: DVec2,
    turned_left: bool,
    cooldown: f64,
) -> ActorId {
    let body = space.add_body(tuning.enemy_mass, tuning.enemy_moment);
    space.set_position(body, pos);
    let shape = space.add_shape(body, Geometry::boxed(tuning.enemy_width, tuning.enemy_height));
    if let Some(shape) = shape {
        space.set_material(shape, 0.0, tuning.enemy_friction);
    }
    let mut enemy = Enemy::new(turned_left, cooldown);
    enemy.update_eye_ray(pos, 0.0, tuning);
    actors.insert(ActorKind::Enemy(enemy), Some(body), shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::TerminalRole;

    fn demo() -> GameState {
        GameState::new(LevelData::demo(), Tuning::default(), 12345).unwrap()
    }

    #[test]
    fn test_new_builds_level() {
        let state = demo();
        let level = LevelData::demo();
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.alive_enemies(), level.enemies.len());
        assert_eq!(state.player.lives, 3);
        assert_eq!(state.player.pos, level.player_spawn);
        assert_eq!(
            state.actors.magnetic_walls().count(),
            level.walls.len()
        );
        // Static world + player + enemies
        assert_eq!(state.space.body_count(), 1 + 1 + level.enemies.len());
    }

    #[test]
    fn test_cooldown_jitter_is_seeded() {
        let cooldowns = |seed| {
            GameState::new(LevelData::demo(), Tuning::default(), seed)
                .unwrap()
                .actors
                .enemies()
                .filter_map(Actor::as_enemy)
                .map(|e| e.attack_cooldown)
                .collect::<Vec<_>>()
        };
        let a = cooldowns(7);
        assert_eq!(a, cooldowns(7));
        assert!(a.iter().all(|c| (0.0..0.5).contains(c)));
    }

    #[test]
    fn test_invalid_tuning_rejected() {
        let tuning = Tuning {
            gravity: 0.0,
            ..Default::default()
        };
        assert!(GameState::new(LevelData::demo(), tuning, 1).is_err());
    }

    #[test]
    fn test_rocket_spawn_ignores_gravity() {
        let mut state = demo();
        let id = state.spawn_rocket(DVec2::new(300.0, 200.0), 0.0).unwrap();
        let body = state.actors.get(id).and_then(Actor::body).unwrap();
        let b = state.space.body(body).unwrap();
        assert_eq!(b.gravity_scale, 0.0);
        assert_eq!(b.velocity, DVec2::new(60.0, 0.0));
        assert!(matches!(
            state.events.last(),
            Some(GameEvent::RocketFired { rocket, .. }) if *rocket == id
        ));
    }

    #[test]
    fn test_restart_cancels_and_rebuilds() {
        let mut state = demo();
        let first_ids: Vec<_> = state.actors.iter().map(|a| a.id).collect();
        state.player.lives = 0;
        state.phase = GamePhase::GameOver;
        state.show_prompt(Prompt::Button);
        state.scheduler.schedule_at(
            10,
            crate::sim::schedule::DeferredAction::ReleaseEnemy { enemy: 0 },
        );

        state.restart();
        assert!(state.scheduler.is_empty());
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.player.lives, 3);
        assert!(state.prompts.is_empty());
        assert_eq!(state.restarts, 1);
        assert_eq!(state.events, vec![GameEvent::GameRestarted]);
        assert_eq!(
            state.actors.iter().map(|a| a.id).collect::<Vec<_>>(),
            first_ids
        );
    }

    #[test]
    fn test_prompts_are_a_set() {
        let mut state = demo();
        state.show_prompt(Prompt::Intro);
        state.show_prompt(Prompt::Intro);
        state.show_prompt(Prompt::Gate { gate: 1 });
        assert_eq!(state.prompts.len(), 2);
        state.hide_prompt(Prompt::Intro);
        assert_eq!(state.prompts, vec![Prompt::Gate { gate: 1 }]);
    }

    #[test]
    fn test_blocking_terminal_has_shape() {
        let mut level = LevelData::demo();
        level.terminals[0].blocking = true;
        let state = GameState::new(level, Tuning::default(), 1).unwrap();
        let intro = state
            .actors
            .iter()
            .find(|a| matches!(a.as_terminal(), Some(t) if t.role == TerminalRole::Intro))
            .unwrap();
        assert!(intro.shape().is_some());
    }
}
