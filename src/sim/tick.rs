//! Fixed timestep simulation tick
//!
//! One call advances the round by one step. The order below is fixed so the
//! same inputs always produce the same round.

use glam::DVec2;

use super::gun::{self, GunState};
use super::lifecycle;
use super::player::MoveIntent;
use super::state::{GameEvent, GamePhase, GameState};
use crate::secs_to_ticks;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    pub move_left: bool,
    pub move_right: bool,
    pub jump: bool,
    /// Attract button held
    pub attract: bool,
    /// Repel button held
    pub repel: bool,
    /// Interact with a nearby terminal or button
    pub interact: bool,
    /// Pause toggle
    pub pause: bool,
    /// Cursor in world coordinates
    pub cursor: DVec2,
}

impl TickInput {
    fn movement(&self) -> MoveIntent {
        MoveIntent {
            left: self.move_left,
            right: self.move_right,
            jump: self.jump,
        }
    }
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f64) {
    state.events.clear();
    state.rocket_hits.clear();

    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                state.emit(GameEvent::Paused);
            }
            GamePhase::Paused => {
                state.phase = GamePhase::Playing;
                state.emit(GameEvent::Resumed);
            }
            GamePhase::GameOver => {}
        }
    }
    if state.phase == GamePhase::Paused {
        return;
    }

    state.time_ticks += 1;

    // Timed effects from earlier ticks
    lifecycle::run_deferred(state);

    // The world keeps running after game over, without player control
    let playing = state.phase == GamePhase::Playing;
    let input = if playing {
        input.clone()
    } else {
        TickInput {
            cursor: input.cursor,
            ..Default::default()
        }
    };

    state.space.step(dt);

    state.player.sync(&state.space, input.cursor, &state.tuning);
    let ray = state.player.gun_ray(&state.tuning);
    state.ray_hit = gun::resolve_gun_ray(&state.space, &state.actors, &ray);

    lifecycle::update_enemy_sight(state, dt);

    apply_gun(state, GunState::requested(input.attract, input.repel));
    state
        .player
        .apply_movement(&mut state.space, input.movement(), &state.tuning, dt);

    lifecycle::detect_enemy_impacts(state);

    lifecycle::advance_explosions(state, dt);
    state.rocket_hits = lifecycle::advance_rockets(state);
    state.actors.sweep(&mut state.space);

    if input.interact {
        lifecycle::check_interactions(state);
    }

    if state.phase == GamePhase::GameOver {
        state.game_over_ticks += 1;
        if state.game_over_ticks >= secs_to_ticks(state.tuning.restart_delay_sec) {
            state.restart();
        }
    }
}

/// Compute the gun force and apply it to the player and, reversed, to the
/// dynamic body under the ray
fn apply_gun(state: &mut GameState, requested: GunState) {
    let out = gun::magnetic_force(state.player.pos, &state.ray_hit, requested, &state.tuning);
    state.player.gun_state = out.state;
    state.player.gun_force = out.force;
    if out.state == GunState::Idle {
        return;
    }

    state.space.set_force(state.player.body, out.force);
    let target = state
        .ray_hit
        .shape
        .and_then(|shape| state.actors.find_by_shape(shape))
        .filter(|a| a.is_dynamic())
        .and_then(|a| a.body());
    if let Some(body) = target {
        state.space.set_force(body, -out.force);
    }
}
