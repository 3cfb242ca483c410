//! Actor lifecycles: enemy sight and death, rocket flight and impact,
//! explosions, terminals and buttons, and the deferred actions behind them.

use glam::DVec2;

use super::actor::{ActorId, ActorKind};
use super::schedule::DeferredAction;
use super::state::{GameEvent, GamePhase, GameState, Prompt};
use crate::level::TerminalRole;
use crate::physics::BodyHandle;
use crate::secs_to_ticks;

/// A rocket touched something this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RocketHit {
    pub rocket: ActorId,
    pub pos: DVec2,
    pub velocity: DVec2,
    pub target: BodyHandle,
}

/// Refresh every live enemy's eye ray and fire at a visible player
pub fn update_enemy_sight(state: &mut GameState, dt: f64) {
    let mut launches = Vec::new();
    for actor in state.actors.iter_mut() {
        let Some(body) = actor.body().and_then(|b| state.space.body(b)) else {
            continue;
        };
        let (position, angle) = (body.position, body.angle);
        let Some(enemy) = actor.as_enemy_mut() else {
            continue;
        };
        if !enemy.alive {
            continue;
        }

        enemy.update_eye_ray(position, angle, &state.tuning);
        let [eye, look] = enemy.eye_ray;
        let sees_player = state
            .space
            .segment_query(state.player.shape, eye, look, state.tuning.enemy_sight_radius)
            .is_some();

        if sees_player && enemy.attack_cooldown <= 0.0 {
            launches.push(enemy.launch_point(position, angle, &state.tuning));
            enemy.attack_cooldown = state.tuning.enemy_attack_cooldown_sec;
        } else {
            enemy.attack_cooldown -= dt;
        }
    }

    for (pos, heading) in launches {
        if state.spawn_rocket(pos, heading).is_none() {
            log::warn!("Rocket launch at {pos:?} failed");
        }
    }
}

/// Kill an enemy and queue its explosion and removal.
/// Returns false if the enemy was already dead or does not exist.
pub fn kill_enemy(state: &mut GameState, id: ActorId) -> bool {
    let Some(actor) = state.actors.get_mut(id) else {
        return false;
    };
    let Some(enemy) = actor.as_enemy_mut() else {
        return false;
    };
    if !enemy.alive {
        return false;
    }
    enemy.alive = false;

    let pos = state.actors.get(id).and_then(|a| a.position(&state.space)).unwrap_or_default();
    state.emit(GameEvent::EnemyDied { enemy: id, pos });

    let now = state.time_ticks;
    let explode = secs_to_ticks(state.tuning.enemy_explosion_delay_sec);
    let release = explode + secs_to_ticks(state.tuning.enemy_removal_delay_sec);
    state
        .scheduler
        .schedule_at(now + explode, DeferredAction::EnemyExplosion { enemy: id });
    state
        .scheduler
        .schedule_at(now + release, DeferredAction::ReleaseEnemy { enemy: id });
    true
}

/// Kill every live enemy that started touching something hard enough
pub fn detect_enemy_impacts(state: &mut GameState) -> usize {
    let threshold = state.tuning.enemy_kill_impact_speed;
    let doomed: Vec<ActorId> = state
        .actors
        .enemies()
        .filter(|a| a.as_enemy().is_some_and(|e| e.alive))
        .filter(|a| {
            a.body().is_some_and(|body| {
                state
                    .space
                    .contacts(body)
                    .any(|c| c.first_contact && c.impact_speed >= threshold)
            })
        })
        .map(|a| a.id)
        .collect();

    for &id in &doomed {
        log::info!("Enemy {id} crushed");
        kill_enemy(state, id);
    }
    doomed.len()
}

/// Age explosions and queue the finished ones for removal. Explosions that
/// appeared during this tick start aging on the next one.
pub fn advance_explosions(state: &mut GameState, dt: f64) {
    let duration = state.tuning.explosion_duration_ms();
    let now = state.time_ticks;
    for actor in state.actors.iter_mut() {
        if let ActorKind::Explosion(explosion) = &mut actor.kind {
            if explosion.spawn_tick < now && explosion.advance(dt, duration) {
                actor.mark();
            }
        }
    }
}

/// Detonate rockets that touched something and expire old ones.
///
/// Each rocket reports at most one hit, leaves an explosion at its position,
/// pushes the body it hit and is queued for removal. Hit rockets and expired
/// rockets are removed by the next sweep.
pub fn advance_rockets(state: &mut GameState) -> Vec<RocketHit> {
    let lifetime = secs_to_ticks(state.tuning.rocket_max_lifetime_sec);
    let now = state.time_ticks;
    let mut hits = Vec::new();

    for actor in state.actors.iter_mut() {
        let ActorKind::Rocket(rocket) = &actor.kind else {
            continue;
        };
        if actor.is_marked() {
            continue;
        }
        let Some(body) = actor.body() else {
            continue;
        };

        if let Some(contact) = state.space.contacts(body).find(|c| c.first_contact) {
            let pos = state.space.body(body).map_or(DVec2::ZERO, |b| b.position);
            hits.push(RocketHit {
                rocket: actor.id,
                pos,
                velocity: rocket.velocity,
                target: contact.other_body,
            });
            actor.mark();
        } else if now.saturating_sub(rocket.spawn_tick) >= lifetime {
            log::debug!("Rocket {} expired", actor.id);
            actor.mark();
        }
    }

    for hit in &hits {
        state.spawn_explosion(hit.pos);
        state.emit(GameEvent::RocketExploded {
            rocket: hit.rocket,
            pos: hit.pos,
        });
        let impulse = hit.velocity * state.tuning.rocket_impulse_factor;
        state.space.apply_impulse_at_point(hit.target, impulse, hit.pos);

        if hit.target == state.player.body {
            hit_player(state);
        } else if let Some(enemy) = state.actors.find_by_body(hit.target).map(|a| a.id) {
            if kill_enemy(state, enemy) {
                log::info!("Enemy {enemy} destroyed by rocket {}", hit.rocket);
            }
        }
    }

    hits
}

/// Take a life from the player; the last one ends the round
pub fn hit_player(state: &mut GameState) {
    if state.phase != GamePhase::Playing {
        return;
    }
    let lives_remaining = state.player.hit();
    state.emit(GameEvent::PlayerHit { lives_remaining });
    if lives_remaining == 0 {
        log::info!("Game over after {} ticks", state.time_ticks);
        state.phase = GamePhase::GameOver;
        state.game_over_ticks = 0;
        state.emit(GameEvent::GameOver);
    }
}

/// Trigger terminals and buttons within reach of the player
pub fn check_interactions(state: &mut GameState) {
    let reach = state.tuning.interaction_radius;
    let player = state.player.pos;
    let now = state.time_ticks;
    let mut shown = Vec::new();
    let mut events = Vec::new();

    for actor in state.actors.iter_mut() {
        match &mut actor.kind {
            ActorKind::Terminal(terminal) => {
                if terminal.triggered || terminal.pending || terminal.pos.distance(player) >= reach {
                    continue;
                }
                match terminal.role {
                    TerminalRole::Intro => {
                        terminal.pending = true;
                        shown.push(Prompt::Intro);
                        state.scheduler.schedule_after(
                            now,
                            state.tuning.intro_prompt_sec,
                            DeferredAction::CompleteIntro { terminal: actor.id },
                        );
                    }
                    TerminalRole::Gate { gate } => {
                        terminal.triggered = true;
                        terminal.pending = true;
                        shown.push(Prompt::Gate { gate });
                        events.push(GameEvent::TerminalTriggered { terminal: actor.id });
                        state.scheduler.schedule_after(
                            now,
                            state.tuning.gate_prompt_sec,
                            DeferredAction::OpenGate { terminal: actor.id },
                        );
                    }
                }
            }
            ActorKind::Button(button) => {
                if button.triggered || button.pos.distance(player) >= reach {
                    continue;
                }
                button.triggered = true;
                shown.push(Prompt::Button);
                events.push(GameEvent::ButtonPressed { button: actor.id });
            }
            _ => {}
        }
    }

    for prompt in shown {
        state.show_prompt(prompt);
    }
    for event in events {
        state.emit(event);
    }
}

/// Apply every deferred action that is due this tick
pub fn run_deferred(state: &mut GameState) {
    let due = state.scheduler.drain_due(state.time_ticks);
    if due.is_empty() {
        return;
    }
    for action in due {
        apply_deferred(state, action);
    }
    state.actors.sweep(&mut state.space);
}

fn apply_deferred(state: &mut GameState, action: DeferredAction) {
    match action {
        DeferredAction::EnemyExplosion { enemy } => {
            let Some(pos) = state.actors.get(enemy).and_then(|a| a.position(&state.space)) else {
                log::warn!("Explosion for missing enemy {enemy}");
                return;
            };
            state.spawn_explosion(pos);
            state.emit(GameEvent::EnemyExploded { enemy, pos });
        }
        DeferredAction::ReleaseEnemy { enemy } => {
            let Some(actor) = state.actors.get_mut(enemy) else {
                log::warn!("Release for missing enemy {enemy}");
                return;
            };
            actor.release_physics(&mut state.space);
            if let Some(e) = actor.as_enemy_mut() {
                e.drawable = false;
            }
        }
        DeferredAction::CompleteIntro { terminal } => {
            state.hide_prompt(Prompt::Intro);
            if let Some(t) = state.actors.get_mut(terminal).and_then(|a| a.as_terminal_mut()) {
                t.triggered = true;
                t.pending = false;
            }
            state.show_guidance = true;
            state.emit(GameEvent::TerminalTriggered { terminal });
        }
        DeferredAction::OpenGate { terminal } => {
            let Some(t) = state.actors.get_mut(terminal).and_then(|a| a.as_terminal_mut()) else {
                log::warn!("Gate completion for missing terminal {terminal}");
                return;
            };
            t.pending = false;
            let TerminalRole::Gate { gate } = t.role else {
                return;
            };
            state.hide_prompt(Prompt::Gate { gate });

            state.player.lives += 1;
            let lives = state.player.lives;
            state.emit(GameEvent::LifeGained { lives });

            if let Some(wall) = state.actors.gate_wall(gate).map(|a| a.id) {
                state.actors.mark_for_removal(wall);
                log::info!("Gate {gate} opened");
                state.emit(GameEvent::GateOpened { gate });
            } else {
                log::warn!("Gate {gate} has no wall");
            }
        }
    }
}
