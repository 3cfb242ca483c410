//! Read-only frame snapshot for a renderer or HUD

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::actor::{ActorId, ActorView};
use super::gun::GunState;
use super::state::{GamePhase, GameState, Prompt};
use crate::consts::SCREEN_WIDTH;
use crate::level::TerminalRole;

/// Guidance arrows hide once the target is this close (squared pixels)
const ARROW_HIDE_DIST_SQ: f64 = 10.0 * SCREEN_WIDTH;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub pos: DVec2,
    pub gun_pos: DVec2,
    pub aim_angle: f64,
    pub facing_left: bool,
    pub on_ground: bool,
    pub gun_state: GunState,
    pub gun_force: DVec2,
    pub lives: u32,
}

/// Arrow pointing from the player toward an untriggered gate terminal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuidanceArrow {
    pub terminal: ActorId,
    pub angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameView {
    pub tick: u64,
    pub phase: GamePhase,
    pub player: PlayerView,
    /// Gun ray end point: the hit, or `None` when the ray hit nothing
    pub ray_hit: Option<DVec2>,
    pub actors: Vec<ActorView>,
    pub prompts: Vec<Prompt>,
    pub arrows: Vec<GuidanceArrow>,
}

impl GameState {
    /// Snapshot everything a renderer needs for this frame
    pub fn view(&self) -> FrameView {
        let player = &self.player;
        FrameView {
            tick: self.time_ticks,
            phase: self.phase,
            player: PlayerView {
                pos: player.pos,
                gun_pos: player.gun_pos,
                aim_angle: player.aim_angle,
                facing_left: player.facing_left,
                on_ground: player.on_ground,
                gun_state: player.gun_state,
                gun_force: player.gun_force,
                lives: player.lives,
            },
            ray_hit: self.ray_hit.is_hit().then_some(self.ray_hit.point),
            actors: self
                .actors
                .iter()
                .filter_map(|a| a.view(&self.space, &self.tuning))
                .collect(),
            prompts: self.prompts.clone(),
            arrows: self.guidance_arrows(),
        }
    }

    fn guidance_arrows(&self) -> Vec<GuidanceArrow> {
        if !self.show_guidance {
            return Vec::new();
        }
        self.actors
            .iter()
            .filter_map(|a| {
                let t = a.as_terminal()?;
                if t.triggered || !matches!(t.role, TerminalRole::Gate { .. }) {
                    return None;
                }
                let to = t.pos - self.player.pos;
                (to.length_squared() >= ARROW_HIDE_DIST_SQ).then(|| GuidanceArrow {
                    terminal: a.id,
                    angle: to.y.atan2(to.x),
                })
            })
            .collect()
    }
}
