//! The player: a non-rotating box with a gun mounted near its shoulder

use glam::DVec2;

use crate::physics::{BodyHandle, Geometry, ShapeHandle, Space};
use crate::tuning::Tuning;

use super::gun::{GunRay, GunState};

/// Aim angles beyond this magnitude (radians) mean the player faces left
const FACING_LEFT_ANGLE: f64 = 1.5;
/// Contact normal y above this means the contact is underfoot
const GROUND_NORMAL_Y: f64 = 0.5;

/// Movement buttons for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl MoveIntent {
    /// -1, 0 or +1; right wins when both are held
    pub fn direction(&self) -> f64 {
        if self.right {
            1.0
        } else if self.left {
            -1.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub body: BodyHandle,
    pub shape: ShapeHandle,
    pub pos: DVec2,
    pub velocity: DVec2,
    pub gun_pos: DVec2,
    pub aim_angle: f64,
    pub facing_left: bool,
    pub on_ground: bool,
    pub gun_state: GunState,
    pub gun_force: DVec2,
    pub lives: u32,
}

impl Player {
    /// Create the player body at `pos`
    pub fn spawn(space: &mut Space, pos: DVec2, tuning: &Tuning) -> Option<Self> {
        let body = space.add_body(tuning.player_mass, f64::INFINITY);
        space.set_position(body, pos);
        let shape = space.add_shape(
            body,
            Geometry::boxed(tuning.player_width, tuning.player_height),
        )?;

        let mut player = Self {
            body,
            shape,
            pos,
            velocity: DVec2::ZERO,
            gun_pos: pos + tuning.gun_offset,
            aim_angle: 0.0,
            facing_left: false,
            on_ground: false,
            gun_state: GunState::Idle,
            gun_force: DVec2::ZERO,
            lives: tuning.player_lives,
        };
        player.sync(space, pos + DVec2::X, tuning);
        Some(player)
    }

    /// Refresh the cached transform, aim and ground contact from the world
    pub fn sync(&mut self, space: &Space, cursor: DVec2, tuning: &Tuning) {
        if let Some(body) = space.body(self.body) {
            self.pos = body.position;
            self.velocity = body.velocity;
        }

        let rough = cursor - self.pos;
        self.facing_left = rough.y.atan2(rough.x).abs() > FACING_LEFT_ANGLE;
        let offset = if self.facing_left {
            DVec2::new(-tuning.gun_offset.x, tuning.gun_offset.y)
        } else {
            tuning.gun_offset
        };
        self.gun_pos = self.pos + offset;

        let aim = cursor - self.gun_pos;
        self.aim_angle = aim.y.atan2(aim.x);

        self.on_ground = space
            .contacts(self.body)
            .any(|c| c.normal.y > GROUND_NORMAL_Y);
    }

    /// Aim ray from the gun muzzle
    pub fn gun_ray(&self, tuning: &Tuning) -> GunRay {
        GunRay::new(self.gun_pos, self.aim_angle, tuning.gun_range)
    }

    /// Walk, air-steer and jump.
    ///
    /// On the ground the horizontal velocity approaches the target speed with
    /// bounded acceleration. While the gun is pulling, an idle stick does not
    /// brake so the magnet can drag the player along the floor.
    pub fn apply_movement(&self, space: &mut Space, intent: MoveIntent, tuning: &Tuning, dt: f64) {
        let gun_active = self.gun_state != GunState::Idle;
        let Some(body) = space.body(self.body) else {
            return;
        };
        let dir = intent.direction();
        let mut v = body.velocity;

        if self.on_ground {
            if dir != 0.0 || !gun_active {
                let target = dir * tuning.player_speed;
                let max_dv = tuning.player_ground_accel() * dt;
                v.x += (target - v.x).clamp(-max_dv, max_dv);
            }
            if intent.jump {
                v.y = -tuning.jump_speed();
            }
        } else if dir != 0.0 {
            let steered = v.x + dir * tuning.player_air_accel * dt;
            if steered.abs() <= tuning.player_speed || steered.abs() < v.x.abs() {
                v.x = steered;
            }
        }

        space.set_velocity(self.body, v);
    }

    /// Lose a life; returns the lives left
    pub fn hit(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }
}
