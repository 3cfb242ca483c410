//! Data-driven game balance
//!
//! Every gameplay constant lives here so a level designer can tweak the feel
//! from a JSON file without touching the simulation.

use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::TILE_LENGTH;
use crate::error::{Error, Result, read_file};

/// Gameplay tuning values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === World ===
    /// Downward gravity (pixels/s², y grows downward)
    pub gravity: f64,
    /// Elasticity of map walls
    pub wall_elasticity: f64,
    /// Friction of map walls
    pub wall_friction: f64,

    // === Player ===
    pub player_mass: f64,
    pub player_width: f64,
    pub player_height: f64,
    /// Top horizontal speed (pixels/s)
    pub player_speed: f64,
    /// Time to reach top speed on ground (seconds)
    pub player_ground_accel_time: f64,
    /// Horizontal acceleration while airborne (pixels/s²)
    pub player_air_accel: f64,
    /// Jump apex height (pixels)
    pub player_jump_height: f64,
    pub player_lives: u32,

    // === Magnetic gun ===
    /// Length of the aim ray, must cross the whole playable area
    pub gun_range: f64,
    pub gun_force_multiplier: f64,
    pub gun_force_max: f64,
    /// Below this ray fraction the gun refuses to fire
    pub gun_min_fraction: f64,
    /// Gun muzzle offset from the player center when facing right
    pub gun_offset: DVec2,

    // === Enemies ===
    pub enemy_mass: f64,
    pub enemy_moment: f64,
    pub enemy_friction: f64,
    pub enemy_width: f64,
    pub enemy_height: f64,
    /// Eye position relative to the enemy center when facing right
    pub enemy_eye_offset: DVec2,
    pub enemy_sight_length: f64,
    /// Thickness of the line-of-sight query
    pub enemy_sight_radius: f64,
    pub enemy_attack_cooldown_sec: f64,
    /// Upper bound of the random initial cooldown (0 disables jitter)
    pub enemy_cooldown_jitter_sec: f64,
    /// First-contact approach speed that kills an enemy (pixels/s)
    pub enemy_kill_impact_speed: f64,
    /// Delay between death and the explosion
    pub enemy_explosion_delay_sec: f64,
    /// Delay between the explosion and body removal
    pub enemy_removal_delay_sec: f64,

    // === Rockets ===
    pub rocket_mass: f64,
    pub rocket_moment: f64,
    pub rocket_width: f64,
    pub rocket_height: f64,
    pub rocket_speed: f64,
    /// Spawn point relative to the enemy center when facing right
    pub rocket_spawn_offset: DVec2,
    /// Impulse per unit of rocket speed delivered to the hit body
    pub rocket_impulse_factor: f64,
    pub rocket_max_lifetime_sec: f64,

    // === Explosions ===
    pub explosion_frame_ms: f64,
    pub explosion_frames: u32,

    // === Interaction ===
    pub interaction_radius: f64,
    pub intro_prompt_sec: f64,
    pub gate_prompt_sec: f64,

    // === Round ===
    pub restart_delay_sec: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        let gravity = 750.0;
        Self {
            // World
            gravity,
            wall_elasticity: 0.0,
            wall_friction: 1.0,

            // Player (1 x 1.6 tiles)
            player_mass: 0.75,
            player_width: TILE_LENGTH,
            player_height: 1.6 * TILE_LENGTH,
            player_speed: 150.0,
            player_ground_accel_time: 0.05,
            player_air_accel: 150.0,
            player_jump_height: 1.5 * TILE_LENGTH,
            player_lives: 3,

            // Gun
            gun_range: 2000.0,
            gun_force_multiplier: 15.0,
            gun_force_max: 750.0,
            gun_min_fraction: 1e-5,
            gun_offset: DVec2::new(TILE_LENGTH / 7.0, -TILE_LENGTH / 4.0),

            // Enemies (1 x 2 tiles)
            enemy_mass: 0.75,
            enemy_moment: 50.0,
            enemy_friction: 0.75,
            enemy_width: TILE_LENGTH,
            enemy_height: 2.0 * TILE_LENGTH,
            enemy_eye_offset: DVec2::new(TILE_LENGTH / 4.0, -TILE_LENGTH / 2.0),
            enemy_sight_length: 10.0 * TILE_LENGTH,
            enemy_sight_radius: 4.0,
            enemy_attack_cooldown_sec: 2.0,
            enemy_cooldown_jitter_sec: 0.5,
            enemy_kill_impact_speed: 320.0,
            enemy_explosion_delay_sec: 2.0,
            enemy_removal_delay_sec: 2.0,

            // Rockets
            rocket_mass: 0.05,
            rocket_moment: 100.0,
            rocket_width: 8.0,
            rocket_height: 2.0,
            rocket_speed: 60.0,
            rocket_spawn_offset: DVec2::new(TILE_LENGTH * 0.9, -TILE_LENGTH / 4.0),
            rocket_impulse_factor: 0.5,
            rocket_max_lifetime_sec: 20.0,

            // Explosions
            explosion_frame_ms: 50.0,
            explosion_frames: 14,

            // Interaction
            interaction_radius: 1.25 * TILE_LENGTH,
            intro_prompt_sec: 3.0,
            gate_prompt_sec: 2.0,

            // Round
            restart_delay_sec: 3.0,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON; missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let tuning: Self =
            serde_json::from_str(json).map_err(|source| Error::Json { what: "tuning", source })?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load and validate tuning from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let tuning = Self::from_json(&read_file(path)?)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Total explosion animation time in milliseconds
    pub fn explosion_duration_ms(&self) -> f64 {
        self.explosion_frame_ms * f64::from(self.explosion_frames)
    }

    /// Horizontal acceleration while grounded
    pub fn player_ground_accel(&self) -> f64 {
        self.player_speed / self.player_ground_accel_time
    }

    /// Initial upward speed of a jump
    pub fn jump_speed(&self) -> f64 {
        (2.0 * self.player_jump_height * self.gravity).sqrt()
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("gravity", self.gravity),
            ("player_mass", self.player_mass),
            ("player_width", self.player_width),
            ("player_height", self.player_height),
            ("player_speed", self.player_speed),
            ("player_ground_accel_time", self.player_ground_accel_time),
            ("gun_range", self.gun_range),
            ("gun_force_multiplier", self.gun_force_multiplier),
            ("gun_force_max", self.gun_force_max),
            ("gun_min_fraction", self.gun_min_fraction),
            ("enemy_mass", self.enemy_mass),
            ("enemy_moment", self.enemy_moment),
            ("enemy_width", self.enemy_width),
            ("enemy_height", self.enemy_height),
            ("enemy_sight_length", self.enemy_sight_length),
            ("enemy_attack_cooldown_sec", self.enemy_attack_cooldown_sec),
            ("enemy_kill_impact_speed", self.enemy_kill_impact_speed),
            ("enemy_explosion_delay_sec", self.enemy_explosion_delay_sec),
            ("enemy_removal_delay_sec", self.enemy_removal_delay_sec),
            ("rocket_mass", self.rocket_mass),
            ("rocket_moment", self.rocket_moment),
            ("rocket_width", self.rocket_width),
            ("rocket_height", self.rocket_height),
            ("rocket_speed", self.rocket_speed),
            ("rocket_max_lifetime_sec", self.rocket_max_lifetime_sec),
            ("explosion_frame_ms", self.explosion_frame_ms),
            ("interaction_radius", self.interaction_radius),
            ("intro_prompt_sec", self.intro_prompt_sec),
            ("gate_prompt_sec", self.gate_prompt_sec),
            ("restart_delay_sec", self.restart_delay_sec),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidTuning(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }

        let non_negative = [
            ("wall_elasticity", self.wall_elasticity),
            ("wall_friction", self.wall_friction),
            ("player_air_accel", self.player_air_accel),
            ("player_jump_height", self.player_jump_height),
            ("enemy_friction", self.enemy_friction),
            ("enemy_sight_radius", self.enemy_sight_radius),
            ("enemy_cooldown_jitter_sec", self.enemy_cooldown_jitter_sec),
            ("rocket_impulse_factor", self.rocket_impulse_factor),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidTuning(format!(
                    "{name} must be non-negative and finite, got {value}"
                )));
            }
        }

        for (name, v) in [
            ("gun_offset", self.gun_offset),
            ("enemy_eye_offset", self.enemy_eye_offset),
            ("rocket_spawn_offset", self.rocket_spawn_offset),
        ] {
            if !v.is_finite() {
                return Err(Error::InvalidTuning(format!("{name} must be finite")));
            }
        }

        if self.gun_min_fraction >= 1.0 {
            return Err(Error::InvalidTuning(
                "gun_min_fraction must be below 1".to_string(),
            ));
        }
        if self.explosion_frames == 0 {
            return Err(Error::InvalidTuning(
                "explosion_frames must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
