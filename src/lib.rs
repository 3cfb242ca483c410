//! Magrix - simulation core of a magnetic-gun platformer
//!
//! Core modules:
//! - `physics`: Rigid-body world (bodies, shapes, ray queries, contacts)
//! - `sim`: Deterministic game simulation (gun, actors, lifecycle, tick)
//! - `level`: Parsed map geometry handed over by the asset loader
//! - `tuning`: Data-driven game balance
//! - `error`: Startup/config error type

pub mod error;
pub mod level;
pub mod physics;
pub mod sim;
pub mod tuning;

pub use error::{Error, Result};
pub use level::LevelData;
pub use tuning::Tuning;

use glam::DVec2;

/// Simulation constants that are not part of the tuning data
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f64 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Map tile edge length in pixels
    pub const TILE_LENGTH: f64 = 16.0;

    /// Logical screen width, used for HUD guidance distances
    pub const SCREEN_WIDTH: f64 = 960.0;
}

/// Normalize angle to (-π, π]
#[inline]
pub fn normalize_angle(mut angle: f64) -> f64 {
    use std::f64::consts::PI;
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle <= -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f64, theta: f64) -> DVec2 {
    DVec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert seconds to a whole number of simulation ticks (at least one)
#[inline]
pub fn secs_to_ticks(secs: f64) -> u64 {
    ((secs / consts::SIM_DT).round() as u64).max(1)
}
