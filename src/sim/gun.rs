//! Magnetic gun
//!
//! A ray from the gun muzzle toward the cursor picks the nearest magnetic
//! target. Attract pulls the player toward the hit point with a force that
//! grows as the hit gets closer; repel pushes away. Dynamic targets receive
//! the opposite force.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::physics::{SegmentHit, ShapeHandle, Space};
use crate::tuning::Tuning;

use super::registry::ActorRegistry;

/// Ray fraction meaning "nothing hit" (real hits are in [0, 1])
pub const NO_HIT_FRACTION: f64 = 1.5;

/// What the gun is doing this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GunState {
    #[default]
    Idle,
    Attract,
    Repel,
}

impl GunState {
    /// Requested mode from the two buttons (both held cancels out)
    pub fn requested(attract: bool, repel: bool) -> Self {
        match (attract, repel) {
            (true, false) => GunState::Attract,
            (false, true) => GunState::Repel,
            _ => GunState::Idle,
        }
    }
}

/// Aim segment in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GunRay {
    pub start: DVec2,
    pub end: DVec2,
}

impl GunRay {
    pub fn new(start: DVec2, angle: f64, length: f64) -> Self {
        Self {
            start,
            end: start + crate::polar_to_cartesian(length, angle),
        }
    }
}

/// Nearest target along the gun ray
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RayHit {
    #[serde(skip)]
    pub shape: Option<ShapeHandle>,
    pub point: DVec2,
    pub normal: DVec2,
    pub fraction: f64,
}

impl Default for RayHit {
    fn default() -> Self {
        Self::none()
    }
}

impl RayHit {
    pub const fn none() -> Self {
        Self {
            shape: None,
            point: DVec2::ZERO,
            normal: DVec2::ZERO,
            fraction: NO_HIT_FRACTION,
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        self.fraction <= 1.0
    }

    /// Keep `hit` if it is strictly nearer; ties keep the earlier candidate
    fn consider(&mut self, shape: ShapeHandle, hit: SegmentHit) {
        if hit.fraction < self.fraction {
            *self = Self {
                shape: Some(shape),
                point: hit.point,
                normal: hit.normal,
                fraction: hit.fraction,
            };
        }
    }
}

/// Query `candidates` in order and keep the nearest hit
pub fn nearest_hit(
    space: &Space,
    ray: &GunRay,
    radius: f64,
    candidates: impl IntoIterator<Item = ShapeHandle>,
) -> RayHit {
    let mut best = RayHit::none();
    for shape in candidates {
        if let Some(hit) = space.segment_query(shape, ray.start, ray.end, radius) {
            best.consider(shape, hit);
        }
    }
    best
}

/// Resolve the gun ray against walls, then enemies, then rockets
pub fn resolve_gun_ray(space: &Space, actors: &ActorRegistry, ray: &GunRay) -> RayHit {
    let walls = actors.magnetic_walls().filter_map(|a| a.shape());
    let enemies = actors.enemies().filter_map(|a| a.shape());
    let rockets = actors.rockets().filter_map(|a| a.shape());
    nearest_hit(space, ray, 0.0, walls.chain(enemies).chain(rockets))
}

/// Gun mode and force on the player for this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GunOutput {
    pub state: GunState,
    pub force: DVec2,
}

impl GunOutput {
    pub const IDLE: Self = Self {
        state: GunState::Idle,
        force: DVec2::ZERO,
    };
}

/// Force on a player at `origin` given the current ray hit.
///
/// Magnitude is `multiplier / fraction²` clamped to `gun_force_max`, along the
/// direction from the player to the hit point. Too-close hits and misses leave
/// the gun idle.
pub fn magnetic_force(
    origin: DVec2,
    hit: &RayHit,
    requested: GunState,
    tuning: &Tuning,
) -> GunOutput {
    if requested == GunState::Idle || !hit.is_hit() || hit.fraction < tuning.gun_min_fraction {
        return GunOutput::IDLE;
    }

    let dir = (hit.point - origin).normalize_or_zero();
    let force = (dir * tuning.gun_force_multiplier / (hit.fraction * hit.fraction))
        .clamp_length_max(tuning.gun_force_max);

    GunOutput {
        state: requested,
        force: match requested {
            GunState::Repel => -force,
            _ => force,
        },
    }
}
