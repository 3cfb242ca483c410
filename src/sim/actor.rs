//! Actors: everything in the level besides the player
//!
//! A closed set of variants. Each actor may own a body and a shape in the
//! physics world; releasing them happens at most once because the handles are
//! taken out of the actor when they are freed.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::level::TerminalRole;
use crate::physics::{BodyHandle, ShapeHandle, Space};
use crate::tuning::Tuning;

/// Stable actor identifier (monotonically increasing)
pub type ActorId = u32;

/// Float slack when comparing accumulated milliseconds
const ELAPSED_EPSILON_MS: f64 = 1e-6;

/// A rocket-firing enemy
#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub alive: bool,
    /// Cleared once the body has been removed after death
    pub drawable: bool,
    pub turned_left: bool,
    /// Seconds until the next shot is allowed (≤ 0 means ready)
    pub attack_cooldown: f64,
    /// Line-of-sight segment, refreshed every tick
    pub eye_ray: [DVec2; 2],
}

impl Enemy {
    pub fn new(turned_left: bool, attack_cooldown: f64) -> Self {
        Self {
            alive: true,
            drawable: true,
            turned_left,
            attack_cooldown,
            eye_ray: [DVec2::ZERO; 2],
        }
    }

    /// +1 facing right, -1 facing left
    #[inline]
    pub fn facing(&self) -> f64 {
        if self.turned_left { -1.0 } else { 1.0 }
    }

    /// Offset mirrored for the facing direction, rotated by the body angle
    fn local_to_world(&self, position: DVec2, angle: f64, offset: DVec2) -> DVec2 {
        let mirrored = DVec2::new(offset.x * self.facing(), offset.y);
        position + DVec2::from_angle(angle).rotate(mirrored)
    }

    /// Recompute the eye ray from the body transform
    pub fn update_eye_ray(&mut self, position: DVec2, angle: f64, tuning: &Tuning) {
        let eye = self.local_to_world(position, angle, tuning.enemy_eye_offset);
        let look = DVec2::from_angle(angle).rotate(DVec2::new(self.facing(), 0.0));
        self.eye_ray = [eye, eye + look * tuning.enemy_sight_length];
    }

    /// Rocket spawn point and heading for the current body transform
    pub fn launch_point(&self, position: DVec2, angle: f64, tuning: &Tuning) -> (DVec2, f64) {
        let spawn = self.local_to_world(position, angle, tuning.rocket_spawn_offset);
        let heading = if self.turned_left {
            crate::normalize_angle(angle + std::f64::consts::PI)
        } else {
            crate::normalize_angle(angle)
        };
        (spawn, heading)
    }
}

/// A rocket in flight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rocket {
    /// Launch velocity, also the direction of the impact impulse
    pub velocity: DVec2,
    pub spawn_tick: u64,
}

/// A purely visual, timed explosion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Explosion {
    pub pos: DVec2,
    pub elapsed_ms: f64,
    /// Tick the explosion appeared on; it starts aging on the next one
    pub spawn_tick: u64,
}

impl Explosion {
    pub fn new(pos: DVec2, spawn_tick: u64) -> Self {
        Self {
            pos,
            elapsed_ms: 0.0,
            spawn_tick,
        }
    }

    /// Advance by `dt` seconds; returns true once the animation is over
    pub fn advance(&mut self, dt: f64, duration_ms: f64) -> bool {
        self.elapsed_ms += dt * 1000.0;
        self.elapsed_ms + ELAPSED_EPSILON_MS >= duration_ms
    }
}

/// Static map geometry; gate walls carry the id of the gate they belong to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub gate: Option<u32>,
}

impl Wall {
    /// Plasma gates do not interact with the magnetic gun
    #[inline]
    pub fn is_magnetic(&self) -> bool {
        self.gate.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Terminal {
    pub pos: DVec2,
    pub role: TerminalRole,
    pub triggered: bool,
    /// Interaction accepted, completion still scheduled
    pub pending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Button {
    pub pos: DVec2,
    pub triggered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActorKind {
    Enemy(Enemy),
    Rocket(Rocket),
    Explosion(Explosion),
    Wall(Wall),
    Terminal(Terminal),
    Button(Button),
}

/// Variant tag handed to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorTag {
    Enemy,
    Rocket,
    Explosion,
    Wall,
    Gate,
    Terminal,
    Button,
}

/// Render-facing snapshot of one actor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorView {
    pub id: ActorId,
    pub tag: ActorTag,
    pub pos: DVec2,
    pub angle: f64,
    pub facing_left: bool,
    pub triggered: bool,
    /// Animation progress in [0, 1] for timed actors
    pub progress: f64,
}

#[derive(Debug, Clone)]
pub struct Actor {
    pub id: ActorId,
    pub kind: ActorKind,
    body: Option<BodyHandle>,
    shape: Option<ShapeHandle>,
    marked: bool,
}

impl Actor {
    pub(crate) fn new(
        id: ActorId,
        kind: ActorKind,
        body: Option<BodyHandle>,
        shape: Option<ShapeHandle>,
    ) -> Self {
        Self {
            id,
            kind,
            body,
            shape,
            marked: false,
        }
    }

    /// Dynamic body, if the actor owns one
    #[inline]
    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    #[inline]
    pub fn shape(&self) -> Option<ShapeHandle> {
        self.shape
    }

    /// Whether the actor is waiting for the next removal sweep
    #[inline]
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    #[inline]
    pub(crate) fn mark(&mut self) {
        self.marked = true;
    }

    /// Free the body and shape. A second call does nothing.
    pub fn release_physics(&mut self, space: &mut Space) {
        if let Some(shape) = self.shape.take() {
            if !space.remove_shape(shape) {
                log::error!("Actor {} held a stale shape handle", self.id);
            }
        }
        if let Some(body) = self.body.take() {
            if !space.remove_body(body) {
                log::error!("Actor {} held a stale body handle", self.id);
            }
        }
    }

    /// Enemies and rockets react to forces; everything else is static or visual
    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind, ActorKind::Enemy(_) | ActorKind::Rocket(_)) && self.body.is_some()
    }

    pub fn tag(&self) -> ActorTag {
        match &self.kind {
            ActorKind::Enemy(_) => ActorTag::Enemy,
            ActorKind::Rocket(_) => ActorTag::Rocket,
            ActorKind::Explosion(_) => ActorTag::Explosion,
            ActorKind::Wall(w) if w.gate.is_some() => ActorTag::Gate,
            ActorKind::Wall(_) => ActorTag::Wall,
            ActorKind::Terminal(_) => ActorTag::Terminal,
            ActorKind::Button(_) => ActorTag::Button,
        }
    }

    /// World position: body position, fixed anchor, or static shape center
    pub fn position(&self, space: &Space) -> Option<DVec2> {
        match &self.kind {
            ActorKind::Explosion(e) => Some(e.pos),
            ActorKind::Terminal(t) => Some(t.pos),
            ActorKind::Button(b) => Some(b.pos),
            _ => {
                if let Some(body) = self.body.and_then(|b| space.body(b)) {
                    Some(body.position)
                } else {
                    self.shape.and_then(|s| space.shape_center(s))
                }
            }
        }
    }

    /// Snapshot for rendering; `None` when there is nothing to draw
    pub fn view(&self, space: &Space, tuning: &Tuning) -> Option<ActorView> {
        let angle = self.body.and_then(|b| space.body(b)).map_or(0.0, |b| b.angle);
        let (facing_left, triggered, progress) = match &self.kind {
            ActorKind::Enemy(e) if !e.drawable => return None,
            ActorKind::Enemy(e) => (e.turned_left, false, 0.0),
            ActorKind::Explosion(e) => (
                false,
                false,
                (e.elapsed_ms / tuning.explosion_duration_ms()).clamp(0.0, 1.0),
            ),
            ActorKind::Terminal(t) => (false, t.triggered, 0.0),
            ActorKind::Button(b) => (false, b.triggered, 0.0),
            ActorKind::Rocket(_) | ActorKind::Wall(_) => (false, false, 0.0),
        };
        Some(ActorView {
            id: self.id,
            tag: self.tag(),
            pos: self.position(space)?,
            angle,
            facing_left,
            triggered,
            progress,
        })
    }

    pub fn as_enemy(&self) -> Option<&Enemy> {
        match &self.kind {
            ActorKind::Enemy(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_enemy_mut(&mut self) -> Option<&mut Enemy> {
        match &mut self.kind {
            ActorKind::Enemy(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_rocket(&self) -> Option<&Rocket> {
        match &self.kind {
            ActorKind::Rocket(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_terminal(&self) -> Option<&Terminal> {
        match &self.kind {
            ActorKind::Terminal(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_terminal_mut(&mut self) -> Option<&mut Terminal> {
        match &mut self.kind {
            ActorKind::Terminal(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Geometry;

    #[test]
    fn test_eye_ray_follows_facing() {
        let tuning = Tuning::default();
        let mut enemy = Enemy::new(true, 0.0);
        enemy.update_eye_ray(DVec2::new(100.0, 100.0), 0.0, &tuning);
        let [eye, end] = enemy.eye_ray;
        assert!(eye.x < 100.0);
        assert!((eye.x - end.x - tuning.enemy_sight_length).abs() < 1e-9);
        assert_eq!(eye.y, end.y);
    }

    #[test]
    fn test_launch_point_mirrors_when_turned_left() {
        let tuning = Tuning::default();
        let right = Enemy::new(false, 0.0);
        let left = Enemy::new(true, 0.0);
        let (spawn_r, heading_r) = right.launch_point(DVec2::ZERO, 0.0, &tuning);
        let (spawn_l, heading_l) = left.launch_point(DVec2::ZERO, 0.0, &tuning);
        assert!((spawn_r.x + spawn_l.x).abs() < 1e-9);
        assert_eq!(spawn_r.y, spawn_l.y);
        assert_eq!(heading_r, 0.0);
        assert!((heading_l - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_toppled_enemy_heading_stays_in_range() {
        use std::f64::consts::PI;
        let tuning = Tuning::default();
        let left = Enemy::new(true, 0.0);
        // Knocked over backwards by a little more than a quarter turn
        let (_, heading) = left.launch_point(DVec2::ZERO, 1.7, &tuning);
        assert!(heading > -PI && heading <= PI);
        assert!((heading - (1.7 - PI)).abs() < 1e-9);

        // Several full spins accumulate on the body angle
        let right = Enemy::new(false, 0.0);
        let (_, heading) = right.launch_point(DVec2::ZERO, 4.0 * PI + 0.25, &tuning);
        assert!((heading - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_explosion_finishes_at_duration() {
        let mut explosion = Explosion::new(DVec2::ZERO, 0);
        assert!(!explosion.advance(0.35, 700.0));
        assert!(explosion.advance(0.35, 700.0));
    }

    #[test]
    fn test_release_physics_only_once() {
        let mut space = Space::new(DVec2::ZERO);
        let body = space.add_body(1.0, 1.0);
        let shape = space.add_shape(body, Geometry::boxed(2.0, 2.0)).unwrap();
        let mut actor = Actor::new(
            1,
            ActorKind::Rocket(Rocket {
                velocity: DVec2::X,
                spawn_tick: 0,
            }),
            Some(body),
            Some(shape),
        );

        actor.release_physics(&mut space);
        assert!(actor.body().is_none());
        assert!(actor.shape().is_none());
        assert!(!space.contains_body(body));

        let bodies = space.body_count();
        actor.release_physics(&mut space);
        assert_eq!(space.body_count(), bodies);
    }

    #[test]
    fn test_dead_enemy_not_drawn_after_release() {
        let space = Space::new(DVec2::ZERO);
        let tuning = Tuning::default();
        let mut enemy = Enemy::new(false, 0.0);
        enemy.alive = false;
        enemy.drawable = false;
        let actor = Actor::new(3, ActorKind::Enemy(enemy), None, None);
        assert!(actor.view(&space, &tuning).is_none());
    }
}
