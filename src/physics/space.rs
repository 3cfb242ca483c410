//! Rigid-body world
//!
//! Wraps the rapier pipeline behind small copyable handles. Forces last for
//! a single step, and after every step the touching shape pairs are gathered
//! into arbiters so game code can ask a body what it touched and whether the
//! touch is new.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use glam::DVec2;
use rapier2d_f64::dynamics::{
    CCDSolver, CoefficientCombineRule, ImpulseJointSet, IntegrationParameters, IslandManager, MultibodyJointSet,
    RigidBody, RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};
use rapier2d_f64::geometry::{
    Collider, ColliderBuilder, ColliderHandle, ColliderSet,
    CollisionEvent, ContactPair, DefaultBroadPhase, NarrowPhase,
};
use rapier2d_f64::math::{Isometry, Point, Real, Rotation, Vector};
use rapier2d_f64::parry::mass_properties::MassProperties;
use rapier2d_f64::pipeline::{ActiveEvents, EventHandler, PhysicsPipeline};

use super::geometry::{
    Geometry, SegmentHit, from_point, from_vector, segment_query, to_point, to_vector,
};
use crate::consts::TILE_LENGTH;

/// Handle to a body. Stale handles never alias a newer body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    #[inline]
    fn raw(self) -> RigidBodyHandle {
        RigidBodyHandle::from_raw_parts(self.index, self.generation)
    }
}

impl From<RigidBodyHandle> for BodyHandle {
    fn from(handle: RigidBodyHandle) -> Self {
        let (index, generation) = handle.into_raw_parts();
        Self { index, generation }
    }
}

/// Handle to a shape. Stale handles never alias a newer shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeHandle {
    index: u32,
    generation: u32,
}

impl ShapeHandle {
    #[inline]
    fn raw(self) -> ColliderHandle {
        ColliderHandle::from_raw_parts(self.index, self.generation)
    }
}

impl From<ColliderHandle> for ShapeHandle {
    fn from(handle: ColliderHandle) -> Self {
        let (index, generation) = handle.into_raw_parts();
        Self { index, generation }
    }
}

/// Whether a body moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Integrated by the step
    Dynamic,
    /// Never moves, infinite mass
    Static,
}

/// Snapshot of a rigid body's simulation state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub kind: BodyKind,
    pub position: DVec2,
    pub velocity: DVec2,
    pub angle: f64,
    pub angular_velocity: f64,
    /// Force applied during the next step
    pub force: DVec2,
    pub mass: f64,
    /// Multiplier on world gravity (0 = unaffected)
    pub gravity_scale: f64,
}

impl Body {
    fn read(rb: &RigidBody) -> Self {
        Self {
            kind: if rb.is_dynamic() {
                BodyKind::Dynamic
            } else {
                BodyKind::Static
            },
            position: from_vector(rb.translation()),
            velocity: from_vector(rb.linvel()),
            angle: rb.rotation().angle(),
            angular_velocity: rb.angvel(),
            force: from_vector(&rb.user_force()),
            mass: rb.mass(),
            gravity_scale: rb.gravity_scale(),
        }
    }
}

/// Contact between two shapes found during the last step
#[derive(Debug, Clone, Copy)]
pub struct Arbiter {
    pub shape_a: ShapeHandle,
    pub shape_b: ShapeHandle,
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Unit normal from a toward b
    pub normal: DVec2,
    /// Closing speed along the normal at the start of the step
    pub impact_speed: f64,
    /// The pair started touching during the last step
    pub first_contact: bool,
}

/// One contact seen from a particular body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub shape: ShapeHandle,
    pub other_body: BodyHandle,
    pub other_shape: ShapeHandle,
    /// Unit normal pointing from this body toward the other
    pub normal: DVec2,
    pub impact_speed: f64,
    pub first_contact: bool,
}

/// Shape pairs whose contact began during a step
#[derive(Default)]
struct StartedPairs(Mutex<Vec<(ShapeHandle, ShapeHandle)>>);

impl StartedPairs {
    fn drain(&self) -> HashSet<(ShapeHandle, ShapeHandle)> {
        let mut pairs = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        pairs.drain(..).collect()
    }
}

impl EventHandler for StartedPairs {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let CollisionEvent::Started(a, b, _) = event {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(pair_key(a.into(), b.into()));
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// The physics world
pub struct Space {
    pub gravity: DVec2,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    started: StartedPairs,
    static_body: BodyHandle,
    arbiters: Vec<Arbiter>,
}

impl Space {
    pub fn new(gravity: DVec2) -> Self {
        let mut bodies = RigidBodySet::new();
        let static_body = bodies.insert(RigidBodyBuilder::fixed().build()).into();
        Self {
            gravity,
            params: IntegrationParameters {
                length_unit: TILE_LENGTH,
                ..IntegrationParameters::default()
            },
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            started: StartedPairs::default(),
            static_body,
            arbiters: Vec::new(),
        }
    }

    /// The immovable body that map geometry attaches to
    #[inline]
    pub fn static_body(&self) -> BodyHandle {
        self.static_body
    }

    /// Create a dynamic body. A non-finite moment locks rotation.
    pub fn add_body(&mut self, mass: f64, moment: f64) -> BodyHandle {
        let rotates = moment.is_finite() && moment > 0.0;
        let inertia = if rotates { moment } else { 0.0 };
        let mut builder = RigidBodyBuilder::dynamic()
            .additional_mass_properties(MassProperties::new(Point::origin(), mass, inertia))
            .can_sleep(false);
        if !rotates {
            builder = builder.lock_rotations();
        }
        self.bodies.insert(builder.build()).into()
    }

    /// Attach a shape to a live body. Shapes start frictionless and
    /// inelastic; material values combine by multiplication.
    pub fn add_shape(&mut self, body: BodyHandle, geometry: Geometry) -> Option<ShapeHandle> {
        self.bodies.get(body.raw())?;
        let collider = ColliderBuilder::new(geometry.shared_shape(0.0))
            .density(0.0)
            .friction(0.0)
            .restitution(0.0)
            .friction_combine_rule(CoefficientCombineRule::Multiply)
            .restitution_combine_rule(CoefficientCombineRule::Multiply)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let handle = self
            .colliders
            .insert_with_parent(collider, body.raw(), &mut self.bodies);
        Some(handle.into())
    }

    /// Set a shape's elasticity and friction
    pub fn set_material(&mut self, shape: ShapeHandle, elasticity: f64, friction: f64) {
        if let Some(collider) = self.colliders.get_mut(shape.raw()) {
            collider.set_restitution(elasticity);
            collider.set_friction(friction);
        }
    }

    /// Detach and drop a shape. Returns false for a stale handle.
    pub fn remove_shape(&mut self, handle: ShapeHandle) -> bool {
        let removed = self
            .colliders
            .remove(handle.raw(), &mut self.islands, &mut self.bodies, true)
            .is_some();
        if removed {
            self.arbiters
                .retain(|a| a.shape_a != handle && a.shape_b != handle);
        }
        removed
    }

    /// Drop a dynamic body together with any shapes still attached.
    /// The static body cannot be removed.
    pub fn remove_body(&mut self, handle: BodyHandle) -> bool {
        if handle == self.static_body {
            return false;
        }
        let removed = self
            .bodies
            .remove(
                handle.raw(),
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some();
        if removed {
            self.arbiters
                .retain(|a| a.body_a != handle && a.body_b != handle);
        }
        removed
    }

    pub fn body(&self, handle: BodyHandle) -> Option<Body> {
        self.bodies.get(handle.raw()).map(Body::read)
    }

    #[inline]
    pub fn contains_body(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle.raw())
    }

    #[inline]
    pub fn contains_shape(&self, handle: ShapeHandle) -> bool {
        self.colliders.contains(handle.raw())
    }

    /// Number of live bodies, including the static body
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn shape_count(&self) -> usize {
        self.colliders.len()
    }

    fn rigid_body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle.raw())
    }

    pub fn set_position(&mut self, handle: BodyHandle, position: DVec2) {
        if let Some(rb) = self.rigid_body_mut(handle) {
            rb.set_translation(to_vector(position), true);
        }
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: DVec2) {
        if let Some(rb) = self.rigid_body_mut(handle) {
            rb.set_linvel(to_vector(velocity), true);
        }
    }

    pub fn set_angle(&mut self, handle: BodyHandle, angle: f64) {
        if let Some(rb) = self.rigid_body_mut(handle) {
            rb.set_rotation(Rotation::new(angle), true);
        }
    }

    pub fn set_gravity_scale(&mut self, handle: BodyHandle, scale: f64) {
        if let Some(rb) = self.rigid_body_mut(handle) {
            rb.set_gravity_scale(scale, true);
        }
    }

    /// Continuous collision detection for fast, small bodies
    pub fn enable_ccd(&mut self, handle: BodyHandle) {
        if let Some(rb) = self.rigid_body_mut(handle) {
            rb.enable_ccd(true);
        }
    }

    /// Replace the force applied during the next step
    pub fn set_force(&mut self, handle: BodyHandle, force: DVec2) {
        if let Some(rb) = self.rigid_body_mut(handle) {
            rb.reset_forces(false);
            rb.add_force(to_vector(force), true);
        }
    }

    /// Instant change of momentum delivered at a world point. Off-center
    /// impulses also spin the body.
    pub fn apply_impulse_at_point(&mut self, handle: BodyHandle, impulse: DVec2, point: DVec2) {
        if let Some(rb) = self.rigid_body_mut(handle) {
            rb.apply_impulse_at_point(to_vector(impulse), to_point(point), true);
        }
    }

    /// World placement of a shape, read through its body so it is current
    /// even before the next step
    fn shape_pose(&self, collider: &Collider) -> Isometry<Real> {
        let parent = collider.parent().and_then(|b| self.bodies.get(b));
        match (parent, collider.position_wrt_parent()) {
            (Some(rb), Some(local)) => rb.position() * local,
            _ => *collider.position(),
        }
    }

    /// Center of a shape's bounding box in world space
    pub fn shape_center(&self, handle: ShapeHandle) -> Option<DVec2> {
        let collider = self.colliders.get(handle.raw())?;
        let aabb = collider.shape().compute_aabb(&self.shape_pose(collider));
        Some(from_point(&aabb.center()))
    }

    /// Query segment start→end (thickened by `radius`) against one shape
    pub fn segment_query(
        &self,
        handle: ShapeHandle,
        start: DVec2,
        end: DVec2,
        radius: f64,
    ) -> Option<SegmentHit> {
        let collider = self.colliders.get(handle.raw())?;
        let pose = self.shape_pose(collider);
        if radius > 0.0 {
            let grown = Geometry::from_shape(collider.shape())?.shared_shape(radius);
            segment_query(&*grown, &pose, start, end)
        } else {
            segment_query(collider.shape(), &pose, start, end)
        }
    }

    /// Contacts of `body` found during the last step
    pub fn contacts(&self, body: BodyHandle) -> impl Iterator<Item = Contact> + '_ {
        self.arbiters.iter().filter_map(move |arb| {
            if arb.body_a == body {
                Some(Contact {
                    shape: arb.shape_a,
                    other_body: arb.body_b,
                    other_shape: arb.shape_b,
                    normal: arb.normal,
                    impact_speed: arb.impact_speed,
                    first_contact: arb.first_contact,
                })
            } else if arb.body_b == body {
                Some(Contact {
                    shape: arb.shape_b,
                    other_body: arb.body_a,
                    other_shape: arb.shape_a,
                    normal: -arb.normal,
                    impact_speed: arb.impact_speed,
                    first_contact: arb.first_contact,
                })
            } else {
                None
            }
        })
    }

    /// All contacts found during the last step
    pub fn arbiters(&self) -> &[Arbiter] {
        &self.arbiters
    }

    /// Advance the world by a fixed timestep
    pub fn step(&mut self, dt: f64) {
        self.params.dt = dt;
        let before: HashMap<RigidBodyHandle, Vector<Real>> = self
            .bodies
            .iter()
            .map(|(handle, rb)| (handle, *rb.linvel()))
            .collect();

        self.pipeline.step(
            &to_vector(self.gravity),
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &self.started,
        );

        for (_, rb) in self.bodies.iter_mut() {
            rb.reset_forces(false);
        }

        let started = self.started.drain();
        self.arbiters = self.collect_arbiters(&before, &started);
    }

    fn collect_arbiters(
        &self,
        before: &HashMap<RigidBodyHandle, Vector<Real>>,
        started: &HashSet<(ShapeHandle, ShapeHandle)>,
    ) -> Vec<Arbiter> {
        let velocity = |handle: RigidBodyHandle| before.get(&handle).copied().unwrap_or_else(Vector::zeros);

        let mut arbiters = Vec::new();
        for pair in self.narrow_phase.contact_pairs() {
            if !pair.has_any_active_contact {
                continue;
            }
            let Some(manifold) = pair
                .manifolds
                .iter()
                .find(|m| !m.data.solver_contacts.is_empty())
            else {
                continue;
            };
            let parent = |handle: ColliderHandle| self.colliders.get(handle).and_then(Collider::parent);
            let (Some(body_a), Some(body_b)) = (parent(pair.collider1), parent(pair.collider2)) else {
                continue;
            };

            let n = manifold.data.normal;
            let closing = (velocity(body_a) - velocity(body_b)).dot(&n);
            let (shape_a, shape_b) = (ShapeHandle::from(pair.collider1), ShapeHandle::from(pair.collider2));
            arbiters.push(Arbiter {
                shape_a,
                shape_b,
                body_a: body_a.into(),
                body_b: body_b.into(),
                normal: from_vector(&n),
                impact_speed: closing.max(0.0),
                first_contact: started.contains(&pair_key(shape_a, shape_b)),
            });
        }
        arbiters
    }
}

#[inline]
fn pair_key(a: ShapeHandle, b: ShapeHandle) -> (ShapeHandle, ShapeHandle) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    fn floor(space: &mut Space) -> ShapeHandle {
        let ground = space.static_body();
        space
            .add_shape(
                ground,
                Geometry::segment(DVec2::new(-500.0, 100.0), DVec2::new(500.0, 100.0), 8.0),
            )
            .unwrap()
    }

    fn crate_at(space: &mut Space, pos: DVec2) -> (BodyHandle, ShapeHandle) {
        let body = space.add_body(1.0, f64::INFINITY);
        space.set_position(body, pos);
        let shape = space.add_shape(body, Geometry::boxed(16.0, 16.0)).unwrap();
        (body, shape)
    }

    #[test]
    fn test_gravity_integration_and_force_clear() {
        let mut space = Space::new(DVec2::new(0.0, 100.0));
        let (body, _) = crate_at(&mut space, DVec2::ZERO);
        space.set_force(body, DVec2::new(60.0, 0.0));
        assert_eq!(space.body(body).unwrap().force, DVec2::new(60.0, 0.0));
        space.step(SIM_DT);

        let b = space.body(body).unwrap();
        assert!((b.velocity.x - 1.0).abs() < 1e-6);
        assert!((b.velocity.y - 100.0 * SIM_DT).abs() < 1e-6);
        assert_eq!(b.force, DVec2::ZERO);
    }

    #[test]
    fn test_box_comes_to_rest_on_floor() {
        let mut space = Space::new(DVec2::new(0.0, 750.0));
        floor(&mut space);
        let (body, _) = crate_at(&mut space, DVec2::new(0.0, 70.0));

        for _ in 0..180 {
            space.step(SIM_DT);
        }
        let b = space.body(body).unwrap();
        // Floor surface at y = 92, box half height 8
        assert!((b.position.y - 84.0).abs() < 1.0, "y = {}", b.position.y);
        assert!(b.velocity.y.abs() < 20.0);
    }

    #[test]
    fn test_first_contact_reported_once() {
        let mut space = Space::new(DVec2::new(0.0, 750.0));
        floor(&mut space);
        let (body, _) = crate_at(&mut space, DVec2::new(0.0, 70.0));

        let mut firsts = 0;
        let mut touching_steps = 0;
        for _ in 0..120 {
            space.step(SIM_DT);
            for contact in space.contacts(body) {
                touching_steps += 1;
                if contact.first_contact {
                    firsts += 1;
                    assert!(contact.impact_speed > 0.0);
                    // Ground is below: normal toward it points down
                    assert!(contact.normal.y > 0.5);
                }
            }
        }
        assert_eq!(firsts, 1);
        assert!(touching_steps > 1);
    }

    #[test]
    fn test_remove_body_drops_shapes_and_contacts() {
        let mut space = Space::new(DVec2::new(0.0, 750.0));
        floor(&mut space);
        let (body, shape) = crate_at(&mut space, DVec2::new(0.0, 84.0));
        for _ in 0..3 {
            space.step(SIM_DT);
        }
        assert!(space.contacts(body).next().is_some());

        assert!(space.remove_body(body));
        assert!(!space.contains_body(body));
        assert!(!space.contains_shape(shape));
        assert!(space.arbiters().is_empty());
        assert_eq!(space.contacts(body).count(), 0);

        // Second removal is a no-op on a stale handle
        assert!(!space.remove_body(body));
        assert!(!space.remove_shape(shape));
    }

    #[test]
    fn test_stale_handle_does_not_alias_reused_slot() {
        let mut space = Space::new(DVec2::ZERO);
        let (old, _) = crate_at(&mut space, DVec2::ZERO);
        space.remove_body(old);
        let (new, _) = crate_at(&mut space, DVec2::new(5.0, 5.0));
        assert_ne!(old, new);
        assert!(space.body(old).is_none());
        assert!(space.body(new).is_some());
    }

    #[test]
    fn test_static_body_cannot_be_removed() {
        let mut space = Space::new(DVec2::ZERO);
        let ground = space.static_body();
        assert!(!space.remove_body(ground));
        assert!(space.contains_body(ground));
        assert_eq!(space.body(ground).unwrap().kind, BodyKind::Static);
    }

    #[test]
    fn test_segment_query_through_space() {
        let mut space = Space::new(DVec2::ZERO);
        let (body, shape) = crate_at(&mut space, DVec2::new(50.0, 0.0));
        let hit = space
            .segment_query(shape, DVec2::ZERO, DVec2::new(100.0, 0.0), 0.0)
            .unwrap();
        assert!((hit.fraction - 0.42).abs() < 1e-9);

        // Moving the body moves the query target without a step
        space.set_position(body, DVec2::new(70.0, 0.0));
        let hit = space
            .segment_query(shape, DVec2::ZERO, DVec2::new(100.0, 0.0), 0.0)
            .unwrap();
        assert!((hit.fraction - 0.62).abs() < 1e-9);
        assert!((space.shape_center(shape).unwrap() - DVec2::new(70.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_thick_segment_query_through_space() {
        let mut space = Space::new(DVec2::ZERO);
        let (_, shape) = crate_at(&mut space, DVec2::new(50.0, 12.0));
        let (start, end) = (DVec2::ZERO, DVec2::new(100.0, 0.0));
        assert!(space.segment_query(shape, start, end, 0.0).is_none());
        assert!(space.segment_query(shape, start, end, 6.0).is_some());
    }

    #[test]
    fn test_impulse_respects_mass() {
        let mut space = Space::new(DVec2::ZERO);
        let body = space.add_body(2.0, f64::INFINITY);
        space.add_shape(body, Geometry::boxed(4.0, 4.0)).unwrap();
        space.step(SIM_DT);
        space.apply_impulse_at_point(body, DVec2::new(4.0, 0.0), DVec2::ZERO);
        let b = space.body(body).unwrap();
        assert!((b.velocity - DVec2::new(2.0, 0.0)).length() < 1e-9);
        assert_eq!(b.angular_velocity, 0.0);
    }

    #[test]
    fn test_off_center_impulse_spins_body() {
        let mut space = Space::new(DVec2::ZERO);
        let body = space.add_body(1.0, 50.0);
        space.add_shape(body, Geometry::boxed(16.0, 16.0)).unwrap();
        space.step(SIM_DT);

        // Push the top edge to the right: y grows downward, so this turns
        // the box clockwise on screen (positive angle)
        space.apply_impulse_at_point(body, DVec2::new(10.0, 0.0), DVec2::new(0.0, -8.0));
        assert!(space.body(body).unwrap().angular_velocity > 0.0);
        for _ in 0..10 {
            space.step(SIM_DT);
        }
        assert!(space.body(body).unwrap().angle > 0.1);
    }

    #[test]
    fn test_locked_body_never_rotates() {
        let mut space = Space::new(DVec2::ZERO);
        let (body, _) = crate_at(&mut space, DVec2::ZERO);
        space.step(SIM_DT);
        space.apply_impulse_at_point(body, DVec2::new(10.0, 0.0), DVec2::new(0.0, -8.0));
        for _ in 0..10 {
            space.step(SIM_DT);
        }
        assert_eq!(space.body(body).unwrap().angle, 0.0);
    }

    #[test]
    fn test_tall_box_topples_when_shoved() {
        let mut space = Space::new(DVec2::new(0.0, 750.0));
        let ground = floor(&mut space);
        space.set_material(ground, 0.0, 1.0);
        let body = space.add_body(1.0, 50.0);
        space.set_position(body, DVec2::new(0.0, 76.0));
        let shape = space.add_shape(body, Geometry::boxed(8.0, 32.0)).unwrap();
        space.set_material(shape, 0.0, 1.0);
        for _ in 0..30 {
            space.step(SIM_DT);
        }

        space.set_velocity(body, DVec2::new(300.0, 0.0));
        let mut max_angle: f64 = 0.0;
        for _ in 0..60 {
            space.step(SIM_DT);
            max_angle = max_angle.max(space.body(body).unwrap().angle.abs());
        }
        assert!(max_angle > 0.2, "max angle {max_angle}");
    }
}
