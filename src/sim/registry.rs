//! Actor registry with deferred removal
//!
//! Actors are kept sorted by id. Removal during iteration is never immediate:
//! callers mark an actor and the registry sweeps marked actors at a point where
//! nothing is borrowing the collection, releasing their physics handles.

use crate::physics::{BodyHandle, ShapeHandle, Space};

use super::actor::{Actor, ActorId, ActorKind};

#[derive(Debug, Clone, Default)]
pub struct ActorRegistry {
    actors: Vec<Actor>,
    next_id: ActorId,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an actor; ids are never reused
    pub fn insert(
        &mut self,
        kind: ActorKind,
        body: Option<BodyHandle>,
        shape: Option<ShapeHandle>,
    ) -> ActorId {
        let id = self.next_id;
        self.next_id += 1;
        self.actors.push(Actor::new(id, kind, body, shape));
        id
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    fn index_of(&self, id: ActorId) -> Option<usize> {
        self.actors.binary_search_by_key(&id, |a| a.id).ok()
    }

    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        self.index_of(id).map(|i| &self.actors[i])
    }

    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.index_of(id).map(|i| &mut self.actors[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.actors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Actor> {
        self.actors.iter_mut()
    }

    pub fn enemies(&self) -> impl Iterator<Item = &Actor> {
        self.actors
            .iter()
            .filter(|a| matches!(a.kind, ActorKind::Enemy(_)))
    }

    pub fn rockets(&self) -> impl Iterator<Item = &Actor> {
        self.actors
            .iter()
            .filter(|a| matches!(a.kind, ActorKind::Rocket(_)))
    }

    pub fn explosions(&self) -> impl Iterator<Item = &Actor> {
        self.actors
            .iter()
            .filter(|a| matches!(a.kind, ActorKind::Explosion(_)))
    }

    /// Walls the magnetic gun can grab (plasma gates excluded)
    pub fn magnetic_walls(&self) -> impl Iterator<Item = &Actor> {
        self.actors
            .iter()
            .filter(|a| matches!(&a.kind, ActorKind::Wall(w) if w.is_magnetic()))
    }

    /// Wall actor of a plasma gate
    pub fn gate_wall(&self, gate: u32) -> Option<&Actor> {
        self.actors
            .iter()
            .find(|a| matches!(&a.kind, ActorKind::Wall(w) if w.gate == Some(gate)))
    }

    pub fn find_by_shape(&self, shape: ShapeHandle) -> Option<&Actor> {
        self.actors.iter().find(|a| a.shape() == Some(shape))
    }

    pub fn find_by_body(&self, body: BodyHandle) -> Option<&Actor> {
        self.actors.iter().find(|a| a.body() == Some(body))
    }

    /// Queue an actor for the next sweep. Returns false for unknown ids.
    pub fn mark_for_removal(&mut self, id: ActorId) -> bool {
        match self.get_mut(id) {
            Some(actor) => {
                actor.mark();
                true
            }
            None => false,
        }
    }

    pub fn pending_removals(&self) -> usize {
        self.actors.iter().filter(|a| a.is_marked()).count()
    }

    /// Drop every marked actor and free its physics handles
    pub fn sweep(&mut self, space: &mut Space) -> usize {
        let before = self.actors.len();
        self.actors.retain_mut(|actor| {
            if actor.is_marked() {
                actor.release_physics(space);
                false
            } else {
                true
            }
        });
        before - self.actors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Geometry;
    use crate::sim::actor::{Explosion, Rocket, Wall};
    use glam::DVec2;

    fn rocket(space: &mut Space, registry: &mut ActorRegistry) -> ActorId {
        let body = space.add_body(0.05, 100.0);
        let shape = space.add_shape(body, Geometry::boxed(8.0, 2.0));
        registry.insert(
            ActorKind::Rocket(Rocket {
                velocity: DVec2::X,
                spawn_tick: 0,
            }),
            Some(body),
            shape,
        )
    }

    #[test]
    fn test_ids_increase_and_lookup() {
        let mut registry = ActorRegistry::new();
        let a = registry.insert(ActorKind::Explosion(Explosion::new(DVec2::ZERO, 0)), None, None);
        let b = registry.insert(ActorKind::Wall(Wall { gate: None }), None, None);
        assert!(b > a);
        assert!(registry.get(a).is_some());
        assert!(registry.get(b + 1).is_none());
    }

    #[test]
    fn test_sweep_releases_physics() {
        let mut space = Space::new(DVec2::ZERO);
        let mut registry = ActorRegistry::new();
        let id = rocket(&mut space, &mut registry);
        let keep = rocket(&mut space, &mut registry);
        let bodies = space.body_count();

        assert!(registry.mark_for_removal(id));
        // Marking twice queues once
        assert!(registry.mark_for_removal(id));
        assert_eq!(registry.pending_removals(), 1);

        assert_eq!(registry.sweep(&mut space), 1);
        assert_eq!(space.body_count(), bodies - 1);
        assert!(registry.get(id).is_none());
        assert!(registry.get(keep).is_some());
        assert_eq!(registry.sweep(&mut space), 0);
    }

    #[test]
    fn test_ids_not_reused_after_sweep() {
        let mut space = Space::new(DVec2::ZERO);
        let mut registry = ActorRegistry::new();
        let first = rocket(&mut space, &mut registry);
        registry.mark_for_removal(first);
        registry.sweep(&mut space);
        let second = rocket(&mut space, &mut registry);
        assert_ne!(first, second);
        assert!(registry.get(first).is_none());
    }

    #[test]
    fn test_gate_walls_not_magnetic() {
        let mut registry = ActorRegistry::new();
        registry.insert(ActorKind::Wall(Wall { gate: None }), None, None);
        let gate = registry.insert(ActorKind::Wall(Wall { gate: Some(3) }), None, None);
        assert_eq!(registry.magnetic_walls().count(), 1);
        assert_eq!(registry.gate_wall(3).map(|a| a.id), Some(gate));
        assert!(registry.gate_wall(4).is_none());
    }
}
