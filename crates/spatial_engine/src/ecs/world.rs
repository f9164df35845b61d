//! World of simulated bodies

use super::Entity;
use crate::foundation::math::Frame;
use crate::foundation::pool::{ObjectPool, PoolConfig};
use crate::physics::collider::Collider;

/// A simulated object: its frame of reference and optional collider
#[derive(Debug, Clone, Default)]
pub struct Body {
    /// Placement in world space, written by the physics/entity layer
    pub frame: Frame,

    /// Collider attached through the collision system
    pub collider: Option<Collider>,
}

/// World containing all bodies, stored in a fixed-slot pool
#[derive(Debug, Clone, Default)]
pub struct World {
    bodies: ObjectPool<Body>,
}

impl World {
    /// Create a new world
    pub fn new(pool: &PoolConfig) -> Self {
        Self {
            bodies: ObjectPool::new(pool),
        }
    }

    /// Create a new entity placed at `frame`
    pub fn spawn(&mut self, frame: Frame) -> Entity {
        let id = self.bodies.insert(Body {
            frame,
            collider: None,
        });
        Entity::new(id)
    }

    /// Remove an entity's body. Use `PhysicsCollisionSystem::despawn` for
    /// entities that may carry a collider.
    pub(crate) fn remove(&mut self, entity: Entity) -> Option<Body> {
        self.bodies.release_id(entity.id()).ok()
    }

    /// Whether the entity is alive
    pub fn contains(&self, entity: Entity) -> bool {
        self.bodies.is_live(entity.id())
    }

    /// Get a body
    pub fn body(&self, entity: Entity) -> Option<&Body> {
        self.bodies.address_of(entity.id())
    }

    /// Get a mutable body
    pub fn body_mut(&mut self, entity: Entity) -> Option<&mut Body> {
        self.bodies.address_of_mut(entity.id())
    }

    /// Get an entity's frame
    pub fn frame(&self, entity: Entity) -> Option<&Frame> {
        self.body(entity).map(|body| &body.frame)
    }

    /// Get an entity's frame for modification
    pub fn frame_mut(&mut self, entity: Entity) -> Option<&mut Frame> {
        self.body_mut(entity).map(|body| &mut body.frame)
    }

    /// Get an entity's collider
    pub fn collider(&self, entity: Entity) -> Option<&Collider> {
        self.body(entity)?.collider.as_ref()
    }

    /// Get an entity's collider for modification
    pub fn collider_mut(&mut self, entity: Entity) -> Option<&mut Collider> {
        self.body_mut(entity)?.collider.as_mut()
    }

    /// Live entities in pool-slot order
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.bodies.iter().map(|(id, _)| Entity::new(id))
    }

    /// Live bodies in pool-slot order
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &Body)> {
        self.bodies.iter().map(|(id, body)| (Entity::new(id), body))
    }

    /// Live bodies in pool-slot order, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut Body)> {
        self.bodies.iter_mut().map(|(id, body)| (Entity::new(id), body))
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the world is empty
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}
