//! Physics module for collision detection
//!
//! Collider payloads and their world-space transforms, the exact
//! intersection tests between them, and the collision system that feeds
//! those tests from the octree broad phase.

pub mod collider;
pub mod collision_system;
pub mod intersection;

pub use collider::{
    Collider, ColliderError, ColliderHandle, ColliderKind, ColliderShape, ColliderStore, ConvexHull, HullFace,
    MeshHandle, Ray, ShapeRef, Sphere, AABB,
};
pub use collision_system::{CollisionPair, PhysicsCollisionSystem, PhysicsError, RayHit, StepReport};
