//! Core collision detection system
//!
//! The collision detection system is split into two phases. The broad phase
//! asks the [`SpatialIndex`] which objects share an octree leaf; the narrow
//! phase runs the exact shape tests from [`crate::physics::intersection`] on
//! those candidates only.
//!
//! The system owns the collider payloads and the index. Entities and their
//! frames live in the [`World`], which is handed in on every call; the system
//! only reads frames, never writes them.

use crate::core::config::{PhysicsConfig, SpatialConfig};
use crate::ecs::{Entity, World};
use crate::foundation::math::{Frame, Vec3};
use crate::physics::collider::{
    Collider, ColliderError, ColliderHandle, ColliderKind, ColliderStore, ConvexHull, Ray, ShapeRef, Sphere, AABB,
};
use crate::physics::intersection;
use crate::spatial::{BoundsLookup, InconsistencyError, SpatialIndex, UpdateReport};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

/// Collision pair representing two entities that are touching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair {
    /// Lower entity
    pub entity_a: Entity,
    /// Higher entity
    pub entity_b: Entity,
}

impl CollisionPair {
    /// Create a new collision pair (always stores the smaller entity first)
    pub fn new(entity_a: Entity, entity_b: Entity) -> Self {
        if entity_a < entity_b {
            Self { entity_a, entity_b }
        } else {
            Self {
                entity_a: entity_b,
                entity_b: entity_a,
            }
        }
    }

    /// Whether `entity` is one of the two partners
    pub fn involves(&self, entity: Entity) -> bool {
        self.entity_a == entity || self.entity_b == entity
    }
}

/// Result of a ray cast against the indexed colliders
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The entity that was hit
    pub entity: Entity,
    /// Distance along the ray
    pub distance: f32,
    /// World-space hit point
    pub point: Vec3,
    /// Surface normal at the hit point
    pub normal: Vec3,
}

/// What one [`PhysicsCollisionSystem::step`] did
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    /// Index maintenance summary, including boundary events
    pub index: UpdateReport,
    /// Broad-phase candidate pairs tested by the narrow phase
    pub candidates: usize,
    /// Pairs touching this tick, sorted
    pub collisions: Vec<CollisionPair>,
    /// Pairs touching now that were not touching last tick, sorted
    pub entered: Vec<CollisionPair>,
    /// Pairs touching last tick that no longer are, sorted
    pub exited: Vec<CollisionPair>,
    /// Subtrees collapsed after the update
    pub pruned: usize,
}

/// Collision system errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhysicsError {
    /// The entity is not alive in the world
    #[error("{0} does not exist")]
    UnknownEntity(Entity),

    /// The entity already carries a collider
    #[error("{0} already has a collider")]
    ColliderAlreadyAttached(Entity),

    /// The entity carries no collider
    #[error("{0} has no collider")]
    NoCollider(Entity),

    /// Payload creation or lookup failed
    #[error(transparent)]
    Collider(#[from] ColliderError),
}

/// Broad-phase bounds of every entity's cached world-space collider
struct WorldBounds<'a> {
    world: &'a World,
    colliders: &'a ColliderStore,
}

impl BoundsLookup for WorldBounds<'_> {
    fn bounds_of(&self, entity: Entity) -> Option<AABB> {
        let collider = self.world.collider(entity)?;
        self.colliders.world_bounds(collider.handle())
    }
}

/// Two-phase collision detection over the bodies of a [`World`]
#[derive(Debug, Clone)]
pub struct PhysicsCollisionSystem {
    /// Model-space and world-space payloads
    colliders: ColliderStore,

    /// Octree plus membership log
    index: SpatialIndex,

    config: PhysicsConfig,

    /// Collision pairs from the current tick
    current_pairs: HashSet<CollisionPair>,

    /// Collision pairs from the previous tick
    previous_pairs: HashSet<CollisionPair>,
}

impl PhysicsCollisionSystem {
    /// Create a collision system with an empty index
    pub fn new(config: &SpatialConfig) -> Self {
        log::info!(
            "Collision system ready: world half extent {}, max occupancy {}, max depth {}",
            config.octree.world_half_extent,
            config.octree.max_occupancy,
            config.octree.max_depth
        );

        Self {
            colliders: ColliderStore::new(&config.pool),
            index: SpatialIndex::new(config.octree.clone()),
            config: config.physics.clone(),
            current_pairs: HashSet::new(),
            previous_pairs: HashSet::new(),
        }
    }

    /// Attach a sphere collider to `entity`
    pub fn attach_sphere(&mut self, world: &mut World, entity: Entity, sphere: Sphere) -> Result<ColliderHandle, PhysicsError> {
        self.attach(world, entity, |store, frame| store.create_sphere(sphere, frame))
    }

    /// Attach an axis-aligned box collider to `entity`
    pub fn attach_aabb(&mut self, world: &mut World, entity: Entity, aabb: AABB) -> Result<ColliderHandle, PhysicsError> {
        self.attach(world, entity, |store, frame| store.create_aabb(aabb, frame))
    }

    /// Attach a convex hull collider to `entity`
    pub fn attach_hull(&mut self, world: &mut World, entity: Entity, hull: ConvexHull) -> Result<ColliderHandle, PhysicsError> {
        self.attach(world, entity, |store, frame| store.create_hull(hull, frame))
    }

    /// Attach a ray collider to `entity`. Rays are not stored in the index;
    /// their candidates come from a ray query every tick.
    pub fn attach_ray(&mut self, world: &mut World, entity: Entity, ray: Ray) -> Result<ColliderHandle, PhysicsError> {
        self.attach(world, entity, |store, frame| store.create_ray(ray, frame))
    }

    fn attach<F>(&mut self, world: &mut World, entity: Entity, create: F) -> Result<ColliderHandle, PhysicsError>
    where
        F: FnOnce(&mut ColliderStore, &Frame) -> Result<ColliderHandle, ColliderError>,
    {
        let body = world.body(entity).ok_or(PhysicsError::UnknownEntity(entity))?;
        if body.collider.is_some() {
            return Err(PhysicsError::ColliderAlreadyAttached(entity));
        }

        let handle = create(&mut self.colliders, &body.frame)?;
        if let Some(body) = world.body_mut(entity) {
            body.collider = Some(Collider::new(handle));
        }

        let lookup = WorldBounds {
            world: &*world,
            colliders: &self.colliders,
        };
        self.index.insert_and_log(entity, &lookup);

        log::trace!("Attached {} collider to {}", handle.kind(), entity);
        Ok(handle)
    }

    /// Remove `entity`'s collider from the index and free its payloads. The
    /// entity stays alive.
    pub fn detach(&mut self, world: &mut World, entity: Entity) -> Result<(), PhysicsError> {
        let collider = world
            .body(entity)
            .ok_or(PhysicsError::UnknownEntity(entity))?
            .collider
            .as_ref()
            .ok_or(PhysicsError::NoCollider(entity))?;
        let handle = collider.handle();

        let lookup = WorldBounds {
            world: &*world,
            colliders: &self.colliders,
        };
        self.index.remove_and_unlog(entity, &lookup);
        self.colliders.free(handle)?;

        if let Some(body) = world.body_mut(entity) {
            body.collider = None;
        }
        self.current_pairs.retain(|pair| !pair.involves(entity));
        self.previous_pairs.retain(|pair| !pair.involves(entity));
        for partner in world.iter_mut().filter_map(|(_, body)| body.collider.as_mut()) {
            partner.remove_colliding(entity);
        }

        Ok(())
    }

    /// Detach the collider, if any, and release the entity's slot
    pub fn despawn(&mut self, world: &mut World, entity: Entity) -> Result<(), PhysicsError> {
        if world.collider(entity).is_some() {
            self.detach(world, entity)?;
        }
        world.remove(entity).ok_or(PhysicsError::UnknownEntity(entity))?;
        Ok(())
    }

    /// Rebuild every world-space payload from the entity frames
    pub fn refresh_world_space(&mut self, world: &World) -> Result<(), PhysicsError> {
        for (_, body) in world.iter() {
            if let Some(collider) = &body.collider {
                self.colliders.update_world(collider.handle(), &body.frame)?;
            }
        }
        Ok(())
    }

    /// Run the incremental index update over every collider in slot order
    pub fn update_index(&mut self, world: &World) -> UpdateReport {
        let entities: Vec<Entity> = world
            .iter()
            .filter(|(_, body)| body.collider.is_some())
            .map(|(entity, _)| entity)
            .collect();

        let lookup = WorldBounds {
            world: &*world,
            colliders: &self.colliders,
        };
        self.index.update_all(entities, &lookup)
    }

    /// One simulation tick of collision detection: refresh world-space
    /// payloads, update the index, run both phases, and fill every
    /// collider's colliding list.
    pub fn step(&mut self, world: &mut World) -> Result<StepReport, PhysicsError> {
        self.refresh_world_space(world)?;
        let index = self.update_index(world);

        std::mem::swap(&mut self.current_pairs, &mut self.previous_pairs);
        self.current_pairs.clear();
        for (_, body) in world.iter_mut() {
            if let Some(collider) = body.collider.as_mut() {
                collider.reset_colliding();
            }
        }

        let candidates = self.broad_phase(world);
        self.narrow_phase(world, &candidates);

        for pair in &self.current_pairs {
            if let Some(collider) = world.collider_mut(pair.entity_a) {
                collider.add_colliding(pair.entity_b);
            }
            if let Some(collider) = world.collider_mut(pair.entity_b) {
                collider.add_colliding(pair.entity_a);
            }
        }

        let pruned = if self.config.prune_each_step {
            let lookup = WorldBounds {
                world: &*world,
                colliders: &self.colliders,
            };
            self.index.prune(&lookup)
        } else {
            0
        };

        Ok(StepReport {
            index,
            candidates: candidates.len(),
            collisions: self.current_collisions(),
            entered: self.collision_entered(),
            exited: self.collision_exited(),
            pruned,
        })
    }

    /// Candidate pairs: co-resident objects plus, for every ray, the objects
    /// in the leaves the ray passes through
    fn broad_phase(&self, world: &World) -> Vec<CollisionPair> {
        let mut candidates: BTreeSet<CollisionPair> = self
            .index
            .candidate_pairs()
            .into_iter()
            .map(|(a, b)| CollisionPair::new(a, b))
            .collect();

        for (entity, body) in world.iter() {
            let Some(collider) = &body.collider else {
                continue;
            };
            if collider.kind() != ColliderKind::Ray {
                continue;
            }
            if let Some(ShapeRef::Ray(ray)) = self.colliders.world_shape(collider.handle()) {
                for other in self.ray_candidates(ray) {
                    if other != entity {
                        candidates.insert(CollisionPair::new(entity, other));
                    }
                }
            }
        }

        candidates.into_iter().collect()
    }

    fn narrow_phase(&mut self, world: &World, candidates: &[CollisionPair]) {
        for pair in candidates {
            let (Some(a), Some(b)) = (self.shape_of(world, pair.entity_a), self.shape_of(world, pair.entity_b)) else {
                continue;
            };
            if a.intersects(&b) {
                self.current_pairs.insert(*pair);
            }
        }
    }

    fn ray_candidates(&self, ray: &Ray) -> Vec<Entity> {
        if ray.direction == Vec3::zeros() {
            return self.index.query_region(&AABB::new(ray.origin, ray.origin));
        }
        self.index.query_ray(ray.origin, ray.direction)
    }

    /// Cast a ray against every indexed collider. Hits are sorted by
    /// distance; ray colliders are never hit.
    pub fn ray_cast(&self, world: &World, origin: Vec3, direction: Vec3) -> Vec<RayHit> {
        let ray = Ray::new(origin, direction);
        let mut hits: Vec<RayHit> = self
            .ray_candidates(&ray)
            .into_iter()
            .filter_map(|entity| {
                let shape = self.shape_of(world, entity)?;
                let (distance, point, normal) = intersection::ray_hit(&ray, &shape)?;
                Some(RayHit {
                    entity,
                    distance,
                    point,
                    normal,
                })
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.entity.cmp(&b.entity)));
        hits
    }

    /// World-space points of `entity`'s collider furthest along `direction`,
    /// using the configured tolerance band
    pub fn support_points(&self, world: &World, entity: Entity, direction: &Vec3) -> Result<Vec<Vec3>, PhysicsError> {
        let collider = world.collider(entity).ok_or(PhysicsError::NoCollider(entity))?;
        let shape = self
            .colliders
            .world_shape(collider.handle())
            .ok_or(PhysicsError::NoCollider(entity))?;
        Ok(shape.support_points(direction, self.config.furthest_point_tolerance))
    }

    /// Cached world-space payload of `entity`'s collider
    pub fn shape_of<'a>(&'a self, world: &World, entity: Entity) -> Option<ShapeRef<'a>> {
        let collider = world.collider(entity)?;
        self.colliders.world_shape(collider.handle())
    }

    /// Verify the tree/log agreement of the index
    pub fn check_consistency(&self) -> Result<(), InconsistencyError> {
        self.index.check_consistency()
    }

    /// Pairs touching this tick, sorted
    pub fn current_collisions(&self) -> Vec<CollisionPair> {
        let mut pairs: Vec<_> = self.current_pairs.iter().copied().collect();
        pairs.sort();
        pairs
    }

    /// Pairs that started touching this tick, sorted
    pub fn collision_entered(&self) -> Vec<CollisionPair> {
        let mut pairs: Vec<_> = self.current_pairs.difference(&self.previous_pairs).copied().collect();
        pairs.sort();
        pairs
    }

    /// Pairs that stopped touching this tick, sorted
    pub fn collision_exited(&self) -> Vec<CollisionPair> {
        let mut pairs: Vec<_> = self.previous_pairs.difference(&self.current_pairs).copied().collect();
        pairs.sort();
        pairs
    }

    /// The spatial index, for queries and debug drawing
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Collider payload storage
    pub fn colliders(&self) -> &ColliderStore {
        &self.colliders
    }

    /// Collision configuration
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }
}
