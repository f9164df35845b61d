//! Collider variants
//!
//! A [`Collider`] is a tagged handle into one of four payload pools. Each
//! payload is stored twice: once in model space, as authored, and once in
//! world space, rebuilt from the model copy and the owning entity's [`Frame`]
//! whenever the entity moves.
//!
//! # Module Organization
//!
//! - [`sphere`], [`aabb`], [`hull`], [`ray`] - the payload types
//! - [`store`] - lock-stepped model/world pools for every payload type
//!
//! # Key Types
//!
//! - [`ColliderShape`] - what every payload type provides
//! - [`ColliderHandle`] - variant tag plus pool id
//! - [`ShapeRef`] - borrowed world-space payload used for intersection tests

pub mod aabb;
pub mod hull;
pub mod ray;
pub mod sphere;
pub mod store;

pub use aabb::AABB;
pub use hull::{ConvexHull, HullFace, FURTHEST_POINT_TOLERANCE};
pub use ray::Ray;
pub use sphere::Sphere;
pub use store::ColliderStore;

use crate::ecs::Entity;
use crate::foundation::math::{Frame, Vec3, Vec4};
use crate::foundation::pool::{PoolError, PoolId};
use crate::physics::intersection;
use std::fmt;
use thiserror::Error;

/// Behaviour shared by every collider payload
pub trait ColliderShape: Default + Clone {
    /// Variant tag for this payload type
    const KIND: ColliderKind;

    /// Write the world-space version of `self`, placed by `frame`, into `dest`
    fn to_world_space(&self, frame: &Frame, dest: &mut Self);

    /// Axis-aligned bounds used by the broad phase. `None` means the shape is
    /// never stored in the spatial index.
    fn world_bounds(&self) -> Option<AABB>;
}

/// Collider variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColliderKind {
    /// Sphere payload
    Sphere,
    /// Axis-aligned box payload
    Aabb,
    /// Convex hull payload
    ConvexHull,
    /// Ray payload
    Ray,
}

impl fmt::Display for ColliderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sphere => "sphere",
            Self::Aabb => "aabb",
            Self::ConvexHull => "convex hull",
            Self::Ray => "ray",
        };
        f.write_str(name)
    }
}

/// Variant tag together with the id of the payload in its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColliderHandle {
    /// Sphere payload id
    Sphere(PoolId),
    /// AABB payload id
    Aabb(PoolId),
    /// Convex hull payload id
    ConvexHull(PoolId),
    /// Ray payload id
    Ray(PoolId),
}

impl ColliderHandle {
    /// Variant of the payload
    pub fn kind(self) -> ColliderKind {
        match self {
            Self::Sphere(_) => ColliderKind::Sphere,
            Self::Aabb(_) => ColliderKind::Aabb,
            Self::ConvexHull(_) => ColliderKind::ConvexHull,
            Self::Ray(_) => ColliderKind::Ray,
        }
    }

    /// Pool id of the payload (shared by the model and world copies)
    pub fn id(self) -> PoolId {
        match self {
            Self::Sphere(id) | Self::Aabb(id) | Self::ConvexHull(id) | Self::Ray(id) => id,
        }
    }
}

/// Handle to a renderer-owned mesh used to draw a collider for debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Collider attached to an entity
#[derive(Debug, Clone)]
pub struct Collider {
    handle: ColliderHandle,
    debug_mesh: Option<MeshHandle>,
    color: Vec4,
    colliding: Vec<Entity>,
}

impl Collider {
    /// Debug color of a collider touching nothing
    pub fn idle_color() -> Vec4 {
        Vec4::new(0.0, 1.0, 0.0, 1.0)
    }

    /// Debug color of a collider touching at least one partner
    pub fn colliding_color() -> Vec4 {
        Vec4::new(1.0, 0.0, 0.0, 1.0)
    }

    /// Wrap a payload handle
    pub fn new(handle: ColliderHandle) -> Self {
        Self {
            handle,
            debug_mesh: None,
            color: Self::idle_color(),
            colliding: Vec::new(),
        }
    }

    /// Attach a debug mesh
    pub fn with_debug_mesh(mut self, mesh: MeshHandle) -> Self {
        self.debug_mesh = Some(mesh);
        self
    }

    /// Payload handle
    pub fn handle(&self) -> ColliderHandle {
        self.handle
    }

    /// Variant of the payload
    pub fn kind(&self) -> ColliderKind {
        self.handle.kind()
    }

    /// Debug mesh, if any
    pub fn debug_mesh(&self) -> Option<MeshHandle> {
        self.debug_mesh
    }

    /// Replace the debug mesh
    pub fn set_debug_mesh(&mut self, mesh: Option<MeshHandle>) {
        self.debug_mesh = mesh;
    }

    /// Current debug color
    pub fn color(&self) -> Vec4 {
        self.color
    }

    /// Partners found touching this collider during the current tick
    pub fn colliding(&self) -> &[Entity] {
        &self.colliding
    }

    /// Whether `other` was found touching this collider during the current tick
    pub fn is_colliding_with(&self, other: Entity) -> bool {
        self.colliding.contains(&other)
    }

    /// Clear the colliding list. Called once per tick before detection.
    pub fn reset_colliding(&mut self) {
        self.colliding.clear();
        self.color = Self::idle_color();
    }

    /// Record a touching partner
    pub fn add_colliding(&mut self, other: Entity) {
        if !self.colliding.contains(&other) {
            self.colliding.push(other);
        }
        self.color = Self::colliding_color();
    }

    /// Forget a partner that stopped existing mid-tick
    pub fn remove_colliding(&mut self, other: Entity) {
        self.colliding.retain(|&partner| partner != other);
        if self.colliding.is_empty() {
            self.color = Self::idle_color();
        }
    }
}

/// Collider errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColliderError {
    /// A hull face references a point that does not exist
    #[error("hull face {face} references point {index}, but the hull has {point_count} points")]
    InvalidFaceIndex {
        /// Face position in the face list
        face: usize,
        /// Offending point index
        index: usize,
        /// Number of points in the hull
        point_count: usize,
    },

    /// A hull face has no point indices
    #[error("hull face {face} has no points")]
    EmptyFace {
        /// Face position in the face list
        face: usize,
    },

    /// Payload pool failure
    #[error("collider pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Borrowed world-space payload of any variant
#[derive(Debug, Clone, Copy)]
pub enum ShapeRef<'a> {
    /// World-space sphere
    Sphere(&'a Sphere),
    /// World-space box
    Aabb(&'a AABB),
    /// World-space hull
    ConvexHull(&'a ConvexHull),
    /// World-space ray
    Ray(&'a Ray),
}

impl ShapeRef<'_> {
    /// Variant of the payload
    pub fn kind(&self) -> ColliderKind {
        match self {
            Self::Sphere(_) => ColliderKind::Sphere,
            Self::Aabb(_) => ColliderKind::Aabb,
            Self::ConvexHull(_) => ColliderKind::ConvexHull,
            Self::Ray(_) => ColliderKind::Ray,
        }
    }

    /// Broad-phase bounds; `None` for rays
    pub fn bounds(&self) -> Option<AABB> {
        match self {
            Self::Sphere(sphere) => sphere.world_bounds(),
            Self::Aabb(aabb) => aabb.world_bounds(),
            Self::ConvexHull(hull) => hull.world_bounds(),
            Self::Ray(ray) => ray.world_bounds(),
        }
    }

    /// Test if this shape intersects with another shape
    pub fn intersects(&self, other: &ShapeRef<'_>) -> bool {
        intersection::shapes_intersect(self, other)
    }

    /// Distance along `ray` to this shape, if hit
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        intersection::ray_distance(ray, self)
    }

    /// Points of this shape furthest along `direction`. Spheres and boxes
    /// return a single support point; rays have none.
    pub fn support_points(&self, direction: &Vec3, tolerance: f32) -> Vec<Vec3> {
        match self {
            Self::Sphere(sphere) => {
                let offset = direction.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
                vec![sphere.center + offset * sphere.radius]
            }
            Self::Aabb(aabb) => {
                ConvexHull::furthest_points_with_tolerance(&aabb.corners(), direction, tolerance)
            }
            Self::ConvexHull(hull) => {
                ConvexHull::furthest_points_with_tolerance(hull.points(), direction, tolerance)
            }
            Self::Ray(_) => Vec::new(),
        }
    }
}
