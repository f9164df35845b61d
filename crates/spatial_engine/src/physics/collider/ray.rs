//! Ray collider payload

use super::{ColliderKind, ColliderShape, AABB};
use crate::foundation::math::{Frame, Vec3};

/// A ray: origin and direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray
    pub origin: Vec3,
    /// The direction of the ray (normalized by [`Ray::new`])
    pub direction: Vec3,
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vec3::zeros(),
            direction: Vec3::z(),
        }
    }
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        let mut ray = Self::default();
        ray.initialize(origin, direction);
        ray
    }

    /// Overwrite the payload. A zero direction is kept as-is and never hits.
    pub fn initialize(&mut self, origin: Vec3, direction: Vec3) {
        self.origin = origin;
        self.direction = direction.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance to the first point inside the box, if any
    pub fn intersect_aabb(&self, aabb: &AABB) -> Option<f32> {
        if self.direction == Vec3::zeros() {
            return aabb.contains_point(self.origin).then_some(0.0);
        }
        aabb.intersect_ray(self.origin, self.direction)
    }
}

impl ColliderShape for Ray {
    const KIND: ColliderKind = ColliderKind::Ray;

    fn to_world_space(&self, frame: &Frame, dest: &mut Self) {
        dest.origin = frame.transform_point(&self.origin);
        dest.direction = frame.rotate(&self.direction);
    }

    /// Rays are unbounded and never stored in the index
    fn world_bounds(&self) -> Option<AABB> {
        None
    }
}
