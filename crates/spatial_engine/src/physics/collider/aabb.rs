//! Axis-aligned bounding boxes
//!
//! Used both as a collider variant and as the region type of octree nodes.

use super::{ColliderKind, ColliderShape};
use crate::foundation::math::{utils, Frame, Vec3};

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AABB {
    /// Minimum corner (left, bottom, back)
    pub min: Vec3,
    /// Maximum corner (right, top, front)
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given half-extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Symmetric cube `[-half_extent, half_extent]` on every axis
    pub fn cube(half_extent: f32) -> Self {
        let extents = Vec3::new(half_extent, half_extent, half_extent);
        Self::from_center_extents(Vec3::zeros(), extents)
    }

    /// Set the corners, ordering each axis so that `min <= max`
    pub fn initialize(&mut self, a: Vec3, b: Vec3) {
        self.min = a.inf(&b);
        self.max = a.sup(&b);
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// One of the eight equal octants. Bit 0 selects +X, bit 1 +Y, bit 2 +Z.
    pub fn octant(&self, index: usize) -> Self {
        let center = self.center();
        let pick = |bit: usize, lo: f32, mid: f32, hi: f32| {
            if index & bit != 0 {
                (mid, hi)
            } else {
                (lo, mid)
            }
        };

        let (min_x, max_x) = pick(1, self.min.x, center.x, self.max.x);
        let (min_y, max_y) = pick(2, self.min.y, center.y, self.max.y);
        let (min_z, max_z) = pick(4, self.min.z, center.z, self.max.z);

        Self::new(Vec3::new(min_x, min_y, min_z), Vec3::new(max_x, max_y, max_z))
    }

    /// The eight corner points
    pub fn corners(&self) -> [Vec3; 8] {
        let mut corners = [Vec3::zeros(); 8];
        for (index, corner) in corners.iter_mut().enumerate() {
            *corner = Vec3::new(
                if index & 1 != 0 { self.max.x } else { self.min.x },
                if index & 2 != 0 { self.max.y } else { self.min.y },
                if index & 4 != 0 { self.max.z } else { self.min.z },
            );
        }
        corners
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB (touching counts)
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Check if `other` lies entirely inside this AABB (shared faces allowed)
    pub fn contains(&self, other: &AABB) -> bool {
        self.min.x <= other.min.x && self.max.x >= other.max.x &&
        self.min.y <= other.min.y && self.max.y >= other.max.y &&
        self.min.z <= other.min.z && self.max.z >= other.max.z
    }

    /// Point inside the box closest to `point`
    pub fn closest_point(&self, point: &Vec3) -> Vec3 {
        Vec3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        )
    }

    /// Test ray intersection with this AABB using slab method
    /// Returns the distance to the entry point if the ray intersects, None otherwise
    /// Based on "An Efficient and Robust Ray–Box Intersection Algorithm"
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let inv_dir = Vec3::new(
            if ray_dir.x != 0.0 { 1.0 / ray_dir.x } else { f32::INFINITY },
            if ray_dir.y != 0.0 { 1.0 / ray_dir.y } else { f32::INFINITY },
            if ray_dir.z != 0.0 { 1.0 / ray_dir.z } else { f32::INFINITY },
        );

        let t1 = (self.min.x - ray_origin.x) * inv_dir.x;
        let t2 = (self.max.x - ray_origin.x) * inv_dir.x;
        let t3 = (self.min.y - ray_origin.y) * inv_dir.y;
        let t4 = (self.max.y - ray_origin.y) * inv_dir.y;
        let t5 = (self.min.z - ray_origin.z) * inv_dir.z;
        let t6 = (self.max.z - ray_origin.z) * inv_dir.z;

        // 0 * inf yields NaN for an origin on a slab plane of a parallel axis;
        // f32::min/max ignore NaN, which treats that slab as unbounded.
        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        // Ray intersects if tmax >= tmin and tmax >= 0
        if tmax >= tmin && tmax >= 0.0 {
            // Return entry point distance (or 0 if we're inside the box)
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

impl ColliderShape for AABB {
    const KIND: ColliderKind = ColliderKind::Aabb;

    /// Half-extents are scaled per axis and the box is re-centered on the
    /// frame-transformed centroid. The box itself is never rotated, so it
    /// stays axis-aligned.
    fn to_world_space(&self, frame: &Frame, dest: &mut Self) {
        let center = frame.transform_point(&self.center());
        let extents = self.extents().component_mul(&utils::abs(&frame.scale));
        *dest = Self::from_center_extents(center, extents);
    }

    fn world_bounds(&self) -> Option<AABB> {
        Some(*self)
    }
}
