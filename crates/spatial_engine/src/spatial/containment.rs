//! Three-way containment classification of a shape against a region

use crate::physics::collider::{ShapeRef, AABB};
use std::fmt;

/// How a shape relates to a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Containment {
    /// No point in common
    Disjoint,
    /// Some but not all of the shape lies inside the region
    Overlapping,
    /// The whole shape lies inside the region (shared faces allowed)
    Contained,
}

impl fmt::Display for Containment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disjoint => "disjoint",
            Self::Overlapping => "overlapping",
            Self::Contained => "contained",
        };
        f.write_str(name)
    }
}

/// Closed-interval overlap on every axis
pub fn overlaps(region: &AABB, shape: &AABB) -> bool {
    (0..3).all(|axis| region.min[axis] <= shape.max[axis] && region.max[axis] >= shape.min[axis])
}

/// `shape` lies within `region` on every axis
pub fn contains(region: &AABB, shape: &AABB) -> bool {
    (0..3).all(|axis| region.min[axis] <= shape.min[axis] && region.max[axis] >= shape.max[axis])
}

/// Classify a shape's axis-aligned bounds against a region: broad reject
/// first, then the containment refinement.
pub fn classify(region: &AABB, shape: &AABB) -> Containment {
    if !overlaps(region, shape) {
        Containment::Disjoint
    } else if contains(region, shape) {
        Containment::Contained
    } else {
        Containment::Overlapping
    }
}

/// Classify a world-space collider. Hulls use their minimum enclosing box;
/// rays have no bounds and are always disjoint.
pub fn classify_shape(region: &AABB, shape: &ShapeRef<'_>) -> Containment {
    match shape.bounds() {
        Some(bounds) => classify(region, &bounds),
        None => Containment::Disjoint,
    }
}
