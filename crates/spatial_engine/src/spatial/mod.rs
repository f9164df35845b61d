//! Broad phase: octree, membership log and the containment classifier
//!
//! The [`SpatialIndex`] is the entry point used by the collision system; the
//! bare [`Octree`] is usable on its own when no per-tick update is needed.

mod containment;
mod index;
mod membership;
mod octree;

pub use containment::{classify, classify_shape, contains, overlaps, Containment};
pub use index::{InconsistencyError, IndexEvent, SpatialIndex, UpdateReport};
pub use membership::{LogEntry, MembershipLog};
pub use octree::{BoundsLookup, NodeId, Octree, OctreeConfig, OctreeNode};
