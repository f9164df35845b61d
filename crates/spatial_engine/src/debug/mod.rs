//! Debug module for visualization and debugging tools
//!
//! Read-only walks over the index and colliders that produce plain data for a
//! renderer to draw. Run them between ticks, never during an update.

pub mod collision_debug;

pub use collision_debug::{
    collider_debug_views, octree_debug_boxes, ColliderDebugView, CollisionDebugColors, CollisionDebugVisualizer,
    DebugBox, DebugFrame,
};
