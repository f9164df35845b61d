//! Collision-specific debug visualization
//!
//! Turns the octree into one box per leaf and every collider into its debug
//! mesh handle, color and world bounds.

use crate::ecs::{Entity, World};
use crate::foundation::math::Vec4;
use crate::physics::collider::{Collider, ColliderKind, MeshHandle, AABB};
use crate::physics::collision_system::PhysicsCollisionSystem;
use crate::spatial::Octree;

/// Color scheme for collision visualization
#[derive(Clone, Debug)]
pub struct CollisionDebugColors {
    /// Leaves holding at least one object
    pub occupied_leaf: Vec4,

    /// Leaves holding nothing
    pub empty_leaf: Vec4,
}

impl Default for CollisionDebugColors {
    fn default() -> Self {
        Self {
            occupied_leaf: Vec4::new(1.0, 0.8, 0.0, 0.4), // Amber, semi-transparent
            empty_leaf: Vec4::new(0.5, 0.5, 0.5, 0.1),    // Grey, faint
        }
    }
}

/// One octree leaf as a wireframe box
#[derive(Debug, Clone, PartialEq)]
pub struct DebugBox {
    /// Region of the leaf
    pub bounds: AABB,
    /// Depth of the leaf, root = 0
    pub depth: u32,
    /// Whether the leaf holds any object
    pub occupied: bool,
    /// Draw color
    pub color: Vec4,
}

/// What the renderer needs to draw one collider
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderDebugView {
    /// Owning entity
    pub entity: Entity,
    /// Collider variant
    pub kind: ColliderKind,
    /// Mesh to draw, if the collider has one
    pub mesh: Option<MeshHandle>,
    /// Current color: red while touching something, green otherwise
    pub color: Vec4,
    /// World-space bounds; `None` for rays
    pub bounds: Option<AABB>,
}

/// Everything collected for one frame of debug drawing
#[derive(Debug, Clone, Default)]
pub struct DebugFrame {
    /// Octree leaves
    pub boxes: Vec<DebugBox>,
    /// Colliders
    pub colliders: Vec<ColliderDebugView>,
}

/// One box per leaf, depth first in octant order
pub fn octree_debug_boxes(tree: &Octree, colors: &CollisionDebugColors) -> Vec<DebugBox> {
    tree.nodes()
        .into_iter()
        .filter(|(_, node)| node.is_leaf())
        .map(|(_, node)| {
            let occupied = !node.occupants().is_empty();
            DebugBox {
                bounds: *node.bounds(),
                depth: node.depth(),
                occupied,
                color: if occupied { colors.occupied_leaf } else { colors.empty_leaf },
            }
        })
        .collect()
}

/// Debug view of every collider in slot order
pub fn collider_debug_views(system: &PhysicsCollisionSystem, world: &World) -> Vec<ColliderDebugView> {
    world
        .iter()
        .filter_map(|(entity, body)| body.collider.as_ref().map(|collider| (entity, collider)))
        .map(|(entity, collider): (Entity, &Collider)| ColliderDebugView {
            entity,
            kind: collider.kind(),
            mesh: collider.debug_mesh(),
            color: collider.color(),
            bounds: system.colliders().world_bounds(collider.handle()),
        })
        .collect()
}

/// Collision-specific debug visualizer
///
/// Collects the boxes and collider views the renderer draws after a tick.
#[derive(Debug, Clone)]
pub struct CollisionDebugVisualizer {
    colors: CollisionDebugColors,

    /// Include octree leaves
    pub show_tree: bool,

    /// Skip leaves holding nothing
    pub hide_empty_leaves: bool,

    /// Include colliders
    pub show_colliders: bool,
}

impl CollisionDebugVisualizer {
    /// Create a new collision debug visualizer
    pub fn new() -> Self {
        Self {
            colors: CollisionDebugColors::default(),
            show_tree: true,
            hide_empty_leaves: false,
            show_colliders: true,
        }
    }

    /// Set custom color scheme
    pub fn with_colors(mut self, colors: CollisionDebugColors) -> Self {
        self.colors = colors;
        self
    }

    /// Gather this frame's debug data
    pub fn collect(&self, system: &PhysicsCollisionSystem, world: &World) -> DebugFrame {
        let mut frame = DebugFrame::default();

        if self.show_tree {
            frame.boxes = octree_debug_boxes(system.index().tree(), &self.colors);
            if self.hide_empty_leaves {
                frame.boxes.retain(|debug_box| debug_box.occupied);
            }
        }
        if self.show_colliders {
            frame.colliders = collider_debug_views(system, world);
        }

        frame
    }
}

impl Default for CollisionDebugVisualizer {
    fn default() -> Self {
        Self::new()
    }
}
