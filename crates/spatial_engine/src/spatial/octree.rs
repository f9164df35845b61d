//! Octree spatial partitioning structure
//!
//! Divides a fixed world cube into hierarchical regions. A leaf splits into
//! 8 equal octants once it holds more than `max_occupancy` objects, unless it
//! already sits at `max_depth`. Objects are stored by reference in every leaf
//! whose region they overlap, so a large or straddling object can live in
//! several leaves at once.
//!
//! Nodes live in an arena and refer to their parent and children by
//! [`NodeId`]. Collapsed subtrees return their slots to a free list that
//! later subdivisions reuse.

use super::containment::{classify, Containment};
use crate::ecs::Entity;
use crate::foundation::math::Vec3;
use crate::physics::collider::AABB;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::BuildHasher;

/// Configuration for octree behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Objects per leaf before subdivision (soft bound at `max_depth`)
    pub max_occupancy: usize,

    /// Maximum subdivision depth (root is depth 0)
    pub max_depth: u32,

    /// Half extent of the symmetric world cube covered by the root
    pub world_half_extent: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_occupancy: 3,
            max_depth: 3,
            world_half_extent: 100.0,
        }
    }
}

impl OctreeConfig {
    /// Bounds of the root node
    pub fn world_bounds(&self) -> AABB {
        AABB::cube(self.world_half_extent)
    }
}

/// Source of the current world-space bounds of indexed objects
pub trait BoundsLookup {
    /// Axis-aligned world bounds of `entity`, or `None` if it has none
    fn bounds_of(&self, entity: Entity) -> Option<AABB>;
}

impl<S: BuildHasher> BoundsLookup for HashMap<Entity, AABB, S> {
    fn bounds_of(&self, entity: Entity) -> Option<AABB> {
        self.get(&entity).copied()
    }
}

/// Index of a node in the octree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena slot backing this id
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode {
    bounds: AABB,
    depth: u32,
    parent: Option<NodeId>,
    children: Option<[NodeId; 8]>,
    occupants: Vec<Entity>,
    live: bool,
}

impl OctreeNode {
    fn new(bounds: AABB, depth: u32, parent: Option<NodeId>) -> Self {
        Self {
            bounds,
            depth,
            parent,
            children: None,
            occupants: Vec::new(),
            live: true,
        }
    }

    /// World-space bounds of this node
    pub fn bounds(&self) -> &AABB {
        &self.bounds
    }

    /// Depth in the tree (0 = root)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Parent node, `None` at the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in octant order, `None` for a leaf
    pub fn children(&self) -> Option<&[NodeId; 8]> {
        self.children.as_ref()
    }

    /// Objects stored in this leaf. Always empty for internal nodes.
    pub fn occupants(&self) -> &[Entity] {
        &self.occupants
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Leaf without occupants
    pub fn is_empty_leaf(&self) -> bool {
        self.is_leaf() && self.occupants.is_empty()
    }
}

/// Octree spatial partitioning structure
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    free: Vec<NodeId>,
    root: NodeId,
    config: OctreeConfig,
}

impl Octree {
    /// Create a tree whose root covers `config.world_bounds()`
    pub fn new(config: OctreeConfig) -> Self {
        let root = OctreeNode::new(config.world_bounds(), 0, None);
        Self {
            nodes: vec![root],
            free: Vec::new(),
            root: NodeId(0),
            config,
        }
    }

    /// Configuration the tree was built with
    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// The root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// A live node
    pub fn node(&self, id: NodeId) -> Option<&OctreeNode> {
        self.nodes.get(id.0).filter(|node| node.live)
    }

    /// Bounds of a node
    pub fn bounds(&self, id: NodeId) -> AABB {
        self.nodes[id.0].bounds
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Children of a node, `None` for a leaf
    pub fn children(&self, id: NodeId) -> Option<[NodeId; 8]> {
        self.nodes[id.0].children
    }

    /// Whether `id` is a leaf
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].is_leaf()
    }

    /// Occupants of a leaf
    pub fn occupants(&self, id: NodeId) -> &[Entity] {
        &self.nodes[id.0].occupants
    }

    /// Classify `bounds` against a node's region
    pub fn classify(&self, id: NodeId, bounds: &AABB) -> Containment {
        classify(&self.nodes[id.0].bounds, bounds)
    }

    /// Whether a leaf may take one more occupant without splitting
    pub fn has_capacity(&self, leaf: NodeId) -> bool {
        let node = &self.nodes[leaf.0];
        node.occupants.len() < self.config.max_occupancy || node.depth >= self.config.max_depth
    }

    /// Live nodes reachable from the root, depth first in octant order
    pub fn nodes(&self) -> Vec<(NodeId, &OctreeNode)> {
        let mut result = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            result.push((id, node));
            if let Some(children) = node.children {
                stack.extend(children.iter().rev());
            }
        }
        result
    }

    /// Leaf nodes, depth first in octant order
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes()
            .into_iter()
            .filter(|(_, node)| node.is_leaf())
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Deepest level currently present
    pub fn max_depth_reached(&self) -> u32 {
        self.nodes().iter().map(|(_, node)| node.depth).max().unwrap_or(0)
    }

    /// Number of (leaf, object) memberships
    pub fn occupancy_count(&self) -> usize {
        self.nodes().iter().map(|(_, node)| node.occupants.len()).sum()
    }

    /// Append to a leaf, rejecting duplicates. Returns whether it was added.
    pub(crate) fn add_occupant(&mut self, leaf: NodeId, entity: Entity) -> bool {
        let occupants = &mut self.nodes[leaf.0].occupants;
        if occupants.contains(&entity) {
            return false;
        }
        occupants.push(entity);
        true
    }

    /// Remove from a leaf's occupancy list. Returns whether it was present.
    pub(crate) fn remove_occupant(&mut self, leaf: NodeId, entity: Entity) -> bool {
        let occupants = &mut self.nodes[leaf.0].occupants;
        match occupants.iter().position(|&e| e == entity) {
            Some(index) => {
                occupants.remove(index);
                true
            }
            None => false,
        }
    }

    /// Turn a leaf into an internal node with 8 equal-octant children and
    /// hand back its former occupants for redistribution.
    pub(crate) fn subdivide(&mut self, leaf: NodeId) -> Vec<Entity> {
        let (bounds, depth) = {
            let node = &self.nodes[leaf.0];
            (node.bounds, node.depth)
        };

        let mut children = [leaf; 8];
        for (octant, child) in children.iter_mut().enumerate() {
            *child = self.allocate(OctreeNode::new(bounds.octant(octant), depth + 1, Some(leaf)));
        }

        let node = &mut self.nodes[leaf.0];
        node.children = Some(children);
        let occupants = std::mem::take(&mut node.occupants);

        log::debug!(
            "Subdivided {} at depth {} ({} occupants to redistribute)",
            leaf,
            depth,
            occupants.len()
        );
        occupants
    }

    fn allocate(&mut self, node: OctreeNode) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0];
        node.live = false;
        node.children = None;
        node.occupants.clear();
        node.parent = None;
        self.free.push(id);
    }

    /// Walk parent links starting at `from` until a node fully contains
    /// `bounds`. `None` means the object has left the indexed world.
    pub fn search_upward(&self, from: Option<NodeId>, bounds: &AABB) -> Option<NodeId> {
        let mut current = from;
        while let Some(id) = current {
            if self.classify(id, bounds) == Containment::Contained {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// Insert without logging, starting at the root. Occupants displaced by
    /// a subdivision are re-placed with their bounds from `lookup`. Returns
    /// false if the object does not touch the world.
    pub fn insert(&mut self, entity: Entity, bounds: &AABB, lookup: &impl BoundsLookup) -> bool {
        if self.classify(self.root, bounds) == Containment::Disjoint {
            return false;
        }
        self.insert_below(self.root, entity, bounds, lookup);
        true
    }

    fn insert_below(&mut self, node: NodeId, entity: Entity, bounds: &AABB, lookup: &impl BoundsLookup) {
        if let Some(children) = self.children(node) {
            for child in children {
                match self.classify(child, bounds) {
                    Containment::Disjoint => {}
                    Containment::Overlapping => self.insert_below(child, entity, bounds, lookup),
                    Containment::Contained => {
                        self.insert_below(child, entity, bounds, lookup);
                        break;
                    }
                }
            }
            return;
        }

        if self.has_capacity(node) {
            self.add_occupant(node, entity);
            return;
        }

        for occupant in self.subdivide(node) {
            if let Some(occupant_bounds) = lookup.bounds_of(occupant) {
                if self.classify(node, &occupant_bounds) != Containment::Disjoint {
                    self.insert_below(node, occupant, &occupant_bounds, lookup);
                }
            }
        }
        self.insert_below(node, entity, bounds, lookup);
    }

    /// Remove an object from every leaf the classifier leads to for
    /// `bounds`. Returns how many leaves held it.
    pub fn remove(&mut self, entity: Entity, bounds: &AABB) -> usize {
        self.remove_below(self.root, entity, bounds)
    }

    fn remove_below(&mut self, node: NodeId, entity: Entity, bounds: &AABB) -> usize {
        let Some(children) = self.children(node) else {
            return usize::from(self.remove_occupant(node, entity));
        };

        let mut removed = 0;
        for child in children {
            match self.classify(child, bounds) {
                Containment::Disjoint => {}
                Containment::Overlapping => removed += self.remove_below(child, entity, bounds),
                Containment::Contained => {
                    removed += self.remove_below(child, entity, bounds);
                    break;
                }
            }
        }
        removed
    }

    /// Collapse every internal node whose 8 children are all empty leaves
    /// (`PruneEmptySubtrees`). Runs bottom-up, so a whole empty subtree
    /// folds in one call. Returns the number of collapsed nodes.
    pub fn prune_empty_subtrees(&mut self) -> usize {
        let collapsed = self.prune_below(self.root);
        if collapsed > 0 {
            log::debug!("Pruned {} empty subtrees, {} nodes live", collapsed, self.node_count());
        }
        collapsed
    }

    fn prune_below(&mut self, node: NodeId) -> usize {
        let Some(children) = self.children(node) else {
            return 0;
        };

        let mut collapsed = 0;
        for child in children {
            collapsed += self.prune_below(child);
        }

        if children.iter().all(|child| self.nodes[child.0].is_empty_leaf()) {
            self.collapse(node);
            collapsed += 1;
        }
        collapsed
    }

    /// Free a node's children, turning it back into a leaf. Occupants of
    /// the children are discarded; callers move them first.
    pub(crate) fn collapse(&mut self, node: NodeId) {
        if let Some(children) = self.nodes[node.0].children.take() {
            for child in children {
                self.release(child);
            }
        }
    }

    /// Every unordered pair of objects sharing at least one leaf, each pair
    /// once as `(lower, higher)`, sorted.
    pub fn candidate_pairs(&self) -> Vec<(Entity, Entity)> {
        let mut pairs = BTreeSet::new();
        for leaf in self.leaves() {
            let occupants = self.occupants(leaf);
            for (i, &a) in occupants.iter().enumerate() {
                for &b in &occupants[i + 1..] {
                    pairs.insert((a.min(b), a.max(b)));
                }
            }
        }
        pairs.into_iter().collect()
    }

    /// Objects stored in leaves whose region the ray passes through, sorted
    pub fn query_ray(&self, origin: Vec3, direction: Vec3) -> Vec<Entity> {
        let mut found = BTreeSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.bounds.intersect_ray(origin, direction).is_none() {
                continue;
            }
            match node.children {
                Some(children) => stack.extend(children),
                None => found.extend(node.occupants.iter().copied()),
            }
        }
        found.into_iter().collect()
    }

    /// Objects stored in leaves overlapping `region`, sorted
    pub fn query_region(&self, region: &AABB) -> Vec<Entity> {
        let mut found = BTreeSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if classify(&node.bounds, region) == Containment::Disjoint {
                continue;
            }
            match node.children {
                Some(children) => stack.extend(children),
                None => found.extend(node.occupants.iter().copied()),
            }
        }
        found.into_iter().collect()
    }

    /// Leaves currently holding `entity`
    pub fn find_entity(&self, entity: Entity) -> Vec<NodeId> {
        self.leaves()
            .into_iter()
            .filter(|&leaf| self.occupants(leaf).contains(&entity))
            .collect()
    }
}
