//! Logged octree index
//!
//! [`SpatialIndex`] pairs the [`Octree`] with a [`MembershipLog`] and keeps
//! them in step: an object is stored in a leaf exactly when the object's log
//! has a row for that leaf. All structural changes go through this type so
//! that the two never drift apart.
//!
//! Per tick, [`SpatialIndex::update_all`] re-classifies every logged row
//! against the object's current bounds and repairs only what changed, rather
//! than rebuilding the tree.

use super::containment::Containment;
use super::membership::{LogEntry, MembershipLog};
use super::octree::{BoundsLookup, NodeId, Octree, OctreeConfig};
use crate::ecs::Entity;
use crate::foundation::math::Vec3;
use crate::physics::collider::AABB;
use thiserror::Error;

/// Something the index did that the simulation may want to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexEvent {
    /// The object is no longer fully inside the world and was dropped from
    /// the index. It stays a live entity.
    LeftBounds(Entity),
    /// A previously dropped object is fully inside the world again and was
    /// re-indexed
    Reentered(Entity),
}

/// Summary of one [`SpatialIndex::update_all`] pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    /// Objects examined
    pub processed: usize,
    /// Log rows whose status changed
    pub status_changes: usize,
    /// Upward searches triggered by a status change
    pub relocations: usize,
    /// Events raised since the previous report
    pub events: Vec<IndexEvent>,
}

impl UpdateReport {
    /// Objects that left the world during the pass
    pub fn left_bounds(&self) -> impl Iterator<Item = Entity> + '_ {
        self.events.iter().filter_map(|event| match event {
            IndexEvent::LeftBounds(entity) => Some(*entity),
            IndexEvent::Reentered(_) => None,
        })
    }
}

/// A violation of the tree/log agreement
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InconsistencyError {
    /// A leaf stores an object that has no log row for it
    #[error("{entity} occupies {node} but has no log row for it")]
    OccupantNotLogged {
        /// Object
        entity: Entity,
        /// Leaf
        node: NodeId,
    },

    /// A log row names a leaf that does not store the object
    #[error("{entity} is logged in {node} but is not stored there")]
    LoggedNotOccupant {
        /// Object
        entity: Entity,
        /// Leaf
        node: NodeId,
    },

    /// A log row names a node that is freed or internal
    #[error("{entity} is logged in {node}, which is not a live leaf")]
    LoggedNodeNotLeaf {
        /// Object
        entity: Entity,
        /// Node
        node: NodeId,
    },

    /// An object is stored twice in one leaf
    #[error("{entity} is stored twice in {node}")]
    DuplicateOccupant {
        /// Object
        entity: Entity,
        /// Leaf
        node: NodeId,
    },

    /// An object has two log rows for one leaf
    #[error("{entity} has two log rows for {node}")]
    DuplicateLogEntry {
        /// Object
        entity: Entity,
        /// Leaf
        node: NodeId,
    },

    /// An internal node holds occupants
    #[error("internal {node} holds occupants")]
    InternalNodeOccupied {
        /// Node
        node: NodeId,
    },

    /// A logged status disagrees with the classifier
    #[error("{entity} is logged {logged} in {node} but classifies {actual}")]
    StatusMismatch {
        /// Object
        entity: Entity,
        /// Leaf
        node: NodeId,
        /// Status in the log
        logged: Containment,
        /// Status from the current bounds
        actual: Containment,
    },
}

/// Octree plus membership log
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    tree: Octree,
    log: MembershipLog,
    events: Vec<IndexEvent>,
}

impl SpatialIndex {
    /// Create an empty index over `config.world_bounds()`
    pub fn new(config: OctreeConfig) -> Self {
        Self {
            tree: Octree::new(config),
            log: MembershipLog::new(),
            events: Vec::new(),
        }
    }

    /// The tree, read-only
    pub fn tree(&self) -> &Octree {
        &self.tree
    }

    /// The membership log, read-only
    pub fn log(&self) -> &MembershipLog {
        &self.log
    }

    /// Whether `entity` is stored anywhere in the tree
    pub fn is_indexed(&self, entity: Entity) -> bool {
        self.log.contains(entity)
    }

    /// Take the events raised since the last call or update pass
    pub fn drain_events(&mut self) -> Vec<IndexEvent> {
        std::mem::take(&mut self.events)
    }

    /// Insert an object from the root, logging every leaf it lands in
    /// (`InsertAndLog`). Returns the object's classification against the
    /// root; nothing is stored when that is `Disjoint` or the object has no
    /// bounds.
    pub fn insert_and_log(&mut self, entity: Entity, lookup: &impl BoundsLookup) -> Containment {
        let Some(bounds) = lookup.bounds_of(entity) else {
            return Containment::Disjoint;
        };

        let root = self.tree.root();
        let status = self.tree.classify(root, &bounds);
        if status == Containment::Disjoint {
            log::info!("{} lies outside the world bounds and was not indexed", entity);
            return status;
        }

        self.insert_below(root, entity, &bounds, lookup);
        status
    }

    /// Remove an object from the tree and delete its log (`RemoveAndUnlog`).
    /// Returns whether it was indexed.
    pub fn remove_and_unlog(&mut self, entity: Entity, lookup: &impl BoundsLookup) -> bool {
        if let Some(bounds) = lookup.bounds_of(entity) {
            self.tree.remove(entity, &bounds);
        }

        // Rows left behind by stale bounds are swept through the log
        match self.log.remove_entry(entity) {
            Some(entries) => {
                for entry in entries {
                    self.tree.remove_occupant(entry.node, entity);
                }
                true
            }
            None => false,
        }
    }

    /// Re-classify every row of every object in `entities` (in the given
    /// order, normally pool-slot order) and repair the tree where a status
    /// changed (`UpdateAll`). Objects that are not indexed but lie fully
    /// inside the world are inserted again.
    pub fn update_all<I>(&mut self, entities: I, lookup: &impl BoundsLookup) -> UpdateReport
    where
        I: IntoIterator<Item = Entity>,
    {
        let mut report = UpdateReport::default();

        for entity in entities {
            let Some(bounds) = lookup.bounds_of(entity) else {
                continue;
            };
            report.processed += 1;

            let Some(entries) = self.log.lookup(entity).map(<[LogEntry]>::to_vec) else {
                self.try_reenter(entity, &bounds, lookup);
                continue;
            };

            for entry in entries {
                // Earlier repairs of this object may already have dropped the row
                let Some(logged) = self.log.status_of(entity, entry.node) else {
                    continue;
                };

                // A Disjoint row is never valid, even when it still classifies that way
                let status = self.tree.classify(entry.node, &bounds);
                if status == logged && status != Containment::Disjoint {
                    continue;
                }

                log::trace!("{} in {}: {} -> {}", entity, entry.node, logged, status);
                report.status_changes += 1;

                match status {
                    Containment::Disjoint => {
                        self.tree.remove_occupant(entry.node, entity);
                        self.log.forget(entity, entry.node);
                        report.relocations += 1;
                        self.relocate(entity, self.tree.parent(entry.node), &bounds, lookup);
                    }
                    Containment::Overlapping => {
                        self.log.record(entity, entry.node, status);
                        report.relocations += 1;
                        self.relocate(entity, self.tree.parent(entry.node), &bounds, lookup);
                    }
                    Containment::Contained => {
                        self.log.record(entity, entry.node, status);
                    }
                }
            }

            self.rediscover(entity, &bounds, lookup);
        }

        report.events = self.drain_events();
        report
    }

    /// Collapse internal nodes whose children are all leaves holding no more
    /// than `max_occupancy` distinct objects between them, moving those
    /// objects and their log rows up into the parent. Empty subtrees are the
    /// common case. Returns the number of collapsed nodes.
    ///
    /// Moved rows are classified against the parent with the bounds from
    /// `lookup`. An object without bounds keeps the strongest status any of
    /// its child rows had.
    pub fn prune(&mut self, lookup: &impl BoundsLookup) -> usize {
        let collapsed = self.prune_below(self.tree.root(), lookup);
        if collapsed > 0 {
            log::debug!("Collapsed {} subtrees, {} nodes live", collapsed, self.tree.node_count());
        }
        collapsed
    }

    /// Every unordered pair of objects sharing a leaf, each pair once
    pub fn candidate_pairs(&self) -> Vec<(Entity, Entity)> {
        self.tree.candidate_pairs()
    }

    /// Objects stored in leaves the ray passes through
    pub fn query_ray(&self, origin: Vec3, direction: Vec3) -> Vec<Entity> {
        self.tree.query_ray(origin, direction)
    }

    /// Objects stored in leaves overlapping `region`
    pub fn query_region(&self, region: &AABB) -> Vec<Entity> {
        self.tree.query_region(region)
    }

    /// Verify that every stored object is logged for its leaf and every log
    /// row names a live leaf that stores the object
    pub fn check_consistency(&self) -> Result<(), InconsistencyError> {
        for (node, data) in self.tree.nodes() {
            let occupants = data.occupants();
            if !data.is_leaf() && !occupants.is_empty() {
                return Err(InconsistencyError::InternalNodeOccupied { node });
            }

            for (i, &entity) in occupants.iter().enumerate() {
                if occupants[..i].contains(&entity) {
                    return Err(InconsistencyError::DuplicateOccupant { entity, node });
                }
                if self.log.status_of(entity, node).is_none() {
                    return Err(InconsistencyError::OccupantNotLogged { entity, node });
                }
            }
        }

        for (entity, entries) in self.log.iter() {
            for (i, entry) in entries.iter().enumerate() {
                let node = entry.node;
                if entries[..i].iter().any(|earlier| earlier.node == node) {
                    return Err(InconsistencyError::DuplicateLogEntry { entity, node });
                }
                match self.tree.node(node) {
                    Some(data) if data.is_leaf() => {
                        if !data.occupants().contains(&entity) {
                            return Err(InconsistencyError::LoggedNotOccupant { entity, node });
                        }
                    }
                    _ => return Err(InconsistencyError::LoggedNodeNotLeaf { entity, node }),
                }
            }
        }

        Ok(())
    }

    /// Verify that every logged status matches the classifier for the
    /// object's current bounds
    pub fn check_statuses(&self, lookup: &impl BoundsLookup) -> Result<(), InconsistencyError> {
        for (entity, entries) in self.log.iter() {
            let Some(bounds) = lookup.bounds_of(entity) else {
                continue;
            };
            for entry in entries {
                let actual = self.tree.classify(entry.node, &bounds);
                if actual != entry.status {
                    return Err(InconsistencyError::StatusMismatch {
                        entity,
                        node: entry.node,
                        logged: entry.status,
                        actual,
                    });
                }
            }
        }
        Ok(())
    }

    fn insert_below(&mut self, node: NodeId, entity: Entity, bounds: &AABB, lookup: &impl BoundsLookup) {
        if let Some(children) = self.tree.children(node) {
            for child in children {
                match self.tree.classify(child, bounds) {
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

        let already_here = self.log.status_of(entity, node).is_some();
        if already_here || self.tree.has_capacity(node) {
            self.tree.add_occupant(node, entity);
            let status = self.tree.classify(node, bounds);
            self.log.record(entity, node, status);
            return;
        }

        self.split_and_redistribute(node, lookup);
        self.insert_below(node, entity, bounds, lookup);
    }

    /// Subdivide a full leaf and move each occupant's membership into the
    /// children. An occupant whose bounds changed since it was placed may no
    /// longer be fully inside the leaf; it is then searched upward like a
    /// status change in `update_all`.
    fn split_and_redistribute(&mut self, leaf: NodeId, lookup: &impl BoundsLookup) {
        let parent = self.tree.parent(leaf);

        for occupant in self.tree.subdivide(leaf) {
            let previous = self.log.forget(occupant, leaf);
            let Some(bounds) = lookup.bounds_of(occupant) else {
                log::warn!("{} has no bounds and was dropped from {}", occupant, leaf);
                continue;
            };

            let status = self.tree.classify(leaf, &bounds);
            if status != Containment::Disjoint {
                self.insert_below(leaf, occupant, &bounds, lookup);
            }

            let degraded = status == Containment::Disjoint
                || (status == Containment::Overlapping && previous == Some(Containment::Contained));
            if degraded {
                self.relocate(occupant, parent, &bounds, lookup);
            }
        }
    }

    /// `SearchUpward` from `start` and re-insert there, or drop the object
    /// from the index when no ancestor contains it
    fn relocate(&mut self, entity: Entity, start: Option<NodeId>, bounds: &AABB, lookup: &impl BoundsLookup) {
        match self.tree.search_upward(start, bounds) {
            Some(ancestor) => self.insert_below(ancestor, entity, bounds, lookup),
            None => self.drop_from_index(entity),
        }
    }

    fn drop_from_index(&mut self, entity: Entity) {
        if let Some(entries) = self.log.remove_entry(entity) {
            for entry in entries {
                self.tree.remove_occupant(entry.node, entity);
            }
        }
        log::info!("{} left the world bounds and was dropped from the index", entity);
        self.events.push(IndexEvent::LeftBounds(entity));
    }

    fn try_reenter(&mut self, entity: Entity, bounds: &AABB, lookup: &impl BoundsLookup) {
        let root = self.tree.root();
        if self.tree.classify(root, bounds) != Containment::Contained {
            return;
        }

        self.insert_below(root, entity, bounds, lookup);
        log::info!("{} re-entered the world bounds", entity);
        self.events.push(IndexEvent::Reentered(entity));
    }

    /// An object still overlapping its leaves may have spread into leaves it
    /// was never placed in. Re-insert it from the lowest ancestor that holds
    /// it whole; leaves it already occupies are left as they are.
    fn rediscover(&mut self, entity: Entity, bounds: &AABB, lookup: &impl BoundsLookup) {
        let straddled = self.log.lookup(entity).and_then(|entries| {
            entries
                .iter()
                .find(|entry| entry.status == Containment::Overlapping)
                .map(|entry| entry.node)
        });

        let Some(leaf) = straddled else {
            return;
        };
        if let Some(ancestor) = self.tree.search_upward(self.tree.parent(leaf), bounds) {
            self.insert_below(ancestor, entity, bounds, lookup);
        }
    }

    fn prune_below(&mut self, node: NodeId, lookup: &impl BoundsLookup) -> usize {
        let Some(children) = self.tree.children(node) else {
            return 0;
        };

        let mut collapsed = 0;
        for child in children {
            collapsed += self.prune_below(child, lookup);
        }
        if !children.iter().all(|&child| self.tree.is_leaf(child)) {
            return collapsed;
        }

        // Containment in any child implies containment in the parent
        let mut merged: Vec<(Entity, Containment)> = Vec::new();
        for child in children {
            for &entity in self.tree.occupants(child) {
                let status = self.log.status_of(entity, child).unwrap_or(Containment::Overlapping);
                match merged.iter_mut().find(|(seen, _)| *seen == entity) {
                    Some(slot) if status == Containment::Contained => slot.1 = status,
                    Some(_) => {}
                    None => merged.push((entity, status)),
                }
            }
        }
        if merged.len() > self.tree.config().max_occupancy {
            return collapsed;
        }

        for child in children {
            for entity in self.tree.occupants(child).to_vec() {
                self.log.forget(entity, child);
            }
        }
        self.tree.collapse(node);
        for (entity, merged_status) in merged {
            let Some(bounds) = lookup.bounds_of(entity) else {
                self.tree.add_occupant(node, entity);
                self.log.record(entity, node, merged_status);
                continue;
            };

            match self.tree.classify(node, &bounds) {
                // Moved away since the last update
                Containment::Disjoint => {
                    log::trace!("{} no longer touches collapsed {}", entity, node);
                    self.relocate(entity, self.tree.parent(node), &bounds, lookup);
                }
                status => {
                    self.tree.add_occupant(node, entity);
                    self.log.record(entity, node, status);
                }
            }
        }

        collapsed + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Harness {
        index: SpatialIndex,
        bounds: HashMap<Entity, AABB>,
    }

    impl Harness {
        fn new(config: OctreeConfig) -> Self {
            Self {
                index: SpatialIndex::new(config),
                bounds: HashMap::new(),
            }
        }

        fn add(&mut self, index: usize, center: Vec3, half: f32) -> Entity {
            let entity = Entity::from_index(index);
            self.bounds.insert(entity, cube(center, half));
            self.index.insert_and_log(entity, &self.bounds);
            self.assert_consistent();
            entity
        }

        fn move_to(&mut self, entity: Entity, center: Vec3, half: f32) {
            self.bounds.insert(entity, cube(center, half));
        }

        fn remove(&mut self, entity: Entity) -> bool {
            let removed = self.index.remove_and_unlog(entity, &self.bounds);
            self.bounds.remove(&entity);
            self.assert_consistent();
            removed
        }

        fn update(&mut self) -> UpdateReport {
            let mut entities: Vec<_> = self.bounds.keys().copied().collect();
            entities.sort();
            let report = self.index.update_all(entities, &self.bounds);
            self.assert_consistent();
            if let Err(err) = self.index.check_statuses(&self.bounds) {
                panic!("{}", err);
            }
            report
        }

        fn assert_consistent(&self) {
            if let Err(err) = self.index.check_consistency() {
                panic!("{}", err);
            }
        }

        fn rows(&self, entity: Entity) -> Vec<LogEntry> {
            self.index.log().lookup(entity).map(<[LogEntry]>::to_vec).unwrap_or_default()
        }

        fn child(&self, octant: usize) -> NodeId {
            let tree = self.index.tree();
            tree.children(tree.root()).unwrap()[octant]
        }
    }

    fn cube(center: Vec3, half: f32) -> AABB {
        AABB::from_center_extents(center, Vec3::new(half, half, half))
    }

    fn octant_center(octant: usize) -> Vec3 {
        let sign = |bit: usize| if octant & bit != 0 { 50.0 } else { -50.0 };
        Vec3::new(sign(1), sign(2), sign(4))
    }

    #[test]
    fn test_fourth_insert_subdivides_once() {
        let mut h = Harness::new(OctreeConfig::default());
        let octants = [0, 1, 2, 7];
        let entities: Vec<_> = octants
            .iter()
            .enumerate()
            .map(|(i, &octant)| h.add(i, octant_center(octant), 5.0))
            .collect();

        let tree = h.index.tree();
        assert!(!tree.is_leaf(tree.root()));
        assert!(tree.occupants(tree.root()).is_empty());
        assert_eq!(tree.node_count(), 9);
        assert_eq!(tree.max_depth_reached(), 1);

        for (entity, &octant) in entities.iter().zip(&octants) {
            let child = h.child(octant);
            assert_eq!(tree.occupants(child), &[*entity]);
            assert_eq!(
                h.rows(*entity),
                vec![LogEntry {
                    node: child,
                    status: Containment::Contained
                }]
            );
        }
    }

    #[test]
    fn test_contained_to_straddling_logs_both_siblings() {
        let mut h = Harness::new(OctreeConfig::default());
        let mover = h.add(0, octant_center(0), 5.0);
        for (i, octant) in [1, 2, 7].into_iter().enumerate() {
            h.add(i + 1, octant_center(octant), 5.0);
        }
        let a = h.child(0);
        let b = h.child(1);
        assert_eq!(h.index.log().status_of(mover, a), Some(Containment::Contained));

        // Slide onto the x = 0 plane shared by octants 0 and 1
        h.move_to(mover, Vec3::new(0.0, -50.0, -50.0), 5.0);
        let report = h.update();
        assert!(report.status_changes >= 1);

        let mut rows = h.rows(mover);
        rows.sort_by_key(|entry| entry.node);
        let mut expected = vec![
            LogEntry {
                node: a,
                status: Containment::Overlapping,
            },
            LogEntry {
                node: b,
                status: Containment::Overlapping,
            },
        ];
        expected.sort_by_key(|entry| entry.node);
        assert_eq!(rows, expected);
        assert!(h.index.tree().occupants(a).contains(&mover));
        assert!(h.index.tree().occupants(b).contains(&mover));

        // And back: contained in A again, gone from B
        h.move_to(mover, octant_center(0), 5.0);
        h.update();
        assert_eq!(
            h.rows(mover),
            vec![LogEntry {
                node: a,
                status: Containment::Contained
            }]
        );
        assert!(!h.index.tree().occupants(b).contains(&mover));
    }

    #[test]
    fn test_straddler_spreading_into_new_leaves_is_found() {
        let mut h = Harness::new(OctreeConfig::default());
        for (i, octant) in [4, 5, 6, 7].into_iter().enumerate() {
            h.add(i, octant_center(octant), 5.0);
        }
        let mover = h.add(10, Vec3::new(0.0, -50.0, -50.0), 5.0);
        assert_eq!(h.rows(mover).len(), 2);

        // Still overlapping octants 0 and 1, now also 2 and 3
        h.move_to(mover, Vec3::new(0.0, -3.0, -50.0), 5.0);
        h.update();

        let mut nodes: Vec<_> = h.rows(mover).iter().map(|entry| entry.node).collect();
        nodes.sort();
        let mut expected: Vec<_> = (0..4).map(|octant| h.child(octant)).collect();
        expected.sort();
        assert_eq!(nodes, expected);
    }

    #[test]
    fn test_leaving_world_raises_event_and_reentry_reindexes() {
        let mut h = Harness::new(OctreeConfig::default());
        let wanderer = h.add(0, Vec3::new(50.0, 50.0, 50.0), 1.0);
        let stay = h.add(1, Vec3::new(-50.0, 0.0, 0.0), 1.0);

        h.move_to(wanderer, Vec3::new(150.0, 0.0, 0.0), 1.0);
        let report = h.update();
        assert_eq!(report.left_bounds().collect::<Vec<_>>(), vec![wanderer]);
        assert!(!h.index.is_indexed(wanderer));
        assert!(h.index.is_indexed(stay));

        // Nothing more is reported while it stays outside
        assert!(h.update().events.is_empty());

        h.move_to(wanderer, Vec3::new(10.0, 10.0, 10.0), 1.0);
        let report = h.update();
        assert_eq!(report.events, vec![IndexEvent::Reentered(wanderer)]);
        assert!(h.index.is_indexed(wanderer));
    }

    #[test]
    fn test_partial_exit_drops_object() {
        let mut h = Harness::new(OctreeConfig::default());
        let edge = h.add(0, Vec3::new(90.0, 0.0, 0.0), 2.0);

        h.move_to(edge, Vec3::new(99.5, 0.0, 0.0), 2.0);
        let report = h.update();
        assert_eq!(report.events, vec![IndexEvent::LeftBounds(edge)]);
        assert!(h.index.tree().occupants(h.index.tree().root()).is_empty());
    }

    #[test]
    fn test_disjoint_object_is_not_indexed() {
        let mut h = Harness::new(OctreeConfig::default());
        let outside = h.add(0, Vec3::new(500.0, 0.0, 0.0), 1.0);
        assert!(!h.index.is_indexed(outside));
        assert_eq!(h.index.tree().occupancy_count(), 0);
    }

    #[test]
    fn test_insert_remove_round_trip_after_prune() {
        let mut h = Harness::new(OctreeConfig::default());
        for (i, octant) in [0, 1, 2].into_iter().enumerate() {
            h.add(i, octant_center(octant), 5.0);
        }
        let before_nodes = h.index.tree().node_count();
        let before_depth = h.index.tree().max_depth_reached();
        let mut before: Vec<_> = h.index.tree().occupants(h.index.tree().root()).to_vec();
        before.sort();

        let extra = h.add(3, octant_center(7), 5.0);
        assert_eq!(h.index.tree().node_count(), 9);

        assert!(h.remove(extra));
        assert_eq!(h.index.prune(&h.bounds), 1);
        h.assert_consistent();

        let tree = h.index.tree();
        let mut after: Vec<_> = tree.occupants(tree.root()).to_vec();
        after.sort();
        assert_eq!(tree.node_count(), before_nodes);
        assert_eq!(tree.max_depth_reached(), before_depth);
        assert_eq!(after, before);

        // Rows were moved up with the objects
        for entity in after {
            assert_eq!(
                h.rows(entity),
                vec![LogEntry {
                    node: tree.root(),
                    status: Containment::Contained
                }]
            );
        }
    }

    #[test]
    fn test_prune_relocates_object_that_moved_out_of_collapsed_node() {
        let mut h = Harness::new(OctreeConfig::default());
        let moved = h.add(0, Vec3::new(-75.0, -75.0, -75.0), 5.0);
        h.add(1, Vec3::new(-25.0, -75.0, -75.0), 5.0);
        h.add(2, Vec3::new(-75.0, -25.0, -75.0), 5.0);
        let last = h.add(3, Vec3::new(-25.0, -25.0, -25.0), 5.0);
        assert_eq!(h.index.tree().max_depth_reached(), 2);

        h.remove(last);
        // Into octant 6 with no update in between
        h.move_to(moved, octant_center(6), 5.0);

        assert_eq!(h.index.prune(&h.bounds), 2);
        h.assert_consistent();
        if let Err(err) = h.index.check_statuses(&h.bounds) {
            panic!("{}", err);
        }

        let tree = h.index.tree();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.find_entity(moved), vec![tree.root()]);
        assert_eq!(
            h.rows(moved),
            vec![LogEntry {
                node: tree.root(),
                status: Containment::Contained
            }]
        );
    }

    #[test]
    fn test_update_repairs_row_logged_disjoint() {
        let mut h = Harness::new(OctreeConfig::default());
        let stale = h.add(0, octant_center(0), 5.0);
        for (i, octant) in [1, 2, 7].into_iter().enumerate() {
            h.add(i + 1, octant_center(octant), 5.0);
        }
        let old_leaf = h.child(0);

        h.move_to(stale, octant_center(6), 5.0);
        h.index.log.record(stale, old_leaf, Containment::Disjoint);

        let report = h.update();
        assert_eq!(report.status_changes, 1);
        assert!(!h.index.tree().occupants(old_leaf).contains(&stale));
        assert_eq!(
            h.rows(stale),
            vec![LogEntry {
                node: h.child(6),
                status: Containment::Contained
            }]
        );
    }

    #[test]
    fn test_remove_sweeps_rows_left_by_stale_bounds() {
        let mut h = Harness::new(OctreeConfig::default());
        for (i, octant) in [0, 1, 2, 7].into_iter().enumerate() {
            h.add(i, octant_center(octant), 5.0);
        }
        let moved = Entity::from_index(0);

        // Moved but not yet updated: the classifier walk misses its leaf
        h.move_to(moved, octant_center(7), 5.0);
        assert!(h.remove(moved));
        assert!(h.index.tree().find_entity(moved).is_empty());
        assert!(!h.remove(moved));
    }

    #[test]
    fn test_split_relocates_stale_occupant() {
        let mut h = Harness::new(OctreeConfig::default());
        let drifting = h.add(0, Vec3::new(10.0, 10.0, 10.0), 1.0);
        h.add(1, octant_center(1), 1.0);
        h.add(2, octant_center(2), 1.0);

        // Drifts half outside the world before the next update
        h.move_to(drifting, Vec3::new(100.0, 10.0, 10.0), 1.0);
        h.add(3, octant_center(7), 1.0);

        assert!(!h.index.is_indexed(drifting));
        assert_eq!(h.index.drain_events(), vec![IndexEvent::LeftBounds(drifting)]);
    }

    #[test]
    fn test_log_matches_tree_through_many_ticks() {
        let mut h = Harness::new(OctreeConfig {
            max_occupancy: 2,
            max_depth: 3,
            world_half_extent: 100.0,
        });

        let count = 24;
        for i in 0..count {
            let angle = i as f32 * 0.7;
            h.add(i, Vec3::new(60.0 * angle.cos(), 40.0 * angle.sin(), (i as f32 - 12.0) * 6.0), 3.0 + (i % 4) as f32);
        }

        for tick in 1..40 {
            let t = tick as f32 * 0.15;
            for i in 0..count {
                let angle = i as f32 * 0.7 + t;
                let center = Vec3::new(
                    95.0 * angle.cos(),
                    70.0 * (angle * 1.3).sin(),
                    (i as f32 - 12.0) * 6.0 + 20.0 * t.sin(),
                );
                h.move_to(Entity::from_index(i), center, 3.0 + (i % 4) as f32);
            }
            h.update();

            if tick % 5 == 0 {
                h.index.prune(&h.bounds);
                h.assert_consistent();
                if let Err(err) = h.index.check_statuses(&h.bounds) {
                    panic!("{}", err);
                }
            }
        }

        let remaining: Vec<_> = h.bounds.keys().copied().collect();
        for entity in remaining {
            h.remove(entity);
        }
        h.index.prune(&h.bounds);
        assert_eq!(h.index.tree().node_count(), 1);
        assert!(h.index.log().is_empty());
    }
}
