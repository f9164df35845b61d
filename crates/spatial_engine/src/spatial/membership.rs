//! Per-object membership log
//!
//! Records, for every indexed object, which leaves hold it and how the object
//! classified against each of them when it was last placed or updated.

use super::containment::Containment;
use super::octree::NodeId;
use crate::ecs::Entity;
use std::collections::HashMap;

/// One (node, status) row of an object's log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogEntry {
    /// Leaf holding the object
    pub node: NodeId,
    /// Classification of the object against that leaf
    pub status: Containment,
}

/// Map from object identity to its log rows
#[derive(Debug, Clone, Default)]
pub struct MembershipLog {
    rows: HashMap<Entity, Vec<LogEntry>>,
}

impl MembershipLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows for `entity`, if it has any (`Lookup`)
    pub fn lookup(&self, entity: Entity) -> Option<&[LogEntry]> {
        self.rows.get(&entity).map(Vec::as_slice)
    }

    /// Rows for `entity`, created empty on first touch (`EnsureEntry`)
    pub fn ensure_entry(&mut self, entity: Entity) -> &mut Vec<LogEntry> {
        self.rows.entry(entity).or_default()
    }

    /// Drop every row for `entity` (`RemoveEntry`)
    pub fn remove_entry(&mut self, entity: Entity) -> Option<Vec<LogEntry>> {
        self.rows.remove(&entity)
    }

    /// Insert or update the row for `node`. Returns the previous status.
    pub fn record(&mut self, entity: Entity, node: NodeId, status: Containment) -> Option<Containment> {
        let entries = self.ensure_entry(entity);
        match entries.iter_mut().find(|entry| entry.node == node) {
            Some(entry) => Some(std::mem::replace(&mut entry.status, status)),
            None => {
                entries.push(LogEntry { node, status });
                None
            }
        }
    }

    /// Remove the row for `node`. An object left without rows loses its
    /// map entry as well.
    pub fn forget(&mut self, entity: Entity, node: NodeId) -> Option<Containment> {
        let entries = self.rows.get_mut(&entity)?;
        let index = entries.iter().position(|entry| entry.node == node)?;
        let removed = entries.remove(index);
        if entries.is_empty() {
            self.rows.remove(&entity);
        }
        Some(removed.status)
    }

    /// Logged status of `entity` in `node`
    pub fn status_of(&self, entity: Entity, node: NodeId) -> Option<Containment> {
        self.lookup(entity)?
            .iter()
            .find(|entry| entry.node == node)
            .map(|entry| entry.status)
    }

    /// Whether `entity` has at least one row
    pub fn contains(&self, entity: Entity) -> bool {
        self.rows.get(&entity).is_some_and(|entries| !entries.is_empty())
    }

    /// Logged objects, in no particular order
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.rows.keys().copied()
    }

    /// All (object, rows) pairs
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &[LogEntry])> {
        self.rows.iter().map(|(entity, entries)| (*entity, entries.as_slice()))
    }

    /// Number of logged objects
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether nothing is logged
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{Octree, OctreeConfig};

    fn two_nodes() -> (NodeId, NodeId) {
        let mut tree = Octree::new(OctreeConfig::default());
        tree.subdivide(tree.root());
        let children = tree.children(tree.root()).unwrap();
        (children[0], children[1])
    }

    #[test]
    fn test_record_updates_in_place() {
        let (a, b) = two_nodes();
        let entity = Entity::from_index(1);
        let mut log = MembershipLog::new();

        assert_eq!(log.record(entity, a, Containment::Contained), None);
        assert_eq!(log.record(entity, b, Containment::Overlapping), None);
        assert_eq!(log.record(entity, a, Containment::Overlapping), Some(Containment::Contained));

        assert_eq!(log.lookup(entity).unwrap().len(), 2);
        assert_eq!(log.status_of(entity, a), Some(Containment::Overlapping));
    }

    #[test]
    fn test_forget_last_row_drops_entry() {
        let (a, b) = two_nodes();
        let entity = Entity::from_index(2);
        let mut log = MembershipLog::new();
        log.record(entity, a, Containment::Overlapping);
        log.record(entity, b, Containment::Overlapping);

        assert_eq!(log.forget(entity, a), Some(Containment::Overlapping));
        assert!(log.contains(entity));
        assert_eq!(log.forget(entity, a), None);
        assert_eq!(log.forget(entity, b), Some(Containment::Overlapping));
        assert!(log.lookup(entity).is_none());
        assert!(log.is_empty());
    }

    #[test]
    fn test_ensure_and_remove_entry() {
        let entity = Entity::from_index(3);
        let mut log = MembershipLog::new();
        assert!(log.ensure_entry(entity).is_empty());
        assert!(!log.contains(entity));
        assert_eq!(log.len(), 1);

        assert_eq!(log.remove_entry(entity), Some(Vec::new()));
        assert!(log.remove_entry(entity).is_none());
    }
}
