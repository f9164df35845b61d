//! Fixed-slot object pools
//!
//! Stable-identity storage with O(1) allocate and release. Released ids are
//! queued and handed out again (oldest first) before the backing store grows,
//! so an id stays valid for exactly as long as its slot is allocated.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Integer handle into an [`ObjectPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(usize);

impl PoolId {
    /// Create an id from a raw slot index
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Slot index backing this id
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Pool sizing behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Slots reserved up front
    pub initial_capacity: usize,

    /// Capacity multiplier applied whenever the pool runs out of fresh slots
    pub growth_factor: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
            growth_factor: 2,
        }
    }
}

/// Pool errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The id does not refer to an allocated slot
    #[error("pool id {0} is not allocated")]
    StaleId(PoolId),

    /// Two pools that must hand out identical ids diverged
    #[error("lock-stepped pools diverged: model id {model}, world id {world}")]
    DeterminismMismatch {
        /// Id returned by the model-space pool
        model: PoolId,
        /// Id returned by the world-space pool
        world: PoolId,
    },
}

/// Fixed-slot pool with a FIFO free queue
#[derive(Debug, Clone)]
pub struct ObjectPool<T> {
    slots: Vec<Option<T>>,
    free: VecDeque<PoolId>,
    capacity: usize,
    growth_factor: usize,
    live: usize,
}

impl<T> ObjectPool<T> {
    /// Create a pool with the given sizing behaviour
    pub fn new(config: &PoolConfig) -> Self {
        let capacity = config.initial_capacity;
        Self {
            slots: Vec::with_capacity(capacity),
            free: VecDeque::new(),
            capacity,
            growth_factor: config.growth_factor.max(2),
            live: 0,
        }
    }

    /// Store a value, reusing the oldest released slot if there is one
    pub fn insert(&mut self, value: T) -> PoolId {
        self.live += 1;

        if let Some(id) = self.free.pop_front() {
            self.slots[id.index()] = Some(value);
            return id;
        }

        let index = self.slots.len();
        if index == self.capacity {
            self.grow();
        }
        self.slots.push(Some(value));
        PoolId(index)
    }

    /// Return an id to the free queue (`ReleaseID`). Storage is not compacted.
    pub fn release_id(&mut self, id: PoolId) -> Result<T, PoolError> {
        let value = self
            .slots
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(PoolError::StaleId(id))?;

        self.free.push_back(id);
        self.live -= 1;
        Ok(value)
    }

    /// O(1) slot lookup (`AddressOf`)
    pub fn address_of(&self, id: PoolId) -> Option<&T> {
        self.slots.get(id.index())?.as_ref()
    }

    /// Mutable O(1) slot lookup
    pub fn address_of_mut(&mut self, id: PoolId) -> Option<&mut T> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    /// Whether `id` refers to an allocated slot
    pub fn is_live(&self, id: PoolId) -> bool {
        self.address_of(id).is_some()
    }

    /// Number of allocated slots
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no slot is allocated
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Current backing capacity in slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Allocated slots in slot order
    pub fn iter(&self) -> impl Iterator<Item = (PoolId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (PoolId(index), value)))
    }

    /// Allocated slots in slot order, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolId, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|value| (PoolId(index), value)))
    }

    /// Ids of allocated slots in slot order
    pub fn ids(&self) -> Vec<PoolId> {
        self.iter().map(|(id, _)| id).collect()
    }

    fn grow(&mut self) {
        let new_capacity = (self.capacity * self.growth_factor).max(1);
        self.slots.reserve_exact(new_capacity - self.slots.len());
        log::debug!("Object pool grew from {} to {} slots", self.capacity, new_capacity);
        self.capacity = new_capacity;
    }
}

impl<T: Default> ObjectPool<T> {
    /// Allocate a slot (`RequestID`). A reused slot is reset to `T::default()`,
    /// never left holding the previous occupant's data.
    pub fn request_id(&mut self) -> PoolId {
        self.insert(T::default())
    }
}

impl<T> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new(&PoolConfig::default())
    }
}

/// Two pools advanced in lock-step so that a model-space payload and its
/// cached world-space version always share one id.
#[derive(Debug, Clone)]
pub struct PairedPool<T> {
    model: ObjectPool<T>,
    world: ObjectPool<T>,
}

impl<T: Default> PairedPool<T> {
    /// Create a pair of empty pools
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            model: ObjectPool::new(config),
            world: ObjectPool::new(config),
        }
    }

    /// Allocate one slot in each pool. The ids must match; a mismatch is a
    /// configuration error and the allocation is rolled back.
    pub fn allocate(&mut self) -> Result<PoolId, PoolError> {
        let model = self.model.request_id();
        let world = self.world.request_id();

        if model != world {
            log::error!(
                "Determinism check failed: model pool returned {}, world pool returned {}",
                model,
                world
            );
            // Both slots were just allocated, so release cannot fail
            let _ = self.model.release_id(model);
            let _ = self.world.release_id(world);
            return Err(PoolError::DeterminismMismatch { model, world });
        }

        Ok(model)
    }
}

impl<T> PairedPool<T> {
    /// Release the slot with this id from both pools
    pub fn free(&mut self, id: PoolId) -> Result<(), PoolError> {
        self.model.release_id(id)?;
        self.world.release_id(id)?;
        Ok(())
    }

    /// Model-space payload
    pub fn model(&self, id: PoolId) -> Option<&T> {
        self.model.address_of(id)
    }

    /// Mutable model-space payload
    pub fn model_mut(&mut self, id: PoolId) -> Option<&mut T> {
        self.model.address_of_mut(id)
    }

    /// Cached world-space payload
    pub fn world(&self, id: PoolId) -> Option<&T> {
        self.world.address_of(id)
    }

    /// Model payload together with its mutable world slot
    pub fn split_mut(&mut self, id: PoolId) -> Result<(&T, &mut T), PoolError> {
        let model = self.model.address_of(id).ok_or(PoolError::StaleId(id))?;
        let world = self.world.address_of_mut(id).ok_or(PoolError::StaleId(id))?;
        Ok((model, world))
    }

    /// Number of allocated payloads
    pub fn len(&self) -> usize {
        self.model.len()
    }

    /// Whether no payload is allocated
    pub fn is_empty(&self) -> bool {
        self.model.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn small_config() -> PoolConfig {
        PoolConfig {
            initial_capacity: 2,
            growth_factor: 2,
        }
    }

    #[test]
    fn test_request_returns_fresh_ids_in_order() {
        let mut pool: ObjectPool<u32> = ObjectPool::new(&small_config());
        assert_eq!(pool.request_id(), PoolId::new(0));
        assert_eq!(pool.request_id(), PoolId::new(1));
        assert_eq!(pool.request_id(), PoolId::new(2));
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_growth_doubles_capacity() {
        let mut pool: ObjectPool<u32> = ObjectPool::new(&small_config());
        pool.request_id();
        pool.request_id();
        assert_eq!(pool.capacity(), 2);

        pool.request_id();
        assert_eq!(pool.capacity(), 4);
    }

    #[test]
    fn test_release_recycles_fifo() {
        let mut pool: ObjectPool<u32> = ObjectPool::new(&small_config());
        let ids: Vec<_> = (0..4).map(|_| pool.request_id()).collect();

        pool.release_id(ids[2]).unwrap();
        pool.release_id(ids[0]).unwrap();

        // Oldest release comes back first
        assert_eq!(pool.request_id(), ids[2]);
        assert_eq!(pool.request_id(), ids[0]);
        assert_eq!(pool.request_id(), PoolId::new(4));
    }

    #[test]
    fn test_reused_slot_is_reset() {
        let mut pool: ObjectPool<u32> = ObjectPool::new(&small_config());
        let id = pool.request_id();
        *pool.address_of_mut(id).unwrap() = 42;
        pool.release_id(id).unwrap();

        let again = pool.request_id();
        assert_eq!(again, id);
        assert_eq!(pool.address_of(again), Some(&0));
    }

    #[test]
    fn test_live_ids_never_alias() {
        let mut pool: ObjectPool<u32> = ObjectPool::new(&small_config());
        let mut live = Vec::new();
        for round in 0..20 {
            live.push(pool.request_id());
            if round % 3 == 0 {
                let id = live.remove(0);
                pool.release_id(id).unwrap();
            }
        }

        let unique: HashSet<_> = live.iter().copied().collect();
        assert_eq!(unique.len(), live.len());
        assert_eq!(pool.len(), live.len());
    }

    #[test]
    fn test_double_release_is_stale() {
        let mut pool: ObjectPool<u32> = ObjectPool::new(&small_config());
        let id = pool.request_id();
        pool.release_id(id).unwrap();
        assert_eq!(pool.release_id(id), Err(PoolError::StaleId(id)));
        assert!(!pool.is_live(id));
    }

    #[test]
    fn test_iter_is_slot_ordered() {
        let mut pool = ObjectPool::new(&small_config());
        let a = pool.insert('a');
        let b = pool.insert('b');
        let c = pool.insert('c');
        pool.release_id(b).unwrap();

        let seen: Vec<_> = pool.iter().map(|(id, v)| (id, *v)).collect();
        assert_eq!(seen, vec![(a, 'a'), (c, 'c')]);
    }

    #[test]
    fn test_paired_pool_ids_match() {
        let mut pool: PairedPool<u32> = PairedPool::new(&small_config());
        let first = pool.allocate().unwrap();
        let second = pool.allocate().unwrap();
        pool.free(first).unwrap();
        assert_eq!(pool.allocate().unwrap(), first);
        assert_ne!(first, second);
    }

    #[test]
    fn test_paired_pool_detects_divergence() {
        let mut pool: PairedPool<u32> = PairedPool::new(&small_config());
        // Push the world pool one slot ahead of the model pool
        pool.world.request_id();

        let err = pool.allocate().unwrap_err();
        assert_eq!(
            err,
            PoolError::DeterminismMismatch {
                model: PoolId::new(0),
                world: PoolId::new(1),
            }
        );
        // Nothing leaked from the failed allocation
        assert_eq!(pool.len(), 0);
    }
}
