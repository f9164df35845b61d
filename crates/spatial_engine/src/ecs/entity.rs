//! Entity implementation

use crate::foundation::pool::PoolId;
use std::fmt;

/// Entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    id: PoolId,
}

impl Entity {
    /// Create an entity for the given pool slot
    pub(crate) const fn new(id: PoolId) -> Self {
        Self { id }
    }

    /// Entity for a raw slot index (tests only)
    #[cfg(test)]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self::new(PoolId::new(index))
    }

    /// Get the entity ID
    pub const fn id(&self) -> PoolId {
        self.id
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity{}", self.id)
    }
}
