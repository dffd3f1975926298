//! Entity identifiers.

use std::fmt;

/// Bare entity identifier.
///
/// An entity is nothing more than a number; its existence is defined solely
/// by the presence of a live storage record in a world. Identifiers are
/// never reused, so a despawned entity's id stays dead forever.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Entity(u64);

impl Entity {
    /// Creates an entity id from a raw index.
    ///
    /// Ids are normally minted by a world's spawn operations; this exists for
    /// storage internals and tests.
    #[must_use]
    pub const fn from_raw(index: u64) -> Self {
        Self(index)
    }

    /// Returns the raw index of this entity.
    #[must_use]
    pub const fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}
