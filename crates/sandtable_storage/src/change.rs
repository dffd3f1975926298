//! Frame-delayed change tracking.
//!
//! Each tick, storage operations record which entities had a component
//! added, mutably accessed, or removed. The accumulating sets are rotated
//! into visible sets at tick finalization, so change queries always see the
//! previous tick's changes — exactly one tick of delay and exactly one tick
//! of visibility.
//!
//! Mutation tracking is access-based by design: any mutable access counts as
//! "changed", with no value comparison.

use std::collections::{HashMap, HashSet};
use std::mem;

use sandtable_foundation::{Entity, TokenId};

#[derive(Default)]
struct ChangeBuffer {
    current: HashMap<TokenId, HashSet<Entity>>,
    visible: HashMap<TokenId, HashSet<Entity>>,
}

impl ChangeBuffer {
    fn mark(&mut self, token: TokenId, entity: Entity) {
        self.current.entry(token).or_default().insert(entity);
    }

    fn last_tick(&self, token: TokenId) -> Option<&HashSet<Entity>> {
        self.visible.get(&token)
    }

    fn rotate(&mut self) {
        self.visible = mem::take(&mut self.current);
    }
}

/// Double-buffered added/mutated/removed entity sets, keyed by component
/// token.
#[derive(Default)]
pub struct ChangeLog {
    added: ChangeBuffer,
    mutated: ChangeBuffer,
    removed: ChangeBuffer,
}

impl ChangeLog {
    /// Creates an empty change log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `entity` gained `token` this tick.
    pub fn mark_added(&mut self, token: TokenId, entity: Entity) {
        self.added.mark(token, entity);
    }

    /// Records that `entity`'s `token` value was mutably accessed this tick.
    pub fn mark_mutated(&mut self, token: TokenId, entity: Entity) {
        self.mutated.mark(token, entity);
    }

    /// Records that `entity` lost `token` this tick.
    pub fn mark_removed(&mut self, token: TokenId, entity: Entity) {
        self.removed.mark(token, entity);
    }

    /// Entities that gained `token` last tick.
    #[must_use]
    pub fn added_last_tick(&self, token: TokenId) -> Option<&HashSet<Entity>> {
        self.added.last_tick(token)
    }

    /// Entities whose `token` value was mutably accessed last tick.
    #[must_use]
    pub fn mutated_last_tick(&self, token: TokenId) -> Option<&HashSet<Entity>> {
        self.mutated.last_tick(token)
    }

    /// Entities that lost `token` last tick.
    #[must_use]
    pub fn removed_last_tick(&self, token: TokenId) -> Option<&HashSet<Entity>> {
        self.removed.last_tick(token)
    }

    /// Makes this tick's accumulators visible and starts fresh ones.
    ///
    /// Called once during tick finalization. The previous visible sets are
    /// dropped, which is what bounds visibility to a single tick.
    pub fn rotate(&mut self) {
        self.added.rotate();
        self.mutated.rotate();
        self.removed.rotate();
    }
}
