//! World state: the unified interface to all storage systems.
//!
//! The `World` owns the token registry, archetype storage, resources,
//! channels, change tracking, and state entries. Every operation is
//! synchronous and deterministic; lookups against missing entities or
//! resources represent absence as `None` or a silent no-op rather than
//! failing.
//!
//! Structural mutations (spawn, insert, remove) apply immediately and are
//! visible to later systems within the same tick. Despawn alone is deferred
//! to tick finalization, so a despawned entity stays visible to reads and
//! queries until the tick ends.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;

use sandtable_foundation::{Channel, Component, Entity, Resource, StateToken, TokenId};

use crate::archetype::{Archetype, Signature};
use crate::bundle::{Bundle, TokenSet};
use crate::change::ChangeLog;
use crate::channel::{ChannelStore, Reader, Writer};
use crate::query::{QueryCache, QueryKey, QueryShape, Term};
use crate::registry::TokenRegistry;
use crate::state::{StateStore, StateTransition};

/// Where an entity's row lives.
///
/// Invariant: `archetypes[record.archetype].entities()[record.row]` is the
/// entity this record belongs to. Swap-removes that relocate another entity
/// update that entity's record together with the data move.
#[derive(Copy, Clone, Debug)]
struct EntityRecord {
    archetype: usize,
    row: usize,
}

/// Debug snapshot of a live entity: which component kinds it holds.
#[derive(Clone, Debug)]
pub struct EntityInspection {
    /// The inspected entity.
    pub entity: Entity,
    /// Diagnostic names of the entity's component kinds.
    pub components: Vec<&'static str>,
}

enum ChangeKind {
    Added,
    Mutated,
}

/// The world: archetype-based entity/component storage plus resources,
/// channels, change tracking, and state entries.
#[derive(Default)]
pub struct World {
    registry: TokenRegistry,
    archetypes: Vec<Archetype>,
    by_signature: HashMap<Signature, usize>,
    records: HashMap<Entity, EntityRecord>,
    next_entity: u64,
    resources: HashMap<TokenId, Box<dyn Any>>,
    channels: ChannelStore,
    changes: ChangeLog,
    states: StateStore,
    pending_despawns: Vec<Entity>,
    tick: u64,
    cache: RefCell<QueryCache>,
}

impl World {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Token registration
    // =========================================================================

    /// Mints a component token for value type `T`.
    pub fn register_component<T: 'static>(&mut self) -> Component<T> {
        self.registry.register_component::<T>()
    }

    /// Mints a resource token for value type `T`.
    pub fn register_resource<T: 'static>(&mut self) -> Resource<T> {
        self.registry.register_resource::<T>()
    }

    /// Mints an event channel token for payload type `T` and opens its
    /// queue.
    pub fn register_event<T: 'static>(&mut self) -> Channel<T> {
        let channel = self.registry.register_channel::<T>();
        self.channels.open::<T>(channel.id());
        channel
    }

    /// Mints a message channel token for payload type `T`.
    ///
    /// Events and messages share one queue mechanism; the separate surface
    /// keeps the broadcast/command distinction in caller naming.
    pub fn register_message<T: 'static>(&mut self) -> Channel<T> {
        self.register_event::<T>()
    }

    /// Mints a state token with the given named values and initial value.
    pub fn register_state(&mut self, values: &[&str], initial: &str) -> StateToken {
        self.registry.register_state(values, initial)
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Spawns an entity with the given component bundle.
    ///
    /// Every supplied token is recorded as added this tick. When a bundle
    /// names the same token twice, the later value wins.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> Entity {
        let entity = Entity::from_raw(self.next_entity);
        self.next_entity += 1;

        let mut tokens = Vec::new();
        bundle.collect_tokens(&mut tokens);
        let mut values = Vec::new();
        bundle.collect_values(&mut values);
        let by_token: HashMap<TokenId, Box<dyn Any>> = values.into_iter().collect();

        let signature = Signature::from_tokens(tokens);
        let sig_tokens = signature.tokens().to_vec();
        let index = self.archetype_index(signature);
        self.push_entity_row(entity, index, &sig_tokens, by_token);

        for &token in &sig_tokens {
            self.changes.mark_added(token, entity);
        }
        entity
    }

    /// Spawns `count` entities from a factory, returning their ids in spawn
    /// order.
    pub fn spawn_batch<B: Bundle>(
        &mut self,
        count: usize,
        mut factory: impl FnMut(usize) -> B,
    ) -> Vec<Entity> {
        (0..count).map(|i| self.spawn(factory(i))).collect()
    }

    /// Inserts or overwrites components on an entity.
    ///
    /// Tokens already in the entity's signature are overwritten in place and
    /// marked mutated. Any new token triggers a migration to the
    /// union-signature archetype; only the newly added tokens are marked
    /// added. No-op for missing entities.
    pub fn insert<B: Bundle>(&mut self, entity: Entity, bundle: B) {
        let Some(record) = self.records.get(&entity).copied() else {
            return;
        };
        let mut values = Vec::new();
        bundle.collect_values(&mut values);
        let by_token: HashMap<TokenId, Box<dyn Any>> = values.into_iter().collect();

        let current = self.archetypes[record.archetype].signature().clone();
        let new_tokens: Vec<TokenId> = by_token
            .keys()
            .copied()
            .filter(|&t| !current.contains(t))
            .collect();

        if new_tokens.is_empty() {
            let arch = &mut self.archetypes[record.archetype];
            for (token, value) in by_token {
                arch.replace(record.row, token, value);
                self.changes.mark_mutated(token, entity);
            }
            return;
        }

        for &token in &new_tokens {
            self.changes.mark_added(token, entity);
        }

        let (snapshot, moved) = self.archetypes[record.archetype].swap_remove_row(record.row);
        self.fix_relocated(moved, record.row);

        let mut merged: HashMap<TokenId, Box<dyn Any>> = snapshot.into_iter().collect();
        merged.extend(by_token);

        let union = current.merged(&new_tokens);
        let sig_tokens = union.tokens().to_vec();
        let index = self.archetype_index(union);
        self.push_entity_row(entity, index, &sig_tokens, merged);
    }

    /// Removes components from an entity, migrating it to the reduced
    /// signature.
    ///
    /// Removed tokens are marked removed this tick. Tokens the entity lacks
    /// are ignored per token. When nothing remains the entity's record is
    /// cleared entirely. No-op for missing entities.
    pub fn remove<S: TokenSet>(&mut self, entity: Entity, tokens: S) {
        let Some(record) = self.records.get(&entity).copied() else {
            return;
        };
        let mut requested = Vec::new();
        tokens.collect_tokens(&mut requested);
        requested.sort_unstable();
        requested.dedup();

        let current = self.archetypes[record.archetype].signature().clone();
        let removing: Vec<TokenId> = requested
            .into_iter()
            .filter(|&t| current.contains(t))
            .collect();
        if removing.is_empty() {
            return;
        }

        // Removed tokens are recorded before the row is relocated.
        for &token in &removing {
            self.changes.mark_removed(token, entity);
        }

        let (snapshot, moved) = self.archetypes[record.archetype].swap_remove_row(record.row);
        self.fix_relocated(moved, record.row);

        let reduced = current.reduced(&removing);
        if reduced.is_empty() {
            self.records.remove(&entity);
            return;
        }

        let kept: HashMap<TokenId, Box<dyn Any>> = snapshot
            .into_iter()
            .filter(|(t, _)| reduced.contains(*t))
            .collect();
        let sig_tokens = reduced.tokens().to_vec();
        let index = self.archetype_index(reduced);
        self.push_entity_row(entity, index, &sig_tokens, kept);
    }

    /// Pre-creates an empty archetype for an exact signature, so later
    /// spawns with that signature need no archetype creation. Idempotent.
    pub fn register_archetype<S: TokenSet>(&mut self, tokens: S) {
        let mut ids = Vec::new();
        tokens.collect_tokens(&mut ids);
        self.archetype_index(Signature::from_tokens(ids));
    }

    /// Returns a component value of a live entity.
    #[must_use]
    pub fn get<T: 'static>(&self, entity: Entity, component: Component<T>) -> Option<&T> {
        let record = self.records.get(&entity)?;
        self.archetypes[record.archetype]
            .column_slice::<T>(component.id())?
            .get(record.row)
    }

    /// Returns a component value mutably, marking it mutated this tick.
    ///
    /// Mutation tracking is access-based: taking the reference counts as a
    /// change even if nothing is written.
    pub fn get_mut<T: 'static>(&mut self, entity: Entity, component: Component<T>) -> Option<&mut T> {
        let record = *self.records.get(&entity)?;
        let slice = self.archetypes[record.archetype].column_slice_mut::<T>(component.id())?;
        self.changes.mark_mutated(component.id(), entity);
        slice.get_mut(record.row)
    }

    /// Returns true if the entity is live and holds the component.
    #[must_use]
    pub fn has<T: 'static>(&self, entity: Entity, component: Component<T>) -> bool {
        self.records
            .get(&entity)
            .is_some_and(|record| self.archetypes[record.archetype].signature().contains(component.id()))
    }

    /// Returns a debug snapshot of a live entity's component kinds.
    #[must_use]
    pub fn inspect(&self, entity: Entity) -> Option<EntityInspection> {
        let record = self.records.get(&entity)?;
        let components = self.archetypes[record.archetype]
            .signature()
            .tokens()
            .iter()
            .map(|&t| self.registry.component_name(t).unwrap_or("<unknown>"))
            .collect();
        Some(EntityInspection { entity, components })
    }

    /// Schedules an entity for removal at tick finalization.
    ///
    /// Until then the entity stays visible to `get`, `inspect`, and every
    /// query. No-op for missing entities; idempotent within a tick.
    pub fn despawn(&mut self, entity: Entity) {
        if self.records.contains_key(&entity) && !self.pending_despawns.contains(&entity) {
            self.pending_despawns.push(entity);
        }
    }

    /// Returns true if the entity has a live storage record.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.records.contains_key(&entity)
    }

    /// Returns the number of live entities, including those pending
    /// despawn.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no entities are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Runs a read-only query, returning one item tuple per matching row in
    /// archetype/row order. No change tracking.
    pub fn query<S: QueryShape>(&self, shape: S) -> Vec<S::Item<'_>> {
        let key = self.query_key(&shape);
        let mut out = Vec::new();
        for index in self.matching(&key) {
            let arch = &self.archetypes[index];
            for row in 0..arch.len() {
                out.push(shape.fetch(arch, row));
            }
        }
        out
    }

    /// Runs a mutable query, calling `visitor` once per matching row.
    ///
    /// Every visited (entity, required token) pair is marked mutated this
    /// tick, whether or not the visitor writes — the same access-based
    /// approximation as [`World::get_mut`].
    ///
    /// # Panics
    ///
    /// Panics if the same component token appears twice among the required
    /// terms; two mutable borrows of one column cannot be handed out.
    pub fn query_mut<S: QueryShape>(&mut self, shape: S, mut visitor: impl FnMut(S::ItemMut<'_>)) {
        let mut terms: Vec<Term> = Vec::new();
        shape.collect_terms(&mut terms);
        let mut required: Vec<TokenId> = terms
            .iter()
            .filter_map(|term| match *term {
                Term::Required(token) => Some(token),
                Term::Excluded(_) | Term::Entity => None,
            })
            .collect();
        required.sort_unstable();
        assert!(
            required.windows(2).all(|w| w[0] != w[1]),
            "duplicate component token in mutable query"
        );
        let key = QueryKey::from_terms(&terms);
        for index in self.matching(&key) {
            let entities = self.archetypes[index].entities().to_vec();
            let ptrs = shape.prepare(&mut self.archetypes[index]);
            for (row, &entity) in entities.iter().enumerate() {
                for &token in &key.required {
                    self.changes.mark_mutated(token, entity);
                }
                // SAFETY: pointers were prepared from this archetype, rows
                // are in bounds, required tokens are pairwise distinct, and
                // nothing mutates the archetype structurally while the item
                // is live.
                let item = unsafe { shape.fetch_prepared(ptrs, row) };
                visitor(item);
            }
        }
    }

    /// Returns tuples for current matches whose entity had any required
    /// token added last tick.
    pub fn query_added<S: QueryShape>(&self, shape: S) -> Vec<S::Item<'_>> {
        self.query_changed_kind(shape, &ChangeKind::Added)
    }

    /// Returns tuples for current matches whose entity had any required
    /// token mutably accessed last tick.
    pub fn query_changed<S: QueryShape>(&self, shape: S) -> Vec<S::Item<'_>> {
        self.query_changed_kind(shape, &ChangeKind::Mutated)
    }

    /// Returns the entities that lost `component` last tick, in id order.
    ///
    /// Bare ids: the component value no longer exists to form a tuple.
    #[must_use]
    pub fn query_removed<T: 'static>(&self, component: Component<T>) -> Vec<Entity> {
        let mut out: Vec<Entity> = self
            .changes
            .removed_last_tick(component.id())
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    fn query_changed_kind<S: QueryShape>(&self, shape: S, kind: &ChangeKind) -> Vec<S::Item<'_>> {
        let key = self.query_key(&shape);
        let mut out = Vec::new();
        for index in self.matching(&key) {
            let arch = &self.archetypes[index];
            for row in 0..arch.len() {
                let entity = arch.entities()[row];
                let hit = key.required.iter().any(|&token| {
                    let set = match kind {
                        ChangeKind::Added => self.changes.added_last_tick(token),
                        ChangeKind::Mutated => self.changes.mutated_last_tick(token),
                    };
                    set.is_some_and(|set| set.contains(&entity))
                });
                if hit {
                    out.push(shape.fetch(arch, row));
                }
            }
        }
        out
    }

    fn query_key<S: QueryShape>(&self, shape: &S) -> QueryKey {
        let mut terms: Vec<Term> = Vec::new();
        shape.collect_terms(&mut terms);
        QueryKey::from_terms(&terms)
    }

    fn matching(&self, key: &QueryKey) -> Vec<usize> {
        self.cache.borrow_mut().matching(key, &self.archetypes)
    }

    // =========================================================================
    // Resources
    // =========================================================================

    /// Stores the singleton value for a resource token, replacing any
    /// previous one.
    pub fn insert_resource<T: 'static>(&mut self, resource: Resource<T>, value: T) {
        self.resources.insert(resource.id(), Box::new(value));
    }

    /// Returns the singleton value for a resource token.
    #[must_use]
    pub fn get_resource<T: 'static>(&self, resource: Resource<T>) -> Option<&T> {
        self.resources.get(&resource.id())?.downcast_ref()
    }

    /// Returns the singleton value for a resource token, mutably.
    pub fn get_resource_mut<T: 'static>(&mut self, resource: Resource<T>) -> Option<&mut T> {
        self.resources.get_mut(&resource.id())?.downcast_mut()
    }

    /// Removes and returns the singleton value for a resource token.
    pub fn remove_resource<T: 'static>(&mut self, resource: Resource<T>) -> Option<T> {
        let boxed = self.resources.remove(&resource.id())?;
        boxed.downcast::<T>().ok().map(|value| *value)
    }

    // =========================================================================
    // Channels
    // =========================================================================

    /// Appends a payload to a channel, stamped with the current tick.
    ///
    /// No-op if the channel was never registered with this world.
    pub fn send<T: 'static>(&mut self, channel: Channel<T>, payload: T) {
        let tick = self.tick;
        if let Some(queue) = self.channels.queue_mut::<T>(channel.id()) {
            queue.send(payload, tick);
        }
    }

    /// Creates a reader whose cursor starts at the oldest currently
    /// retained item.
    #[must_use]
    pub fn reader<T: 'static>(&self, channel: Channel<T>) -> Reader<T> {
        let cursor = self
            .channels
            .queue::<T>(channel.id())
            .map_or(0, crate::channel::ChannelQueue::oldest_retained_id);
        Reader::new(channel, cursor)
    }

    /// Creates a writer handle for a channel.
    #[must_use]
    pub fn writer<T: 'static>(&self, channel: Channel<T>) -> Writer<T> {
        Writer::new(channel)
    }

    pub(crate) fn channels(&self) -> &ChannelStore {
        &self.channels
    }

    // =========================================================================
    // States
    // =========================================================================

    /// Activates a state at its declared initial value; the first tick after
    /// this dispatches the initial enter stage.
    pub fn insert_state(&mut self, token: StateToken) {
        if let Some(decl) = self.registry.state_decl(token.id()) {
            self.states.insert(token, decl);
        }
    }

    /// Transitions a state to a named value. No-op when the value is
    /// unknown, equals the current value, or the state was never inserted.
    pub fn set_state(&mut self, token: StateToken, value: &str) {
        self.states.set(token, value);
    }

    /// Returns the current value of an active state.
    #[must_use]
    pub fn state(&self, token: StateToken) -> Option<&str> {
        self.states.current(token)
    }

    /// Drains dirty state entries for transition dispatch. Engine use.
    pub fn take_state_transitions(&mut self) -> Vec<StateTransition> {
        self.states.drain_dirty()
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Returns the current tick number.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Finalizes the current tick: applies deferred despawns (marking their
    /// tokens removed), advances the channel frame counter and purges
    /// expired items, then rotates the change-tracking buffers.
    ///
    /// The engine calls this at the end of every update; tests driving a
    /// bare world call it directly.
    pub fn finalize_tick(&mut self) {
        let pending = std::mem::take(&mut self.pending_despawns);
        for entity in pending {
            let Some(record) = self.records.remove(&entity) else {
                continue;
            };
            let sig_tokens = self.archetypes[record.archetype].signature().tokens().to_vec();
            for token in sig_tokens {
                self.changes.mark_removed(token, entity);
            }
            let (_values, moved) = self.archetypes[record.archetype].swap_remove_row(record.row);
            self.fix_relocated(moved, record.row);
        }

        self.tick += 1;
        self.channels.expire_all(self.tick);
        self.changes.rotate();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Gets or lazily creates the archetype for a signature.
    ///
    /// Creation grows the archetype list, which invalidates the query cache
    /// on its next lookup. Archetypes are never reclaimed, even when empty.
    fn archetype_index(&mut self, signature: Signature) -> usize {
        if let Some(&index) = self.by_signature.get(&signature) {
            return index;
        }
        let columns = signature
            .tokens()
            .iter()
            .map(|&token| {
                let column = self
                    .registry
                    .new_column(token)
                    .expect("component token not registered with this world");
                (token, column)
            })
            .collect();
        let index = self.archetypes.len();
        self.archetypes.push(Archetype::new(signature.clone(), columns));
        self.by_signature.insert(signature, index);
        index
    }

    fn push_entity_row(
        &mut self,
        entity: Entity,
        index: usize,
        sig_tokens: &[TokenId],
        mut by_token: HashMap<TokenId, Box<dyn Any>>,
    ) {
        let ordered: Vec<(TokenId, Box<dyn Any>)> = sig_tokens
            .iter()
            .map(|&token| {
                let value = by_token
                    .remove(&token)
                    .expect("migration lost a component value");
                (token, value)
            })
            .collect();
        let arch = &mut self.archetypes[index];
        arch.push_row(entity, ordered);
        let row = arch.len() - 1;
        self.records.insert(entity, EntityRecord { archetype: index, row });
    }

    fn fix_relocated(&mut self, moved: Option<Entity>, row: usize) {
        if let Some(moved) = moved {
            self.records
                .get_mut(&moved)
                .expect("relocated entity missing record")
                .row = row;
        }
    }
}
