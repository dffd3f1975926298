//! Cached query resolution over archetype storage.
//!
//! A query is a tuple of terms: component tokens (required, yielding the
//! value), [`Without`] markers (excluding entities that own the wrapped
//! token, yielding `()`), and [`EntityRef`] (yielding the owning entity id).
//! Resolution retains archetypes whose signature is a superset of the
//! required tokens and disjoint from the excluded ones, and caches that
//! archetype list keyed by the sorted token sets. Only membership is cached,
//! never values, so in-place mutation is always immediately visible through
//! a cached query. The whole cache is invalidated whenever a new archetype
//! is created.

use std::collections::HashMap;

use sandtable_foundation::{Component, Entity, TokenId};

use crate::archetype::Archetype;

// =============================================================================
// Query terms
// =============================================================================

/// A resolved query argument.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Term {
    /// The archetype must contain this token; the term yields its value.
    Required(TokenId),
    /// The archetype must not contain this token.
    Excluded(TokenId),
    /// Pseudo-token yielding the owning entity id.
    Entity,
}

/// Pseudo-token requesting the owning entity id in the result tuple.
#[derive(Copy, Clone, Debug, Default)]
pub struct EntityRef;

/// Marker excluding entities that own the wrapped component token.
///
/// Yields `()` in the result tuple.
#[derive(Copy, Clone, Debug)]
pub struct Without<T: 'static>(pub Component<T>);

/// One argument of a query tuple.
pub trait QueryTerm {
    /// Item yielded by read-only queries.
    type Item<'w>;
    /// Item yielded by mutable queries.
    type ItemMut<'w>;
    /// Per-archetype prepared state for mutable row fetches.
    type Ptr: Copy;

    /// The tagged form of this argument.
    fn term(&self) -> Term;

    /// Reads this term's item from a resolved archetype row.
    fn fetch<'w>(&self, archetype: &'w Archetype, row: usize) -> Self::Item<'w>;

    /// Captures this term's column base pointer for one archetype.
    fn prepare(&self, archetype: &mut Archetype) -> Self::Ptr;

    /// Reads this term's mutable item through a prepared pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`QueryTerm::prepare`] on an archetype that
    /// outlives `'w` and is not structurally mutated while items are live,
    /// `row` must be in bounds, and the required tokens of the enclosing
    /// query must be pairwise distinct so no two items alias.
    unsafe fn fetch_prepared<'w>(&self, ptr: Self::Ptr, row: usize) -> Self::ItemMut<'w>;
}

impl<T: 'static> QueryTerm for Component<T> {
    type Item<'w> = &'w T;
    type ItemMut<'w> = &'w mut T;
    type Ptr = *mut T;

    fn term(&self) -> Term {
        Term::Required(self.id())
    }

    fn fetch<'w>(&self, archetype: &'w Archetype, row: usize) -> &'w T {
        let column = archetype
            .column_slice::<T>(self.id())
            .expect("resolved archetype lacks required column");
        &column[row]
    }

    fn prepare(&self, archetype: &mut Archetype) -> *mut T {
        archetype
            .column_base_ptr::<T>(self.id())
            .expect("resolved archetype lacks required column")
    }

    unsafe fn fetch_prepared<'w>(&self, ptr: *mut T, row: usize) -> &'w mut T {
        unsafe { &mut *ptr.add(row) }
    }
}

impl QueryTerm for EntityRef {
    type Item<'w> = Entity;
    type ItemMut<'w> = Entity;
    type Ptr = *const Entity;

    fn term(&self) -> Term {
        Term::Entity
    }

    fn fetch<'w>(&self, archetype: &'w Archetype, row: usize) -> Entity {
        archetype.entities()[row]
    }

    fn prepare(&self, archetype: &mut Archetype) -> *const Entity {
        archetype.entities().as_ptr()
    }

    unsafe fn fetch_prepared<'w>(&self, ptr: *const Entity, row: usize) -> Self::ItemMut<'w> {
        unsafe { *ptr.add(row) }
    }
}

impl<T: 'static> QueryTerm for Without<T> {
    type Item<'w> = ();
    type ItemMut<'w> = ();
    type Ptr = ();

    fn term(&self) -> Term {
        Term::Excluded(self.0.id())
    }

    fn fetch<'w>(&self, _archetype: &'w Archetype, _row: usize) {}

    fn prepare(&self, _archetype: &mut Archetype) {}

    unsafe fn fetch_prepared<'w>(&self, (): (), _row: usize) -> Self::ItemMut<'w> {}
}

// =============================================================================
// Query shapes
// =============================================================================

/// A complete query: a single term or a tuple of terms up to arity eight.
pub trait QueryShape {
    /// Tuple of items yielded by read-only queries.
    type Item<'w>;
    /// Tuple of items yielded by mutable queries.
    type ItemMut<'w>;
    /// Tuple of prepared per-archetype pointers.
    type Ptrs: Copy;

    /// Appends the tagged form of every argument to `out`.
    fn collect_terms(&self, out: &mut Vec<Term>);

    /// Reads one result row from a resolved archetype.
    fn fetch<'w>(&self, archetype: &'w Archetype, row: usize) -> Self::Item<'w>;

    /// Captures column base pointers for one archetype.
    fn prepare(&self, archetype: &mut Archetype) -> Self::Ptrs;

    /// Reads one mutable result row through prepared pointers.
    ///
    /// # Safety
    ///
    /// Same contract as [`QueryTerm::fetch_prepared`], for every term.
    unsafe fn fetch_prepared<'w>(&self, ptrs: Self::Ptrs, row: usize) -> Self::ItemMut<'w>;
}

impl<Q: QueryTerm> QueryShape for Q {
    type Item<'w> = Q::Item<'w>;
    type ItemMut<'w> = Q::ItemMut<'w>;
    type Ptrs = Q::Ptr;

    fn collect_terms(&self, out: &mut Vec<Term>) {
        out.push(self.term());
    }

    fn fetch<'w>(&self, archetype: &'w Archetype, row: usize) -> Self::Item<'w> {
        QueryTerm::fetch(self, archetype, row)
    }

    fn prepare(&self, archetype: &mut Archetype) -> Self::Ptrs {
        QueryTerm::prepare(self, archetype)
    }

    unsafe fn fetch_prepared<'w>(&self, ptrs: Self::Ptrs, row: usize) -> Self::ItemMut<'w> {
        unsafe { QueryTerm::fetch_prepared(self, ptrs, row) }
    }
}

macro_rules! impl_query_shape {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: QueryTerm),+> QueryShape for ($($name,)+) {
            type Item<'w> = ($($name::Item<'w>,)+);
            type ItemMut<'w> = ($($name::ItemMut<'w>,)+);
            type Ptrs = ($($name::Ptr,)+);

            fn collect_terms(&self, out: &mut Vec<Term>) {
                $(out.push(QueryTerm::term(&self.$idx));)+
            }

            fn fetch<'w>(&self, archetype: &'w Archetype, row: usize) -> Self::Item<'w> {
                ($(QueryTerm::fetch(&self.$idx, archetype, row),)+)
            }

            fn prepare(&self, archetype: &mut Archetype) -> Self::Ptrs {
                ($(QueryTerm::prepare(&self.$idx, archetype),)+)
            }

            unsafe fn fetch_prepared<'w>(&self, ptrs: Self::Ptrs, row: usize) -> Self::ItemMut<'w> {
                unsafe { ($(QueryTerm::fetch_prepared(&self.$idx, ptrs.$idx, row),)+) }
            }
        }
    };
}

impl_query_shape!(Q0: 0);
impl_query_shape!(Q0: 0, Q1: 1);
impl_query_shape!(Q0: 0, Q1: 1, Q2: 2);
impl_query_shape!(Q0: 0, Q1: 1, Q2: 2, Q3: 3);
impl_query_shape!(Q0: 0, Q1: 1, Q2: 2, Q3: 3, Q4: 4);
impl_query_shape!(Q0: 0, Q1: 1, Q2: 2, Q3: 3, Q4: 4, Q5: 5);
impl_query_shape!(Q0: 0, Q1: 1, Q2: 2, Q3: 3, Q4: 4, Q5: 5, Q6: 6);
impl_query_shape!(Q0: 0, Q1: 1, Q2: 2, Q3: 3, Q4: 4, Q5: 5, Q6: 6, Q7: 7);

// =============================================================================
// Membership cache
// =============================================================================

/// Canonical cache key: sorted required ids plus sorted excluded ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey {
    /// Required token ids, sorted and deduplicated.
    pub required: Vec<TokenId>,
    /// Excluded token ids, sorted and deduplicated.
    pub excluded: Vec<TokenId>,
}

impl QueryKey {
    /// Builds the canonical key for a term list.
    #[must_use]
    pub fn from_terms(terms: &[Term]) -> Self {
        let mut required = Vec::new();
        let mut excluded = Vec::new();
        for term in terms {
            match *term {
                Term::Required(t) => required.push(t),
                Term::Excluded(t) => excluded.push(t),
                Term::Entity => {}
            }
        }
        required.sort_unstable();
        required.dedup();
        excluded.sort_unstable();
        excluded.dedup();
        Self { required, excluded }
    }
}

/// Caches resolved archetype lists per query key.
///
/// Only archetype membership is cached; values are read live. The cache
/// clears itself whenever the archetype count changes, since a new archetype
/// may match any key.
#[derive(Default)]
pub struct QueryCache {
    archetype_count: usize,
    lists: HashMap<QueryKey, Vec<usize>>,
}

impl QueryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the indices of archetypes matching `key`, resolving and
    /// caching on a miss.
    pub fn matching(&mut self, key: &QueryKey, archetypes: &[Archetype]) -> Vec<usize> {
        if self.archetype_count != archetypes.len() {
            self.lists.clear();
            self.archetype_count = archetypes.len();
        }
        if let Some(list) = self.lists.get(key) {
            return list.clone();
        }
        let list: Vec<usize> = archetypes
            .iter()
            .enumerate()
            .filter(|(_, arch)| {
                arch.signature().contains_all(&key.required)
                    && arch.signature().is_disjoint(&key.excluded)
            })
            .map(|(i, _)| i)
            .collect();
        self.lists.insert(key.clone(), list.clone());
        list
    }
}
