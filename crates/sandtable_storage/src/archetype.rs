//! Archetype storage: dense columns keyed by component-set signature.
//!
//! An archetype holds every entity that carries exactly one set of component
//! tokens. Each token owns one dense column, and a parallel vector records
//! which entity owns each row. All columns and the entity vector share the
//! same length at all times; row `i` across every column belongs to the same
//! entity.

use std::any::Any;
use std::collections::HashMap;

use sandtable_foundation::{Entity, TokenId};

// =============================================================================
// Signature
// =============================================================================

/// The set of component tokens an entity currently holds.
///
/// Tokens are kept sorted by raw id so the signature doubles as a canonical
/// archetype key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    tokens: Vec<TokenId>,
}

impl Signature {
    /// Creates an empty signature.
    #[must_use]
    pub fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Creates a signature from a list of tokens, sorting and deduplicating.
    #[must_use]
    pub fn from_tokens(mut tokens: Vec<TokenId>) -> Self {
        tokens.sort_unstable();
        tokens.dedup();
        Self { tokens }
    }

    /// Returns the tokens in this signature.
    #[must_use]
    pub fn tokens(&self) -> &[TokenId] {
        &self.tokens
    }

    /// Returns the number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the signature holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Checks if this signature contains a token.
    #[must_use]
    pub fn contains(&self, token: TokenId) -> bool {
        self.tokens.binary_search(&token).is_ok()
    }

    /// Checks if this signature contains every listed token.
    #[must_use]
    pub fn contains_all(&self, tokens: &[TokenId]) -> bool {
        tokens.iter().all(|&t| self.contains(t))
    }

    /// Checks if this signature contains none of the listed tokens.
    #[must_use]
    pub fn is_disjoint(&self, tokens: &[TokenId]) -> bool {
        !tokens.iter().any(|&t| self.contains(t))
    }

    /// Returns a new signature with the listed tokens added.
    #[must_use]
    pub fn merged(&self, tokens: &[TokenId]) -> Self {
        let mut combined = self.tokens.clone();
        combined.extend_from_slice(tokens);
        Self::from_tokens(combined)
    }

    /// Returns a new signature with the listed tokens removed.
    #[must_use]
    pub fn reduced(&self, tokens: &[TokenId]) -> Self {
        let remaining = self
            .tokens
            .iter()
            .copied()
            .filter(|t| !tokens.contains(t))
            .collect();
        Self { tokens: remaining }
    }
}

// =============================================================================
// Columns
// =============================================================================

/// A type-erased dense column of component values.
///
/// Concrete columns are `Vec<T>` underneath; the trait exists so archetypes
/// can move values between each other during migration without knowing `T`
/// at the call site.
pub trait Column {
    /// Returns the number of values stored.
    fn len(&self) -> usize;

    /// Returns true if the column holds no values.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a boxed value of the column's element type.
    fn push(&mut self, value: Box<dyn Any>);

    /// Removes the value at `row` by swapping in the last value.
    fn swap_remove(&mut self, row: usize) -> Box<dyn Any>;

    /// Overwrites the value at `row` in place.
    fn replace(&mut self, row: usize, value: Box<dyn Any>);

    /// Creates an empty column of the same element type.
    fn fresh(&self) -> Box<dyn Column>;

    /// Upcast for typed downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Concrete column storing values of one component type.
pub struct TypedColumn<T: 'static> {
    values: Vec<T>,
}

impl<T: 'static> TypedColumn<T> {
    /// Creates an empty column.
    #[must_use]
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Returns the values as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// Returns the values as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }
}

impl<T: 'static> Default for TypedColumn<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Column for TypedColumn<T> {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn push(&mut self, value: Box<dyn Any>) {
        let value = value
            .downcast::<T>()
            .expect("column element type mismatch");
        self.values.push(*value);
    }

    fn swap_remove(&mut self, row: usize) -> Box<dyn Any> {
        Box::new(self.values.swap_remove(row))
    }

    fn replace(&mut self, row: usize, value: Box<dyn Any>) {
        let value = value
            .downcast::<T>()
            .expect("column element type mismatch");
        self.values[row] = *value;
    }

    fn fresh(&self) -> Box<dyn Column> {
        Box::new(Self::new())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// =============================================================================
// Archetype
// =============================================================================

/// Storage bucket for all entities sharing one exact component signature.
pub struct Archetype {
    signature: Signature,
    entities: Vec<Entity>,
    columns: HashMap<TokenId, Box<dyn Column>>,
}

impl Archetype {
    /// Creates an empty archetype from a signature and one column per token.
    ///
    /// The caller supplies exactly one column for every signature token; the
    /// token registry is the usual source of fresh columns.
    #[must_use]
    pub fn new(signature: Signature, columns: Vec<(TokenId, Box<dyn Column>)>) -> Self {
        debug_assert_eq!(signature.len(), columns.len());
        Self {
            signature,
            entities: Vec::new(),
            columns: columns.into_iter().collect(),
        }
    }

    /// Returns this archetype's signature.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns the number of entities stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if no entities are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns the owning entity for each row.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Returns the typed column for a token as a slice.
    ///
    /// Returns `None` if the token is not in the signature or `T` does not
    /// match the column's element type.
    #[must_use]
    pub fn column_slice<T: 'static>(&self, token: TokenId) -> Option<&[T]> {
        self.columns
            .get(&token)?
            .as_any()
            .downcast_ref::<TypedColumn<T>>()
            .map(TypedColumn::as_slice)
    }

    /// Returns the typed column for a token as a mutable slice.
    pub fn column_slice_mut<T: 'static>(&mut self, token: TokenId) -> Option<&mut [T]> {
        self.columns
            .get_mut(&token)?
            .as_any_mut()
            .downcast_mut::<TypedColumn<T>>()
            .map(TypedColumn::as_mut_slice)
    }

    /// Returns the base pointer of a typed column for row-wise mutable
    /// iteration across several columns at once.
    pub(crate) fn column_base_ptr<T: 'static>(&mut self, token: TokenId) -> Option<*mut T> {
        self.column_slice_mut::<T>(token)
            .map(<[T]>::as_mut_ptr)
    }

    /// Appends a row for `entity`.
    ///
    /// `values` must supply exactly the signature's tokens, each with a value
    /// of the column's element type.
    pub fn push_row(&mut self, entity: Entity, values: Vec<(TokenId, Box<dyn Any>)>) {
        debug_assert_eq!(values.len(), self.signature.len());
        for (token, value) in values {
            self.columns
                .get_mut(&token)
                .expect("value supplied for token outside archetype signature")
                .push(value);
        }
        self.entities.push(entity);
        debug_assert!(self.columns_consistent());
    }

    /// Removes the row at `row`, swapping the last row into its place.
    ///
    /// Returns the removed values and, when another entity was relocated into
    /// the vacated slot, that entity — the caller must update its record
    /// together with this move.
    pub fn swap_remove_row(&mut self, row: usize) -> (Vec<(TokenId, Box<dyn Any>)>, Option<Entity>) {
        let mut values = Vec::with_capacity(self.signature.len());
        for (&token, column) in &mut self.columns {
            values.push((token, column.swap_remove(row)));
        }
        self.entities.swap_remove(row);
        let moved = self.entities.get(row).copied();
        debug_assert!(self.columns_consistent());
        (values, moved)
    }

    /// Overwrites one value in place.
    ///
    /// No-op if the token is not in the signature.
    pub fn replace(&mut self, row: usize, token: TokenId, value: Box<dyn Any>) {
        if let Some(column) = self.columns.get_mut(&token) {
            column.replace(row, value);
        }
    }

    fn columns_consistent(&self) -> bool {
        self.columns.values().all(|c| c.len() == self.entities.len())
    }
}
