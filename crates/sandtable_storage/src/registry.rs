//! Token registry: mints opaque kind identifiers.
//!
//! Every component, resource, channel, and state kind is issued one token
//! for the life of the registry. The registry is owned by a single world, so
//! two worlds in one process never share identity — there is no global
//! state. For component kinds the registry also captures a column
//! constructor, letting archetypes build columns for tokens whose value type
//! is no longer statically known at the migration site.

use std::any::type_name;
use std::collections::HashMap;

use sandtable_foundation::{Channel, Component, Resource, StateToken, TokenId};

use crate::archetype::{Column, TypedColumn};

fn fresh_column<T: 'static>() -> Box<dyn Column> {
    Box::new(TypedColumn::<T>::new())
}

struct ComponentInfo {
    name: &'static str,
    new_column: fn() -> Box<dyn Column>,
}

/// Declaration of a finite-state-machine kind: its named values and the
/// index of the initial value.
#[derive(Clone, Debug)]
pub struct StateDecl {
    /// The fixed set of named values, in declaration order.
    pub values: Vec<String>,
    /// Index of the initial value within `values`.
    pub initial: usize,
}

/// Issues unique opaque identifiers for component, resource, channel, and
/// state kinds.
#[derive(Default)]
pub struct TokenRegistry {
    next: u32,
    components: HashMap<TokenId, ComponentInfo>,
    resources: HashMap<TokenId, &'static str>,
    channels: HashMap<TokenId, &'static str>,
    states: HashMap<TokenId, StateDecl>,
}

impl TokenRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn mint(&mut self) -> TokenId {
        let id = TokenId::from_raw(self.next);
        self.next += 1;
        id
    }

    /// Mints a component token for value type `T`.
    pub fn register_component<T: 'static>(&mut self) -> Component<T> {
        let id = self.mint();
        self.components.insert(
            id,
            ComponentInfo {
                name: type_name::<T>(),
                new_column: fresh_column::<T>,
            },
        );
        Component::from_raw(id)
    }

    /// Mints a resource token for value type `T`.
    pub fn register_resource<T: 'static>(&mut self) -> Resource<T> {
        let id = self.mint();
        self.resources.insert(id, type_name::<T>());
        Resource::from_raw(id)
    }

    /// Mints a channel token for payload type `T`.
    pub fn register_channel<T: 'static>(&mut self) -> Channel<T> {
        let id = self.mint();
        self.channels.insert(id, type_name::<T>());
        Channel::from_raw(id)
    }

    /// Mints a state token with the given named values and initial value.
    ///
    /// An `initial` value missing from `values` falls back to the first
    /// declared value.
    pub fn register_state(&mut self, values: &[&str], initial: &str) -> StateToken {
        let values: Vec<String> = values.iter().map(|v| (*v).to_string()).collect();
        let initial = values.iter().position(|v| v == initial).unwrap_or(0);
        let id = self.mint();
        self.states.insert(id, StateDecl { values, initial });
        StateToken::from_raw(id)
    }

    /// Returns the diagnostic name of a component token.
    #[must_use]
    pub fn component_name(&self, token: TokenId) -> Option<&'static str> {
        self.components.get(&token).map(|info| info.name)
    }

    /// Builds a fresh, empty column for a component token.
    #[must_use]
    pub fn new_column(&self, token: TokenId) -> Option<Box<dyn Column>> {
        self.components.get(&token).map(|info| (info.new_column)())
    }

    /// Returns the declaration of a state token.
    #[must_use]
    pub fn state_decl(&self, token: TokenId) -> Option<&StateDecl> {
        self.states.get(&token)
    }
}
