//! Finite-state-machine storage.
//!
//! Each state token owns a fixed set of named values and one current slot.
//! Transitions set a dirty flag; the engine drains dirty entries once per
//! tick (between the pre-update and update stages) and runs the matching
//! exit/enter stages.

use std::collections::HashMap;

use sandtable_foundation::{StateToken, TokenId};

use crate::registry::StateDecl;

struct StateEntry {
    values: Vec<String>,
    current: usize,
    previous: Option<usize>,
    dirty: bool,
}

/// A dirty state entry drained for dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateTransition {
    /// The state token that transitioned.
    pub token: StateToken,
    /// The value left, when this is a transition rather than the initial
    /// activation.
    pub previous: Option<String>,
    /// The value entered.
    pub current: String,
}

/// Active state entries for one world.
#[derive(Default)]
pub struct StateStore {
    entries: HashMap<TokenId, StateEntry>,
}

impl StateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates a state at its declared initial value, dirty so the first
    /// tick dispatches an initial enter. Re-inserting an active state resets
    /// it the same way.
    pub fn insert(&mut self, token: StateToken, decl: &StateDecl) {
        self.entries.insert(
            token.id(),
            StateEntry {
                values: decl.values.clone(),
                current: decl.initial,
                previous: None,
                dirty: true,
            },
        );
    }

    /// Transitions a state to a named value.
    ///
    /// No-op when the state is not active, the value is unknown, or the
    /// value already is current.
    pub fn set(&mut self, token: StateToken, value: &str) {
        let Some(entry) = self.entries.get_mut(&token.id()) else {
            return;
        };
        let Some(index) = entry.values.iter().position(|v| v == value) else {
            return;
        };
        if index == entry.current {
            return;
        }
        entry.previous = Some(entry.current);
        entry.current = index;
        entry.dirty = true;
    }

    /// Returns the current value of an active state.
    #[must_use]
    pub fn current(&self, token: StateToken) -> Option<&str> {
        let entry = self.entries.get(&token.id())?;
        Some(&entry.values[entry.current])
    }

    /// Drains every dirty entry, clearing previous and dirty.
    ///
    /// Transitions made while the drained batch is being dispatched dirty
    /// their entries again and surface on the next tick.
    pub fn drain_dirty(&mut self) -> Vec<StateTransition> {
        let mut out = Vec::new();
        for (&token, entry) in &mut self.entries {
            if !entry.dirty {
                continue;
            }
            out.push(StateTransition {
                token: StateToken::from_raw(token),
                previous: entry.previous.map(|i| entry.values[i].clone()),
                current: entry.values[entry.current].clone(),
            });
            entry.previous = None;
            entry.dirty = false;
        }
        out
    }
}
