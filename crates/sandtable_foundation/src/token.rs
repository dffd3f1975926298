//! Opaque token handles for component, resource, channel, and state kinds.
//!
//! A token is a plain identity handle: it names a "kind" and carries a
//! phantom value type so the storage layer can hand values back with their
//! original types. Tokens hold no constructor logic; a component instance is
//! simply the pair `(Component<T>, value)`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Raw opaque kind identifier.
///
/// Minted once per kind by a world's token registry and unique within that
/// world for the life of the process.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TokenId(u32);

impl TokenId {
    /// Creates a token id from a raw index.
    ///
    /// Ids are normally minted by a registry; this exists for storage
    /// internals and tests.
    #[must_use]
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this token.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.0)
    }
}

/// Typed handle for a component kind.
///
/// Copyable identity only; the value type `T` is phantom. Two handles are
/// equal when they carry the same [`TokenId`].
pub struct Component<T> {
    id: TokenId,
    _marker: PhantomData<fn() -> T>,
}

/// Typed handle for a singleton resource kind.
pub struct Resource<T> {
    id: TokenId,
    _marker: PhantomData<fn() -> T>,
}

/// Typed handle for an event or message channel kind.
///
/// Events and messages share one queue mechanism; the two registration
/// surfaces exist so callers can keep the broadcast/command distinction in
/// their own naming.
pub struct Channel<T> {
    id: TokenId,
    _marker: PhantomData<fn() -> T>,
}

macro_rules! impl_typed_token {
    ($name:ident) => {
        impl<T> $name<T> {
            /// Creates a handle from a raw token id.
            #[must_use]
            pub const fn from_raw(id: TokenId) -> Self {
                Self {
                    id,
                    _marker: PhantomData,
                }
            }

            /// Returns the underlying token id.
            #[must_use]
            pub const fn id(self) -> TokenId {
                self.id
            }
        }

        // Manual impls: derives would bound `T`, but the handle is identity
        // only and never owns a `T`.
        impl<T> Copy for $name<T> {}

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> PartialEq for $name<T> {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl<T> Eq for $name<T> {}

        impl<T> Hash for $name<T> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.id.index())
            }
        }
    };
}

impl_typed_token!(Component);
impl_typed_token!(Resource);
impl_typed_token!(Channel);

/// Handle for a finite-state-machine kind.
///
/// State values are named strings declared at registration; the handle
/// itself is untyped.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct StateToken(TokenId);

impl StateToken {
    /// Creates a handle from a raw token id.
    #[must_use]
    pub const fn from_raw(id: TokenId) -> Self {
        Self(id)
    }

    /// Returns the underlying token id.
    #[must_use]
    pub const fn id(self) -> TokenId {
        self.0
    }
}

impl fmt::Debug for StateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateToken({})", self.0.index())
    }
}

/// Schedule stage identifier.
///
/// The built-in stages occupy reserved indices, in tick order. Dynamic
/// enter/exit stages for state transitions are minted above
/// [`StageId::DYNAMIC_BASE`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StageId(u32);

impl StageId {
    // =========================================================================
    // Reserved Stages
    // =========================================================================
    // Fixed indices, in execution order.

    /// Runs once via the init entry point, before the first tick.
    pub const STARTUP: StageId = StageId(0);

    /// First per-tick stage.
    pub const PRE_UPDATE: StageId = StageId(1);

    /// Main per-tick stage; runs after state-transition dispatch.
    pub const UPDATE: StageId = StageId(2);

    /// Runs after [`StageId::UPDATE`].
    pub const POST_UPDATE: StageId = StageId(3);

    /// Last per-tick stage.
    pub const RENDER: StageId = StageId(4);

    /// First index available for dynamically minted stages.
    pub const DYNAMIC_BASE: u32 = 5;

    /// Creates a stage id from a raw index.
    #[must_use]
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this stage.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Returns the display name of this stage.
    ///
    /// Dynamic stages report as `"dynamic"`; their transition names live in
    /// the schedule that minted them.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self.0 {
            0 => "startup",
            1 => "pre_update",
            2 => "update",
            3 => "post_update",
            4 => "render",
            _ => "dynamic",
        }
    }
}

impl fmt::Debug for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StageId({}:{})", self.0, self.name())
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
