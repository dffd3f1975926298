//! Error types for the Sandtable runtime.
//!
//! Uses `thiserror` for ergonomic error definition. Errors are deliberately
//! rare in this engine: lookups against missing entities, components, or
//! resources represent absence as `None` or a no-op rather than failing. The
//! error path exists for the system boundary, where a failing system aborts
//! the current tick.

use std::fmt;

use thiserror::Error;

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Sandtable operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates an error reported by a user system.
    #[must_use]
    pub fn system(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::System(message.into()))
    }

    /// Creates an internal invariant-violation error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Failure reported by a user system; aborts the current tick.
    #[error("system error: {0}")]
    System(String),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context describing where an error occurred.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// The schedule stage that was executing, if any.
    pub stage: Option<String>,
    /// The tick number at the time of the error.
    pub tick: Option<u64>,
}

impl ErrorContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: None,
            tick: None,
        }
    }

    /// Records the executing stage.
    #[must_use]
    pub fn in_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Records the tick number.
    #[must_use]
    pub fn at_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(stage) = &self.stage {
            write!(f, "stage {stage}")?;
        }
        if let Some(tick) = self.tick {
            if self.stage.is_some() {
                write!(f, ", ")?;
            }
            write!(f, "tick {tick}")?;
        }
        Ok(())
    }
}
