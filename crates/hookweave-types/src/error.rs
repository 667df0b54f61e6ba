//! Unified error type for hookweave.
//!
//! All crates map their internal failures into [`HookError`] so the
//! dispatch engine can distinguish, at a single point, errors that are
//! absorbed and routed to the `pluginError` hook from errors that must
//! surface directly to the caller of `dispatch` (invalid state
//! transitions, wait timeouts).

use std::fmt;

use thiserror::Error;

/// Category of a [`HookError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A handler, plugin setup routine, or the framework itself failed
    /// unexpectedly. Absorbed by the dispatch engine and routed to
    /// `pluginError` unless explicitly marked caller-facing.
    Internal,
    /// A plugin with the requested name is not registered.
    NotFound,
    /// An operation was rejected because of a naming conflict (duplicate
    /// plugin registration).
    Conflict,
    /// A state transition was attempted that the registered schema does
    /// not allow. Always caller-facing.
    InvalidTransition,
    /// A `waitForState` call reached its timeout. Always caller-facing.
    Timeout,
    /// A deferred-emission hook exceeded its recursion bound.
    RecursionBound,
    /// Configuration could not be loaded or parsed.
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Internal => "INTERNAL",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::Timeout => "TIMEOUT",
            Self::RecursionBound => "RECURSION_BOUND",
            Self::Configuration => "CONFIGURATION",
        };
        write!(f, "{s}")
    }
}

/// The unified error type used throughout hookweave.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct HookError {
    /// The category of error.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Clone for HookError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl HookError {
    /// Creates a new error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new error with an underlying cause attached.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// A handler or plugin routine failed unexpectedly.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// No plugin or handler matches the given name.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// A naming conflict occurred (e.g. duplicate plugin registration).
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// A state transition was rejected by a registered schema.
    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTransition, message)
    }

    /// A `waitForState` call timed out.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// A deferred-emission hook hit its recursion bound.
    pub fn recursion_bound(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RecursionBound, message)
    }

    /// Configuration could not be loaded.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Whether this error is meant to surface directly to a `dispatch`
    /// caller rather than being absorbed into `pluginError`.
    pub fn is_caller_facing(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidTransition | ErrorKind::Timeout)
    }
}

impl From<serde_json::Error> for HookError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("JSON error: {err}"), err)
    }
}

impl From<config::ConfigError> for HookError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("configuration error: {err}"),
            err,
        )
    }
}
