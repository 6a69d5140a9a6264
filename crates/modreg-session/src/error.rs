//! Error types for registration sessions
//!
//! Each lower crate keeps its own error enum; [`SessionError`] wraps them so
//! session operations propagate with `?`.

use modreg_change::ApplyError;
use modreg_source::{ParseError, ResolveError};
use modreg_workspace::{ConfigError, StoreError};

/// Combined session error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("apply error: {0}")]
    Apply(#[from] ApplyError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Target file is absent from the store
    #[error("could not find file for path: {path}")]
    FileNotFound { path: String },

    /// The stored file no longer matches the session snapshot
    #[error("stale snapshot of {path}: parsed {expected}, store holds {actual}")]
    StaleSnapshot {
        path: String,
        expected: String,
        actual: String,
    },
}

impl SessionError {
    /// True when the run should abort
    ///
    /// Nothing is retried: every error leaves the store untouched and ends the
    /// operation that raised it.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::Store(_)
            | Self::Resolve(_)
            | Self::Apply(_)
            | Self::Parse(_)
            | Self::FileNotFound { .. }
            | Self::StaleSnapshot { .. } => true,
        }
    }

    /// Map a store read failure, lifting `FileNotFound` to the session level
    pub(crate) fn from_read(error: StoreError) -> Self {
        match error {
            StoreError::FileNotFound { path } => Self::FileNotFound { path },
            other => Self::Store(other),
        }
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;
