//! Error taxonomy for the persistent-state subsystem.
//!
//! Read paths never surface `Io`/`Parse` to callers; they log and degrade to
//! structural defaults. Write paths and validation return these variants.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize document for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("migration aborted: could not write backup {backup}: {source}")]
    Migration {
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scope '{0}' (expected 'global' or 'project')")]
    InvalidScope(String),

    #[error("conversation index {index} is out of range (1..={len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid value for '{key}': {value} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("unknown setting '{0}'")]
    UnknownKey(String),

    #[error("no value configured for '{key}'")]
    NotFound { key: &'static str },
}

impl StateError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialize {
            path: path.into(),
            source,
        }
    }

    /// True for the explicit "no source yields a value" signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StateError::NotFound { .. })
    }

    /// True for rejected input (bad scope, index, key or value).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StateError::InvalidScope(_)
                | StateError::IndexOutOfRange { .. }
                | StateError::InvalidValue { .. }
                | StateError::UnknownKey(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StateError>;
