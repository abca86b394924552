// src/core/errors.rs

//! Defines the error taxonomy of the convergence engine.
//!
//! Validation errors reject a whole instance before anything touches the host,
//! host errors abort the remaining actions of one instance, and render errors
//! signal a renderer that could not produce a file. None of them stop the
//! orchestrator from moving on to the next instance.

use std::path::PathBuf;
use std::sync::Arc;
use strum_macros::Display;
use thiserror::Error;

/// The required fields of a monitored master, in the order the validator checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum MasterField {
    MasterIp,
    MasterPort,
    QuorumCount,
    MasterName,
}

/// A desired-state record that cannot be turned into an `EffectiveConfig`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required sentinel parameter {field} for master #{master_index}: {master}")]
    MissingMasterField {
        field: MasterField,
        master_index: usize,
        /// A rendering of the offending master record after defaults were merged.
        master: String,
    },

    #[error("Missing required instance parameter {field}")]
    MissingInstanceField { field: &'static str },

    #[error("No masters declared (neither a 'masters' list nor legacy master fields)")]
    NoMasters,

    #[error("Sentinel '{name}' is declared more than once in this run")]
    DuplicateInstance { name: String },

    #[error("Malformed sentinel entry at {field}: {reason}")]
    Malformed {
        /// The offending key, or `entry` when it cannot be pinned down.
        field: String,
        reason: String,
    },
}

/// A failure reported by a host provider while mutating or inspecting host state.
#[derive(Error, Debug, Clone)]
pub enum HostError {
    #[error("IO error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: Arc<std::io::Error>,
    },

    #[error("Command '{command}' failed with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Unknown user '{0}'")]
    UnknownUser(String),

    #[error("Unknown group '{0}'")]
    UnknownGroup(String),

    #[error("'{}' exists but is not a {expected}", path.display())]
    Conflict {
        path: PathBuf,
        expected: &'static str,
    },
}

impl HostError {
    /// Wraps an `io::Error` together with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HostError::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

impl PartialEq for HostError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostError::Io { path: p1, source: e1 }, HostError::Io { path: p2, source: e2 }) => {
                p1 == p2 && e1.kind() == e2.kind()
            }
            (HostError::UnknownUser(u1), HostError::UnknownUser(u2)) => u1 == u2,
            (HostError::UnknownGroup(g1), HostError::UnknownGroup(g2)) => g1 == g2,
            (
                HostError::Conflict { path: p1, expected: x1 },
                HostError::Conflict { path: p2, expected: x2 },
            ) => p1 == p2 && x1 == x2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

/// A template renderer could not produce text for a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Template '{template}' cannot be rendered from the supplied variables")]
    VariablesMismatch { template: String },
}

/// The per-instance error surfaced to the orchestrator's report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProvisionError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Host state error during {action}: {source}")]
    Host {
        action: String,
        #[source]
        source: HostError,
    },

    #[error("Render error during {action}: {source}")]
    Render {
        action: String,
        #[source]
        source: RenderError,
    },
}
