//! Error types for the permission registry and graph algorithms.

use thiserror::Error;

/// Errors raised while registering permissions or walking the permission graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("permission id must not be empty")]
    EmptyId,

    #[error("permission already registered: {0}")]
    DuplicateId(String),

    #[error("permission {0} cannot depend on itself")]
    SelfDependency(String),

    #[error("permission {0} cannot imply itself")]
    SelfImplication(String),

    #[error("unknown permission: {0}")]
    UnknownPermission(String),

    #[error("circular dependency detected at permission {0}")]
    CircularDependency(String),

    #[error("permission {permission} depends on unregistered permission {dependency}")]
    MissingDependency {
        permission: String,
        dependency: String,
    },

    #[error("permission {permission} implies unregistered permission {implied}")]
    MissingImplication { permission: String, implied: String },

    #[error("invalid protocol permission: {0}")]
    InvalidProtocolPermission(String),
}

impl CoreError {
    /// Whether this error points at a broken permission graph rather than bad input.
    pub fn is_graph_fault(&self) -> bool {
        matches!(
            self,
            CoreError::UnknownPermission(_)
                | CoreError::CircularDependency(_)
                | CoreError::MissingDependency { .. }
                | CoreError::MissingImplication { .. }
        )
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, CoreError>;
