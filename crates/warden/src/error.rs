//! Error types for permission checks.
//!
//! A denial is not an error. `Ok(false)` is the normal outcome of a check
//! the user fails; every variant below means the check itself could not be
//! completed.

use std::time::Duration;

use thiserror::Error;
use warden_core::CoreError;
use warden_perms::PermsError;
use warden_store::StoreError;

/// Text safe to show to end users for any check failure.
pub const PUBLIC_FAILURE_MESSAGE: &str = "permission check failed";

/// Errors that can occur while checking a permission.
#[derive(Debug, Error)]
pub enum CheckError {
    /// A required identifier was blank.
    #[error("{0} must not be blank")]
    InvalidInput(&'static str),

    /// Storage failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A referenced permission is not registered.
    #[error("unknown permission: {0}")]
    UnknownPermission(String),

    /// The dependency graph has a cycle.
    #[error("circular dependency detected at permission: {0}")]
    CircularDependency(String),

    /// The user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Storage did not answer within the configured bound.
    #[error("storage did not respond within {0:?}")]
    Timeout(Duration),

    /// Any other registry fault.
    #[error("registry error: {0}")]
    Core(CoreError),
}

impl CheckError {
    /// Whether the error points at a broken permission graph rather than at
    /// the caller or the storage layer. These should alarm operators.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            CheckError::UnknownPermission(_) | CheckError::CircularDependency(_)
        )
    }

    /// Whether storage failed or timed out.
    pub fn is_storage(&self) -> bool {
        matches!(self, CheckError::Store(_) | CheckError::Timeout(_))
    }

    /// Generic message for responses. Never includes internal detail.
    pub fn public_message(&self) -> &'static str {
        PUBLIC_FAILURE_MESSAGE
    }
}

impl From<CoreError> for CheckError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::UnknownPermission(id) => CheckError::UnknownPermission(id),
            CoreError::CircularDependency(id) => CheckError::CircularDependency(id),
            other => CheckError::Core(other),
        }
    }
}

impl From<PermsError> for CheckError {
    fn from(e: PermsError) -> Self {
        match e {
            PermsError::UserNotFound(id) => CheckError::UserNotFound(id),
            PermsError::Store(e) => CheckError::Store(e),
            PermsError::Core(e) => e.into(),
        }
    }
}

/// Result type for permission checks.
pub type Result<T> = std::result::Result<T, CheckError>;
