//! Error types for the grant loader.

use thiserror::Error;
use warden_core::CoreError;
use warden_store::StoreError;

/// Errors that can occur while materializing a user's grants.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The user does not exist in storage.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Storage failed; propagated as-is, never turned into a denial.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A granted permission references the registry in an invalid way.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for grant loading.
pub type Result<T> = std::result::Result<T, PermsError>;
