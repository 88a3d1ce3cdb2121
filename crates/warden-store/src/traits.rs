//! Store traits: the abstract interface the authorization engine reads from.
//!
//! The engine never writes grants. It reads principals, resource grants and
//! verification state through [`GrantStore`], and persists registry snapshots
//! through [`PermissionCatalog`] so admin surfaces can browse permissions
//! without touching process memory.

use async_trait::async_trait;
use warden_core::Permission;

use crate::error::Result;
use crate::types::{PrincipalRecord, ResourceGrant, ResourceGrantQuery, VerificationRecord};

/// Read-side storage interface for grant computation.
///
/// All methods are async to support both blocking (SQLite) and native async
/// backends. Dropping a returned future abandons the query.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Load a user with direct roles and team roles (each with permission IDs).
    ///
    /// Returns `None` if the user does not exist.
    async fn load_principal(&self, user_id: &str) -> Result<Option<PrincipalRecord>>;

    /// Resource grants matching `query`: same resource, granted to the user or
    /// one of the listed teams, and not expired at `query.now`.
    async fn resource_grants(&self, query: &ResourceGrantQuery) -> Result<Vec<ResourceGrant>>;

    /// The user's email verification record, if one was ever issued.
    async fn email_verification(&self, user_id: &str) -> Result<Option<VerificationRecord>>;

    /// Whether the local password provider currently requires email verification.
    async fn local_verification_required(&self) -> Result<bool>;
}

/// Durable copy of the permission registry.
#[async_trait]
pub trait PermissionCatalog: Send + Sync {
    /// Insert or update permissions by ID. Returns the number of rows written.
    async fn upsert_permissions(&self, permissions: &[Permission]) -> Result<usize>;

    /// All persisted permissions, sorted by ID.
    async fn list_permissions(&self) -> Result<Vec<Permission>>;
}
