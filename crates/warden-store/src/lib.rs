//! # Warden Store
//!
//! Storage abstraction for the warden permission engine. Provides trait-based
//! read access to principals, role and team memberships, resource grants and
//! email verification state, with SQLite and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`GrantStore`] - The async trait the grant loader reads from
//! - [`PermissionCatalog`] - Durable snapshot of the permission registry
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`PrincipalRecord`] - A user with direct roles and team roles
//! - [`ResourceGrant`] - A permission granted on one resource
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warden_store::{AuthProvider, GrantStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("warden.db").unwrap();
//!
//!     store.add_user("alice", AuthProvider::Local).unwrap();
//!     store.add_role("viewer", ["user.view"]).unwrap();
//!     store.assign_role("alice", "viewer").unwrap();
//!
//!     let alice = store.load_principal("alice").await.unwrap();
//!     assert!(alice.is_some());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Read-only engine**: the permission engine only reads through [`GrantStore`];
//!   the seeding helpers on each backend stand in for the admin surfaces
//! - **Expiry in the query**: expired resource grants are filtered by the store
//! - **Timestamps**: all times are Unix milliseconds (`i64`)

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, LOCAL_VERIFICATION_SETTING};
pub use traits::{GrantStore, PermissionCatalog};
pub use types::{
    AuthProvider, PrincipalRecord, PrincipalType, ResourceGrant, ResourceGrantQuery, RoleRecord,
    TeamRecord, VerificationRecord,
};

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
