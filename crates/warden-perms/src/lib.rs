//! # Warden Permissions
//!
//! Grant materialization: computing what a user may do right now.
//!
//! ## Overview
//!
//! Permissions are never stored as a flat per-user list. A user's effective
//! set is derived on every check from their direct roles, the roles of every
//! team they belong to and, for resource-scoped checks, the resource grants
//! attached to them or their teams. The union is then expanded through the
//! registry's `implies` edges.
//!
//! ## Key Concepts
//!
//! - **Root**: bypasses everything; no permission set is computed
//! - **Verification gate**: a local-auth user with an unfinished email
//!   verification is recognized but holds nothing
//! - **Resource grants**: permissions bound to one `(resource_type, resource_id)`,
//!   optionally expiring; merged with role-derived grants
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_core::{register_core_permissions, PermissionRegistry};
//! use warden_perms::GrantLoader;
//! use warden_store::MemoryStore;
//!
//! async fn example() {
//!     let registry = Arc::new(PermissionRegistry::new());
//!     register_core_permissions(&registry).unwrap();
//!     let store = Arc::new(MemoryStore::new());
//!
//!     let loader = GrantLoader::new(registry, store);
//!     let grants = loader.load("alice").await;
//! }
//! ```

pub mod error;
pub mod loader;
pub mod state;

pub use error::{PermsError, Result};
pub use loader::GrantLoader;
pub use state::UserGrants;
