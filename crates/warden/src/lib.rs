//! # Warden
//!
//! Permission resolution for the warden remote-access gateway.
//!
//! ## Overview
//!
//! Feature and protocol modules register their permissions in a shared
//! [`PermissionRegistry`] at startup. Each protected route then asks the
//! [`Checker`] whether the current user may proceed. The checker loads the
//! user's grants from storage (direct roles, team roles and resource grants),
//! expands them through `implies` edges and requires every transitive
//! `depends_on` prerequisite to be held as well.
//!
//! ## Key Concepts
//!
//! - **Dependency (`depends_on`)**: a precondition; never granted automatically
//! - **Implication (`implies`)**: an automatic grant of finer permissions
//! - **Root**: bypasses every check, for any permission
//! - **Denial**: `Ok(false)`, never an error
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden::{Checker, CheckerConfig};
//! use warden::core::{register_core_permissions, PermissionRegistry};
//! use warden::store::SqliteStore;
//!
//! async fn example() {
//!     let registry = Arc::new(PermissionRegistry::new());
//!     register_core_permissions(&registry).unwrap();
//!     registry.validate_graph().unwrap();
//!
//!     let store = Arc::new(SqliteStore::open("warden.db").unwrap());
//!     let checker = Checker::new(registry, store, CheckerConfig::default());
//!     checker.sync_catalog().await.unwrap();
//!
//!     match checker.check("alice", "user.delete").await {
//!         Ok(true) => { /* 200 */ }
//!         Ok(false) => { /* 403 */ }
//!         Err(e) => { /* 500 with e.public_message() */ }
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `warden::core` - Permission definitions, registry and graph algorithms
//! - `warden::store` - Storage traits, SQLite and in-memory stores
//! - `warden::perms` - Grant loading

pub mod catalog;
pub mod checker;
pub mod decision;
pub mod error;

// Re-export component crates
pub use warden_core as core;
pub use warden_perms as perms;
pub use warden_store as store;

// Re-export main types for convenience
pub use catalog::sync_registry;
pub use checker::{Checker, CheckerConfig};
pub use decision::{Decision, DecisionReason};
pub use error::{CheckError, Result, PUBLIC_FAILURE_MESSAGE};

pub use warden_core::{CoreError, DefaultScope, Permission, PermissionRegistry};
