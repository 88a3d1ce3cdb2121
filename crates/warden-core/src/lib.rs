//! # Warden Core
//!
//! Pure primitives for the warden authorization engine: permission
//! definitions, the permission registry, and the graph algorithms that run
//! over it.
//!
//! This crate contains no I/O, no storage, no async. Everything here is
//! in-memory computation over the registry.
//!
//! ## Key Types
//!
//! - [`Permission`] - A named capability with `depends_on` and `implies` edges
//! - [`PermissionRegistry`] - Thread-safe catalog populated at startup
//! - [`CoreError`] - Registration and graph errors
//!
//! ## Graph Algorithms
//!
//! - [`PermissionRegistry::resolve_dependencies`] - transitive `depends_on`
//!   closure with cycle detection
//! - [`PermissionRegistry::expand_implied`] - transitive `implies` closure
//!
//! ## Usage
//!
//! ```rust
//! use warden_core::{Permission, PermissionRegistry};
//!
//! let registry = PermissionRegistry::new();
//! registry.register(Permission::new("user.view", "core")).unwrap();
//! registry
//!     .register(Permission::new("user.edit", "core").depends_on(["user.view"]))
//!     .unwrap();
//!
//! assert_eq!(registry.resolve_dependencies("user.edit").unwrap(), vec!["user.view"]);
//! ```

pub mod builtin;
pub mod dependency;
pub mod error;
pub mod implication;
pub mod permission;
pub mod protocol;
pub mod registry;

pub use builtin::{core_permissions, register_core_permissions, CORE_MODULE};
pub use error::{CoreError, Result};
pub use permission::{DefaultScope, Permission};
pub use protocol::{protocol_category, protocol_module, protocol_permission_id};
pub use registry::PermissionRegistry;
