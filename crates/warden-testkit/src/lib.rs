//! # Warden Testkit
//!
//! Testing utilities for the warden permission engine.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a registry and memory store seeded for common scenarios
//! - **Generators**: Proptest strategies for permission graphs
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use warden_testkit::generators::{acyclic_graph, PermissionGraph};
//!
//! proptest! {
//!     #[test]
//!     fn every_node_resolves(graph in acyclic_graph(16)) {
//!         let registry = graph.registry();
//!         for id in graph.ids() {
//!             prop_assert!(registry.resolve_dependencies(&id).is_ok());
//!         }
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use warden_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! fixture.user_with_permissions("alice", &["user.view"]).unwrap();
//! let checker = fixture.checker();
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::TestFixture;
pub use generators::{acyclic_graph, dependency_cycle, PermissionGraph};
