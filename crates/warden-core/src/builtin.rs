//! The gateway's core permission catalog.

use crate::error::Result;
use crate::permission::{DefaultScope, Permission};
use crate::registry::PermissionRegistry;

/// Module name owning the core permissions.
pub const CORE_MODULE: &str = "core";

fn core(id: &str, category: &str, display_name: &str, description: &str) -> Permission {
    Permission::new(id, CORE_MODULE)
        .with_category(category)
        .with_display_name(display_name)
        .with_description(description)
}

/// Definitions for the core module.
pub fn core_permissions() -> Vec<Permission> {
    vec![
        // Users
        core("user.view", "users", "View users", "List and inspect user accounts"),
        core("user.create", "users", "Create users", "Create user accounts")
            .depends_on(["user.view"]),
        core("user.edit", "users", "Edit users", "Update user accounts")
            .depends_on(["user.view"]),
        core("user.delete", "users", "Delete users", "Delete user accounts")
            .depends_on(["user.view", "user.edit"]),
        core("user.manage", "users", "Manage users", "Full control over user accounts")
            .depends_on(["user.view"])
            .implies(["user.view", "user.create", "user.edit", "user.delete"]),
        // Teams
        core("team.view", "teams", "View teams", "List teams and their members"),
        core("team.manage", "teams", "Manage teams", "Create teams and change membership")
            .depends_on(["team.view"]),
        // Roles and permissions
        core("role.view", "roles", "View roles", "List roles and their permissions"),
        core("role.manage", "roles", "Manage roles", "Create roles and change their permissions")
            .depends_on(["role.view"]),
        core("permission.view", "permissions", "View permissions", "Browse the permission catalog"),
        core(
            "permission.manage",
            "permissions",
            "Manage permissions",
            "Grant and revoke resource permissions",
        )
        .depends_on(["permission.view"]),
        // Connections
        core("connection.view", "connections", "View connections", "See connection entries")
            .with_scope(DefaultScope::Resource),
        core("connection.launch", "connections", "Launch connections", "Open a session")
            .with_scope(DefaultScope::Resource)
            .depends_on(["connection.view"]),
        core("connection.manage", "connections", "Manage connections", "Edit and delete connections")
            .with_scope(DefaultScope::Resource)
            .depends_on(["connection.view"])
            .implies(["connection.view", "connection.launch"]),
        core("connection.share", "connections", "Share connections", "Share a connection with others")
            .with_scope(DefaultScope::Resource)
            .depends_on(["connection.view"]),
        // Audit
        core("audit.view", "audit", "View audit log", "Read the audit log"),
    ]
}

/// Register the core permissions into `registry`.
pub fn register_core_permissions(registry: &PermissionRegistry) -> Result<()> {
    registry.register_all(core_permissions())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_catalog_is_consistent() {
        let registry = PermissionRegistry::new();
        register_core_permissions(&registry).unwrap();

        registry.validate_graph().unwrap();
        assert_eq!(registry.get_by_module(CORE_MODULE).len(), core_permissions().len());
    }

    #[test]
    fn test_manage_implies_its_parts() {
        let registry = PermissionRegistry::new();
        register_core_permissions(&registry).unwrap();

        let expanded = registry.expand_implied(["user.manage"]).unwrap();
        for id in ["user.view", "user.create", "user.edit", "user.delete"] {
            assert!(expanded.contains(id), "missing {id}");
        }
        assert!(!expanded.contains("team.view"));
    }

    #[test]
    fn test_registering_twice_fails() {
        let registry = PermissionRegistry::new();
        register_core_permissions(&registry).unwrap();
        assert!(register_core_permissions(&registry).is_err());
    }
}
