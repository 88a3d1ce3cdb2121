//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use warden::{Checker, CheckerConfig};
use warden_core::{register_core_permissions, PermissionRegistry};
use warden_store::{AuthProvider, MemoryStore, ResourceGrant, Result};

/// A test fixture with a registry and a memory store.
pub struct TestFixture {
    pub registry: Arc<PermissionRegistry>,
    pub store: Arc<MemoryStore>,
}

impl TestFixture {
    /// Create a fixture with the core permission catalog registered.
    pub fn new() -> Self {
        let fixture = Self::empty();
        register_core_permissions(&fixture.registry).expect("core catalog on a fresh registry");
        fixture
    }

    /// Create a fixture with an empty registry.
    pub fn empty() -> Self {
        Self {
            registry: Arc::new(PermissionRegistry::new()),
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// A checker over this fixture with default configuration.
    pub fn checker(&self) -> Checker<MemoryStore> {
        self.checker_with(CheckerConfig::default())
    }

    pub fn checker_with(&self, config: CheckerConfig) -> Checker<MemoryStore> {
        Checker::new(self.registry.clone(), self.store.clone(), config)
    }

    /// Create an OIDC user holding `permissions` through a private role.
    pub fn user_with_permissions(&self, user_id: &str, permissions: &[&str]) -> Result<()> {
        self.store.add_user(user_id, AuthProvider::Oidc)?;
        self.attach_role(user_id, permissions)
    }

    /// Create a local-auth user whose email verification is still pending,
    /// and make the local provider require verification.
    pub fn pending_local_user(&self, user_id: &str, permissions: &[&str]) -> Result<()> {
        self.store.add_user(user_id, AuthProvider::Local)?;
        self.attach_role(user_id, permissions)?;
        self.store.set_local_verification_required(true)?;
        self.store.set_verification(user_id, None)
    }

    pub fn root_user(&self, user_id: &str) -> Result<()> {
        self.store.add_user(user_id, AuthProvider::Oidc)?;
        self.store.set_root(user_id, true)
    }

    /// Create a team holding `permissions` through a private role, with
    /// `members` (who must already exist).
    pub fn team_with_permissions(
        &self,
        team_id: &str,
        permissions: &[&str],
        members: &[&str],
    ) -> Result<()> {
        let role_id = format!("{team_id}-role");
        self.store.add_team(team_id, team_id)?;
        self.store.add_role(&role_id, permissions.iter().copied())?;
        self.store.assign_team_role(team_id, &role_id)?;
        for member in members {
            self.store.add_team_member(team_id, member)?;
        }
        Ok(())
    }

    /// Grant `permission_id` to a user on one resource.
    pub fn grant_on(
        &self,
        user_id: &str,
        resource_type: &str,
        resource_id: &str,
        permission_id: &str,
        expires_at: Option<i64>,
    ) -> Result<()> {
        let mut grant = ResourceGrant::for_user(resource_type, resource_id, user_id, permission_id);
        grant.expires_at = expires_at;
        self.store.grant_resource(grant)
    }

    fn attach_role(&self, user_id: &str, permissions: &[&str]) -> Result<()> {
        let role_id = format!("{user_id}-role");
        self.store.add_role(&role_id, permissions.iter().copied())?;
        self.store.assign_role(user_id, &role_id)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registers_core_catalog() {
        let fixture = TestFixture::new();
        assert!(fixture.registry.contains("user.delete"));
        assert!(fixture.registry.validate_graph().is_ok());
        assert!(TestFixture::empty().registry.is_empty());
    }

    #[tokio::test]
    async fn test_user_fixture() {
        let fixture = TestFixture::new();
        fixture
            .user_with_permissions("alice", &["user.view", "user.edit"])
            .unwrap();

        let checker = fixture.checker();
        assert!(checker.check("alice", "user.edit").await.unwrap());
        assert!(!checker.check("alice", "user.delete").await.unwrap());
    }

    #[tokio::test]
    async fn test_team_fixture() {
        let fixture = TestFixture::new();
        fixture.user_with_permissions("alice", &[]).unwrap();
        fixture
            .team_with_permissions("ops", &["audit.view"], &["alice"])
            .unwrap();

        assert!(fixture.checker().check("alice", "audit.view").await.unwrap());
    }

    #[tokio::test]
    async fn test_pending_and_root_fixtures() {
        let fixture = TestFixture::new();
        fixture.pending_local_user("carol", &["user.view"]).unwrap();
        fixture.root_user("admin").unwrap();

        let checker = fixture.checker();
        assert!(checker.user_permissions("carol").await.unwrap().is_empty());
        assert!(checker.check("admin", "anything.at.all").await.unwrap());
    }

    #[tokio::test]
    async fn test_grant_on() {
        let fixture = TestFixture::new();
        fixture.user_with_permissions("alice", &["connection.view"]).unwrap();
        fixture
            .grant_on("alice", "connection", "c1", "connection.launch", None)
            .unwrap();
        fixture
            .grant_on("alice", "connection", "c2", "connection.launch", Some(0))
            .unwrap();

        let checker = fixture.checker();
        assert!(checker
            .check_resource("alice", "connection", "c1", "connection.launch")
            .await
            .unwrap());
        assert!(!checker
            .check_resource("alice", "connection", "c2", "connection.launch")
            .await
            .unwrap());
    }
}
