//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use warden_core::Permission;

use crate::error::{Result, StoreError};
use crate::traits::{GrantStore, PermissionCatalog};
use crate::types::{
    AuthProvider, PrincipalRecord, ResourceGrant, ResourceGrantQuery, RoleRecord, TeamRecord,
    VerificationRecord,
};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    users: BTreeMap<String, StoredUser>,

    /// Roles indexed by ID.
    roles: BTreeMap<String, StoredRole>,

    /// Teams indexed by ID.
    teams: BTreeMap<String, StoredTeam>,

    resource_grants: Vec<ResourceGrant>,

    verifications: BTreeMap<String, VerificationRecord>,

    local_verification_required: bool,

    /// Persisted permission catalog.
    catalog: BTreeMap<String, Permission>,
}

struct StoredUser {
    is_root: bool,
    auth_provider: AuthProvider,
    role_ids: BTreeSet<String>,
}

struct StoredRole {
    name: String,
    permissions: BTreeSet<String>,
}

struct StoredTeam {
    name: String,
    members: BTreeSet<String>,
    role_ids: BTreeSet<String>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Seeding
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a user, or update the provider of an existing one. Root flag
    /// and role assignments survive.
    pub fn add_user(&self, user_id: &str, auth_provider: AuthProvider) -> Result<()> {
        self.write()?
            .users
            .entry(user_id.to_string())
            .and_modify(|user| user.auth_provider = auth_provider.clone())
            .or_insert_with(|| StoredUser {
                is_root: false,
                auth_provider,
                role_ids: BTreeSet::new(),
            });
        Ok(())
    }

    /// Flip a user's root flag.
    pub fn set_root(&self, user_id: &str, is_root: bool) -> Result<()> {
        let mut inner = self.write()?;
        let user = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;
        user.is_root = is_root;
        Ok(())
    }

    /// Create or replace a role with the given permission IDs.
    pub fn add_role<I, S>(&self, role_id: &str, permissions: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write()?.roles.insert(
            role_id.to_string(),
            StoredRole {
                name: role_id.to_string(),
                permissions: permissions.into_iter().map(Into::into).collect(),
            },
        );
        Ok(())
    }

    /// Attach a permission to an existing role.
    pub fn add_role_permission(&self, role_id: &str, permission_id: &str) -> Result<()> {
        let mut inner = self.write()?;
        let role = inner
            .roles
            .get_mut(role_id)
            .ok_or_else(|| StoreError::NotFound(format!("role {role_id}")))?;
        role.permissions.insert(permission_id.to_string());
        Ok(())
    }

    pub fn assign_role(&self, user_id: &str, role_id: &str) -> Result<()> {
        let mut inner = self.write()?;
        if !inner.roles.contains_key(role_id) {
            return Err(StoreError::NotFound(format!("role {role_id}")));
        }
        let user = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;
        user.role_ids.insert(role_id.to_string());
        Ok(())
    }

    /// Create a team, or rename an existing one. Members and roles survive.
    pub fn add_team(&self, team_id: &str, name: &str) -> Result<()> {
        self.write()?
            .teams
            .entry(team_id.to_string())
            .and_modify(|team| team.name = name.to_string())
            .or_insert_with(|| StoredTeam {
                name: name.to_string(),
                members: BTreeSet::new(),
                role_ids: BTreeSet::new(),
            });
        Ok(())
    }

    pub fn add_team_member(&self, team_id: &str, user_id: &str) -> Result<()> {
        let mut inner = self.write()?;
        if !inner.users.contains_key(user_id) {
            return Err(StoreError::NotFound(format!("user {user_id}")));
        }
        let team = inner
            .teams
            .get_mut(team_id)
            .ok_or_else(|| StoreError::NotFound(format!("team {team_id}")))?;
        team.members.insert(user_id.to_string());
        Ok(())
    }

    pub fn assign_team_role(&self, team_id: &str, role_id: &str) -> Result<()> {
        let mut inner = self.write()?;
        if !inner.roles.contains_key(role_id) {
            return Err(StoreError::NotFound(format!("role {role_id}")));
        }
        let team = inner
            .teams
            .get_mut(team_id)
            .ok_or_else(|| StoreError::NotFound(format!("team {team_id}")))?;
        team.role_ids.insert(role_id.to_string());
        Ok(())
    }

    /// Insert a resource grant, replacing the expiry of an identical one.
    pub fn grant_resource(&self, grant: ResourceGrant) -> Result<()> {
        let mut inner = self.write()?;
        match inner.resource_grants.iter_mut().find(|g| same_grant(g, &grant)) {
            Some(existing) => existing.expires_at = grant.expires_at,
            None => inner.resource_grants.push(grant),
        }
        Ok(())
    }

    /// Remove the resource grant matching `grant`, ignoring expiry.
    pub fn revoke_resource(&self, grant: &ResourceGrant) -> Result<usize> {
        let mut inner = self.write()?;
        let before = inner.resource_grants.len();
        inner.resource_grants.retain(|g| !same_grant(g, grant));
        Ok(before - inner.resource_grants.len())
    }

    /// Record a verification for `user_id`; `None` means still pending.
    pub fn set_verification(&self, user_id: &str, verified_at: Option<i64>) -> Result<()> {
        self.write()?.verifications.insert(
            user_id.to_string(),
            VerificationRecord {
                user_id: user_id.to_string(),
                verified_at,
            },
        );
        Ok(())
    }

    pub fn set_local_verification_required(&self, required: bool) -> Result<()> {
        self.write()?.local_verification_required = required;
        Ok(())
    }
}

/// Identity of a resource grant, as keyed in SQLite.
fn same_grant(a: &ResourceGrant, b: &ResourceGrant) -> bool {
    a.resource_type == b.resource_type
        && a.resource_id == b.resource_id
        && a.principal_type == b.principal_type
        && a.principal_id == b.principal_id
        && a.permission_id == b.permission_id
}

fn role_record(role_id: &str, role: &StoredRole) -> RoleRecord {
    RoleRecord {
        id: role_id.to_string(),
        name: role.name.clone(),
        permissions: role.permissions.iter().cloned().collect(),
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn load_principal(&self, user_id: &str) -> Result<Option<PrincipalRecord>> {
        let inner = self.read()?;
        let Some(user) = inner.users.get(user_id) else {
            return Ok(None);
        };

        let roles = user
            .role_ids
            .iter()
            .filter_map(|id| inner.roles.get(id).map(|r| role_record(id, r)))
            .collect();

        let teams = inner
            .teams
            .iter()
            .filter(|(_, team)| team.members.contains(user_id))
            .map(|(team_id, team)| TeamRecord {
                id: team_id.clone(),
                name: team.name.clone(),
                roles: team
                    .role_ids
                    .iter()
                    .filter_map(|id| inner.roles.get(id).map(|r| role_record(id, r)))
                    .collect(),
            })
            .collect();

        Ok(Some(PrincipalRecord {
            user_id: user_id.to_string(),
            is_root: user.is_root,
            auth_provider: user.auth_provider.clone(),
            roles,
            teams,
        }))
    }

    async fn resource_grants(&self, query: &ResourceGrantQuery) -> Result<Vec<ResourceGrant>> {
        let inner = self.read()?;
        Ok(inner
            .resource_grants
            .iter()
            .filter(|g| query.matches(g))
            .cloned()
            .collect())
    }

    async fn email_verification(&self, user_id: &str) -> Result<Option<VerificationRecord>> {
        let inner = self.read()?;
        Ok(inner.verifications.get(user_id).cloned())
    }

    async fn local_verification_required(&self) -> Result<bool> {
        Ok(self.read()?.local_verification_required)
    }
}

#[async_trait]
impl PermissionCatalog for MemoryStore {
    async fn upsert_permissions(&self, permissions: &[Permission]) -> Result<usize> {
        let mut inner = self.write()?;
        for permission in permissions {
            inner
                .catalog
                .insert(permission.id.clone(), permission.clone());
        }
        Ok(permissions.len())
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>> {
        Ok(self.read()?.catalog.values().cloned().collect())
    }
}
