//! Grant loading: turn storage records into a [`UserGrants`].
//!
//! The loader performs, in order:
//!
//! 1. Load the principal (direct roles, teams and team roles)
//! 2. Root short-circuit: no permission set is computed for root
//! 3. Verification gate for local-auth users
//! 4. Union of role-derived permission IDs, expanded through `implies`
//!
//! Resource-scoped checks add a second step that fetches live resource
//! grants for the user and their teams, expands them the same way and
//! merges them into the role-derived set.

use std::collections::HashSet;
use std::sync::Arc;

use warden_core::PermissionRegistry;
use warden_store::{GrantStore, PrincipalRecord, ResourceGrantQuery};

use crate::error::{PermsError, Result};
use crate::state::UserGrants;

/// Materializes [`UserGrants`] from a [`GrantStore`].
pub struct GrantLoader<S: ?Sized> {
    registry: Arc<PermissionRegistry>,
    store: Arc<S>,
    enforce_verification: bool,
}

impl<S: ?Sized> Clone for GrantLoader<S> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            store: self.store.clone(),
            enforce_verification: self.enforce_verification,
        }
    }
}

impl<S: GrantStore + ?Sized> GrantLoader<S> {
    /// Create a loader with the verification gate enabled.
    pub fn new(registry: Arc<PermissionRegistry>, store: Arc<S>) -> Self {
        Self {
            registry,
            store,
            enforce_verification: true,
        }
    }

    /// Enable or disable the email verification gate.
    pub fn with_verification(mut self, enforce: bool) -> Self {
        self.enforce_verification = enforce;
        self
    }

    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Load the role-derived grants of `user_id`.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if storage has no such user
    /// - `Store` if any storage query fails
    /// - `Core(UnknownPermission)` if a role grants an unregistered permission
    pub async fn load(&self, user_id: &str) -> Result<UserGrants> {
        let principal = self
            .store
            .load_principal(user_id)
            .await?
            .ok_or_else(|| PermsError::UserNotFound(user_id.to_string()))?;

        if principal.is_root {
            return Ok(UserGrants::root(user_id));
        }

        let team_ids = principal.team_ids();

        if self.verification_pending(&principal).await? {
            tracing::debug!(user = user_id, "email verification pending; withholding grants");
            return Ok(UserGrants::pending_verification(user_id, team_ids));
        }

        let permissions = self
            .registry
            .expand_implied(principal.role_permission_ids())?;

        Ok(UserGrants::new(user_id, team_ids, permissions))
    }

    /// Expanded permissions granted to `grants`' user (directly or through a
    /// team) on one resource, considering only grants live at `now`.
    ///
    /// Root and verification-pending users get an empty set: root never
    /// needs resource grants and a pending user carries none.
    pub async fn resource_permissions(
        &self,
        grants: &UserGrants,
        resource_type: &str,
        resource_id: &str,
        now: i64,
    ) -> Result<HashSet<String>> {
        if grants.is_root || grants.verification_pending {
            return Ok(HashSet::new());
        }

        let query = ResourceGrantQuery {
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            user_id: grants.user_id.clone(),
            team_ids: grants.team_ids.clone(),
            now,
        };
        let rows = self.store.resource_grants(&query).await?;

        let live = rows
            .iter()
            .filter(|g| g.is_active(now))
            .map(|g| g.permission_id.as_str());

        Ok(self.registry.expand_implied(live)?)
    }

    /// Role-derived grants merged with the resource grants live at `now`.
    pub async fn load_for_resource(
        &self,
        user_id: &str,
        resource_type: &str,
        resource_id: &str,
        now: i64,
    ) -> Result<UserGrants> {
        let mut grants = self.load(user_id).await?;
        let extra = self
            .resource_permissions(&grants, resource_type, resource_id, now)
            .await?;
        grants.merge(extra);
        Ok(grants)
    }

    /// The gate applies only to local-auth users while the local provider
    /// requires verification. No record at all means the account predates
    /// the requirement and passes.
    async fn verification_pending(&self, principal: &PrincipalRecord) -> Result<bool> {
        if !self.enforce_verification || !principal.auth_provider.is_local() {
            return Ok(false);
        }
        if !self.store.local_verification_required().await? {
            return Ok(false);
        }

        let record = self.store.email_verification(&principal.user_id).await?;
        Ok(record.is_some_and(|r| !r.is_complete()))
    }
}
