//! The permission checker: the public authorization API.
//!
//! Every call recomputes the user's grants from the registry and from
//! storage. Nothing is cached, so a revoked grant, a changed root flag or a
//! completed verification takes effect on the very next check.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use warden_core::PermissionRegistry;
use warden_perms::{GrantLoader, UserGrants};
use warden_store::{now_millis, GrantStore, PermissionCatalog};

use crate::decision::{Decision, DecisionReason};
use crate::error::{CheckError, Result};

/// Configuration for the Checker.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Upper bound on the storage work of a single check. `None` waits
    /// indefinitely.
    pub storage_timeout: Option<Duration>,
    /// Whether the local-auth email verification gate is applied at all.
    pub enforce_verification: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            storage_timeout: Some(Duration::from_secs(5)),
            enforce_verification: true,
        }
    }
}

/// Answers "may this user do this?".
///
/// Provides:
/// - Global checks ([`check`](Self::check))
/// - Resource-scoped checks ([`check_resource`](Self::check_resource))
/// - Capability discovery ([`user_permissions`](Self::user_permissions))
/// - Explained decisions for admin surfaces ([`explain`](Self::explain))
pub struct Checker<S: ?Sized> {
    registry: Arc<PermissionRegistry>,
    loader: GrantLoader<S>,
    config: CheckerConfig,
}

impl<S: GrantStore + ?Sized> Checker<S> {
    /// Create a new checker.
    pub fn new(registry: Arc<PermissionRegistry>, store: Arc<S>, config: CheckerConfig) -> Self {
        let loader = GrantLoader::new(registry.clone(), store)
            .with_verification(config.enforce_verification);
        Self {
            registry,
            loader,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<S> {
        self.loader.store()
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checks
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether `user_id` may exercise `permission_id` globally.
    ///
    /// Returns `Ok(false)` for a denial. Root principals are allowed any
    /// permission, registered or not.
    pub async fn check(&self, user_id: &str, permission_id: &str) -> Result<bool> {
        Ok(self.explain(user_id, permission_id).await?.allowed)
    }

    /// Whether `user_id` may exercise `permission_id` on one resource.
    ///
    /// Resource grants are merged with role-derived grants before the
    /// dependency test, which applies the same way as for [`check`](Self::check).
    pub async fn check_resource(
        &self,
        user_id: &str,
        resource_type: &str,
        resource_id: &str,
        permission_id: &str,
    ) -> Result<bool> {
        Ok(self
            .explain_resource(user_id, resource_type, resource_id, permission_id)
            .await?
            .allowed)
    }

    /// Like [`check`](Self::check), with the reason for the outcome.
    pub async fn explain(&self, user_id: &str, permission_id: &str) -> Result<Decision> {
        let result = self.decide_global(user_id, permission_id).await;
        observe(result, user_id, permission_id, None)
    }

    /// Like [`check_resource`](Self::check_resource), with the reason for
    /// the outcome.
    pub async fn explain_resource(
        &self,
        user_id: &str,
        resource_type: &str,
        resource_id: &str,
        permission_id: &str,
    ) -> Result<Decision> {
        let result = self
            .decide_resource(user_id, resource_type, resource_id, permission_id)
            .await;
        observe(
            result,
            user_id,
            permission_id,
            Some((resource_type, resource_id)),
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Discovery
    // ─────────────────────────────────────────────────────────────────────────

    /// The user's effective global permissions, sorted.
    ///
    /// Root users get every registered permission. Intended for rendering
    /// capabilities, not for authorization decisions.
    pub async fn user_permissions(&self, user_id: &str) -> Result<Vec<String>> {
        require("user_id", user_id)?;
        match self.bounded(self.loader.load(user_id)).await {
            Ok(grants) => Ok(self.effective(&grants)),
            Err(e) => {
                log_failure(&e, user_id, "*", None);
                Err(e)
            }
        }
    }

    /// The user's effective permissions on one resource, sorted.
    pub async fn resource_permissions(
        &self,
        user_id: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<String>> {
        require("user_id", user_id)?;
        require("resource_type", resource_type)?;
        require("resource_id", resource_id)?;

        let load = self
            .loader
            .load_for_resource(user_id, resource_type, resource_id, now_millis());
        match self.bounded(load).await {
            Ok(grants) => Ok(self.effective(&grants)),
            Err(e) => {
                log_failure(&e, user_id, "*", Some((resource_type, resource_id)));
                Err(e)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    async fn decide_global(&self, user_id: &str, permission_id: &str) -> Result<Decision> {
        require("user_id", user_id)?;
        require("permission_id", permission_id)?;

        let grants = self.bounded(self.loader.load(user_id)).await?;
        self.decide(&grants, permission_id)
    }

    async fn decide_resource(
        &self,
        user_id: &str,
        resource_type: &str,
        resource_id: &str,
        permission_id: &str,
    ) -> Result<Decision> {
        require("user_id", user_id)?;
        require("resource_type", resource_type)?;
        require("resource_id", resource_id)?;
        require("permission_id", permission_id)?;

        let load = self
            .loader
            .load_for_resource(user_id, resource_type, resource_id, now_millis());
        let grants = self.bounded(load).await?;
        self.decide(&grants, permission_id)
    }

    /// Apply the dependency-satisfaction test to materialized grants.
    fn decide(&self, grants: &UserGrants, permission_id: &str) -> Result<Decision> {
        if grants.is_root {
            return Ok(Decision::new(permission_id, DecisionReason::Root));
        }

        if !self.registry.contains(permission_id) {
            return Err(CheckError::UnknownPermission(permission_id.to_string()));
        }
        let dependencies = self.registry.resolve_dependencies(permission_id)?;

        if grants.verification_pending {
            return Ok(Decision::new(permission_id, DecisionReason::VerificationPending));
        }
        if !grants.holds(permission_id) {
            return Ok(Decision::new(permission_id, DecisionReason::NotGranted));
        }

        let missing = grants.missing(&dependencies);
        if !missing.is_empty() {
            let missing = missing.into_iter().map(str::to_string).collect();
            return Ok(Decision::missing_dependencies(permission_id, missing));
        }

        Ok(Decision::new(permission_id, DecisionReason::Granted))
    }

    fn effective(&self, grants: &UserGrants) -> Vec<String> {
        if grants.is_root {
            self.registry.ids()
        } else {
            grants.sorted()
        }
    }

    /// Run a loader future under the configured storage timeout.
    async fn bounded<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = warden_perms::Result<T>>,
    {
        let result = match self.config.storage_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| CheckError::Timeout(limit))?,
            None => fut.await,
        };
        Ok(result?)
    }
}

impl<S: GrantStore + PermissionCatalog + ?Sized> Checker<S> {
    /// Persist the registry to the checker's own store.
    pub async fn sync_catalog(&self) -> warden_store::Result<usize> {
        crate::catalog::sync_registry(&self.registry, self.loader.store().as_ref()).await
    }
}

fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CheckError::InvalidInput(field));
    }
    Ok(())
}

fn observe(
    result: Result<Decision>,
    user_id: &str,
    permission_id: &str,
    resource: Option<(&str, &str)>,
) -> Result<Decision> {
    match &result {
        Ok(decision) => tracing::debug!(
            user = user_id,
            permission = permission_id,
            resource = ?resource,
            allowed = decision.allowed,
            reason = ?decision.reason,
            "permission check"
        ),
        Err(e) => log_failure(e, user_id, permission_id, resource),
    }
    result
}

fn log_failure(
    err: &CheckError,
    user_id: &str,
    permission_id: &str,
    resource: Option<(&str, &str)>,
) {
    if err.is_misconfiguration() {
        tracing::warn!(
            user = user_id,
            permission = permission_id,
            resource = ?resource,
            error = %err,
            "permission registry misconfigured"
        );
    } else if err.is_storage() {
        tracing::warn!(
            user = user_id,
            permission = permission_id,
            resource = ?resource,
            error = %err,
            "permission check storage failure"
        );
    } else {
        tracing::debug!(
            user = user_id,
            permission = permission_id,
            error = %err,
            "permission check rejected"
        );
    }
}
