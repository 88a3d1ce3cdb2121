//! The permission registry: the process-wide catalog of permission definitions.
//!
//! Feature modules register their permissions once during startup; after that
//! the registry is read on every authorization check. A single `RwLock`
//! guards the backing map so reads never block each other.
//!
//! The registry is an ordinary value. The composition root owns one instance
//! (usually behind an `Arc`) and hands it to the checker and to module
//! initialization code, so tests can build as many isolated registries as
//! they need.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use crate::error::{CoreError, Result};
use crate::permission::Permission;

/// Thread-safe catalog of permission definitions.
///
/// Every getter returns owned copies; callers may mutate results freely.
#[derive(Debug, Default)]
pub struct PermissionRegistry {
    inner: RwLock<HashMap<String, Permission>>,
}

impl PermissionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a permission definition.
    ///
    /// The ID and edge entries are trimmed, and edge lists deduplicated,
    /// before storage. Referenced IDs are not required to exist yet; modules
    /// may register in any order.
    pub fn register(&self, mut permission: Permission) -> Result<()> {
        permission.normalize();
        if permission.id.is_empty() {
            return Err(CoreError::EmptyId);
        }

        if permission.depends_on.iter().any(|d| *d == permission.id) {
            return Err(CoreError::SelfDependency(permission.id));
        }
        if permission.implies.iter().any(|i| *i == permission.id) {
            return Err(CoreError::SelfImplication(permission.id));
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.contains_key(&permission.id) {
            return Err(CoreError::DuplicateId(permission.id));
        }

        tracing::debug!(
            "registered permission {} (module {})",
            permission.id,
            permission.module
        );
        inner.insert(permission.id.clone(), permission);
        Ok(())
    }

    /// Register several permissions, stopping at the first failure.
    pub fn register_all<I>(&self, permissions: I) -> Result<()>
    where
        I: IntoIterator<Item = Permission>,
    {
        for permission in permissions {
            self.register(permission)?;
        }
        Ok(())
    }

    /// Look up a permission definition.
    pub fn get(&self, id: &str) -> Option<Permission> {
        self.read().get(id).cloned()
    }

    /// Snapshot of every registered permission.
    pub fn get_all(&self) -> HashMap<String, Permission> {
        self.read().clone()
    }

    /// All permissions owned by `module`, sorted by ID.
    pub fn get_by_module(&self, module: &str) -> Vec<Permission> {
        let mut perms: Vec<Permission> = self
            .read()
            .values()
            .filter(|p| p.module == module)
            .cloned()
            .collect();
        perms.sort_by(|a, b| a.id.cmp(&b.id));
        perms
    }

    /// Every registered ID, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Check that every `depends_on` edge points at a registered permission.
    ///
    /// Run once after all modules have registered. Permissions are visited in
    /// ID order so the reported failure is deterministic.
    pub fn validate_dependencies(&self) -> Result<()> {
        let inner = self.read();
        let mut ids: Vec<&String> = inner.keys().collect();
        ids.sort();

        for id in ids {
            for dep in &inner[id.as_str()].depends_on {
                if !inner.contains_key(dep) {
                    return Err(CoreError::MissingDependency {
                        permission: id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Full startup validation of the permission graph.
    ///
    /// Runs [`validate_dependencies`](Self::validate_dependencies), checks that
    /// every `implies` target exists, then resolves every permission's
    /// dependencies so cycles surface before the first request.
    pub fn validate_graph(&self) -> Result<()> {
        self.validate_dependencies()?;

        let ids = self.ids();
        {
            let inner = self.read();
            for id in &ids {
                for implied in &inner[id.as_str()].implies {
                    if !inner.contains_key(implied) {
                        return Err(CoreError::MissingImplication {
                            permission: id.clone(),
                            implied: implied.clone(),
                        });
                    }
                }
            }
        }

        for id in &ids {
            self.resolve_dependencies(id)?;
        }
        Ok(())
    }

    /// Read access to the backing map for the graph walks.
    ///
    /// Walks hold the read guard for their whole traversal instead of cloning
    /// the map; the borrow checker keeps them from mutating shared state.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Permission>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove a permission. Test isolation only.
    #[cfg(test)]
    pub(crate) fn remove(&self, id: &str) -> Option<Permission> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }
}
