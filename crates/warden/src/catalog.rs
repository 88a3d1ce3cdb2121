//! Persisting the registry to durable storage.

use warden_core::{Permission, PermissionRegistry};
use warden_store::{PermissionCatalog, Result};

/// Upsert every registered permission into `catalog`, by ID.
///
/// Rows for permissions no longer registered are left in place. Returns the
/// number of rows written.
pub async fn sync_registry<C>(registry: &PermissionRegistry, catalog: &C) -> Result<usize>
where
    C: PermissionCatalog + ?Sized,
{
    let mut permissions: Vec<Permission> = registry.get_all().into_values().collect();
    permissions.sort_by(|a, b| a.id.cmp(&b.id));

    let written = catalog.upsert_permissions(&permissions).await?;
    tracing::info!(permissions = written, "synced permission registry to catalog");
    Ok(written)
}
