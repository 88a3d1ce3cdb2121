//! Registration helpers for protocol drivers.
//!
//! Drivers (SSH, RDP, VNC, ...) register their permissions through
//! [`PermissionRegistry::register_protocol_permission`], which derives the ID,
//! module, category and metadata from the driver and action names. The result
//! is an ordinary permission: it may depend on or imply core permissions.

use crate::error::{CoreError, Result};
use crate::permission::Permission;
use crate::registry::PermissionRegistry;

/// Metadata key carrying the driver ID.
pub const METADATA_DRIVER: &str = "driver";

/// Metadata key carrying the action name.
pub const METADATA_ACTION: &str = "action";

/// `protocol:<driver>.<action>`
pub fn protocol_permission_id(driver_id: &str, action: &str) -> String {
    format!("protocol:{driver_id}.{action}")
}

/// `protocols.<driver>`
pub fn protocol_module(driver_id: &str) -> String {
    format!("protocols.{driver_id}")
}

/// `protocol:<driver>`
pub fn protocol_category(driver_id: &str) -> String {
    format!("protocol:{driver_id}")
}

impl PermissionRegistry {
    /// Register a permission on behalf of a protocol driver.
    ///
    /// Overwrites `id`, `module` and `category` of `permission` and injects the
    /// driver and action into its metadata before delegating to
    /// [`register`](Self::register).
    pub fn register_protocol_permission(
        &self,
        driver_id: &str,
        action: &str,
        mut permission: Permission,
    ) -> Result<()> {
        let driver_id = driver_id.trim();
        let action = action.trim();
        if driver_id.is_empty() {
            return Err(CoreError::InvalidProtocolPermission(
                "driver id must not be empty".into(),
            ));
        }
        if action.is_empty() {
            return Err(CoreError::InvalidProtocolPermission(format!(
                "action for driver {driver_id} must not be empty"
            )));
        }

        permission.id = protocol_permission_id(driver_id, action);
        permission.module = protocol_module(driver_id);
        permission.category = protocol_category(driver_id);
        permission
            .metadata
            .insert(METADATA_DRIVER.to_string(), driver_id.to_string());
        permission
            .metadata
            .insert(METADATA_ACTION.to_string(), action.to_string());

        self.register(permission)
    }
}
