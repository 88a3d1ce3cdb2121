//! Explained outcome of a permission check.

use serde::{Deserialize, Serialize};

/// Why a check came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Root principal; nothing else was consulted.
    Root,
    /// The permission and all its dependencies are held.
    Granted,
    /// The permission itself is not held.
    NotGranted,
    /// The permission is held but at least one dependency is not.
    MissingDependencies,
    /// The user is recognized but awaits email verification.
    VerificationPending,
}

/// A check result with enough detail for admin surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub permission_id: String,
    pub allowed: bool,
    pub reason: DecisionReason,
    /// Dependencies the user lacks. Only set for `MissingDependencies`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

impl Decision {
    pub(crate) fn new(permission_id: &str, reason: DecisionReason) -> Self {
        Self {
            permission_id: permission_id.to_string(),
            allowed: matches!(reason, DecisionReason::Root | DecisionReason::Granted),
            reason,
            missing: Vec::new(),
        }
    }

    pub(crate) fn missing_dependencies(permission_id: &str, missing: Vec<String>) -> Self {
        Self {
            missing,
            ..Self::new(permission_id, DecisionReason::MissingDependencies)
        }
    }
}
