//! Materialized grant state for one principal.
//!
//! A [`UserGrants`] is computed fresh for every check and thrown away after
//! the decision. It carries no lifetime beyond the request.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// The effective permissions of one user at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGrants {
    pub user_id: String,

    /// Root principals bypass every check. When set, `permissions` is empty
    /// and must not be consulted.
    pub is_root: bool,

    /// Teams the user belongs to, used to match team-scoped resource grants.
    pub team_ids: Vec<String>,

    /// Expanded permission set (role-derived, plus resource grants once merged).
    pub permissions: HashSet<String>,

    /// Set when a local-auth user has an unfinished email verification.
    /// The permission set is then empty.
    pub verification_pending: bool,
}

impl UserGrants {
    /// Grants for a root principal.
    pub fn root(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_root: true,
            ..Self::default()
        }
    }

    /// Grants for a recognized user still awaiting verification.
    pub fn pending_verification(user_id: impl Into<String>, team_ids: Vec<String>) -> Self {
        Self {
            user_id: user_id.into(),
            team_ids,
            verification_pending: true,
            ..Self::default()
        }
    }

    pub fn new(
        user_id: impl Into<String>,
        team_ids: Vec<String>,
        permissions: HashSet<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            team_ids,
            permissions,
            ..Self::default()
        }
    }

    /// Whether `permission_id` is in the effective set. Ignores root.
    pub fn holds(&self, permission_id: &str) -> bool {
        self.permissions.contains(permission_id)
    }

    /// Union additional permissions into the effective set.
    pub fn merge<I>(&mut self, permissions: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.permissions.extend(permissions);
    }

    /// Members of `required` that are not held, in input order.
    pub fn missing<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .map(String::as_str)
            .filter(|id| !self.holds(id))
            .collect()
    }

    /// Whether `permission_id` and all of `dependencies` are held.
    ///
    /// Root always satisfies.
    pub fn satisfies(&self, permission_id: &str, dependencies: &[String]) -> bool {
        self.is_root || (self.holds(permission_id) && self.missing(dependencies).is_empty())
    }

    /// The effective set, sorted.
    pub fn sorted(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.permissions.iter().cloned().collect();
        ids.sort();
        ids
    }
}
