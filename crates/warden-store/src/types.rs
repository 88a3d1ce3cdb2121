//! Records exchanged between the stores and the grant loader.

use serde::{Deserialize, Serialize};

/// Authentication provider a user signs in with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Built-in username/password provider.
    Local,
    Oidc,
    Saml,
    Ldap,
    Other(String),
}

impl AuthProvider {
    pub fn as_str(&self) -> &str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Oidc => "oidc",
            AuthProvider::Saml => "saml",
            AuthProvider::Ldap => "ldap",
            AuthProvider::Other(name) => name,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "local" => AuthProvider::Local,
            "oidc" => AuthProvider::Oidc,
            "saml" => AuthProvider::Saml,
            "ldap" => AuthProvider::Ldap,
            other => AuthProvider::Other(other.to_string()),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, AuthProvider::Local)
    }
}

impl core::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role and the permission IDs attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: String,
    pub name: String,
    pub permissions: Vec<String>,
}

/// A team the user belongs to, with the roles attached to the team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: String,
    pub name: String,
    pub roles: Vec<RoleRecord>,
}

/// Everything the grant loader needs to know about a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub user_id: String,
    pub is_root: bool,
    pub auth_provider: AuthProvider,
    /// Roles assigned directly to the user.
    pub roles: Vec<RoleRecord>,
    /// Teams the user belongs to.
    pub teams: Vec<TeamRecord>,
}

impl PrincipalRecord {
    pub fn team_ids(&self) -> Vec<String> {
        self.teams.iter().map(|t| t.id.clone()).collect()
    }

    /// Permission IDs from direct roles and from every team's roles.
    pub fn role_permission_ids(&self) -> impl Iterator<Item = &str> {
        self.roles
            .iter()
            .chain(self.teams.iter().flat_map(|t| t.roles.iter()))
            .flat_map(|r| r.permissions.iter().map(String::as_str))
    }
}

/// Kind of principal a resource grant is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalType {
    User,
    Team,
}

impl PrincipalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalType::User => "user",
            PrincipalType::Team => "team",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(PrincipalType::User),
            "team" => Some(PrincipalType::Team),
            _ => None,
        }
    }
}

/// A permission granted on one specific resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGrant {
    pub resource_type: String,
    pub resource_id: String,
    pub principal_type: PrincipalType,
    pub principal_id: String,
    pub permission_id: String,
    /// Expiry (Unix ms). `None` never expires.
    pub expires_at: Option<i64>,
}

impl ResourceGrant {
    pub fn new(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        principal_type: PrincipalType,
        principal_id: impl Into<String>,
        permission_id: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            principal_type,
            principal_id: principal_id.into(),
            permission_id: permission_id.into(),
            expires_at: None,
        }
    }

    pub fn for_user(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        user_id: impl Into<String>,
        permission_id: impl Into<String>,
    ) -> Self {
        Self::new(resource_type, resource_id, PrincipalType::User, user_id, permission_id)
    }

    pub fn for_team(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        team_id: impl Into<String>,
        permission_id: impl Into<String>,
    ) -> Self {
        Self::new(resource_type, resource_id, PrincipalType::Team, team_id, permission_id)
    }

    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.expires_at = Some(timestamp);
        self
    }

    /// Whether the grant is still in force at `now`.
    ///
    /// A grant expiring exactly at `now` is already inert.
    pub fn is_active(&self, now: i64) -> bool {
        self.expires_at.map_or(true, |expires| expires > now)
    }
}

/// Filter for resource grants visible to one user on one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGrantQuery {
    pub resource_type: String,
    pub resource_id: String,
    pub user_id: String,
    pub team_ids: Vec<String>,
    /// Reference time (Unix ms) for the expiry filter.
    pub now: i64,
}

impl ResourceGrantQuery {
    /// Whether `grant` passes every clause of this filter.
    pub fn matches(&self, grant: &ResourceGrant) -> bool {
        if grant.resource_type != self.resource_type || grant.resource_id != self.resource_id {
            return false;
        }
        let principal_matches = match grant.principal_type {
            PrincipalType::User => grant.principal_id == self.user_id,
            PrincipalType::Team => self.team_ids.iter().any(|t| *t == grant.principal_id),
        };
        principal_matches && grant.is_active(self.now)
    }
}

/// Email verification state of a local-auth user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub user_id: String,
    /// Completion time (Unix ms). `None` while pending.
    pub verified_at: Option<i64>,
}

impl VerificationRecord {
    pub fn is_complete(&self) -> bool {
        self.verified_at.is_some()
    }
}
