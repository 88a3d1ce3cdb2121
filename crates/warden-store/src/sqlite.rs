//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Statement};
use warden_core::{DefaultScope, Permission};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::now_millis;
use crate::traits::{GrantStore, PermissionCatalog};
use crate::types::{
    AuthProvider, PrincipalRecord, PrincipalType, ResourceGrant, ResourceGrantQuery, RoleRecord,
    TeamRecord, VerificationRecord,
};

/// `auth_settings` key holding the local provider's verification requirement.
pub const LOCAL_VERIFICATION_SETTING: &str = "local.require_email_verification";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All trait operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        f(&mut *conn)
    }

    /// Run `f` against the connection on the blocking thread pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Seeding / admin writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a user, or update the provider of an existing one. Root flag
    /// and role assignments survive.
    pub fn add_user(&self, user_id: &str, auth_provider: AuthProvider) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, is_root, auth_provider, created_at) VALUES (?1, 0, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET auth_provider = excluded.auth_provider",
                params![user_id, auth_provider.as_str(), now_millis()],
            )?;
            Ok(())
        })
    }

    pub fn set_root(&self, user_id: &str, is_root: bool) -> Result<()> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET is_root = ?2 WHERE id = ?1",
                params![user_id, is_root],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(format!("user {user_id}")));
            }
            Ok(())
        })
    }

    /// Create or replace a role with the given permission IDs.
    pub fn add_role<I, S>(&self, role_id: &str, permissions: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let permissions: Vec<String> = permissions.into_iter().map(Into::into).collect();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO roles (id, name) VALUES (?1, ?1)
                 ON CONFLICT(id) DO NOTHING",
                params![role_id],
            )?;
            tx.execute("DELETE FROM role_permissions WHERE role_id = ?1", params![role_id])?;
            for permission in &permissions {
                tx.execute(
                    "INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?1, ?2)",
                    params![role_id, permission],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn add_role_permission(&self, role_id: &str, permission_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?1, ?2)",
                params![role_id, permission_id],
            )?;
            Ok(())
        })
    }

    pub fn assign_role(&self, user_id: &str, role_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?1, ?2)",
                params![user_id, role_id],
            )?;
            Ok(())
        })
    }

    /// Create a team, or rename an existing one. Members and roles survive.
    pub fn add_team(&self, team_id: &str, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO teams (id, name) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                params![team_id, name],
            )?;
            Ok(())
        })
    }

    pub fn add_team_member(&self, team_id: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO team_members (team_id, user_id) VALUES (?1, ?2)",
                params![team_id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn assign_team_role(&self, team_id: &str, role_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO team_roles (team_id, role_id) VALUES (?1, ?2)",
                params![team_id, role_id],
            )?;
            Ok(())
        })
    }

    /// Insert a resource grant, replacing the expiry of an identical one.
    pub fn grant_resource(&self, grant: ResourceGrant) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO resource_permissions (
                    resource_type, resource_id, principal_type, principal_id,
                    permission_id, expires_at, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(resource_type, resource_id, principal_type, principal_id, permission_id)
                 DO UPDATE SET expires_at = excluded.expires_at",
                params![
                    grant.resource_type,
                    grant.resource_id,
                    grant.principal_type.as_str(),
                    grant.principal_id,
                    grant.permission_id,
                    grant.expires_at,
                    now_millis(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn revoke_resource(&self, grant: &ResourceGrant) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM resource_permissions
                 WHERE resource_type = ?1 AND resource_id = ?2 AND principal_type = ?3
                   AND principal_id = ?4 AND permission_id = ?5",
                params![
                    grant.resource_type,
                    grant.resource_id,
                    grant.principal_type.as_str(),
                    grant.principal_id,
                    grant.permission_id,
                ],
            )?;
            Ok(removed)
        })
    }

    /// Record a verification for `user_id`; `None` means still pending.
    pub fn set_verification(&self, user_id: &str, verified_at: Option<i64>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO email_verifications (user_id, verified_at, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET verified_at = excluded.verified_at",
                params![user_id, verified_at, now_millis()],
            )?;
            Ok(())
        })
    }

    pub fn set_local_verification_required(&self, required: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO auth_settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![LOCAL_VERIFICATION_SETTING, required.to_string()],
            )?;
            Ok(())
        })
    }
}

/// Group `(role_id, role_name, permission_id?)` rows into role records.
///
/// Rows must be ordered by role ID.
fn collect_roles(stmt: &mut Statement<'_>, key: &str) -> Result<Vec<RoleRecord>> {
    let rows = stmt.query_map(params![key], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    })?;

    let mut roles: Vec<RoleRecord> = Vec::new();
    for row in rows {
        let (id, name, permission) = row?;
        if roles.last().map_or(true, |r| r.id != id) {
            roles.push(RoleRecord {
                id,
                name,
                permissions: Vec::new(),
            });
        }
        if let (Some(permission), Some(role)) = (permission, roles.last_mut()) {
            role.permissions.push(permission);
        }
    }
    Ok(roles)
}

fn row_to_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<ResourceGrant> {
    let principal_type: String = row.get(2)?;
    let principal_type = PrincipalType::parse(&principal_type)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(2, "principal_type".into(), Type::Text))?;

    Ok(ResourceGrant {
        resource_type: row.get(0)?,
        resource_id: row.get(1)?,
        principal_type,
        principal_id: row.get(3)?,
        permission_id: row.get(4)?,
        expires_at: row.get(5)?,
    })
}

fn load_principal_blocking(conn: &Connection, user_id: &str) -> Result<Option<PrincipalRecord>> {
    let user: Option<(bool, String)> = conn
        .query_row(
            "SELECT is_root, auth_provider FROM users WHERE id = ?1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((is_root, auth_provider)) = user else {
        return Ok(None);
    };

    let mut user_roles = conn.prepare(
        "SELECT r.id, r.name, rp.permission_id
         FROM user_roles ur
         JOIN roles r ON r.id = ur.role_id
         LEFT JOIN role_permissions rp ON rp.role_id = r.id
         WHERE ur.user_id = ?1
         ORDER BY r.id, rp.permission_id",
    )?;
    let roles = collect_roles(&mut user_roles, user_id)?;

    let mut team_stmt = conn.prepare(
        "SELECT t.id, t.name
         FROM team_members tm
         JOIN teams t ON t.id = tm.team_id
         WHERE tm.user_id = ?1
         ORDER BY t.id",
    )?;
    let team_rows: Vec<(String, String)> = team_stmt
        .query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut team_roles = conn.prepare(
        "SELECT r.id, r.name, rp.permission_id
         FROM team_roles tr
         JOIN roles r ON r.id = tr.role_id
         LEFT JOIN role_permissions rp ON rp.role_id = r.id
         WHERE tr.team_id = ?1
         ORDER BY r.id, rp.permission_id",
    )?;
    let mut teams = Vec::with_capacity(team_rows.len());
    for (id, name) in team_rows {
        let roles = collect_roles(&mut team_roles, &id)?;
        teams.push(TeamRecord { id, name, roles });
    }

    Ok(Some(PrincipalRecord {
        user_id: user_id.to_string(),
        is_root,
        auth_provider: AuthProvider::parse(&auth_provider),
        roles,
        teams,
    }))
}

fn resource_grants_blocking(
    conn: &Connection,
    query: &ResourceGrantQuery,
) -> Result<Vec<ResourceGrant>> {
    let mut sql = String::from(
        "SELECT resource_type, resource_id, principal_type, principal_id, permission_id, expires_at
         FROM resource_permissions
         WHERE resource_type = ?1 AND resource_id = ?2
           AND (expires_at IS NULL OR expires_at > ?3)
           AND ((principal_type = 'user' AND principal_id = ?4)",
    );
    let mut values: Vec<Value> = vec![
        Value::Text(query.resource_type.clone()),
        Value::Text(query.resource_id.clone()),
        Value::Integer(query.now),
        Value::Text(query.user_id.clone()),
    ];

    if !query.team_ids.is_empty() {
        let placeholders: Vec<String> = (0..query.team_ids.len())
            .map(|i| format!("?{}", values.len() + i + 1))
            .collect();
        sql.push_str(&format!(
            " OR (principal_type = 'team' AND principal_id IN ({}))",
            placeholders.join(", ")
        ));
        values.extend(query.team_ids.iter().cloned().map(Value::Text));
    }
    sql.push_str(") ORDER BY permission_id, principal_type, principal_id");

    let mut stmt = conn.prepare(&sql)?;
    let grants = stmt
        .query_map(params_from_iter(values.iter()), row_to_grant)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(grants)
}

#[async_trait]
impl GrantStore for SqliteStore {
    async fn load_principal(&self, user_id: &str) -> Result<Option<PrincipalRecord>> {
        let user_id = user_id.to_string();
        self.blocking(move |conn| load_principal_blocking(conn, &user_id))
            .await
    }

    async fn resource_grants(&self, query: &ResourceGrantQuery) -> Result<Vec<ResourceGrant>> {
        let query = query.clone();
        self.blocking(move |conn| resource_grants_blocking(conn, &query))
            .await
    }

    async fn email_verification(&self, user_id: &str) -> Result<Option<VerificationRecord>> {
        let user_id = user_id.to_string();
        self.blocking(move |conn| {
            let verified_at: Option<Option<i64>> = conn
                .query_row(
                    "SELECT verified_at FROM email_verifications WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(verified_at.map(|verified_at| VerificationRecord {
                user_id,
                verified_at,
            }))
        })
        .await
    }

    async fn local_verification_required(&self) -> Result<bool> {
        self.blocking(|conn| {
            let value: Option<String> = conn
                .query_row(
                    "SELECT value FROM auth_settings WHERE key = ?1",
                    params![LOCAL_VERIFICATION_SETTING],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value.as_deref() == Some("true"))
        })
        .await
    }
}

#[async_trait]
impl PermissionCatalog for SqliteStore {
    async fn upsert_permissions(&self, permissions: &[Permission]) -> Result<usize> {
        let permissions = permissions.to_vec();
        self.blocking(move |conn| {
            let now = now_millis();
            let tx = conn.transaction()?;
            for p in &permissions {
                tx.execute(
                    "INSERT INTO permissions (
                        id, module, category, display_name, description, default_scope,
                        depends_on, implies, metadata, updated_at
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                     ON CONFLICT(id) DO UPDATE SET
                        module = excluded.module,
                        category = excluded.category,
                        display_name = excluded.display_name,
                        description = excluded.description,
                        default_scope = excluded.default_scope,
                        depends_on = excluded.depends_on,
                        implies = excluded.implies,
                        metadata = excluded.metadata,
                        updated_at = excluded.updated_at",
                    params![
                        p.id,
                        p.module,
                        p.category,
                        p.display_name,
                        p.description,
                        p.default_scope.as_str(),
                        serde_json::to_string(&p.depends_on)?,
                        serde_json::to_string(&p.implies)?,
                        serde_json::to_string(&p.metadata)?,
                        now,
                    ],
                )?;
            }
            tx.commit()?;
            Ok(permissions.len())
        })
        .await
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, module, category, display_name, description, default_scope,
                        depends_on, implies, metadata
                 FROM permissions ORDER BY id",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut permissions = Vec::with_capacity(rows.len());
            for (id, module, category, display_name, description, scope, deps, implies, meta) in
                rows
            {
                permissions.push(Permission {
                    id,
                    module,
                    category,
                    display_name,
                    description,
                    default_scope: DefaultScope::parse(&scope),
                    depends_on: serde_json::from_str(&deps)?,
                    implies: serde_json::from_str(&implies)?,
                    metadata: serde_json::from_str(&meta)?,
                });
            }
            Ok(permissions)
        })
        .await
    }
}
