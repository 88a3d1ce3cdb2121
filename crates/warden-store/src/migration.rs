//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, crate::now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!("migrated grant store schema from v{} to v{}", current, CURRENT_VERSION);
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Principals
        CREATE TABLE users (
            id TEXT PRIMARY KEY,
            is_root INTEGER NOT NULL DEFAULT 0,
            auth_provider TEXT NOT NULL DEFAULT 'local',
            created_at INTEGER NOT NULL
        );

        CREATE TABLE roles (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE role_permissions (
            role_id TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
            permission_id TEXT NOT NULL,
            PRIMARY KEY (role_id, permission_id)
        );

        CREATE TABLE user_roles (
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            role_id TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
            PRIMARY KEY (user_id, role_id)
        );

        CREATE TABLE teams (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE team_members (
            team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            PRIMARY KEY (team_id, user_id)
        );

        CREATE TABLE team_roles (
            team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
            role_id TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
            PRIMARY KEY (team_id, role_id)
        );

        -- Per-resource grants; expired rows stay until compacted elsewhere
        CREATE TABLE resource_permissions (
            resource_type TEXT NOT NULL,
            resource_id TEXT NOT NULL,
            principal_type TEXT NOT NULL CHECK (principal_type IN ('user', 'team')),
            principal_id TEXT NOT NULL,
            permission_id TEXT NOT NULL,
            expires_at INTEGER,               -- Unix ms, NULL = never
            created_at INTEGER NOT NULL,
            PRIMARY KEY (resource_type, resource_id, principal_type, principal_id, permission_id)
        );

        -- Local-auth email verification
        CREATE TABLE email_verifications (
            user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            verified_at INTEGER,              -- NULL while pending
            created_at INTEGER NOT NULL
        );

        CREATE TABLE auth_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Persisted permission catalog (registry snapshot)
        CREATE TABLE permissions (
            id TEXT PRIMARY KEY,
            module TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT '',
            display_name TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            default_scope TEXT NOT NULL DEFAULT 'global',
            depends_on TEXT NOT NULL DEFAULT '[]',  -- JSON array of IDs
            implies TEXT NOT NULL DEFAULT '[]',     -- JSON array of IDs
            metadata TEXT NOT NULL DEFAULT '{}',    -- JSON object
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX idx_resource_permissions_principal
            ON resource_permissions(principal_type, principal_id);
        CREATE INDEX idx_team_members_user ON team_members(user_id);
        CREATE INDEX idx_permissions_module ON permissions(module);
        "#,
    )?;

    Ok(())
}
