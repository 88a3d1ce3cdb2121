//! End-to-end permission checks against both storage backends.
//!
//! Every scenario runs twice: once on `MemoryStore`, once on `SqliteStore`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use warden::core::{register_core_permissions, CoreError, Permission, PermissionRegistry};
use warden::store::{
    now_millis, AuthProvider, GrantStore, MemoryStore, PrincipalRecord, ResourceGrant,
    ResourceGrantQuery, Result as StoreResult, SqliteStore, StoreError, VerificationRecord,
};
use warden::{CheckError, Checker, CheckerConfig, DecisionReason};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Admin writes shared by both backends.
trait Seed: GrantStore + 'static {
    fn user(&self, id: &str, provider: AuthProvider) -> StoreResult<()>;
    fn root(&self, id: &str) -> StoreResult<()>;
    fn role(&self, id: &str, permissions: &[&str]) -> StoreResult<()>;
    fn assign(&self, user: &str, role: &str) -> StoreResult<()>;
    fn team(&self, id: &str) -> StoreResult<()>;
    fn member(&self, team: &str, user: &str) -> StoreResult<()>;
    fn team_role(&self, team: &str, role: &str) -> StoreResult<()>;
    fn grant(&self, grant: ResourceGrant) -> StoreResult<()>;
    fn verification(&self, user: &str, verified_at: Option<i64>) -> StoreResult<()>;
    fn require_verification(&self, required: bool) -> StoreResult<()>;
}

macro_rules! impl_seed {
    ($store:ty) => {
        impl Seed for $store {
            fn user(&self, id: &str, provider: AuthProvider) -> StoreResult<()> {
                self.add_user(id, provider)
            }
            fn root(&self, id: &str) -> StoreResult<()> {
                self.set_root(id, true)
            }
            fn role(&self, id: &str, permissions: &[&str]) -> StoreResult<()> {
                self.add_role(id, permissions.iter().copied())
            }
            fn assign(&self, user: &str, role: &str) -> StoreResult<()> {
                self.assign_role(user, role)
            }
            fn team(&self, id: &str) -> StoreResult<()> {
                self.add_team(id, id)
            }
            fn member(&self, team: &str, user: &str) -> StoreResult<()> {
                self.add_team_member(team, user)
            }
            fn team_role(&self, team: &str, role: &str) -> StoreResult<()> {
                self.assign_team_role(team, role)
            }
            fn grant(&self, grant: ResourceGrant) -> StoreResult<()> {
                self.grant_resource(grant)
            }
            fn verification(&self, user: &str, verified_at: Option<i64>) -> StoreResult<()> {
                self.set_verification(user, verified_at)
            }
            fn require_verification(&self, required: bool) -> StoreResult<()> {
                self.set_local_verification_required(required)
            }
        }
    };
}

impl_seed!(MemoryStore);
impl_seed!(SqliteStore);

fn registry() -> Result<Arc<PermissionRegistry>> {
    let registry = Arc::new(PermissionRegistry::new());
    register_core_permissions(&registry)?;
    registry.validate_graph()?;
    Ok(registry)
}

fn checker<S: Seed>(registry: Arc<PermissionRegistry>, store: Arc<S>) -> Checker<S> {
    Checker::new(registry, store, CheckerConfig::default())
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

async fn root_bypass<S: Seed>(store: Arc<S>) -> Result<()> {
    store.user("admin", AuthProvider::Local)?;
    store.root("admin")?;
    // A pending verification does not touch root.
    store.require_verification(true)?;
    store.verification("admin", None)?;

    let checker = checker(registry()?, store);
    for permission in ["user.delete", "audit.view", "not.registered"] {
        assert!(checker.check("admin", permission).await?);
        assert!(
            checker
                .check_resource("admin", "connection", "c1", permission)
                .await?
        );
    }
    assert_eq!(
        checker.user_permissions("admin").await?,
        checker.registry().ids()
    );
    Ok(())
}

async fn dependency_enforcement<S: Seed>(store: Arc<S>) -> Result<()> {
    store.user("alice", AuthProvider::Oidc)?;
    store.role("editor", &["user.edit"])?;
    store.assign("alice", "editor")?;

    let checker = checker(registry()?, store.clone());
    assert!(!checker.check("alice", "user.edit").await?);

    store.role("viewer", &["user.view"])?;
    store.assign("alice", "viewer")?;
    assert!(checker.check("alice", "user.edit").await?);
    Ok(())
}

async fn delete_requires_view_and_edit<S: Seed>(store: Arc<S>) -> Result<()> {
    let registry = Arc::new(PermissionRegistry::new());
    registry.register(Permission::new("user.view", "core"))?;
    registry.register(Permission::new("user.edit", "core").depends_on(["user.view"]))?;
    registry.register(
        Permission::new("user.delete", "core").depends_on(["user.view", "user.edit"]),
    )?;

    store.user("alice", AuthProvider::Oidc)?;
    store.role("deleter", &["user.delete"])?;
    store.assign("alice", "deleter")?;

    let checker = checker(registry, store.clone());
    assert!(!checker.check("alice", "user.delete").await?);

    store.role("editor", &["user.view", "user.edit"])?;
    store.assign("alice", "editor")?;
    assert!(checker.check("alice", "user.delete").await?);
    Ok(())
}

async fn implication_propagation<S: Seed>(store: Arc<S>) -> Result<()> {
    store.user("alice", AuthProvider::Oidc)?;
    store.role("user-admin", &["user.manage"])?;
    store.assign("alice", "user-admin")?;

    let checker = checker(registry()?, store);
    assert!(checker.check("alice", "user.delete").await?);
    assert!(checker.check("alice", "user.view").await?);
    assert_eq!(
        checker.user_permissions("alice").await?,
        vec!["user.create", "user.delete", "user.edit", "user.manage", "user.view"]
    );
    Ok(())
}

async fn cycle_detection<S: Seed>(store: Arc<S>) -> Result<()> {
    let registry = Arc::new(PermissionRegistry::new());
    registry.register(Permission::new("a", "loop").depends_on(["b"]))?;
    registry.register(Permission::new("b", "loop").depends_on(["a"]))?;
    assert!(matches!(
        registry.resolve_dependencies("a"),
        Err(CoreError::CircularDependency(_))
    ));
    assert!(registry.validate_graph().is_err());

    store.user("alice", AuthProvider::Oidc)?;
    store.role("looper", &["a", "b"])?;
    store.assign("alice", "looper")?;

    let checker = checker(registry, store);
    let err = checker.check("alice", "a").await.unwrap_err();
    assert!(matches!(err, CheckError::CircularDependency(_)));
    assert!(err.is_misconfiguration());
    Ok(())
}

async fn resource_expiry<S: Seed>(store: Arc<S>) -> Result<()> {
    let now = now_millis();
    store.user("alice", AuthProvider::Oidc)?;
    let view = |id: &str| ResourceGrant::for_user("connection", id, "alice", "connection.view");
    store.grant(view("past").expires_at(now - 60_000))?;
    store.grant(view("future").expires_at(now + 3_600_000))?;
    store.grant(view("forever"))?;

    let checker = checker(registry()?, store);
    assert!(
        !checker
            .check_resource("alice", "connection", "past", "connection.view")
            .await?
    );
    assert!(
        checker
            .check_resource("alice", "connection", "future", "connection.view")
            .await?
    );
    assert!(
        checker
            .check_resource("alice", "connection", "forever", "connection.view")
            .await?
    );
    // Resource grants never leak into global checks.
    assert!(!checker.check("alice", "connection.view").await?);
    Ok(())
}

async fn resource_dependency_enforcement<S: Seed>(store: Arc<S>) -> Result<()> {
    store.user("alice", AuthProvider::Oidc)?;
    store.grant(ResourceGrant::for_user("connection", "c1", "alice", "connection.launch"))?;

    let checker = checker(registry()?, store.clone());
    let decision = checker
        .explain_resource("alice", "connection", "c1", "connection.launch")
        .await?;
    assert!(!decision.allowed);
    assert_eq!(decision.reason, DecisionReason::MissingDependencies);
    assert_eq!(decision.missing, vec!["connection.view"]);

    // A global grant of the dependency completes the resource grant.
    store.role("viewer", &["connection.view"])?;
    store.assign("alice", "viewer")?;
    assert!(
        checker
            .check_resource("alice", "connection", "c1", "connection.launch")
            .await?
    );
    assert!(
        !checker
            .check_resource("alice", "connection", "c2", "connection.launch")
            .await?
    );
    Ok(())
}

async fn team_resource_grants<S: Seed>(store: Arc<S>) -> Result<()> {
    store.user("alice", AuthProvider::Oidc)?;
    store.user("bob", AuthProvider::Oidc)?;
    store.team("ops")?;
    store.member("ops", "alice")?;
    store.grant(ResourceGrant::for_team("connection", "c1", "ops", "connection.manage"))?;

    let checker = checker(registry()?, store);
    assert!(
        checker
            .check_resource("alice", "connection", "c1", "connection.launch")
            .await?
    );
    assert!(
        !checker
            .check_resource("bob", "connection", "c1", "connection.launch")
            .await?
    );
    assert_eq!(
        checker
            .resource_permissions("alice", "connection", "c1")
            .await?,
        vec!["connection.launch", "connection.manage", "connection.view"]
    );
    Ok(())
}

async fn verification_gating<S: Seed>(store: Arc<S>) -> Result<()> {
    store.user("alice", AuthProvider::Local)?;
    store.role("user-admin", &["user.manage"])?;
    store.assign("alice", "user-admin")?;
    store.grant(ResourceGrant::for_user("connection", "c1", "alice", "connection.manage"))?;
    store.require_verification(true)?;
    store.verification("alice", None)?;

    let checker = checker(registry()?, store.clone());
    assert!(checker.user_permissions("alice").await?.is_empty());
    assert!(!checker.check("alice", "user.view").await?);
    assert!(
        !checker
            .check_resource("alice", "connection", "c1", "connection.view")
            .await?
    );

    store.verification("alice", Some(now_millis()))?;
    assert_eq!(checker.user_permissions("alice").await?.len(), 5);
    assert!(checker.check("alice", "user.view").await?);
    Ok(())
}

async fn verification_not_required<S: Seed>(store: Arc<S>) -> Result<()> {
    store.user("alice", AuthProvider::Local)?;
    store.user("bob", AuthProvider::Saml)?;
    store.role("viewer", &["user.view"])?;
    store.assign("alice", "viewer")?;
    store.assign("bob", "viewer")?;
    store.verification("alice", None)?;
    store.verification("bob", None)?;

    let checker = checker(registry()?, store.clone());
    // Provider does not require verification.
    assert!(checker.check("alice", "user.view").await?);

    // Required, but only local users are gated.
    store.require_verification(true)?;
    assert!(!checker.check("alice", "user.view").await?);
    assert!(checker.check("bob", "user.view").await?);
    Ok(())
}

async fn team_inheritance<S: Seed>(store: Arc<S>) -> Result<()> {
    store.user("alice", AuthProvider::Oidc)?;
    store.team("support")?;
    store.member("support", "alice")?;
    store.role("viewer", &["user.view"])?;
    store.team_role("support", "viewer")?;

    let checker = checker(registry()?, store);
    assert!(checker.check("alice", "user.view").await?);
    assert!(checker
        .user_permissions("alice")
        .await?
        .contains(&"user.view".to_string()));
    Ok(())
}

async fn reseeding_keeps_assignments<S: Seed>(store: Arc<S>) -> Result<()> {
    store.user("alice", AuthProvider::Oidc)?;
    store.role("viewer", &["user.view"])?;
    store.assign("alice", "viewer")?;
    store.user("bob", AuthProvider::Oidc)?;
    store.root("bob")?;
    store.team("support")?;
    store.member("support", "alice")?;
    store.role("auditor", &["audit.view"])?;
    store.team_role("support", "auditor")?;

    // Adding existing records again must not drop root, roles or members.
    store.user("alice", AuthProvider::Oidc)?;
    store.user("bob", AuthProvider::Oidc)?;
    store.team("support")?;

    let checker = checker(registry()?, store);
    assert!(checker.check("alice", "user.view").await?);
    assert!(checker.check("alice", "audit.view").await?);
    assert!(checker.check("bob", "user.delete").await?);
    Ok(())
}

async fn protocol_permissions<S: Seed>(store: Arc<S>) -> Result<()> {
    let registry = registry()?;
    registry.register_protocol_permission(
        "ssh",
        "connect",
        Permission::default().depends_on(["connection.launch"]),
    )?;
    registry.validate_graph()?;

    store.user("alice", AuthProvider::Oidc)?;
    store.role("ssh", &["protocol:ssh.connect", "connection.launch"])?;
    store.assign("alice", "ssh")?;

    let checker = checker(registry, store.clone());
    // connection.launch itself needs connection.view.
    assert!(!checker.check("alice", "protocol:ssh.connect").await?);

    store.role("viewer", &["connection.view"])?;
    store.assign("alice", "viewer")?;
    assert!(checker.check("alice", "protocol:ssh.connect").await?);
    Ok(())
}

async fn unknown_permission<S: Seed>(store: Arc<S>) -> Result<()> {
    store.user("alice", AuthProvider::Oidc)?;
    let checker = checker(registry()?, store.clone());

    let err = checker.check("alice", "nope.nope").await.unwrap_err();
    assert!(matches!(err, CheckError::UnknownPermission(ref id) if id == "nope.nope"));

    // A role naming an unregistered permission is corrupted data.
    store.role("broken", &["ghost.permission"])?;
    store.assign("alice", "broken")?;
    let err = checker.check("alice", "user.view").await.unwrap_err();
    assert!(matches!(err, CheckError::UnknownPermission(ref id) if id == "ghost.permission"));
    Ok(())
}

async fn revocation_is_immediate<S: Seed>(store: Arc<S>) -> Result<()> {
    store.user("alice", AuthProvider::Oidc)?;
    let grant = ResourceGrant::for_user("connection", "c1", "alice", "connection.view");
    store.grant(grant.clone())?;

    let checker = checker(registry()?, store.clone());
    assert!(
        checker
            .check_resource("alice", "connection", "c1", "connection.view")
            .await?
    );

    store.grant(grant.expires_at(now_millis() - 1))?;
    assert!(
        !checker
            .check_resource("alice", "connection", "c1", "connection.view")
            .await?
    );
    Ok(())
}

macro_rules! on_both_stores {
    ($($name:ident),* $(,)?) => {
        mod memory {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() -> Result<()> {
                    init_tracing();
                    super::$name(Arc::new(MemoryStore::new())).await
                }
            )*
        }

        mod sqlite {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() -> Result<()> {
                    init_tracing();
                    super::$name(Arc::new(SqliteStore::open_memory()?)).await
                }
            )*
        }
    };
}

on_both_stores!(
    root_bypass,
    dependency_enforcement,
    delete_requires_view_and_edit,
    implication_propagation,
    cycle_detection,
    resource_expiry,
    resource_dependency_enforcement,
    team_resource_grants,
    verification_gating,
    verification_not_required,
    team_inheritance,
    reseeding_keeps_assignments,
    protocol_permissions,
    unknown_permission,
    revocation_is_immediate,
);

// ─────────────────────────────────────────────────────────────────────────────
// Storage failures
// ─────────────────────────────────────────────────────────────────────────────

/// A store whose every query fails.
struct FailingStore;

#[async_trait]
impl GrantStore for FailingStore {
    async fn load_principal(&self, _user_id: &str) -> StoreResult<Option<PrincipalRecord>> {
        Err(StoreError::InvalidData("users table unreadable".into()))
    }

    async fn resource_grants(&self, _query: &ResourceGrantQuery) -> StoreResult<Vec<ResourceGrant>> {
        Err(StoreError::InvalidData("grants table unreadable".into()))
    }

    async fn email_verification(&self, _user_id: &str) -> StoreResult<Option<VerificationRecord>> {
        Err(StoreError::InvalidData("verification table unreadable".into()))
    }

    async fn local_verification_required(&self) -> StoreResult<bool> {
        Err(StoreError::InvalidData("settings unreadable".into()))
    }
}

/// A store that answers after a delay.
struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

#[async_trait]
impl GrantStore for SlowStore {
    async fn load_principal(&self, user_id: &str) -> StoreResult<Option<PrincipalRecord>> {
        tokio::time::sleep(self.delay).await;
        self.inner.load_principal(user_id).await
    }

    async fn resource_grants(&self, query: &ResourceGrantQuery) -> StoreResult<Vec<ResourceGrant>> {
        tokio::time::sleep(self.delay).await;
        self.inner.resource_grants(query).await
    }

    async fn email_verification(&self, user_id: &str) -> StoreResult<Option<VerificationRecord>> {
        self.inner.email_verification(user_id).await
    }

    async fn local_verification_required(&self) -> StoreResult<bool> {
        self.inner.local_verification_required().await
    }
}

#[tokio::test]
async fn storage_errors_propagate_not_deny() -> Result<()> {
    init_tracing();
    let checker = Checker::new(registry()?, Arc::new(FailingStore), CheckerConfig::default());

    let err = checker.check("alice", "user.view").await.unwrap_err();
    assert!(matches!(err, CheckError::Store(StoreError::InvalidData(_))));
    assert!(!err.is_misconfiguration());
    assert_eq!(err.public_message(), "permission check failed");

    assert!(checker
        .check_resource("alice", "connection", "c1", "connection.view")
        .await
        .is_err());
    assert!(checker.user_permissions("alice").await.is_err());
    Ok(())
}

#[tokio::test]
async fn slow_storage_times_out() -> Result<()> {
    init_tracing();
    let inner = MemoryStore::new();
    inner.add_user("alice", AuthProvider::Oidc)?;
    let store = Arc::new(SlowStore {
        inner,
        delay: Duration::from_millis(500),
    });

    let config = CheckerConfig {
        storage_timeout: Some(Duration::from_millis(20)),
        ..CheckerConfig::default()
    };
    let checker = Checker::new(registry()?, store.clone(), config);
    let err = checker.check("alice", "user.view").await.unwrap_err();
    assert!(matches!(err, CheckError::Timeout(d) if d == Duration::from_millis(20)));

    // Without a bound the same store answers normally.
    let patient = Checker::new(
        registry()?,
        store,
        CheckerConfig {
            storage_timeout: None,
            ..CheckerConfig::default()
        },
    );
    assert!(!patient.check("alice", "user.view").await?);
    Ok(())
}

#[tokio::test]
async fn dyn_store_checker() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.add_user("alice", AuthProvider::Oidc)?;
    store.add_role("viewer", ["audit.view"])?;
    store.assign_role("alice", "viewer")?;

    let store: Arc<dyn GrantStore> = store;
    let checker = Checker::new(registry()?, store, CheckerConfig::default());
    assert!(checker.check("alice", "audit.view").await?);
    Ok(())
}

#[tokio::test]
async fn file_backed_store_survives_reopen() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("warden.db");

    {
        let store = SqliteStore::open(&path)?;
        store.add_user("alice", AuthProvider::Oidc)?;
        store.add_role("viewer", ["user.view"])?;
        store.assign_role("alice", "viewer")?;
    }

    let registry = registry()?;
    let checker = Checker::new(
        registry.clone(),
        Arc::new(SqliteStore::open(&path)?),
        CheckerConfig::default(),
    );
    assert!(checker.check("alice", "user.view").await?);

    let written = checker.sync_catalog().await?;
    assert_eq!(written, registry.len());
    Ok(())
}
