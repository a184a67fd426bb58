//! Integration tests for common Tenantry workflows.
//!
//! These tests drive the facade the way a host application would.

use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Schema, Set};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tenantry::prelude::*;
use tenantry::{Resolution, UnitOutcome};

/// Collects unit-end events.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<UnitOfWorkEnded>>>);

impl Recorder {
    fn push(&self, event: &UnitOfWorkEnded) {
        self.0.lock().unwrap().push(event.clone());
    }

    fn events(&self) -> Vec<UnitOfWorkEnded> {
        self.0.lock().unwrap().clone()
    }
}

mod user {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

// =============================================================================
// Context Stack
// =============================================================================

#[test]
fn test_script_nesting_and_stickiness() {
    let tenancy = Tenancy::new("testing");

    let result: Result<(), ()> = tenancy.hooks().run_unit_sync(UnitOfWorkKind::Script, || {
        assert_eq!(tenancy.current(), None);

        tenancy.start("a");
        tenancy.start("b");
        assert_eq!(tenancy.current().as_deref(), Some("b"));

        let inner = tenancy.make("inner");
        tenancy.end();
        assert_eq!(tenancy.current().as_deref(), Some("a"));
        tenancy.end();
        assert_eq!(tenancy.current(), None);

        // popping past empty is a no-op
        assert_eq!(tenancy.end(), None);

        assert_eq!(tenancy.connection_for(&inner), "b");
        Ok(())
    });

    assert!(result.is_ok());
}

#[test]
fn test_explicit_override_precedence() {
    let tenancy = Tenancy::new("testing");
    tenancy.reset();

    tenancy.start("tenant_db");
    let pinned = tenancy.on("testing").make("report");
    let named = tenancy.make_with_binding("event", ConnectionBinding::named("analytics"));
    let defaulted = tenancy.make_with_binding("user", ConnectionBinding::Default);
    tenancy.reset();

    assert_eq!(tenancy.connection_for(&pinned), "testing");
    assert_eq!(tenancy.connection_for(&named), "analytics");
    assert_eq!(tenancy.connection_for(&defaulted), "tenant_db");
}

#[test]
fn test_resolver_outcomes() {
    let tenancy = Tenancy::new("testing");
    let resolver = tenancy.resolver();

    assert_eq!(
        resolver.decide(&ConnectionBinding::Unset, None),
        Resolution::NoTenant
    );
    assert_eq!(
        resolver.decide(&ConnectionBinding::named("testing"), Some("tenant_db")),
        Resolution::Tenant("tenant_db".into())
    );
    assert_eq!(
        resolver.decide(&ConnectionBinding::named("analytics"), Some("tenant_db")),
        Resolution::Explicit("analytics".into())
    );
}

// =============================================================================
// Units of Work
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_are_isolated() {
    let tenancy = Tenancy::new("testing");
    let mut handles = Vec::new();

    for i in 0..8 {
        let tenancy = tenancy.clone();
        handles.push(tokio::spawn(async move {
            tenancy
                .run_unit(UnitOfWorkKind::Request, async {
                    let tenant = format!("tenant_{}", i);
                    tenancy.start(tenant.clone());
                    tokio::task::yield_now().await;
                    let entity = tenancy.make(i);
                    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                    Ok::<_, ()>((tenant, tenancy.connection_for(&entity)))
                })
                .await
        }));
    }

    for handle in handles {
        let (tenant, resolved) = handle.await.unwrap().unwrap();
        assert_eq!(tenant, resolved);
    }
}

#[tokio::test]
async fn test_hooks_fire_on_every_exit_path() {
    let tenancy = Tenancy::new("testing");
    let recorder = Recorder::default();
    let sink = recorder.clone();
    tenancy.hooks().on_unit_end(move |event| sink.push(event));

    let _: Result<(), &str> = tenancy
        .run_unit(UnitOfWorkKind::Request, async {
            tenancy.start("tenant_db");
            tenancy.end();
            Ok(())
        })
        .await;
    let _: Result<(), &str> = tenancy
        .run_unit(UnitOfWorkKind::Job, async {
            tenancy.start("tenant_db");
            Err("job failed")
        })
        .await;

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].outcome, UnitOutcome::Completed);
    assert_eq!(events[0].leaked_depth, 0);
    assert_eq!(events[1].outcome, UnitOutcome::Failed);
    assert_eq!(events[1].leaked_depth, 1);
}

#[tokio::test]
async fn test_spawned_work_inherits_tenant() {
    let tenancy = Tenancy::new("testing");

    context::scope(async {
        let _tenant = enter("tenant_db");

        let seen = tokio::spawn(context::inherit(async { context::current() }))
            .await
            .unwrap();

        assert_eq!(seen.as_deref(), Some("tenant_db"));
    })
    .await;

    assert_eq!(tenancy.current(), None);
}

// =============================================================================
// Configuration to Database
// =============================================================================

const SETTINGS: &str = r#"
[database]
default = "testing"

[database.connections.testing]
url = "sqlite::memory:"
max_connections = 1
min_connections = 1

[database.connections.tenant_db]
url = "sqlite::memory:"
max_connections = 1
min_connections = 1
"#;

async fn connect_from_file() -> (Tenancy, ConnectionManager) {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(SETTINGS.as_bytes()).unwrap();

    let settings = DatabaseSettings::from_file(file.path()).unwrap();
    let connections = ConnectionManager::connect(&settings).await.unwrap();

    for name in connections.names() {
        let db = connections.get(&name).unwrap();
        let backend = db.get_database_backend();
        let stmt = Schema::new(backend).create_table_from_entity(user::Entity);
        db.execute(backend.build(&stmt)).await.unwrap();
    }

    (connections.tenancy(), connections)
}

async fn count(connections: &ConnectionManager, name: &str) -> u64 {
    let db = connections.get(name).unwrap();
    user::Entity::find().count(db.connection()).await.unwrap()
}

fn new_user(name: &str) -> user::ActiveModel {
    user::ActiveModel {
        name: Set(name.to_owned()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_request_writes_land_on_tenant() {
    let (tenancy, connections) = connect_from_file().await;

    let result: Result<(), DbError> = tenancy
        .run_unit(UnitOfWorkKind::Request, async {
            tenancy.start("tenant_db");

            let user = tenancy.make(new_user("alice"));
            user.insert(&connections).await?;

            connections
                .transaction(|txn| {
                    Box::pin(async move {
                        sea_orm::ActiveModelTrait::insert(new_user("bob"), txn).await?;
                        Ok::<_, DbError>(())
                    })
                })
                .await?;

            tenancy.end();
            Ok(())
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(count(&connections, "tenant_db").await, 2);
    assert_eq!(count(&connections, "testing").await, 0);
}

#[tokio::test]
async fn test_failed_tenant_transaction_surfaces_unchanged() {
    let (tenancy, connections) = connect_from_file().await;

    let result: Result<(), DbError> = tenancy
        .run_unit(UnitOfWorkKind::Job, async {
            tenancy.start("tenant_db");
            tenancy
                .transaction(&connections, |txn| {
                    Box::pin(async move {
                        sea_orm::ActiveModelTrait::insert(new_user("carol"), txn).await?;
                        Err::<(), _>(DbError::UnknownConnection("raised by job".into()))
                    })
                })
                .await
        })
        .await;

    assert!(matches!(result, Err(DbError::UnknownConnection(msg)) if msg == "raised by job"));
    assert_eq!(count(&connections, "tenant_db").await, 0);
    assert_eq!(count(&connections, "testing").await, 0);
}
