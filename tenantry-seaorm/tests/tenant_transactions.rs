//! Tenant routing against real SQLite connections.

use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Schema, Set};
use tenantry_config::{ConnectionSettings, DatabaseSettings};
use tenantry_core::{ConnectionBinding, Tenancy, UnitOfWorkKind, context};
use tenantry_seaorm::{ConnectionManager, DbError, TenantTransaction, TenantedModelExt};

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

fn sqlite() -> ConnectionSettings {
    ConnectionSettings::new("sqlite::memory:")
        .max_connections(1)
        .min_connections(1)
}

async fn setup() -> (Tenancy, ConnectionManager) {
    let settings = DatabaseSettings::new("testing")
        .with_connection("testing", sqlite())
        .with_connection("tenant_db", sqlite())
        .with_connection("other_tenant", sqlite());

    let connections = ConnectionManager::connect(&settings).await.unwrap();

    for name in connections.names() {
        let db = connections.get(&name).unwrap();
        let backend = db.get_database_backend();
        let stmt = Schema::new(backend).create_table_from_entity(user::Entity);
        db.execute(backend.build(&stmt)).await.unwrap();
    }

    (connections.tenancy(), connections)
}

fn new_user(name: &str) -> user::ActiveModel {
    user::ActiveModel {
        name: Set(name.to_owned()),
        ..Default::default()
    }
}

async fn count(connections: &ConnectionManager, name: &str) -> u64 {
    let db = connections.get(name).unwrap();
    user::Entity::find().count(db.connection()).await.unwrap()
}

async fn names(connections: &ConnectionManager, name: &str) -> Vec<String> {
    let db = connections.get(name).unwrap();
    user::Entity::find()
        .all(db.connection())
        .await
        .unwrap()
        .into_iter()
        .map(|user| user.name)
        .collect()
}

#[tokio::test]
async fn test_entity_without_tenant_writes_to_default() {
    let (tenancy, connections) = setup().await;

    context::scope(async {
        let user = tenancy.make(new_user("alice"));
        user.insert(&connections).await.unwrap();
    })
    .await;

    assert_eq!(count(&connections, "testing").await, 1);
    assert_eq!(count(&connections, "tenant_db").await, 0);
}

#[tokio::test]
async fn test_sticky_update_after_end() {
    let (tenancy, connections) = setup().await;

    context::scope(async {
        tenancy.start("tenant_db");
        let user = tenancy.make(new_user("alice"));
        tenancy.end();
        assert_eq!(tenancy.current(), None);

        let saved = user.clone().insert(&connections).await.unwrap();

        // same binding, now carrying the stored row
        let mut renamed = user.map(|_| user::ActiveModel::from(saved));
        renamed.name = Set("alice2".to_owned());
        renamed.update(&connections).await.unwrap();
    })
    .await;

    assert_eq!(names(&connections, "tenant_db").await, vec!["alice2"]);
    assert_eq!(count(&connections, "testing").await, 0);
}

#[tokio::test]
async fn test_override_beats_tenant() {
    let (tenancy, connections) = setup().await;

    context::scope(async {
        tenancy.start("tenant_db");
        let pinned = tenancy.on("testing").make(new_user("report"));
        let tenant = tenancy.make(new_user("alice"));
        tenancy.end();

        assert_eq!(pinned.binding(), &ConnectionBinding::named("testing"));
        pinned.insert(&connections).await.unwrap();
        tenant.insert(&connections).await.unwrap();
    })
    .await;

    assert_eq!(names(&connections, "testing").await, vec!["report"]);
    assert_eq!(names(&connections, "tenant_db").await, vec!["alice"]);
}

#[tokio::test]
async fn test_nested_tenants_route_to_innermost() {
    let (tenancy, connections) = setup().await;

    context::scope(async {
        tenancy.start("tenant_db");
        tenancy.start("other_tenant");
        tenancy.make(new_user("inner")).insert(&connections).await.unwrap();
        tenancy.end();
        tenancy.make(new_user("outer")).insert(&connections).await.unwrap();
        tenancy.end();
    })
    .await;

    assert_eq!(names(&connections, "other_tenant").await, vec!["inner"]);
    assert_eq!(names(&connections, "tenant_db").await, vec!["outer"]);
    assert_eq!(count(&connections, "testing").await, 0);
}

#[tokio::test]
async fn test_transaction_commits_on_current_tenant() {
    let (_tenancy, connections) = setup().await;

    context::scope(async {
        context::start("tenant_db");
        connections
            .transaction(|txn| {
                Box::pin(async move {
                    sea_orm::ActiveModelTrait::insert(new_user("alice"), txn).await?;
                    Ok::<_, DbError>(())
                })
            })
            .await
            .unwrap();
        context::end();
    })
    .await;

    assert_eq!(count(&connections, "tenant_db").await, 1);
    assert_eq!(count(&connections, "testing").await, 0);
}

#[tokio::test]
async fn test_failed_transaction_rolls_back_and_propagates() {
    let (_tenancy, connections) = setup().await;

    let result: Result<(), DbError> = context::scope(async {
        context::start("tenant_db");
        let result = connections
            .transaction(|txn| {
                Box::pin(async move {
                    sea_orm::ActiveModelTrait::insert(new_user("alice"), txn).await?;
                    Err::<(), DbError>(DbError::Connection("aborted by callback".into()))
                })
            })
            .await;

        // stack untouched by the transaction
        assert_eq!(context::current().as_deref(), Some("tenant_db"));
        result
    })
    .await;

    match result {
        Err(DbError::Connection(message)) => assert_eq!(message, "aborted by callback"),
        other => panic!("expected callback error, got {:?}", other),
    }
    assert_eq!(count(&connections, "tenant_db").await, 0);
    assert_eq!(count(&connections, "testing").await, 0);
}

#[tokio::test]
async fn test_rollback_leaves_other_connections_untouched() {
    let (tenancy, connections) = setup().await;

    context::scope(async {
        tenancy.make(new_user("existing")).insert(&connections).await.unwrap();

        tenancy.start("tenant_db");
        let _ = connections
            .transaction(|txn| {
                Box::pin(async move {
                    sea_orm::ActiveModelTrait::insert(new_user("doomed"), txn).await?;
                    Err::<(), _>(DbError::Connection("rollback".into()))
                })
            })
            .await;
        tenancy.end();
    })
    .await;

    assert_eq!(names(&connections, "testing").await, vec!["existing"]);
    assert_eq!(count(&connections, "tenant_db").await, 0);
}

#[tokio::test]
async fn test_tenancy_transaction_through_runner() {
    let (tenancy, connections) = setup().await;

    context::scope(async {
        tenancy.start("other_tenant");
        tenancy
            .transaction(&connections, |txn| {
                Box::pin(async move {
                    sea_orm::ActiveModelTrait::insert(new_user("via_runner"), txn).await?;
                    Ok::<_, DbError>(())
                })
            })
            .await
            .unwrap();
        tenancy.end();
    })
    .await;

    assert_eq!(names(&connections, "other_tenant").await, vec!["via_runner"]);
}

#[tokio::test]
async fn test_unknown_tenant_fails_at_first_use() {
    let (tenancy, connections) = setup().await;

    let result = context::scope(async {
        tenancy.start("no_such_db");
        let user = tenancy.make(new_user("alice"));
        tenancy.end();
        user.insert(&connections).await
    })
    .await;

    assert!(matches!(result, Err(DbError::UnknownConnection(name)) if name == "no_such_db"));
}

#[tokio::test]
async fn test_run_unit_resets_between_jobs() {
    let (tenancy, connections) = setup().await;

    let first: Result<(), DbError> = tenancy
        .run_unit(UnitOfWorkKind::Job, async {
            tenancy.start("tenant_db");
            tenancy.make(new_user("job1")).insert(&connections).await?;
            // no end(): the unit boundary clears it
            Ok(())
        })
        .await;

    let second: Result<(), DbError> = tenancy
        .run_unit(UnitOfWorkKind::Job, async {
            assert_eq!(tenancy.current(), None);
            tenancy.make(new_user("job2")).insert(&connections).await?;
            Ok(())
        })
        .await;

    assert!(first.is_ok() && second.is_ok());
    assert_eq!(names(&connections, "tenant_db").await, vec!["job1"]);
    assert_eq!(names(&connections, "testing").await, vec!["job2"]);
}

#[tokio::test]
async fn test_cancelled_transaction_rolls_back_and_keeps_stack() {
    let (tenancy, connections) = setup().await;

    let current = context::scope(async {
        tenancy.start("tenant_db");

        let pending = connections.transaction(|txn| {
            Box::pin(async move {
                sea_orm::ActiveModelTrait::insert(new_user("partial"), txn).await?;
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                Ok::<_, DbError>(())
            })
        });
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(50), pending).await;
        assert!(timed_out.is_err());

        tenancy.current()
    })
    .await;

    assert_eq!(current.as_deref(), Some("tenant_db"));
    assert_eq!(count(&connections, "tenant_db").await, 0);
    assert_eq!(count(&connections, "testing").await, 0);
}
