//! Named connection registry.

use crate::{Database, DbError, DbResult, IsolationLevel};
use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use sea_orm::{DatabaseTransaction, TransactionError, TransactionTrait};
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::sync::Arc;
use tenantry_config::{DatabaseSettings, Validate};
use tenantry_core::{ConnectionBinding, TenantAware, Tenancy, TransactionRunner, context};
use tenantry_log::{debug, info, warn};

/// All connections a process can target, by name, plus the default.
///
/// Tenant identifiers pushed with `start()` are names in this registry. An
/// unknown name is reported when it is first used, never when it is pushed.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct ConnectionManager {
    default: Arc<str>,
    connections: Arc<RwLock<HashMap<String, Database>>>,
}

impl ConnectionManager {
    /// Empty registry whose default connection is `default`.
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: Arc::from(default.into()),
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Validate `settings` and open every connection it lists.
    pub async fn connect(settings: &DatabaseSettings) -> DbResult<Self> {
        settings.validate()?;

        let manager = Self::new(settings.default.clone());
        for (name, connection) in &settings.connections {
            let db = Database::connect(name, connection).await?;
            manager.register(db);
        }

        info!(
            "Connected {} database(s), default {}",
            settings.connections.len(),
            settings.default
        );

        Ok(manager)
    }

    /// Add or replace a connection under its own name.
    pub fn register(&self, db: Database) {
        let name = db.name().to_string();
        if self.connections.write().insert(name.clone(), db).is_some() {
            warn!("Replaced database connection {}", name);
        } else {
            debug!("Registered database connection {}", name);
        }
    }

    /// Connection registered as `name`.
    pub fn get(&self, name: &str) -> DbResult<Database> {
        self.connections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::UnknownConnection(name.to_string()))
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.connections.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Name of the default connection.
    pub fn default_name(&self) -> &str {
        &self.default
    }

    /// The default connection.
    pub fn default_connection(&self) -> DbResult<Database> {
        self.get(&self.default)
    }

    /// A [`Tenancy`] hub sharing this registry's default connection, so
    /// `connection_for` and the writes of [`crate::TenantedModelExt`] agree.
    pub fn tenancy(&self) -> Tenancy {
        Tenancy::new(self.default_name())
    }

    /// Connection for a binding; `Unset` and `Default` map to the default.
    pub fn for_binding(&self, binding: &ConnectionBinding) -> DbResult<Database> {
        self.get(binding.name_or(&self.default))
    }

    /// Connection an entity is bound to.
    pub fn for_entity<E: TenantAware + ?Sized>(&self, entity: &E) -> DbResult<Database> {
        self.for_binding(entity.connection_binding())
    }

    /// Connection of the active tenant, or the default when none is active.
    pub fn current(&self) -> DbResult<Database> {
        match context::current() {
            Some(name) => self.get(&name),
            None => self.default_connection(),
        }
    }

    /// Run `callback` atomically on the connection named `connection`.
    ///
    /// Commits when the callback returns `Ok`. Rolls back when it returns
    /// `Err` or when the returned future is dropped. The callback's error
    /// is returned unchanged; adapter errors convert into `E`.
    pub async fn run_in_transaction<F, T, E>(&self, connection: &str, callback: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, E>> + Send,
        T: Send,
        E: From<DbError> + Display + Debug + Send,
    {
        self.run_with_isolation(connection, None, callback).await
    }

    pub(crate) async fn run_with_isolation<F, T, E>(
        &self,
        connection: &str,
        isolation: Option<IsolationLevel>,
        callback: F,
    ) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, E>> + Send,
        T: Send,
        E: From<DbError> + Display + Debug + Send,
    {
        let db = self.get(connection)?;
        debug!("Starting transaction on {}", db.name());

        let result = db
            .connection()
            .transaction_with_config(callback, isolation.map(Into::into), None)
            .await;

        match result {
            Ok(value) => {
                debug!("Committed transaction on {}", db.name());
                Ok(value)
            }
            Err(TransactionError::Connection(err)) => Err(E::from(DbError::from(err))),
            Err(TransactionError::Transaction(err)) => {
                debug!("Rolled back transaction on {}: {}", db.name(), err);
                Err(err)
            }
        }
    }

    /// Close every pool and empty the registry.
    pub async fn close_all(&self) -> DbResult<()> {
        let drained: Vec<Database> = self.connections.write().drain().map(|(_, db)| db).collect();

        let mut first_error = None;
        for db in drained {
            if let Err(e) = db.close().await {
                warn!("Failed to close database connection: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("default", &self.default)
            .field("connections", &self.names())
            .finish()
    }
}

#[async_trait]
impl TransactionRunner for ConnectionManager {
    type Transaction = DatabaseTransaction;
    type Error = DbError;

    async fn run_in_transaction<F, T, E>(&self, connection: &str, callback: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, E>> + Send,
        T: Send,
        E: From<DbError> + Display + Debug + Send,
    {
        ConnectionManager::run_in_transaction(self, connection, callback).await
    }
}
