//! A single named SeaORM connection.

use crate::{DbError, DbResult};
use sea_orm::{ConnectOptions, ConnectionTrait, DatabaseConnection};
use std::sync::Arc;
use std::time::Instant;
use tenantry_config::ConnectionSettings;
use tenantry_log::{debug, info};

/// Named wrapper around a pooled [`DatabaseConnection`].
///
/// Clones share the pool.
#[derive(Clone)]
pub struct Database {
    name: Arc<str>,
    conn: DatabaseConnection,
}

impl Database {
    /// Open the pool described by `settings` under `name`.
    pub async fn connect(name: &str, settings: &ConnectionSettings) -> DbResult<Self> {
        info!("Connecting to database {}", name);
        debug!("Database URL: {}", settings.redacted_url());

        let conn = sea_orm::Database::connect(connect_options(settings))
            .await
            .map_err(|e| DbError::Connection(format!("{}: {}", name, e)))?;

        info!("Database connection {} established", name);

        Ok(Self::from_connection(name, conn))
    }

    /// Wrap an already open connection, e.g. a mock.
    pub fn from_connection(name: &str, conn: DatabaseConnection) -> Self {
        Self {
            name: Arc::from(name),
            conn,
        }
    }

    /// Registry name of this connection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the database to check connectivity.
    pub async fn ping(&self) -> DbResult<()> {
        debug!("Pinging database {}", self.name);
        self.conn
            .ping()
            .await
            .map_err(|e| DbError::Connection(e.to_string()))
    }

    /// Close the pool.
    pub async fn close(self) -> DbResult<()> {
        info!("Closing database connection {}", self.name);
        self.conn
            .close()
            .await
            .map_err(|e| DbError::Connection(e.to_string()))
    }

    /// Get database backend information.
    pub fn backend(&self) -> DatabaseBackend {
        match self.conn.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => DatabaseBackend::Postgres,
            sea_orm::DatabaseBackend::MySql => DatabaseBackend::MySql,
            sea_orm::DatabaseBackend::Sqlite => DatabaseBackend::Sqlite,
        }
    }

    /// Perform a health check.
    pub async fn health_check(&self) -> DatabaseHealth {
        let start = Instant::now();
        let result = self.ping().await;
        let elapsed = start.elapsed();

        DatabaseHealth {
            name: self.name.to_string(),
            is_healthy: result.is_ok(),
            response_time_ms: elapsed.as_millis() as u64,
            backend: self.backend(),
            error: result.err().map(|e| e.to_string()),
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("backend", &self.backend())
            .finish()
    }
}

impl std::ops::Deref for Database {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl AsRef<DatabaseConnection> for Database {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.conn
    }
}

/// Pool options for `settings`.
pub fn connect_options(settings: &ConnectionSettings) -> ConnectOptions {
    let mut options = ConnectOptions::new(settings.url.clone());

    options
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .connect_timeout(settings.connect_timeout)
        .idle_timeout(settings.idle_timeout)
        .max_lifetime(settings.max_lifetime)
        .sqlx_logging(settings.sqlx_logging);

    if let Some(ref schema) = settings.schema {
        options.set_schema_search_path(schema.clone());
    }

    options
}

/// Database backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    /// PostgreSQL.
    Postgres,
    /// MySQL/MariaDB.
    MySql,
    /// SQLite.
    Sqlite,
}

impl DatabaseBackend {
    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        match self {
            DatabaseBackend::Postgres => "PostgreSQL",
            DatabaseBackend::MySql => "MySQL",
            DatabaseBackend::Sqlite => "SQLite",
        }
    }
}

/// Health of one named connection.
#[derive(Debug, Clone)]
pub struct DatabaseHealth {
    /// Registry name.
    pub name: String,
    /// Whether the database is reachable.
    pub is_healthy: bool,
    /// Response time in milliseconds.
    pub response_time_ms: u64,
    /// Backend type.
    pub backend: DatabaseBackend,
    /// Error message if unhealthy.
    pub error: Option<String>,
}
