//! Error types for the SeaORM adapter.

use tenantry_config::ConfigError;
use thiserror::Error;

/// Errors raised by the connection registry and tenant transactions.
#[derive(Error, Debug)]
pub enum DbError {
    /// Could not open or reach a connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Database error from SeaORM.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// No connection is registered under this name.
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    /// Invalid connection settings.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for adapter operations.
pub type DbResult<T> = Result<T, DbError>;
