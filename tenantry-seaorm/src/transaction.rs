//! Tenant-routed transactions.

use crate::{ConnectionManager, DbError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::DatabaseTransaction;
use std::fmt::{Debug, Display};
use tenantry_core::context;

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// Read uncommitted - lowest isolation.
    ReadUncommitted,
    /// Read committed.
    ReadCommitted,
    /// Repeatable read.
    RepeatableRead,
    /// Serializable - highest isolation.
    Serializable,
}

impl From<IsolationLevel> for sea_orm::IsolationLevel {
    fn from(level: IsolationLevel) -> Self {
        match level {
            IsolationLevel::ReadUncommitted => sea_orm::IsolationLevel::ReadUncommitted,
            IsolationLevel::ReadCommitted => sea_orm::IsolationLevel::ReadCommitted,
            IsolationLevel::RepeatableRead => sea_orm::IsolationLevel::RepeatableRead,
            IsolationLevel::Serializable => sea_orm::IsolationLevel::Serializable,
        }
    }
}

/// Transactions on the active tenant's connection.
///
/// The connection is the current tenant when one is active, otherwise the
/// default. The tenant stack is read, never pushed or popped.
#[async_trait]
pub trait TenantTransaction {
    /// Execute a closure within a transaction on the current connection.
    ///
    /// If the closure returns an error, the transaction is rolled back and
    /// the error is returned as is. Otherwise, the transaction is committed.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// tenantry::start("tenant_db");
    /// connections
    ///     .transaction(|txn| {
    ///         Box::pin(async move {
    ///             let user = user::ActiveModel {
    ///                 name: Set("Alice".to_owned()),
    ///                 ..Default::default()
    ///             };
    ///             user.insert(txn).await?;
    ///             Ok::<_, DbError>(())
    ///         })
    ///     })
    ///     .await?;
    /// tenantry::end();
    /// ```
    async fn transaction<F, T, E>(&self, callback: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, E>> + Send,
        T: Send,
        E: From<DbError> + Display + Debug + Send;

    /// Execute a closure within a transaction with custom isolation level.
    async fn transaction_with_isolation<F, T, E>(
        &self,
        isolation: IsolationLevel,
        callback: F,
    ) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, E>> + Send,
        T: Send,
        E: From<DbError> + Display + Debug + Send;
}

impl ConnectionManager {
    fn current_name(&self) -> String {
        context::current().unwrap_or_else(|| self.default_name().to_string())
    }
}

#[async_trait]
impl TenantTransaction for ConnectionManager {
    async fn transaction<F, T, E>(&self, callback: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, E>> + Send,
        T: Send,
        E: From<DbError> + Display + Debug + Send,
    {
        let connection = self.current_name();
        self.run_with_isolation(&connection, None, callback).await
    }

    async fn transaction_with_isolation<F, T, E>(
        &self,
        isolation: IsolationLevel,
        callback: F,
    ) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, E>> + Send,
        T: Send,
        E: From<DbError> + Display + Debug + Send,
    {
        tenantry_log::debug!("Transaction isolation level {:?}", isolation);
        let connection = self.current_name();
        self.run_with_isolation(&connection, Some(isolation), callback).await
    }
}
