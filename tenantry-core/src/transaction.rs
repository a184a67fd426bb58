//! Transaction Primitive
//!
//! The core never talks to a database itself. Storage adapters implement
//! [`TransactionRunner`] for their named connections and the core decides
//! which name to hand them.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt::{Debug, Display};

/// Runs a callback atomically against one named connection.
///
/// Implementations must:
///
/// - commit when the callback returns `Ok`,
/// - roll back every write the callback made when it returns `Err`, or when
///   the returned future is dropped before completion,
/// - hand the callback's error back unchanged.
///
/// Errors raised by the runner itself (unknown connection, failure to begin
/// or commit) are converted into the caller's error type through `From`.
#[async_trait]
pub trait TransactionRunner: Send + Sync {
    /// Handle passed to the callback.
    type Transaction: Send + Sync;

    /// Errors the runner can raise on its own.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run `callback` in a transaction on `connection`.
    async fn run_in_transaction<F, T, E>(&self, connection: &str, callback: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c Self::Transaction) -> BoxFuture<'c, Result<T, E>> + Send,
        T: Send,
        E: From<Self::Error> + Display + Debug + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tenancy;
    use crate::context::{current, depth, scope, start};
    use futures::FutureExt;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Debug, thiserror::Error)]
    #[error("unknown connection: {0}")]
    struct Unknown(String);

    #[derive(Debug, thiserror::Error)]
    enum AppError {
        #[error(transparent)]
        Runner(#[from] Unknown),
        #[error("callback failed: {0}")]
        Callback(&'static str),
    }

    /// Buffers writes per transaction and applies them on commit.
    #[derive(Default)]
    struct MemoryRunner {
        committed: Mutex<HashMap<String, Vec<String>>>,
    }

    impl MemoryRunner {
        fn with_connections(names: &[&str]) -> Self {
            let runner = Self::default();
            for name in names {
                runner.committed.lock().insert(name.to_string(), Vec::new());
            }
            runner
        }

        fn rows(&self, connection: &str) -> Vec<String> {
            self.committed
                .lock()
                .get(connection)
                .cloned()
                .unwrap_or_default()
        }
    }

    #[derive(Default)]
    struct Journal {
        writes: Mutex<Vec<String>>,
    }

    impl Journal {
        fn write(&self, row: &str) {
            self.writes.lock().push(row.to_string());
        }
    }

    #[async_trait]
    impl TransactionRunner for MemoryRunner {
        type Transaction = Journal;
        type Error = Unknown;

        async fn run_in_transaction<F, T, E>(&self, connection: &str, callback: F) -> Result<T, E>
        where
            F: for<'c> FnOnce(&'c Journal) -> BoxFuture<'c, Result<T, E>> + Send,
            T: Send,
            E: From<Unknown> + Display + Debug + Send,
        {
            if !self.committed.lock().contains_key(connection) {
                return Err(Unknown(connection.to_string()).into());
            }

            let journal = Journal::default();
            let result = callback(&journal).await;

            if result.is_ok() {
                let writes = std::mem::take(&mut *journal.writes.lock());
                if let Some(rows) = self.committed.lock().get_mut(connection) {
                    rows.extend(writes);
                }
            }
            result
        }
    }

    #[test]
    fn test_transaction_targets_current_tenant() {
        let runner = MemoryRunner::with_connections(&["testing", "tenant_db"]);
        let tenancy = Tenancy::new("testing");

        let result: Result<(), AppError> = tokio_test::block_on(scope(async {
            start("tenant_db");
            tenancy
                .transaction(&runner, |tx: &Journal| {
                    async move {
                        tx.write("alice");
                        Ok(())
                    }
                    .boxed()
                })
                .await
        }));

        assert!(result.is_ok());
        assert_eq!(runner.rows("tenant_db"), vec!["alice".to_string()]);
        assert!(runner.rows("testing").is_empty());
    }

    #[test]
    fn test_transaction_without_tenant_uses_default() {
        let runner = MemoryRunner::with_connections(&["testing", "tenant_db"]);
        let tenancy = Tenancy::new("testing");

        let result: Result<(), AppError> =
            tokio_test::block_on(tenancy.transaction(&runner, |tx: &Journal| {
                async move {
                    tx.write("bob");
                    Ok(())
                }
                .boxed()
            }));

        assert!(result.is_ok());
        assert_eq!(runner.rows("testing"), vec!["bob".to_string()]);
    }

    #[test]
    fn test_failed_callback_rolls_back_and_propagates() {
        let runner = MemoryRunner::with_connections(&["testing", "tenant_db"]);
        let tenancy = Tenancy::new("testing");

        let (result, top, depth_after) = tokio_test::block_on(scope(async {
            start("tenant_db");
            let result: Result<(), AppError> = tenancy
                .transaction(&runner, |tx: &Journal| {
                    async move {
                        tx.write("carol");
                        Err(AppError::Callback("constraint violated"))
                    }
                    .boxed()
                })
                .await;
            (result, current(), depth())
        }));

        assert!(matches!(
            result,
            Err(AppError::Callback("constraint violated"))
        ));
        assert!(runner.rows("tenant_db").is_empty());
        assert!(runner.rows("testing").is_empty());

        // transaction never pushes or pops
        assert_eq!(top.as_deref(), Some("tenant_db"));
        assert_eq!(depth_after, 1);
    }

    #[test]
    fn test_unknown_connection_surfaces_at_use() {
        let runner = MemoryRunner::with_connections(&["testing"]);
        let tenancy = Tenancy::new("testing");

        let result: Result<(), AppError> = tokio_test::block_on(scope(async {
            start("missing_tenant");
            tenancy
                .transaction(&runner, |_tx: &Journal| async move { Ok(()) }.boxed())
                .await
        }));

        match result {
            Err(AppError::Runner(Unknown(name))) => assert_eq!(name, "missing_tenant"),
            other => panic!("expected unknown connection, got {:?}", other),
        }
    }
}
