//! The Tenancy hub.

use crate::binding::ConnectionBinding;
use crate::context;
use crate::entity::{TenantAware, Tenanted};
use crate::lifecycle::{LifecycleHooks, UnitOfWorkKind};
use crate::resolver::ConnectionResolver;
use crate::transaction::TransactionRunner;
use futures::future::BoxFuture;
use std::fmt::{Debug, Display};
use std::future::Future;
use tenantry_log::debug;

/// Entry point for tenant-aware construction and transactions.
///
/// Holds the process default connection, the resolver and the lifecycle
/// hooks. Cheap to clone; clones share the same hooks.
///
/// ```rust
/// use tenantry_core::{ConnectionBinding, Tenancy};
///
/// let tenancy = Tenancy::new("testing");
///
/// tenancy.start("tenant_db");
/// let user = tenancy.make("alice");
/// tenancy.end();
///
/// assert_eq!(user.binding(), &ConnectionBinding::named("tenant_db"));
/// assert_eq!(tenancy.connection_for(&user), "tenant_db");
/// ```
#[derive(Debug, Clone)]
pub struct Tenancy {
    resolver: ConnectionResolver,
    hooks: LifecycleHooks,
}

impl Tenancy {
    /// Create a hub whose default connection is `default_connection`.
    ///
    /// Also installs the log field provider that tags records with the
    /// active connection. The first hub created in a process wins.
    pub fn new(default_connection: impl Into<String>) -> Self {
        let resolver = ConnectionResolver::new(default_connection);

        if tenantry_log::set_field_provider(context::log_fields) {
            debug!(target: "tenantry", "Installed tenant log field provider");
        }

        Self {
            resolver,
            hooks: LifecycleHooks::new(),
        }
    }

    /// The process default connection.
    pub fn default_connection(&self) -> &str {
        self.resolver.default_connection()
    }

    /// The resolver used by [`Tenancy::make`] and [`Tenancy::adopt`].
    pub fn resolver(&self) -> &ConnectionResolver {
        &self.resolver
    }

    /// Unit-of-work end hooks.
    pub fn hooks(&self) -> &LifecycleHooks {
        &self.hooks
    }

    /// See [`context::start`].
    pub fn start(&self, connection: impl Into<String>) {
        context::start(connection);
    }

    /// See [`context::end`].
    pub fn end(&self) -> Option<String> {
        context::end()
    }

    /// See [`context::current`].
    pub fn current(&self) -> Option<String> {
        context::current()
    }

    /// See [`context::reset`].
    pub fn reset(&self) {
        context::reset();
    }

    /// The active tenant, or the default connection when none is active.
    pub fn current_or_default(&self) -> String {
        context::current().unwrap_or_else(|| self.default_connection().to_string())
    }

    /// Wrap `model` and resolve its binding against the active tenant.
    pub fn make<M>(&self, model: M) -> Tenanted<M> {
        self.make_with_binding(model, ConnectionBinding::Unset)
    }

    /// Like [`Tenancy::make`], starting from a container-supplied binding.
    pub fn make_with_binding<M>(&self, model: M, binding: ConnectionBinding) -> Tenanted<M> {
        self.adopt(Tenanted::with_binding(model, binding))
    }

    /// Resolve an entity built elsewhere and hand it back.
    pub fn adopt<E: TenantAware>(&self, mut entity: E) -> E {
        self.resolver.resolve_on_construct(&mut entity);
        entity
    }

    /// Pin construction to `connection`, bypassing tenant context.
    ///
    /// ```rust
    /// use tenantry_core::Tenancy;
    ///
    /// let tenancy = Tenancy::new("testing");
    /// tenancy.start("tenant_db");
    ///
    /// let report = tenancy.on("testing").make("monthly");
    /// assert_eq!(tenancy.connection_for(&report), "testing");
    ///
    /// tenancy.reset();
    /// ```
    pub fn on(&self, connection: impl Into<String>) -> Pinned {
        Pinned {
            connection: connection.into(),
        }
    }

    /// Connection an entity's operations go to.
    pub fn connection_for<E: TenantAware + ?Sized>(&self, entity: &E) -> String {
        entity
            .connection_name(self.default_connection())
            .to_string()
    }

    /// Run `callback` atomically on the current tenant, or the default
    /// connection when none is active.
    ///
    /// Does not push or pop the stack. The callback's result is returned
    /// unchanged; rollback on failure is up to `runner`.
    pub async fn transaction<R, F, T, E>(&self, runner: &R, callback: F) -> Result<T, E>
    where
        R: TransactionRunner,
        F: for<'c> FnOnce(&'c R::Transaction) -> BoxFuture<'c, Result<T, E>> + Send,
        T: Send,
        E: From<R::Error> + Display + Debug + Send,
    {
        let connection = self.current_or_default();
        debug!(target: "tenantry::transaction", "Running transaction on {}", connection);
        runner.run_in_transaction(&connection, callback).await
    }

    /// See [`LifecycleHooks::run_unit`].
    pub async fn run_unit<F, T, E>(&self, kind: UnitOfWorkKind, future: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        self.hooks.run_unit(kind, future).await
    }
}

/// Construction pinned to one connection. Created by [`Tenancy::on`].
///
/// The binding is always `Named`, even when the pinned connection is the
/// default, and the resolver is not consulted.
#[derive(Debug, Clone)]
pub struct Pinned {
    connection: String,
}

impl Pinned {
    /// The pinned connection.
    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// Wrap `model` bound to the pinned connection.
    pub fn make<M>(&self, model: M) -> Tenanted<M> {
        Tenanted::with_binding(model, ConnectionBinding::Named(self.connection.clone()))
    }

    /// Bind an existing entity to the pinned connection.
    pub fn adopt<E: TenantAware>(&self, mut entity: E) -> E {
        entity.set_connection_binding(ConnectionBinding::Named(self.connection.clone()));
        entity
    }
}
