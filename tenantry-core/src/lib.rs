//! Tenant Context for Tenantry
//!
//! Lets one process serve many tenants, each backed by its own database
//! connection, without threading a connection through every data-access
//! call. Code declares "everything in this block targets tenant X" and
//! entities constructed inside the block stay bound to X.
//!
//! # Features
//!
//! - 🧱 **Context Stack** - Nested `start`/`end`, `current`, `reset`
//! - 🔒 **Unit-of-Work Isolation** - Task-local stack per request or job
//! - 📌 **Sticky Bindings** - Resolved once, at construction
//! - 🎯 **Overrides** - Explicit connections beat tenant context
//! - 🔁 **Transactions** - Routed to the current tenant or the default
//! - 🧹 **Lifecycle Hooks** - Reset and notify at every unit boundary
//!
//! # Quick Start
//!
//! ## 1. Nesting Tenants
//!
//! ```rust
//! use tenantry_core::Tenancy;
//!
//! let tenancy = Tenancy::new("testing");
//!
//! tenancy.start("tenant_db");
//! let user = tenancy.make("alice");
//! tenancy.end();
//!
//! // Sticky: still targets tenant_db after the scope ended
//! assert_eq!(tenancy.connection_for(&user), "tenant_db");
//! assert_eq!(tenancy.current(), None);
//! ```
//!
//! ## 2. Scoped Acquisition
//!
//! ```rust
//! use tenantry_core::{context, enter};
//!
//! {
//!     let _tenant = enter("tenant_db");
//!     assert_eq!(context::current().as_deref(), Some("tenant_db"));
//! }
//! assert_eq!(context::current(), None);
//! ```
//!
//! ## 3. Units of Work
//!
//! ```rust,ignore
//! let tenancy = Tenancy::new("testing");
//! tenancy.hooks().on_unit_end(|event| metrics.record(event));
//!
//! // Each request gets its own stack, reset when the handler returns
//! tenancy
//!     .run_unit(UnitOfWorkKind::Request, async move {
//!         tenancy.start(tenant_from(&request));
//!         handle(request).await
//!     })
//!     .await
//! ```
//!
//! ## 4. Transactions
//!
//! ```rust,ignore
//! tenancy.start("tenant_db");
//! tenancy
//!     .transaction(&connections, |txn| {
//!         Box::pin(async move {
//!             user.insert(txn).await?;
//!             Ok::<_, DbError>(())
//!         })
//!     })
//!     .await?;
//! tenancy.end();
//! ```

pub mod binding;
pub mod context;
pub mod entity;
pub mod error;
pub mod guard;
pub mod lifecycle;
pub mod resolver;
pub mod stack;
pub mod tenancy;
pub mod transaction;

pub use binding::ConnectionBinding;
pub use context::{current, end, reset, start};
pub use entity::{TenantAware, Tenanted};
pub use error::TenancyError;
pub use guard::{TenantGuard, enter, with_tenant};
pub use lifecycle::{LifecycleHooks, UnitOfWork, UnitOfWorkEnded, UnitOfWorkKind, UnitOutcome};
pub use resolver::{ConnectionResolver, Resolution};
pub use stack::ConnectionStack;
pub use tenancy::{Pinned, Tenancy};
pub use transaction::TransactionRunner;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::binding::ConnectionBinding;
    pub use crate::context;
    pub use crate::entity::{TenantAware, Tenanted};
    pub use crate::error::TenancyError;
    pub use crate::guard::{TenantGuard, enter, with_tenant};
    pub use crate::lifecycle::{LifecycleHooks, UnitOfWorkEnded, UnitOfWorkKind, UnitOutcome};
    pub use crate::tenancy::Tenancy;
    pub use crate::transaction::TransactionRunner;
}
