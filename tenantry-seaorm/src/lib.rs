//! # Tenantry SeaORM
//!
//! SeaORM backend for Tenantry: a registry of named connections and
//! transactions routed to the active tenant.
//!
//! ## Features
//!
//! - **Named Connections**: One pool per tenant database, opened from settings
//! - **Tenant Transactions**: Commit or roll back on the current tenant
//! - **Sticky Writes**: `Tenanted` active models write where they were made
//! - **Multiple Backends**: PostgreSQL, MySQL, and SQLite support
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tenantry_config::DatabaseSettings;
//! use tenantry_seaorm::{ConnectionManager, TenantTransaction};
//!
//! let settings = DatabaseSettings::from_file("config/database.toml")?;
//! let connections = ConnectionManager::connect(&settings).await?;
//!
//! tenantry_core::start("tenant_db");
//! connections
//!     .transaction(|txn| {
//!         Box::pin(async move {
//!             user::ActiveModel {
//!                 name: Set("Alice".to_owned()),
//!                 ..Default::default()
//!             }
//!             .insert(txn)
//!             .await?;
//!             Ok::<_, DbError>(())
//!         })
//!     })
//!     .await?;
//! tenantry_core::end();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod connections;
mod database;
mod error;
mod model;
mod transaction;

pub use connections::*;
pub use database::*;
pub use error::*;
pub use model::*;
pub use transaction::*;

// Re-export sea-orm types for convenience
pub use sea_orm;

/// Prelude module for commonly used types.
pub mod prelude {
    pub use super::{ConnectionManager, Database, DbError, DbResult};
    pub use super::{IsolationLevel, TenantTransaction, TenantedModelExt};
    pub use sea_orm::entity::prelude::*;
    pub use sea_orm::{
        ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait,
        PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    };
}
