// Tenantry - tenant-scoped database connections for Rust
//
// This library lets one process serve many tenants by declaring, per block
// of code, which tenant's connection data access should target.

// Re-export core functionality
pub use tenantry_core::*;

// Re-export the member crates
pub use tenantry_core;
pub use tenantry_log;

#[cfg(feature = "config")]
pub use tenantry_config;

#[cfg(feature = "seaorm")]
pub use tenantry_seaorm;

/// Prelude module for convenient imports
pub mod prelude {
    pub use tenantry_core::prelude::*;

    #[cfg(feature = "config")]
    pub use tenantry_config::{ConnectionSettings, DatabaseSettings, Validate};

    #[cfg(feature = "seaorm")]
    pub use tenantry_seaorm::{
        ConnectionManager, Database, DbError, DbResult, IsolationLevel, TenantTransaction,
        TenantedModelExt,
    };
}
