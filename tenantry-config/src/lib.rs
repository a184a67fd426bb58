//! Connection configuration for tenantry.
//!
//! Supplies the two things the tenancy core needs from configuration: the
//! name of the default connection and the map of every named connection.
//!
//! ```rust
//! use tenantry_config::{ConnectionSettings, DatabaseSettings, Validate};
//!
//! let settings = DatabaseSettings::new("testing")
//!     .with_connection("testing", ConnectionSettings::new("sqlite::memory:"))
//!     .with_connection("tenant_db", ConnectionSettings::new("sqlite::memory:"));
//!
//! assert!(settings.validate().is_ok());
//! assert_eq!(settings.default, "testing");
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{ConnectionSettings, DatabaseSettings, ENV_PREFIX};
pub use validation::{ConfigValidator, Validate};
