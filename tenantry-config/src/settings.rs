// Named database connection settings

use crate::env::EnvLoader;
use crate::loader::{ConfigLoader, FileFormat};
use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Default environment prefix for [`DatabaseSettings::from_env`].
pub const ENV_PREFIX: &str = "TENANTRY_DB";

/// Settings for one named connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Database URL.
    pub url: String,

    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout, in seconds when serialized.
    #[serde(default = "default_connect_timeout", with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Idle timeout for pooled connections.
    #[serde(default = "default_idle_timeout", with = "duration_secs")]
    pub idle_timeout: Duration,

    /// Maximum lifetime of a pooled connection.
    #[serde(default = "default_max_lifetime", with = "duration_secs")]
    pub max_lifetime: Duration,

    /// Enable SQLx statement logging.
    #[serde(default)]
    pub sqlx_logging: bool,

    /// Schema search path (PostgreSQL).
    #[serde(default)]
    pub schema: Option<String>,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_idle_timeout() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_max_lifetime() -> Duration {
    Duration::from_secs(30 * 60)
}

impl ConnectionSettings {
    /// Settings for `url` with pool defaults.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout: default_connect_timeout(),
            idle_timeout: default_idle_timeout(),
            max_lifetime: default_max_lifetime(),
            sqlx_logging: false,
            schema: None,
        }
    }

    /// Set the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the maximum connection lifetime.
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Enable or disable SQLx logging.
    pub fn sqlx_logging(mut self, enabled: bool) -> Self {
        self.sqlx_logging = enabled;
        self
    }

    /// Set the schema search path (PostgreSQL).
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// URL with the userinfo part masked, safe for logs.
    pub fn redacted_url(&self) -> String {
        match (self.url.find("://"), self.url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}://***{}", &self.url[..scheme_end], &self.url[at..])
            }
            _ => self.url.clone(),
        }
    }

    fn from_env(loader: &EnvLoader, name: &str) -> Result<Self> {
        let mut settings = Self::new(loader.load_var(&format!("{}_url", name))?);

        if let Some(max) = loader.load_parsed(&format!("{}_max_connections", name))? {
            settings.max_connections = max;
        }
        if let Some(min) = loader.load_parsed(&format!("{}_min_connections", name))? {
            settings.min_connections = min;
        }
        if let Some(secs) = loader.load_parsed(&format!("{}_connect_timeout", name))? {
            settings.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = loader.load_parsed(&format!("{}_idle_timeout", name))? {
            settings.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = loader.load_parsed(&format!("{}_max_lifetime", name))? {
            settings.max_lifetime = Duration::from_secs(secs);
        }
        if let Some(logging) = loader.load_opt(&format!("{}_sqlx_logging", name)) {
            settings.sqlx_logging = logging == "true" || logging == "1";
        }
        if let Some(schema) = loader.load_opt(&format!("{}_schema", name)) {
            settings.schema = Some(schema);
        }

        Ok(settings)
    }
}

impl Validate for ConnectionSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.url, "url")?;
        ConfigValidator::positive(self.max_connections, "max_connections")?;
        ConfigValidator::ordered(
            self.min_connections,
            self.max_connections,
            "min_connections",
            "max_connections",
        )
    }
}

/// The process-wide connection map and the name of the default connection.
///
/// Accepted file shapes (TOML shown, JSON is equivalent):
///
/// ```toml
/// default = "testing"
///
/// [connections.testing]
/// url = "sqlite::memory:"
///
/// [connections.tenant_db]
/// url = "postgres://app@db/tenant"
/// max_connections = 5
/// ```
///
/// The same document nested under a top-level `database` key is also
/// accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Name of the connection used when no tenant is active.
    pub default: String,

    /// Every named connection.
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionSettings>,
}

impl DatabaseSettings {
    /// Empty connection map with `default` as the default name.
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            connections: BTreeMap::new(),
        }
    }

    /// Add or replace a named connection.
    pub fn with_connection(mut self, name: impl Into<String>, settings: ConnectionSettings) -> Self {
        self.connections.insert(name.into(), settings);
        self
    }

    /// Look up a named connection.
    pub fn connection(&self, name: &str) -> Option<&ConnectionSettings> {
        self.connections.get(name)
    }

    /// Settings of the default connection.
    pub fn default_connection(&self) -> Option<&ConnectionSettings> {
        self.connection(&self.default)
    }

    /// Connection names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    /// Deserialize from an already parsed document and validate it.
    pub fn from_value(mut value: serde_json::Value) -> Result<Self> {
        if value.get("database").is_some() {
            value = value["database"].take();
        }

        let settings: Self = serde_json::from_value(value)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from a JSON, TOML or `.env` file.
    ///
    /// `.env` files are applied to the process environment and then read with
    /// [`DatabaseSettings::from_env`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let loader = ConfigLoader::auto(path)?;

        if loader.format() == FileFormat::Env {
            return Self::from_dotenv(Some(path));
        }

        tenantry_log::debug!("Loading database settings from {}", path.display());
        Self::from_value(loader.load_file(path)?)
    }

    /// Load from `TENANTRY_DB_*` variables.
    ///
    /// - `TENANTRY_DB_DEFAULT` names the default connection
    /// - `TENANTRY_DB_CONNECTIONS` lists extra names, comma separated
    /// - `TENANTRY_DB_<NAME>_URL` (required per name),
    ///   `_MAX_CONNECTIONS`, `_MIN_CONNECTIONS`, `_CONNECT_TIMEOUT`,
    ///   `_IDLE_TIMEOUT`, `_MAX_LIFETIME`, `_SQLX_LOGGING`, `_SCHEMA`
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// [`DatabaseSettings::from_env`] with a custom prefix.
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self> {
        let loader = EnvLoader::new(Some(prefix.to_string()));
        let default = loader.load_var("default")?;

        let mut names = vec![default.clone()];
        if let Some(list) = loader.load_opt("connections") {
            for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }

        let mut settings = Self::new(default);
        for name in names {
            let connection = ConnectionSettings::from_env(&loader, &name)?;
            settings.connections.insert(name, connection);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Apply a `.env` file (or the nearest one when `None`) and read the
    /// environment.
    pub fn from_dotenv(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Self::from_env()
    }
}

impl Validate for DatabaseSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.default, "default")?;

        if !self.connections.contains_key(&self.default) {
            return Err(ConfigError::ValidationError(format!(
                "default connection '{}' is not configured",
                self.default
            )));
        }

        for (name, connection) in &self.connections {
            ConfigValidator::not_empty(name, "connection name")?;
            connection.validate().map_err(|e| match e {
                ConfigError::ValidationError(msg) => {
                    ConfigError::ValidationError(format!("connection '{}': {}", name, msg))
                }
                other => other,
            })?;
        }

        Ok(())
    }
}

/// Durations as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
