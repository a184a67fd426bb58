// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Environment variable loader scoped to a key prefix.
///
/// With prefix `TENANTRY_DB`, `load_var("default")` reads
/// `TENANTRY_DB_DEFAULT`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load every variable under the prefix, keys lowercased and stripped.
    pub fn load(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();

        for (key, value) in env::vars() {
            match self.prefix {
                Some(ref prefix) => {
                    if let Some(rest) = key.strip_prefix(prefix.as_str()) {
                        vars.insert(rest.trim_start_matches('_').to_lowercase(), value);
                    }
                }
                None => {
                    vars.insert(key.to_lowercase(), value);
                }
            }
        }

        vars
    }

    /// Full variable name for `key`.
    pub fn key(&self, key: &str) -> String {
        match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = self.key(key);
        env::var(&full_key).map_err(|source| ConfigError::EnvError {
            key: full_key,
            source,
        })
    }

    /// Load an optional variable; absent variables are `None`.
    pub fn load_opt(&self, key: &str) -> Option<String> {
        env::var(self.key(key)).ok()
    }

    /// Load and parse an optional variable.
    pub fn load_parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.load_opt(key) {
            Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
                ConfigError::ParseError(format!("{} has an invalid value: {}", self.key(key), raw))
            }),
            None => Ok(None),
        }
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}
