//! Entity Connection Binding

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which connection an entity is bound to.
///
/// `Unset` and `Default` both mean "use the process default", but are kept
/// apart so that a container which explicitly assigned the default is still
/// recognisable. Neither counts as an explicit choice when tenant context is
/// applied; see [`crate::ConnectionResolver`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum ConnectionBinding {
    /// Nothing assigned yet.
    #[default]
    Unset,
    /// Explicitly bound to whatever the default connection is.
    Default,
    /// Bound to a named connection.
    Named(String),
}

impl ConnectionBinding {
    /// Bind to `connection`.
    pub fn named(connection: impl Into<String>) -> Self {
        Self::Named(connection.into())
    }

    /// The named connection, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Unset | Self::Default => None,
        }
    }

    /// Effective connection name given the process default.
    pub fn name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.name().unwrap_or(default)
    }

    /// Whether this binding names a connection other than `default`.
    ///
    /// `Named(default)` is not explicit: it is indistinguishable from a
    /// container that simply filled in the default.
    pub fn is_explicit(&self, default: &str) -> bool {
        matches!(self, Self::Named(name) if name != default)
    }
}

impl fmt::Display for ConnectionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "<unset>"),
            Self::Default => write!(f, "<default>"),
            Self::Named(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for ConnectionBinding {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for ConnectionBinding {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<Option<String>> for ConnectionBinding {
    fn from(name: Option<String>) -> Self {
        name.map_or(Self::Unset, Self::Named)
    }
}
