//! Connection Resolution
//!
//! Decides, once per entity, whether tenant context replaces the binding
//! the entity was constructed with.

use crate::binding::ConnectionBinding;
use crate::context;
use crate::entity::TenantAware;
use std::sync::Arc;
use tenantry_log::trace;

/// Outcome of resolving one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No tenant was active; the binding was left as constructed.
    NoTenant,
    /// The entity was bound to the active tenant.
    Tenant(String),
    /// The entity already named a non-default connection and kept it.
    Explicit(String),
}

/// Applies tenant context to freshly constructed entities.
///
/// Precedence, highest first:
///
/// 1. an explicit binding to a connection other than the default,
/// 2. the active tenant,
/// 3. the binding supplied at construction (`Unset`/`Default`).
///
/// `Unset`, `Default` and `Named(default)` are all treated as "not chosen",
/// otherwise every container-filled entity would look explicit and tenant
/// context would never apply.
#[derive(Debug, Clone)]
pub struct ConnectionResolver {
    default_connection: Arc<str>,
}

impl ConnectionResolver {
    /// Create a resolver for a process whose default connection is
    /// `default_connection`.
    pub fn new(default_connection: impl Into<String>) -> Self {
        Self {
            default_connection: Arc::from(default_connection.into()),
        }
    }

    /// The process default connection.
    pub fn default_connection(&self) -> &str {
        &self.default_connection
    }

    /// Pure decision for a binding under an optional active tenant.
    pub fn decide(&self, binding: &ConnectionBinding, tenant: Option<&str>) -> Resolution {
        let Some(tenant) = tenant else {
            return Resolution::NoTenant;
        };

        match binding {
            ConnectionBinding::Named(name) if binding.is_explicit(&self.default_connection) => {
                Resolution::Explicit(name.clone())
            }
            _ => Resolution::Tenant(tenant.to_string()),
        }
    }

    /// Resolve `entity` against the current tenant context.
    ///
    /// Call exactly once, as part of construction. The resulting binding is
    /// sticky: later `start`/`end` calls do not affect it.
    pub fn resolve_on_construct<E: TenantAware + ?Sized>(&self, entity: &mut E) -> Resolution {
        let tenant = context::current();
        let resolution = self.decide(entity.connection_binding(), tenant.as_deref());

        match resolution {
            Resolution::Tenant(ref name) => {
                trace!(target: "tenantry::resolver", "binding entity to tenant {}", name);
                entity.set_connection_binding(ConnectionBinding::Named(name.clone()));
            }
            Resolution::Explicit(ref name) => {
                trace!(target: "tenantry::resolver", "keeping explicit connection {}", name);
            }
            Resolution::NoTenant => {}
        }

        resolution
    }
}
