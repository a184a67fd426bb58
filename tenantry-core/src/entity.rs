//! Tenant-aware entities.

use crate::binding::ConnectionBinding;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// A data-access entity that carries a connection binding.
///
/// The binding is decided once, when the entity is constructed through
/// [`crate::Tenancy`], and stays put afterwards.
pub trait TenantAware {
    /// Current binding.
    fn connection_binding(&self) -> &ConnectionBinding;

    /// Replace the binding. Only construction-time resolution and explicit
    /// overrides should call this.
    fn set_connection_binding(&mut self, binding: ConnectionBinding);

    /// Effective connection name given the process default.
    fn connection_name<'a>(&'a self, default: &'a str) -> &'a str {
        self.connection_binding().name_or(default)
    }
}

/// Pairs any model with a connection binding.
///
/// Dereferences to the model, so a `Tenanted<user::ActiveModel>` can be used
/// where the model is expected while remembering where it belongs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenanted<M> {
    model: M,
    binding: ConnectionBinding,
}

impl<M> Tenanted<M> {
    /// Wrap `model` with an unset binding.
    pub fn new(model: M) -> Self {
        Self::with_binding(model, ConnectionBinding::Unset)
    }

    /// Wrap `model` with a container-supplied binding.
    pub fn with_binding(model: M, binding: ConnectionBinding) -> Self {
        Self { model, binding }
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access to the wrapped model. The binding is unaffected.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// The binding.
    pub fn binding(&self) -> &ConnectionBinding {
        &self.binding
    }

    /// Split into model and binding.
    pub fn into_parts(self) -> (M, ConnectionBinding) {
        (self.model, self.binding)
    }

    /// Drop the binding.
    pub fn into_inner(self) -> M {
        self.model
    }

    /// Transform the model, keeping the binding (for example a query result
    /// turned into an active model for an update).
    pub fn map<N>(self, f: impl FnOnce(M) -> N) -> Tenanted<N> {
        Tenanted {
            model: f(self.model),
            binding: self.binding,
        }
    }

    /// Fallible [`Tenanted::map`].
    pub fn try_map<N, E>(self, f: impl FnOnce(M) -> Result<N, E>) -> Result<Tenanted<N>, E> {
        Ok(Tenanted {
            model: f(self.model)?,
            binding: self.binding,
        })
    }
}

impl<M> TenantAware for Tenanted<M> {
    fn connection_binding(&self) -> &ConnectionBinding {
        &self.binding
    }

    fn set_connection_binding(&mut self, binding: ConnectionBinding) {
        self.binding = binding;
    }
}

impl<M> Deref for Tenanted<M> {
    type Target = M;

    fn deref(&self) -> &Self::Target {
        &self.model
    }
}

impl<M> DerefMut for Tenanted<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.model
    }
}

impl<M> AsRef<M> for Tenanted<M> {
    fn as_ref(&self) -> &M {
        &self.model
    }
}
