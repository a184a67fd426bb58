//! Writes routed by an entity's sticky connection.

use crate::{ConnectionManager, DbResult};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DeleteResult, EntityTrait, IntoActiveModel,
};
use tenantry_core::{TenantAware, Tenanted};
use tenantry_log::debug;

/// Model type produced by an active model.
pub type ModelOf<A> = <<A as ActiveModelTrait>::Entity as EntityTrait>::Model;

/// Persist a [`Tenanted`] active model on the connection it was bound to at
/// construction, regardless of the tenant active now.
///
/// ```rust,ignore
/// tenancy.start("tenant_db");
/// let user = tenancy.make(user::ActiveModel {
///     name: Set("Alice".to_owned()),
///     ..Default::default()
/// });
/// tenancy.end();
///
/// // still written to tenant_db
/// user.insert(&connections).await?;
/// ```
#[async_trait]
pub trait TenantedModelExt {
    /// Wrapped active model.
    type ActiveModel: ActiveModelTrait;

    /// Insert on the bound connection.
    async fn insert(self, connections: &ConnectionManager) -> DbResult<ModelOf<Self::ActiveModel>>;

    /// Update on the bound connection.
    async fn update(self, connections: &ConnectionManager) -> DbResult<ModelOf<Self::ActiveModel>>;

    /// Delete on the bound connection.
    async fn delete(self, connections: &ConnectionManager) -> DbResult<DeleteResult>;
}

#[async_trait]
impl<A> TenantedModelExt for Tenanted<A>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
    ModelOf<A>: IntoActiveModel<A>,
{
    type ActiveModel = A;

    async fn insert(self, connections: &ConnectionManager) -> DbResult<ModelOf<A>> {
        let db = connections.for_entity(&self)?;
        debug!("Insert on {} ({})", db.name(), self.connection_binding());
        Ok(ActiveModelTrait::insert(self.into_inner(), db.connection()).await?)
    }

    async fn update(self, connections: &ConnectionManager) -> DbResult<ModelOf<A>> {
        let db = connections.for_entity(&self)?;
        debug!("Update on {} ({})", db.name(), self.connection_binding());
        Ok(ActiveModelTrait::update(self.into_inner(), db.connection()).await?)
    }

    async fn delete(self, connections: &ConnectionManager) -> DbResult<DeleteResult> {
        let db = connections.for_entity(&self)?;
        debug!("Delete on {} ({})", db.name(), self.connection_binding());
        Ok(ActiveModelTrait::delete(self.into_inner(), db.connection()).await?)
    }
}
