//! AKS cluster type controller
//!
//! A cluster type and its default node pool type are created together in
//! one transaction; the transaction's change id becomes the identity. Cluster
//! types are templates and cannot be changed in place.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{delete_by_name, locate, locate_or_clear, Context, ResourceController, ResourceState};
use crate::events::ReconcileEvent;
use crate::identity::{Identity, ResourceKind, Service};
use crate::model::{AksClusterTypeSpec, CorrelationIds};
use crate::{Error, Result};

/// Controller for AKS `ClusterType` objects
pub struct AksClusterTypeController {
    ctx: Arc<Context>,
}

impl AksClusterTypeController {
    /// Create a controller sharing the given context
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ResourceController for AksClusterTypeController {
    type Spec = AksClusterTypeSpec;

    fn kind(&self) -> ResourceKind {
        ResourceKind::ClusterType
    }

    /// Cluster types are ready as soon as the transaction commits, so the
    /// deadline is unused.
    async fn create(
        &self,
        desired: &AksClusterTypeSpec,
        state: &mut ResourceState<AksClusterTypeSpec>,
        _timeout: Duration,
    ) -> Result<()> {
        let api = self.ctx.api.as_ref();

        let credentials = locate(
            api,
            Service::Clusters,
            ResourceKind::CloudCredentials,
            &desired.credentials,
        )
        .await?;

        let txn = desired.build_transaction(&credentials, CorrelationIds::generate());
        let response = api
            .post(Service::Clusters, ResourceKind::Txn, &serde_json::to_value(&txn)?)
            .await?;
        let change_id = response
            .get("changeId")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::data_integrity("transaction response carries no changeId"))?;

        let id = Identity::cluster_service(ResourceKind::Txn, change_id);
        state.id = Some(id.clone());
        state.recorded = Some(desired.clone());
        self.ctx
            .emit(ReconcileEvent::Created {
                kind: ResourceKind::ClusterType,
                name: desired.name.clone(),
                id,
            })
            .await;
        Ok(())
    }

    async fn read(
        &self,
        desired: &AksClusterTypeSpec,
        state: &mut ResourceState<AksClusterTypeSpec>,
    ) -> Result<()> {
        let Some(id) =
            locate_or_clear(&self.ctx, ResourceKind::ClusterType, &desired.name, state).await?
        else {
            return Ok(());
        };

        if state.id.is_none() {
            state.id = Some(id);
        }
        if state.recorded.is_none() {
            state.recorded = Some(desired.clone());
        }
        Ok(())
    }

    async fn update(
        &self,
        desired: &AksClusterTypeSpec,
        state: &mut ResourceState<AksClusterTypeSpec>,
    ) -> Result<()> {
        if state.recorded.as_ref() != Some(desired) {
            self.ctx
                .emit(ReconcileEvent::ClusterTypeImmutable {
                    name: desired.name.clone(),
                })
                .await;
        }
        Ok(())
    }

    async fn delete(
        &self,
        desired: &AksClusterTypeSpec,
        state: &mut ResourceState<AksClusterTypeSpec>,
    ) -> Result<()> {
        delete_by_name(&self.ctx, ResourceKind::ClusterType, &desired.name, state).await
    }
}
