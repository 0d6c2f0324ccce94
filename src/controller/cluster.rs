//! Managed cluster controller
//!
//! Create resolves the cluster type, folds its version and cloud into the
//! request, records the new identity and then watches provisioning. Read and
//! Update always re-resolve the cluster by name and act on the first node
//! pool only.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    delete_by_name, locate, locate_or_clear, wait_for_terminal_state, Context, ResourceController,
    ResourceState,
};
use crate::client::CLUSTER_SPECS_RELATION;
use crate::events::ReconcileEvent;
use crate::identity::{Identity, ResourceKind, Service};
use crate::model::{ClusterDocument, ClusterRequest, ClusterSpec, ClusterTypeDescriptor, NodePool};
use crate::{Error, Result};

/// Controller for `KubernetesCluster` objects
pub struct ClusterController {
    ctx: Arc<Context>,
}

impl ClusterController {
    /// Create a controller sharing the given context
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Fetch the cluster document and pick its authoritative node pool
    async fn first_node_pool(&self, cluster: &str, id: &Identity) -> Result<NodePool> {
        let doc = ClusterDocument::from_value(self.ctx.api.get(id).await?)?;
        let count = doc.node_pools.len();

        let first = doc.node_pools.into_iter().next().ok_or_else(|| {
            Error::data_integrity(format!("cluster {cluster} has no node pools"))
        })?;

        if count > 1 {
            self.ctx
                .emit(ReconcileEvent::MultipleNodePools {
                    cluster: cluster.to_string(),
                    count,
                })
                .await;
        }
        Ok(first)
    }
}

/// Reject changes to fields that cannot be updated in place
fn check_immutable_fields(recorded: &ClusterSpec, desired: &ClusterSpec) -> Result<()> {
    if recorded.name != desired.name {
        return Err(Error::validation(
            "name",
            format!(
                "cannot change from '{}' to '{}' in place",
                recorded.name, desired.name
            ),
        ));
    }
    if recorded.cluster_type != desired.cluster_type {
        return Err(Error::validation(
            "cluster_type",
            format!(
                "cannot change from '{}' to '{}' in place",
                recorded.cluster_type, desired.cluster_type
            ),
        ));
    }
    Ok(())
}

#[async_trait]
impl ResourceController for ClusterController {
    type Spec = ClusterSpec;

    fn kind(&self) -> ResourceKind {
        ResourceKind::KubernetesCluster
    }

    async fn create(
        &self,
        desired: &ClusterSpec,
        state: &mut ResourceState<ClusterSpec>,
        timeout: Duration,
    ) -> Result<()> {
        let api = self.ctx.api.as_ref();

        let type_id = locate(
            api,
            Service::Clusters,
            ResourceKind::ClusterType,
            &desired.cluster_type,
        )
        .await?;
        let descriptor =
            ClusterTypeDescriptor::from_relation(api.get_relation(&type_id, CLUSTER_SPECS_RELATION).await?)?;

        let request = serde_json::to_value(ClusterRequest::new(desired, &descriptor))?;
        let response = api
            .post(Service::Clusters, ResourceKind::KubernetesCluster, &request)
            .await?;
        let uuid = response
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::data_integrity("cluster create response carries no id"))?;

        let id = Identity::cluster_service(ResourceKind::KubernetesCluster, uuid);
        state.id = Some(id.clone());
        state.recorded = Some(desired.clone());
        self.ctx
            .emit(ReconcileEvent::Created {
                kind: ResourceKind::KubernetesCluster,
                name: desired.name.clone(),
                id: id.clone(),
            })
            .await;

        wait_for_terminal_state(&self.ctx, &desired.name, &id, timeout).await?;
        Ok(())
    }

    async fn read(&self, desired: &ClusterSpec, state: &mut ResourceState<ClusterSpec>) -> Result<()> {
        let Some(id) =
            locate_or_clear(&self.ctx, ResourceKind::KubernetesCluster, &desired.name, state).await?
        else {
            return Ok(());
        };

        let pool = self.first_node_pool(&desired.name, &id).await?;

        let mut recorded = state.recorded.take().unwrap_or_else(|| desired.clone());
        recorded.node_count = pool.node_count;
        state.recorded = Some(recorded);
        state.id = Some(id);
        Ok(())
    }

    async fn update(
        &self,
        desired: &ClusterSpec,
        state: &mut ResourceState<ClusterSpec>,
    ) -> Result<()> {
        let previous = state.recorded.as_ref().map(|r| r.node_count);
        if let Some(recorded) = &state.recorded {
            check_immutable_fields(recorded, desired)?;
            if recorded.node_count == desired.node_count {
                return Ok(());
            }
        }

        let id = locate(
            self.ctx.api.as_ref(),
            Service::Clusters,
            ResourceKind::KubernetesCluster,
            &desired.name,
        )
        .await?;
        let pool = self.first_node_pool(&desired.name, &id).await?;

        let pool_id = Identity::cluster_service(ResourceKind::NodePool, pool.id);
        self.ctx
            .api
            .put(&pool_id, &json!({ "nodeCount": desired.node_count }))
            .await?;

        state.id = Some(id);
        state.recorded = Some(desired.clone());
        self.ctx
            .emit(ReconcileEvent::NodeCountUpdated {
                cluster: desired.name.clone(),
                from: previous,
                to: desired.node_count,
            })
            .await;
        Ok(())
    }

    async fn delete(
        &self,
        desired: &ClusterSpec,
        state: &mut ResourceState<ClusterSpec>,
    ) -> Result<()> {
        delete_by_name(&self.ctx, ResourceKind::KubernetesCluster, &desired.name, state).await
    }
}
