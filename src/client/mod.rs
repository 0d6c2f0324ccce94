//! Control-plane API abstraction
//!
//! The reconcilers talk to the remote control plane only through
//! [`ControlPlaneApi`]. [`HttpControlPlane`] is the production binding; tests
//! substitute a mock or an in-memory fake.

mod http;

pub use http::HttpControlPlane;

use async_trait::async_trait;
use serde_json::Value;

#[cfg(test)]
use mockall::automock;

use crate::identity::{Identity, ResourceKind, Service};
use crate::Result;

/// Relation on a ClusterType holding its nested ClusterSpec
pub const CLUSTER_SPECS_RELATION: &str = "clusterSpecs";

/// Relation on a KubernetesCluster holding its status detail
pub const CLUSTER_STATUS_RELATION: &str = "clusterStatus";

/// Action discriminator sent with delete calls
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeleteAction {
    /// Remove the object and the infrastructure behind it
    #[default]
    Delete,
}

impl DeleteAction {
    /// Wire value of the discriminator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
        }
    }
}

/// Parameters for [`ControlPlaneApi::delete`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteParams {
    /// What the control plane should do with the object
    pub action: DeleteAction,
}

impl DeleteParams {
    /// Parameters for a full delete
    pub fn delete() -> Self {
        Self {
            action: DeleteAction::Delete,
        }
    }
}

/// Trait abstracting the remote control-plane API
///
/// Every method surfaces [`crate::Error::NotFound`] when the addressed object
/// does not exist; all other failures are returned as-is and never retried.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ControlPlaneApi: Send + Sync {
    /// Resolve an exact name to an identity within a service and kind
    async fn query_by_name(
        &self,
        service: Service,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Identity>;

    /// Fetch the full current document of an object
    async fn get(&self, id: &Identity) -> Result<Value>;

    /// Fetch a named related sub-object
    async fn get_relation(&self, id: &Identity, relation: &str) -> Result<Value>;

    /// Create an object from a document
    ///
    /// With `kind = Txn` the document is a multi-object batch and the
    /// response carries a `changeId` instead of an `id`.
    async fn post(&self, service: Service, kind: ResourceKind, document: &Value)
        -> Result<Value>;

    /// Apply a partial document to the addressed object
    async fn put(&self, target: &Identity, patch: &Value) -> Result<Value>;

    /// Delete the addressed object
    async fn delete(&self, id: &Identity, params: &DeleteParams) -> Result<()>;
}
