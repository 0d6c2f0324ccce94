//! Stable identities of remote resources
//!
//! An [`Identity`] is the (service, kind, uuid) triple the control plane
//! assigns to an object. It is built from its parts and never parsed back
//! out of a formatted string.

use serde::{Deserialize, Serialize};

/// Control-plane service that owns a resource
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum Service {
    /// Cluster management service
    #[default]
    Clusters,
}

impl Service {
    /// URL path segment for this service
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Clusters => "cluster",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Resource kinds addressed by the reconcilers
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ResourceKind {
    /// A managed Kubernetes cluster
    KubernetesCluster,
    /// A cluster type template
    ClusterType,
    /// Stored cloud credentials referenced by cluster types
    CloudCredentials,
    /// Compute pool belonging to a cluster
    NodePool,
    /// Node pool template belonging to a cluster type
    NodePoolType,
    /// Multi-object atomic transaction
    Txn,
}

impl ResourceKind {
    /// Model name used in API paths and documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KubernetesCluster => "KubernetesCluster",
            Self::ClusterType => "ClusterType",
            Self::CloudCredentials => "CloudCredentials",
            Self::NodePool => "NodePool",
            Self::NodePoolType => "NodePoolType",
            Self::Txn => "txn",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque, stable identity of a remote resource
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Owning service
    pub service: Service,
    /// Resource kind
    pub kind: ResourceKind,
    /// Token assigned by the control plane
    pub uuid: String,
}

impl Identity {
    /// Create an identity from its parts
    pub fn new(service: Service, kind: ResourceKind, uuid: impl Into<String>) -> Self {
        Self {
            service,
            kind,
            uuid: uuid.into(),
        }
    }

    /// Identity of a cluster-service resource
    pub fn cluster_service(kind: ResourceKind, uuid: impl Into<String>) -> Self {
        Self::new(Service::Clusters, kind, uuid)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.service, self.kind, self.uuid)
    }
}
