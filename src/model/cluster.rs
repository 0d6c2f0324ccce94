//! Managed cluster documents
//!
//! [`ClusterSpec`] is the caller's desired state. [`ClusterRequest`] is the
//! create document sent to the control plane and [`ClusterDocument`] the
//! subset of the remote representation the reconcilers read back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation::{validate_name, validate_node_count, validate_required};
use crate::{Error, Result};

/// Desired state of a managed cluster
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Cluster name, the durable external key
    pub name: String,

    /// Requested node count of the first node pool
    pub node_count: u32,

    /// Name of the cluster type the cluster is created from
    pub cluster_type: String,
}

impl ClusterSpec {
    /// Validate the desired cluster
    pub fn validate(&self) -> Result<()> {
        validate_name("name", &self.name)?;
        validate_node_count("node_count", self.node_count)?;
        validate_required("cluster_type", &self.cluster_type)?;
        Ok(())
    }
}

/// How the control plane manages a cluster
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ClusterMode {
    /// Lifecycle owned by the cloud provider's managed service
    #[default]
    ProviderManaged,
}

/// Nested spec of a cluster type, read when creating a cluster of that type
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ClusterTypeDescriptor {
    /// Kubernetes version pinned by the type
    pub version: String,

    /// Cloud provider the type targets (e.g. "azure")
    pub cloud: String,
}

impl ClusterTypeDescriptor {
    /// Decode the `clusterSpecs` relation
    ///
    /// The relation may come back as a single object or as a list; a list
    /// must hold at least one spec.
    pub fn from_relation(doc: Value) -> Result<Self> {
        let spec = match doc {
            Value::Array(items) => items.into_iter().next().ok_or_else(|| {
                Error::data_integrity("cluster type has no cluster spec")
            })?,
            other => other,
        };
        Ok(serde_json::from_value(spec)?)
    }
}

/// Create document for a managed cluster
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRequest {
    /// Cluster name
    pub name: String,
    /// Management mode
    pub mode: ClusterMode,
    /// Cluster type the cluster is created from
    pub type_selector: String,
    /// Cluster configuration inherited from the type
    pub config: ClusterConfig,
}

impl ClusterRequest {
    /// Build the create document, folding the type's policy into the config
    pub fn new(spec: &ClusterSpec, descriptor: &ClusterTypeDescriptor) -> Self {
        Self {
            name: spec.name.clone(),
            mode: ClusterMode::ProviderManaged,
            type_selector: spec.cluster_type.clone(),
            config: ClusterConfig {
                model_index: "ClusterConfig",
                version: descriptor.version.clone(),
                node_count: spec.node_count,
                cloud_provider: descriptor.cloud.clone(),
            },
        }
    }
}

/// `ClusterConfig` sub-document of a cluster create request
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    model_index: &'static str,
    /// Kubernetes version
    pub version: String,
    /// Requested node count
    pub node_count: u32,
    /// Cloud provider
    pub cloud_provider: String,
}

/// Provisioning state of a managed cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisioningState {
    /// Still converging
    Pending,
    /// Terminal success
    Running,
    /// Terminal failure
    Failed,
}

impl ProvisioningState {
    /// Interpret the control plane's `state` string
    pub fn from_state(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "running" | "ready" => Self::Running,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// Returns true for Running and Failed
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Running => write!(f, "Running"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Node pool entry of a cluster document
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    /// Node pool uuid
    pub id: String,
    /// Node pool name
    #[serde(default)]
    pub name: Option<String>,
    /// Current node count
    pub node_count: u32,
}

/// Remote representation of a managed cluster
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDocument {
    /// Cluster uuid
    pub id: String,
    /// Cluster name
    #[serde(default)]
    pub name: Option<String>,
    /// Raw provisioning state
    #[serde(default)]
    pub state: Option<String>,
    /// Node pools, in the order the control plane lists them
    #[serde(default)]
    pub node_pools: Vec<NodePool>,
}

impl ClusterDocument {
    /// Decode a `Get` response
    pub fn from_value(doc: Value) -> Result<Self> {
        Ok(serde_json::from_value(doc)?)
    }

    /// Current provisioning state; a missing state counts as Pending
    pub fn provisioning_state(&self) -> ProvisioningState {
        self.state
            .as_deref()
            .map(ProvisioningState::from_state)
            .unwrap_or(ProvisioningState::Pending)
    }
}

/// Render a status-detail document as a single line for error messages
///
/// Prefers an explicit `message`, then the messages of any `conditions`,
/// and falls back to the compact JSON.
pub fn describe_status(doc: &Value) -> String {
    if let Some(message) = doc.get("message").and_then(Value::as_str) {
        if !message.is_empty() {
            return message.to_string();
        }
    }

    if let Some(conditions) = doc.get("conditions").and_then(Value::as_array) {
        let messages: Vec<&str> = conditions
            .iter()
            .filter_map(|c| c.get("message").and_then(Value::as_str))
            .filter(|m| !m.is_empty())
            .collect();
        if !messages.is_empty() {
            return messages.join("; ");
        }
    }

    doc.to_string()
}
