//! Reconciliation events
//!
//! Controllers never log directly. They describe what happened as a
//! [`ReconcileEvent`] and hand it to an injected [`EventSink`]; the binary
//! wires in [`TracingEventSink`], tests capture or discard events.
//!
//! Events are **fire-and-forget**: a sink never returns an error and a lost
//! event never breaks reconciliation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

#[cfg(test)]
use mockall::automock;

use crate::identity::{Identity, ResourceKind};

/// Whether an event is routine or needs operator attention
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Expected progress
    Normal,
    /// Degraded but non-fatal outcome
    Warning,
}

/// Something worth reporting that happened during reconciliation
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ReconcileEvent {
    /// Create request accepted and an identity recorded
    Created {
        /// Resource kind
        kind: ResourceKind,
        /// Resource name
        name: String,
        /// Identity assigned by the control plane
        id: Identity,
    },
    /// Cluster reached Running
    ProvisioningSucceeded {
        /// Cluster name
        cluster: String,
    },
    /// Cluster reached Failed
    ProvisioningFailed {
        /// Cluster name
        cluster: String,
        /// Status detail reported by the control plane
        detail: String,
    },
    /// Deadline elapsed while the cluster was still provisioning
    ProvisioningTimedOut {
        /// Cluster name
        cluster: String,
        /// How long the watch ran
        waited: Duration,
    },
    /// Cluster reports more than one node pool; only the first is used
    MultipleNodePools {
        /// Cluster name
        cluster: String,
        /// Number of node pools reported
        count: usize,
    },
    /// Read found nothing under the name and cleared the identity
    ResourceGone {
        /// Resource kind
        kind: ResourceKind,
        /// Resource name
        name: String,
    },
    /// Node count of the first node pool was patched
    NodeCountUpdated {
        /// Cluster name
        cluster: String,
        /// Previously recorded node count, if any
        from: Option<u32>,
        /// Requested node count
        to: u32,
    },
    /// Delete issued and the identity cleared
    Deleted {
        /// Resource kind
        kind: ResourceKind,
        /// Resource name
        name: String,
    },
    /// Delete found nothing to remove
    AlreadyDeleted {
        /// Resource kind
        kind: ResourceKind,
        /// Resource name
        name: String,
    },
    /// Update requested on a cluster type, which cannot change in place
    ClusterTypeImmutable {
        /// Cluster type name
        name: String,
    },
}

impl ReconcileEvent {
    /// Severity of the event
    pub fn severity(&self) -> Severity {
        match self {
            Self::ProvisioningFailed { .. }
            | Self::ProvisioningTimedOut { .. }
            | Self::MultipleNodePools { .. }
            | Self::ClusterTypeImmutable { .. } => Severity::Warning,
            _ => Severity::Normal,
        }
    }

    /// Machine-readable reason string
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Created { .. } => reasons::CREATED,
            Self::ProvisioningSucceeded { .. } => reasons::PROVISIONING_SUCCEEDED,
            Self::ProvisioningFailed { .. } => reasons::PROVISIONING_FAILED,
            Self::ProvisioningTimedOut { .. } => reasons::PROVISIONING_TIMED_OUT,
            Self::MultipleNodePools { .. } => reasons::MULTIPLE_NODE_POOLS,
            Self::ResourceGone { .. } => reasons::RESOURCE_GONE,
            Self::NodeCountUpdated { .. } => reasons::NODE_COUNT_UPDATED,
            Self::Deleted { .. } => reasons::DELETED,
            Self::AlreadyDeleted { .. } => reasons::ALREADY_DELETED,
            Self::ClusterTypeImmutable { .. } => reasons::CLUSTER_TYPE_IMMUTABLE,
        }
    }

    /// Human-readable description
    pub fn message(&self) -> String {
        match self {
            Self::Created { kind, name, id } => format!("{kind} '{name}' created as {id}"),
            Self::ProvisioningSucceeded { cluster } => format!("cluster {cluster} is running"),
            Self::ProvisioningFailed { cluster, detail } => {
                format!("cluster {cluster} failed to provision: {detail}")
            }
            Self::ProvisioningTimedOut { cluster, waited } => format!(
                "cluster {cluster} still provisioning after {}s, giving up the wait",
                waited.as_secs()
            ),
            Self::MultipleNodePools { cluster, count } => format!(
                "cluster {cluster} has {count} node pools, only the first is managed"
            ),
            Self::ResourceGone { kind, name } => {
                format!("{kind} '{name}' no longer exists, clearing recorded identity")
            }
            Self::NodeCountUpdated { cluster, from, to } => match from {
                Some(from) => format!("cluster {cluster} node count {from} -> {to}"),
                None => format!("cluster {cluster} node count set to {to}"),
            },
            Self::Deleted { kind, name } => format!("{kind} '{name}' deleted"),
            Self::AlreadyDeleted { kind, name } => format!("{kind} '{name}' already deleted"),
            Self::ClusterTypeImmutable { name } => format!(
                "cluster type '{name}' cannot be updated in place, delete and recreate it"
            ),
        }
    }
}

/// Destination for reconciliation events
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publish an event; never fails
    async fn publish(&self, event: &ReconcileEvent);
}

/// Production sink writing events as `tracing` records
///
/// Normal events become `info!`, warnings become `warn!`.
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: &ReconcileEvent) {
        let reason = event.reason();
        let message = event.message();
        match event.severity() {
            Severity::Normal => info!(reason, "{message}"),
            Severity::Warning => warn!(reason, "{message}"),
        }
    }
}

/// Sink that drops every event
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn publish(&self, _event: &ReconcileEvent) {}
}

/// Well-known event reason strings
pub mod reasons {
    /// Create request accepted
    pub const CREATED: &str = "Created";
    /// Cluster reached Running
    pub const PROVISIONING_SUCCEEDED: &str = "ProvisioningSucceeded";
    /// Cluster reached Failed
    pub const PROVISIONING_FAILED: &str = "ProvisioningFailed";
    /// Provisioning wait deadline elapsed
    pub const PROVISIONING_TIMED_OUT: &str = "ProvisioningTimedOut";
    /// More than one node pool reported
    pub const MULTIPLE_NODE_POOLS: &str = "MultipleNodePools";
    /// Resource vanished on the remote side
    pub const RESOURCE_GONE: &str = "ResourceGone";
    /// Node pool scaled
    pub const NODE_COUNT_UPDATED: &str = "NodeCountUpdated";
    /// Resource deleted
    pub const DELETED: &str = "Deleted";
    /// Nothing left to delete
    pub const ALREADY_DELETED: &str = "AlreadyDeleted";
    /// In-place update of an immutable template refused
    pub const CLUSTER_TYPE_IMMUTABLE: &str = "ClusterTypeImmutable";
}
