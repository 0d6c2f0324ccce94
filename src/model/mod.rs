//! Desired-state specs and the documents exchanged with the control plane

mod cluster;
mod cluster_type;
pub mod validation;

pub use cluster::{
    describe_status, ClusterConfig, ClusterDocument, ClusterMode, ClusterRequest, ClusterSpec,
    ClusterTypeDescriptor, NodePool, ProvisioningState,
};
pub use cluster_type::{
    AddOnSpec, AddOns, AksClusterConfig, AksClusterTypeSpec, AksNodePoolConfig,
    CloudClusterConfig, CloudConfigSpec, CloudNodePoolConfig, ClusterSpecDocument,
    ClusterTypeDocument, CorrelationIds, NodePoolSpecDocument, NodePoolTypeDocument,
    TransactionDocument, TransactionObject,
};
