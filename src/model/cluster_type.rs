//! Cluster type (template) documents
//!
//! A cluster type is created as two linked objects, the `ClusterType` and its
//! default `NodePoolType`, submitted together in one transaction. The two are
//! bound by locally generated ids: the cloud config spec names the node pool
//! type, and the node pool type points back at the cloud config spec.
//!
//! Cloud-specific settings are a closed set of variants serialised under
//! their own discriminator key (`aksConfig`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cluster::ClusterMode;
use super::validation::{validate_charset, validate_disk_size, validate_name, validate_required};
use crate::identity::Identity;
use crate::Result;

/// Addon installed on every cluster created from a type
const DEFAULT_ADDON: &str = "kyverno";

/// Catalog the default addon comes from
const DEFAULT_ADDON_CATALOG: &str = "default-addon-catalog";

/// Suffix of the default node pool type's name
const DEFAULT_NODE_POOL_TYPE_SUFFIX: &str = "-default-node-pool-type";

/// Desired state of an AKS cluster type
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AksClusterTypeSpec {
    /// Cluster type name
    pub name: String,
    /// Kubernetes version
    pub version: String,
    /// Name of the cloud credentials to provision with
    pub credentials: String,
    /// Azure region
    pub region: String,
    /// Azure resource group
    pub resource_group: String,
    /// Subnet the node pool joins
    pub subnet_id: String,
    /// VM size of the default node pool
    pub vm_size: String,
    /// VM set type (e.g. "VirtualMachineScaleSets")
    pub vm_set_type: String,
    /// Log Analytics workspace id
    pub workspace_id: String,
    /// Enable the HTTP application routing addon
    pub https_application_routing: bool,
    /// Enable Azure monitoring
    pub monitoring: bool,
    /// OS disk size in GiB
    pub disk_size: u32,
}

impl AksClusterTypeSpec {
    /// Validate the desired cluster type
    pub fn validate(&self) -> Result<()> {
        validate_name("name", &self.name)?;
        validate_required("version", &self.version)?;
        validate_required("credentials", &self.credentials)?;
        validate_required("region", &self.region)?;
        validate_charset("resource_group", &self.resource_group)?;
        validate_charset("vm_size", &self.vm_size)?;
        validate_charset("vm_set_type", &self.vm_set_type)?;
        validate_disk_size("disk_size", self.disk_size)?;
        Ok(())
    }

    /// Build the create transaction for this type
    ///
    /// `credentials` is the resolved identity of the referenced cloud
    /// credentials; `ids` binds the two documents together.
    pub fn build_transaction(
        &self,
        credentials: &Identity,
        ids: CorrelationIds,
    ) -> TransactionDocument {
        let cloud_config = CloudClusterConfig::Aks(AksClusterConfig::new(self));
        let cluster_type = ClusterTypeDocument {
            name: self.name.clone(),
            description: String::new(),
            model_index: "ClusterType",
            spec: ClusterSpecDocument {
                cluster_mode: ClusterMode::ProviderManaged,
                model_index: "ClusterSpec",
                version: self.version.clone(),
                cloud: cloud_config.cloud(),
                addons: AddOns::default_set(),
                cloud_config_spec: CloudConfigSpec {
                    credentials: credentials.uuid.clone(),
                    id: ids.cloud_config,
                    model_index: "CloudConfigSpec",
                    node_pool_types: ids.node_pool_type,
                    cloud: cloud_config,
                },
            },
        };

        let node_pool_type = NodePoolTypeDocument {
            id: ids.node_pool_type,
            model_index: "NodePoolType",
            name: format!("{}{}", self.name, DEFAULT_NODE_POOL_TYPE_SUFFIX),
            cloud_config_spec: ids.cloud_config,
            spec: NodePoolSpecDocument {
                model_index: "NodePoolSpec",
                cloud: CloudNodePoolConfig::Aks(AksNodePoolConfig::new(self)),
            },
        };

        TransactionDocument {
            create: vec![
                TransactionObject::ClusterType(cluster_type),
                TransactionObject::NodePoolType(node_pool_type),
            ],
        }
    }
}

/// Locally generated ids linking the objects of one transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CorrelationIds {
    /// Id of the cloud config spec inside the cluster type
    pub cloud_config: Uuid,
    /// Id of the default node pool type
    pub node_pool_type: Uuid,
}

impl CorrelationIds {
    /// Generate a fresh pair of random ids
    pub fn generate() -> Self {
        Self {
            cloud_config: Uuid::new_v4(),
            node_pool_type: Uuid::new_v4(),
        }
    }
}

/// Atomic multi-object create
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TransactionDocument {
    /// Objects created together, all or none
    pub create: Vec<TransactionObject>,
}

/// One object inside a transaction
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum TransactionObject {
    /// The cluster type itself
    ClusterType(ClusterTypeDocument),
    /// Its default node pool type
    NodePoolType(NodePoolTypeDocument),
}

/// `ClusterType` document
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterTypeDocument {
    /// Type name
    pub name: String,
    /// Free-form description
    pub description: String,
    model_index: &'static str,
    /// Nested cluster spec
    pub spec: ClusterSpecDocument,
}

/// `ClusterSpec` sub-document of a cluster type
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpecDocument {
    /// Management mode of clusters of this type
    pub cluster_mode: ClusterMode,
    model_index: &'static str,
    /// Kubernetes version
    pub version: String,
    /// Cloud provider, derived from the cloud config variant
    pub cloud: &'static str,
    /// Addons installed on clusters of this type
    pub addons: AddOns,
    /// Cloud configuration
    pub cloud_config_spec: CloudConfigSpec,
}

/// `AddOns` sub-document
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddOns {
    /// Install the DNS addon
    pub dns: bool,
    model_index: &'static str,
    /// Catalog addons
    pub other: Vec<AddOnSpec>,
}

impl AddOns {
    /// DNS off plus the default policy addon
    pub fn default_set() -> Self {
        Self {
            dns: false,
            model_index: "AddOns",
            other: vec![AddOnSpec::from_catalog(DEFAULT_ADDON, DEFAULT_ADDON_CATALOG)],
        }
    }
}

/// `AddOnSpec` sub-document
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddOnSpec {
    model_index: &'static str,
    /// Addon name
    pub name: String,
    /// Catalog application selector
    pub add_on_selector: String,
    /// Catalog name
    pub catalog: String,
}

impl AddOnSpec {
    /// Addon installed from a catalog under its own name
    pub fn from_catalog(name: &str, catalog: &str) -> Self {
        Self {
            model_index: "AddOnSpec",
            name: name.to_string(),
            add_on_selector: name.to_string(),
            catalog: catalog.to_string(),
        }
    }
}

/// `CloudConfigSpec` sub-document
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudConfigSpec {
    /// Uuid of the cloud credentials
    pub credentials: String,
    /// Correlation id referenced by the node pool type
    pub id: Uuid,
    model_index: &'static str,
    /// Id of the default node pool type
    pub node_pool_types: Uuid,
    /// Cloud-specific settings under their discriminator key
    #[serde(flatten)]
    pub cloud: CloudClusterConfig,
}

/// Cloud-specific cluster settings
#[derive(Clone, Debug, Serialize, PartialEq)]
#[non_exhaustive]
pub enum CloudClusterConfig {
    /// Azure Kubernetes Service
    #[serde(rename = "aksConfig")]
    Aks(AksClusterConfig),
}

impl CloudClusterConfig {
    /// Cloud provider name the variant belongs to
    pub fn cloud(&self) -> &'static str {
        match self {
            Self::Aks(_) => "azure",
        }
    }
}

/// `AksClusterConfig` sub-document
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AksClusterConfig {
    /// Azure region
    pub region: String,
    /// Azure resource group
    pub resource_group: String,
    /// HTTP application routing addon
    pub https_application_routing: bool,
    /// Azure monitoring
    pub monitoring: bool,
    /// Log Analytics workspace id
    pub workspace_id: String,
    model_index: &'static str,
    /// Network profile
    pub network_profile: String,
    /// Kubernetes service CIDR
    pub service_cidr: String,
    /// Cluster DNS service IP
    pub dns_service_ip: String,
    /// Docker bridge CIDR
    pub docker_bridge_cidr: String,
    /// Network policy engine, empty for none
    pub network_policy: String,
    /// Network plugin
    pub network_plugin: String,
    /// Pod CIDR
    pub pod_cidr: String,
}

impl AksClusterConfig {
    /// AKS settings from the desired type with basic kubenet networking defaults
    pub fn new(spec: &AksClusterTypeSpec) -> Self {
        Self {
            region: spec.region.clone(),
            resource_group: spec.resource_group.clone(),
            https_application_routing: spec.https_application_routing,
            monitoring: spec.monitoring,
            workspace_id: spec.workspace_id.clone(),
            model_index: "AksClusterConfig",
            network_profile: "basic".to_string(),
            service_cidr: "10.0.0.0/16".to_string(),
            dns_service_ip: "10.0.0.10".to_string(),
            docker_bridge_cidr: "172.17.0.1/16".to_string(),
            network_policy: String::new(),
            network_plugin: "kubenet".to_string(),
            pod_cidr: "10.244.0.0/16".to_string(),
        }
    }
}

/// `NodePoolType` document
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolTypeDocument {
    /// Correlation id referenced by the cloud config spec
    pub id: Uuid,
    model_index: &'static str,
    /// Node pool type name
    pub name: String,
    /// Id of the owning cloud config spec
    pub cloud_config_spec: Uuid,
    /// Nested node pool spec
    pub spec: NodePoolSpecDocument,
}

/// `NodePoolSpec` sub-document
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolSpecDocument {
    model_index: &'static str,
    /// Cloud-specific settings under their discriminator key
    #[serde(flatten)]
    pub cloud: CloudNodePoolConfig,
}

/// Cloud-specific node pool settings
#[derive(Clone, Debug, Serialize, PartialEq)]
#[non_exhaustive]
pub enum CloudNodePoolConfig {
    /// Azure Kubernetes Service
    #[serde(rename = "aksConfig")]
    Aks(AksNodePoolConfig),
}

/// `AksNodePoolConfig` sub-document
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AksNodePoolConfig {
    /// Subnet the nodes join
    pub subnet_id: String,
    /// VM size
    pub vm_size: String,
    /// VM set type
    pub vm_set_type: String,
    /// OS disk size in GiB
    pub disk_size: u32,
    /// Node OS
    pub os_type: String,
    model_index: &'static str,
}

impl AksNodePoolConfig {
    /// Linux node pool settings from the desired type
    pub fn new(spec: &AksClusterTypeSpec) -> Self {
        Self {
            subnet_id: spec.subnet_id.clone(),
            vm_size: spec.vm_size.clone(),
            vm_set_type: spec.vm_set_type.clone(),
            disk_size: spec.disk_size,
            os_type: "Linux".to_string(),
            model_index: "AksNodePoolConfig",
        }
    }
}
