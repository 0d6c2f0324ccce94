//! In-memory control plane
//!
//! Stores just enough of each object to answer the calls the controllers
//! make, and records every mutating call so stories can assert on what was
//! (or was not) sent.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use nirmata_reconciler::client::{
    ControlPlaneApi, DeleteParams, CLUSTER_SPECS_RELATION, CLUSTER_STATUS_RELATION,
};
use nirmata_reconciler::controller::Context;
use nirmata_reconciler::events::{EventSink, ReconcileEvent};
use nirmata_reconciler::identity::{Identity, ResourceKind, Service};
use nirmata_reconciler::{Error, Result};

/// How a newly created cluster provisions
#[derive(Clone, Debug)]
pub enum Provisioning {
    /// Reports Running on the given poll (1-based)
    RunningAfter(usize),
    /// Reports Failed on the given poll with a status message
    FailedAfter(usize, String),
    /// Never leaves Pending
    Stuck,
}

#[derive(Clone, Debug)]
struct FakeCluster {
    uuid: String,
    name: String,
    polls: usize,
    provisioning: Provisioning,
    node_pools: Vec<(String, u32)>,
}

impl FakeCluster {
    fn state(&self) -> &'static str {
        match &self.provisioning {
            Provisioning::RunningAfter(n) if self.polls >= *n => "running",
            Provisioning::FailedAfter(n, _) if self.polls >= *n => "failed",
            _ => "creating",
        }
    }

    fn document(&self) -> Value {
        let pools: Vec<Value> = self
            .node_pools
            .iter()
            .map(|(id, count)| json!({"id": id, "nodeCount": count}))
            .collect();
        json!({
            "id": self.uuid,
            "name": self.name,
            "state": self.state(),
            "nodePools": pools,
        })
    }
}

#[derive(Clone, Debug)]
struct FakeClusterType {
    uuid: String,
    version: String,
    cloud: String,
}

#[derive(Default)]
struct Store {
    next_id: usize,
    credentials: BTreeMap<String, String>,
    cluster_types: BTreeMap<String, FakeClusterType>,
    clusters: BTreeMap<String, FakeCluster>,
    transactions: Vec<Value>,
    calls: Vec<String>,
    provisioning: Option<Provisioning>,
    crash_on: Vec<String>,
}

impl Store {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn cluster_by_uuid(&mut self, uuid: &str) -> Option<&mut FakeCluster> {
        self.clusters.values_mut().find(|c| c.uuid == uuid)
    }
}

/// Control plane keeping every object in memory
#[derive(Default)]
pub struct FakeControlPlane {
    store: Mutex<Store>,
}

impl FakeControlPlane {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register cloud credentials under `name`
    pub fn add_credentials(&self, name: &str) {
        let mut store = self.store.lock().unwrap();
        let uuid = store.fresh_id("cred");
        store.credentials.insert(name.to_string(), uuid);
    }

    /// Register an existing cluster type
    pub fn add_cluster_type(&self, name: &str, version: &str, cloud: &str) {
        let mut store = self.store.lock().unwrap();
        let uuid = store.fresh_id("ct");
        store.cluster_types.insert(
            name.to_string(),
            FakeClusterType {
                uuid,
                version: version.to_string(),
                cloud: cloud.to_string(),
            },
        );
    }

    /// Script how clusters created from now on provision
    pub fn provision_as(&self, provisioning: Provisioning) {
        self.store.lock().unwrap().provisioning = Some(provisioning);
    }

    /// Make every lookup of `name` panic inside the calling task
    pub fn crash_on_lookup(&self, name: &str) {
        self.store.lock().unwrap().crash_on.push(name.to_string());
    }

    /// Create a running cluster behind the reconciler's back
    pub fn add_cluster(&self, name: &str, node_count: u32) {
        let mut store = self.store.lock().unwrap();
        let uuid = store.fresh_id("c");
        let pool = store.fresh_id("np");
        store.clusters.insert(
            name.to_string(),
            FakeCluster {
                uuid,
                name: name.to_string(),
                polls: 0,
                provisioning: Provisioning::RunningAfter(0),
                node_pools: vec![(pool, node_count)],
            },
        );
    }

    /// Add a node pool to an existing cluster behind the reconciler's back
    pub fn add_node_pool(&self, cluster: &str, node_count: u32) {
        let mut store = self.store.lock().unwrap();
        let id = store.fresh_id("np");
        if let Some(c) = store.clusters.get_mut(cluster) {
            c.node_pools.push((id, node_count));
        }
    }

    /// Delete a cluster behind the reconciler's back
    pub fn remove_cluster(&self, cluster: &str) {
        self.store.lock().unwrap().clusters.remove(cluster);
    }

    /// Node counts of a cluster's pools, in order
    pub fn node_counts(&self, cluster: &str) -> Vec<u32> {
        self.store
            .lock()
            .unwrap()
            .clusters
            .get(cluster)
            .map(|c| c.node_pools.iter().map(|(_, n)| *n).collect())
            .unwrap_or_default()
    }

    pub fn has_cluster(&self, cluster: &str) -> bool {
        self.store.lock().unwrap().clusters.contains_key(cluster)
    }

    pub fn has_cluster_type(&self, name: &str) -> bool {
        self.store.lock().unwrap().cluster_types.contains_key(name)
    }

    /// Every committed transaction document
    pub fn transactions(&self) -> Vec<Value> {
        self.store.lock().unwrap().transactions.clone()
    }

    /// Mutating calls, as "METHOD Kind"
    pub fn calls(&self) -> Vec<String> {
        self.store.lock().unwrap().calls.clone()
    }

    /// Number of mutating calls made with `method`
    pub fn count_calls(&self, method: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(method))
            .count()
    }
}

#[async_trait]
impl ControlPlaneApi for FakeControlPlane {
    async fn query_by_name(
        &self,
        service: Service,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Identity> {
        let crash = self.store.lock().unwrap().crash_on.iter().any(|n| n == name);
        if crash {
            panic!("lookup of {name} crashed");
        }
        let store = self.store.lock().unwrap();
        let uuid = match kind {
            ResourceKind::KubernetesCluster => store.clusters.get(name).map(|c| c.uuid.clone()),
            ResourceKind::ClusterType => store.cluster_types.get(name).map(|t| t.uuid.clone()),
            ResourceKind::CloudCredentials => store.credentials.get(name).cloned(),
            _ => None,
        };
        uuid.map(|uuid| Identity::new(service, kind, uuid))
            .ok_or_else(|| Error::not_found(kind.as_str(), name))
    }

    async fn get(&self, id: &Identity) -> Result<Value> {
        let mut store = self.store.lock().unwrap();
        match id.kind {
            ResourceKind::KubernetesCluster => {
                let cluster = store
                    .cluster_by_uuid(&id.uuid)
                    .ok_or_else(|| Error::not_found(id.kind.as_str(), &id.uuid))?;
                cluster.polls += 1;
                Ok(cluster.document())
            }
            _ => Err(Error::not_found(id.kind.as_str(), &id.uuid)),
        }
    }

    async fn get_relation(&self, id: &Identity, relation: &str) -> Result<Value> {
        let mut store = self.store.lock().unwrap();
        match (id.kind, relation) {
            (ResourceKind::ClusterType, CLUSTER_SPECS_RELATION) => store
                .cluster_types
                .values()
                .find(|t| t.uuid == id.uuid)
                .map(|t| json!([{"version": t.version, "cloud": t.cloud}]))
                .ok_or_else(|| Error::not_found(relation, &id.uuid)),
            (ResourceKind::KubernetesCluster, CLUSTER_STATUS_RELATION) => {
                let cluster = store
                    .cluster_by_uuid(&id.uuid)
                    .ok_or_else(|| Error::not_found(relation, &id.uuid))?;
                let message = match &cluster.provisioning {
                    Provisioning::FailedAfter(_, message) => message.clone(),
                    _ => String::new(),
                };
                Ok(json!({"message": message}))
            }
            _ => Err(Error::not_found(relation, &id.uuid)),
        }
    }

    async fn post(&self, _service: Service, kind: ResourceKind, document: &Value) -> Result<Value> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(format!("POST {kind}"));
        match kind {
            ResourceKind::KubernetesCluster => {
                let name = document["name"].as_str().unwrap_or_default().to_string();
                let node_count = document["config"]["nodeCount"].as_u64().unwrap_or(0) as u32;
                let uuid = store.fresh_id("c");
                let pool = store.fresh_id("np");
                let provisioning = store
                    .provisioning
                    .clone()
                    .unwrap_or(Provisioning::RunningAfter(1));
                store.clusters.insert(
                    name.clone(),
                    FakeCluster {
                        uuid: uuid.clone(),
                        name,
                        polls: 0,
                        provisioning,
                        node_pools: vec![(pool, node_count)],
                    },
                );
                Ok(json!({"id": uuid}))
            }
            ResourceKind::Txn => {
                let cluster_type = &document["create"][0];
                let name = cluster_type["name"].as_str().unwrap_or_default().to_string();
                let uuid = store.fresh_id("ct");
                store.cluster_types.insert(
                    name,
                    FakeClusterType {
                        uuid,
                        version: cluster_type["spec"]["version"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                        cloud: cluster_type["spec"]["cloud"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                    },
                );
                store.transactions.push(document.clone());
                let change_id = store.fresh_id("chg");
                Ok(json!({"changeId": change_id}))
            }
            other => Err(Error::remote(400, format!("cannot create {other}"))),
        }
    }

    async fn put(&self, target: &Identity, patch: &Value) -> Result<Value> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(format!("PUT {}", target.kind));
        let count = patch["nodeCount"]
            .as_u64()
            .ok_or_else(|| Error::remote(400, "patch carries no nodeCount"))? as u32;

        for cluster in store.clusters.values_mut() {
            if let Some(pool) = cluster.node_pools.iter_mut().find(|(id, _)| *id == target.uuid) {
                pool.1 = count;
                return Ok(json!({"id": target.uuid, "nodeCount": count}));
            }
        }
        Err(Error::not_found(target.kind.as_str(), &target.uuid))
    }

    async fn delete(&self, id: &Identity, params: &DeleteParams) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        store
            .calls
            .push(format!("DELETE {} action={}", id.kind, params.action.as_str()));
        let removed = match id.kind {
            ResourceKind::KubernetesCluster => {
                let name = store
                    .clusters
                    .iter()
                    .find(|(_, c)| c.uuid == id.uuid)
                    .map(|(n, _)| n.clone());
                name.and_then(|n| store.clusters.remove(&n)).is_some()
            }
            ResourceKind::ClusterType => {
                let name = store
                    .cluster_types
                    .iter()
                    .find(|(_, t)| t.uuid == id.uuid)
                    .map(|(n, _)| n.clone());
                name.and_then(|n| store.cluster_types.remove(&n)).is_some()
            }
            _ => false,
        };
        if removed {
            Ok(())
        } else {
            Err(Error::not_found(id.kind.as_str(), &id.uuid))
        }
    }
}

/// Sink recording every event
#[derive(Default)]
pub struct EventCapture {
    events: Mutex<Vec<ReconcileEvent>>,
}

impl EventCapture {
    pub fn reasons(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(ReconcileEvent::reason)
            .collect()
    }
}

#[async_trait]
impl EventSink for EventCapture {
    async fn publish(&self, event: &ReconcileEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Context over `api` with a 10 s poll interval and captured events
pub fn context(api: &Arc<FakeControlPlane>) -> (Arc<Context>, Arc<EventCapture>) {
    let events = Arc::new(EventCapture::default());
    let ctx = Context::builder(api.clone())
        .event_sink(events.clone())
        .poll_interval(Duration::from_secs(10))
        .build();
    (Arc::new(ctx), events)
}
