//! Declarative host driving the controllers
//!
//! The host plays the part of a declarative resource framework: it loads
//! desired state from YAML manifests, validates all of it before touching the
//! control plane, runs each resource's lifecycle operation in its own task
//! and persists the state every task hands back.
//!
//! # Manifests
//!
//! ```yaml
//! kind: AksClusterType
//! name: aks-standard
//! version: 1.29.2
//! credentials: azure-prod
//! # ...
//! ---
//! kind: Cluster
//! name: prod-east
//! nodeCount: 3
//! clusterType: aks-standard
//! ```
//!
//! # State file
//!
//! A JSON object mapping `"<Kind>/<name>"` to the resource's recorded state.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::controller::{
    AksClusterTypeController, ClusterController, Context, DesiredSpec, ResourceController,
    ResourceState,
};
use crate::model::{AksClusterTypeSpec, ClusterSpec};
use crate::{Error, Result};

/// One desired resource read from a manifest
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind")]
pub enum Manifest {
    /// A managed cluster
    Cluster(ClusterSpec),
    /// An AKS cluster type
    AksClusterType(AksClusterTypeSpec),
}

impl Manifest {
    /// Manifest kind as written in YAML
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cluster(_) => "Cluster",
            Self::AksClusterType(_) => "AksClusterType",
        }
    }

    /// Resource name
    pub fn name(&self) -> &str {
        match self {
            Self::Cluster(spec) => spec.name(),
            Self::AksClusterType(spec) => spec.name(),
        }
    }

    /// State file key, `"<Kind>/<name>"`
    pub fn key(&self) -> String {
        format!("{}/{}", self.kind(), self.name())
    }

    /// Validate the desired spec
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Cluster(spec) => DesiredSpec::validate(spec),
            Self::AksClusterType(spec) => DesiredSpec::validate(spec),
        }
    }
}

/// Parse a multi-document YAML string into manifests
///
/// Empty documents are skipped.
pub fn parse_manifests(text: &str) -> Result<Vec<Manifest>> {
    let mut manifests = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        manifests.push(serde_yaml::from_value(value)?);
    }
    Ok(manifests)
}

/// Read and parse every manifest file, in order
pub async fn load_manifests(paths: &[PathBuf]) -> Result<Vec<Manifest>> {
    let mut manifests = Vec::new();
    for path in paths {
        let text = tokio::fs::read_to_string(path).await?;
        let parsed = parse_manifests(&text).map_err(|e| {
            Error::serialization(format!("{}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), count = parsed.len(), "loaded manifests");
        manifests.extend(parsed);
    }
    Ok(manifests)
}

/// JSON file holding the recorded state of every resource
#[derive(Debug, Default)]
pub struct StateStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Value>,
}

impl StateStore {
    /// In-memory store that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the store from `path`; a missing file starts empty
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// Recorded state of `key`, empty when nothing is recorded
    pub fn get<S: DeserializeOwned>(&self, key: &str) -> Result<ResourceState<S>> {
        match self.entries.get(key) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(ResourceState::default()),
        }
    }

    /// Record `state` under `key`, dropping the entry once the state is empty
    pub fn put<S: Serialize>(&mut self, key: &str, state: &ResourceState<S>) -> Result<()> {
        self.put_raw(key, serde_json::to_value(state)?);
        Ok(())
    }

    fn put_raw(&mut self, key: &str, state: Value) {
        let empty = state.get("id").map_or(true, Value::is_null)
            && state.get("recorded").map_or(true, Value::is_null);
        if empty {
            self.entries.remove(key);
        } else {
            self.entries.insert(key.to_string(), state);
        }
    }

    /// Keys currently recorded
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Write the store back to its file, if it has one
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(&self.entries)?;
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Lifecycle command applied to every manifest
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Create missing resources, refresh and converge existing ones
    Apply,
    /// Read only
    Refresh,
    /// Delete
    Destroy,
}

/// Result of one resource's task
#[derive(Debug)]
pub struct Outcome {
    /// State file key of the resource
    pub key: String,
    /// What the task returned
    pub result: Result<()>,
}

struct TaskReport {
    key: String,
    state: Result<Value>,
    result: Result<()>,
}

/// Runs lifecycle commands over a set of manifests
pub struct Host {
    clusters: Arc<ClusterController>,
    cluster_types: Arc<AksClusterTypeController>,
    create_timeout: Duration,
}

impl Host {
    /// Create a host whose controllers share `ctx`
    pub fn new(ctx: Arc<Context>) -> Self {
        let create_timeout = ctx.reconcile.create_timeout;
        Self {
            clusters: Arc::new(ClusterController::new(ctx.clone())),
            cluster_types: Arc::new(AksClusterTypeController::new(ctx)),
            create_timeout,
        }
    }

    /// Run `command` over every manifest, one task per resource
    ///
    /// Every manifest is validated and its recorded state decoded first; a
    /// single invalid or duplicated manifest, or an unreadable state entry,
    /// fails the whole run before any remote call. Cluster types are handled
    /// before the clusters that reference them (after them for Destroy);
    /// within each group all resources run concurrently. A failing resource
    /// does not stop the others, and every outcome is returned, sorted by
    /// key. The state returned by each task is written into `store` even when
    /// the task failed.
    pub async fn run(
        &self,
        command: Command,
        manifests: Vec<Manifest>,
        store: &mut StateStore,
    ) -> Result<Vec<Outcome>> {
        let mut keys = BTreeSet::new();
        let mut types = Vec::new();
        let mut clusters = Vec::new();
        for manifest in manifests {
            manifest.validate()?;
            let key = manifest.key();
            if !keys.insert(key.clone()) {
                return Err(Error::validation(
                    "manifest",
                    format!("{key} is declared more than once"),
                ));
            }
            let recorded = |e: Error| Error::serialization(format!("state of {key}: {e}"));
            match manifest {
                Manifest::Cluster(desired) => {
                    let state = store.get(&key).map_err(recorded)?;
                    clusters.push(Planned::Cluster(key, desired, state));
                }
                Manifest::AksClusterType(desired) => {
                    let state = store.get(&key).map_err(recorded)?;
                    types.push(Planned::AksClusterType(key, desired, state));
                }
            }
        }

        let phases = match command {
            Command::Destroy => [clusters, types],
            Command::Apply | Command::Refresh => [types, clusters],
        };

        let mut outcomes = Vec::new();
        for phase in phases {
            if !phase.is_empty() {
                outcomes.extend(self.run_phase(command, phase, store).await);
            }
        }

        outcomes.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(outcomes)
    }

    async fn run_phase(
        &self,
        command: Command,
        planned: Vec<Planned>,
        store: &mut StateStore,
    ) -> Vec<Outcome> {
        let mut owners = HashMap::new();
        let mut tasks = JoinSet::new();
        for item in planned {
            let (key, handle) = match item {
                Planned::Cluster(key, desired, state) => {
                    let handle = tasks.spawn(drive(
                        self.clusters.clone(),
                        command,
                        key.clone(),
                        desired,
                        state,
                        self.create_timeout,
                    ));
                    (key, handle)
                }
                Planned::AksClusterType(key, desired, state) => {
                    let handle = tasks.spawn(drive(
                        self.cluster_types.clone(),
                        command,
                        key.clone(),
                        desired,
                        state,
                        self.create_timeout,
                    ));
                    (key, handle)
                }
            };
            owners.insert(handle.id(), key);
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, report)) => {
                    match report.state {
                        Ok(state) => store.put_raw(&report.key, state),
                        Err(e) => warn!(resource = %report.key, error = %e, "state not recorded"),
                    }
                    outcomes.push(Outcome {
                        key: report.key,
                        result: report.result,
                    });
                }
                Err(e) => {
                    let key = owners.remove(&e.id()).unwrap_or_default();
                    warn!(resource = %key, error = %e, "reconcile task aborted");
                    outcomes.push(Outcome {
                        result: Err(Error::task_aborted(&key, e.to_string())),
                        key,
                    });
                }
            }
        }
        outcomes
    }
}

/// A validated manifest paired with its decoded recorded state
enum Planned {
    Cluster(String, ClusterSpec, ResourceState<ClusterSpec>),
    AksClusterType(String, AksClusterTypeSpec, ResourceState<AksClusterTypeSpec>),
}

async fn drive<C: ResourceController + 'static>(
    controller: Arc<C>,
    command: Command,
    key: String,
    desired: C::Spec,
    mut state: ResourceState<C::Spec>,
    create_timeout: Duration,
) -> TaskReport {
    let result = match command {
        Command::Apply => apply(controller.as_ref(), &desired, &mut state, create_timeout).await,
        Command::Refresh => controller.read(&desired, &mut state).await,
        Command::Destroy => controller.delete(&desired, &mut state).await,
    };

    match &result {
        Ok(()) => info!(resource = %key, ?command, "reconciled"),
        Err(e) => warn!(resource = %key, ?command, error = %e, "reconcile failed"),
    }

    TaskReport {
        state: serde_json::to_value(&state).map_err(Error::from),
        key,
        result,
    }
}

/// Create when nothing is recorded; otherwise refresh, then recreate or update
async fn apply<C: ResourceController>(
    controller: &C,
    desired: &C::Spec,
    state: &mut ResourceState<C::Spec>,
    create_timeout: Duration,
) -> Result<()> {
    if !state.exists() {
        return controller.create(desired, state, create_timeout).await;
    }

    controller.read(desired, state).await?;
    if state.exists() {
        controller.update(desired, state).await
    } else {
        controller.create(desired, state, create_timeout).await
    }
}
