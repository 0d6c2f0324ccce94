//! Resource controllers for managed clusters and cluster types
//!
//! Each controller implements the four lifecycle operations of
//! [`ResourceController`] against the remote control plane. The host
//! supplies the desired spec and the locally recorded [`ResourceState`]; the
//! controllers mutate that state in place so an identity recorded early
//! survives a later failure.

mod cluster;
mod cluster_type;
mod locator;
mod watcher;

pub use cluster::ClusterController;
pub use cluster_type::AksClusterTypeController;
pub use locator::{locate, locate_optional};
pub use watcher::{wait_for_terminal_state, WatchOutcome};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::client::{ControlPlaneApi, DeleteParams};
use crate::config::ReconcileConfig;
use crate::events::{EventSink, NoopEventSink, ReconcileEvent, TracingEventSink};
use crate::identity::{Identity, ResourceKind, Service};
use crate::model::{AksClusterTypeSpec, ClusterSpec};
use crate::Result;

/// A desired-state spec the host can key and validate
pub trait DesiredSpec {
    /// Durable external key of the resource
    fn name(&self) -> &str;

    /// Check the desired state before any remote call is made
    fn validate(&self) -> Result<()>;
}

impl DesiredSpec for ClusterSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<()> {
        ClusterSpec::validate(self)
    }
}

impl DesiredSpec for AksClusterTypeSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<()> {
        AksClusterTypeSpec::validate(self)
    }
}

/// Locally recorded state of one resource
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ResourceState<S> {
    /// Identity of the remote object, absent until created
    pub id: Option<Identity>,
    /// Last known view of the resource
    pub recorded: Option<S>,
}

impl<S> Default for ResourceState<S> {
    fn default() -> Self {
        Self {
            id: None,
            recorded: None,
        }
    }
}

impl<S> ResourceState<S> {
    /// Forget the remote object entirely
    pub fn clear(&mut self) {
        self.id = None;
        self.recorded = None;
    }

    /// Returns true once an identity has been recorded
    pub fn exists(&self) -> bool {
        self.id.is_some()
    }
}

/// Lifecycle operations of one resource kind
///
/// Each operation is invoked at most once concurrently per resource; the
/// controllers hold no locks of their own.
#[async_trait]
pub trait ResourceController: Send + Sync {
    /// Desired-state spec handled by this controller
    type Spec: DesiredSpec + Clone + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Kind of the object located by name
    fn kind(&self) -> ResourceKind;

    /// Create the remote object, waiting at most `timeout` where it applies
    async fn create(
        &self,
        desired: &Self::Spec,
        state: &mut ResourceState<Self::Spec>,
        timeout: Duration,
    ) -> Result<()>;

    /// Refresh the recorded view from the remote object
    async fn read(&self, desired: &Self::Spec, state: &mut ResourceState<Self::Spec>)
        -> Result<()>;

    /// Converge the remote object towards `desired`
    async fn update(
        &self,
        desired: &Self::Spec,
        state: &mut ResourceState<Self::Spec>,
    ) -> Result<()>;

    /// Delete the remote object
    async fn delete(
        &self,
        desired: &Self::Spec,
        state: &mut ResourceState<Self::Spec>,
    ) -> Result<()>;
}

/// Controller context shared by every reconciliation
///
/// Use [`ContextBuilder`] to construct instances:
///
/// ```ignore
/// let ctx = Context::builder(Arc::new(HttpControlPlane::new(&config)?))
///     .reconcile_config(reconcile)
///     .build();
/// ```
pub struct Context {
    /// Control-plane client (trait object for testability)
    pub api: Arc<dyn ControlPlaneApi>,
    /// Destination of reconciliation events
    pub events: Arc<dyn EventSink>,
    /// Timing of the provisioning wait
    pub reconcile: ReconcileConfig,
}

impl Context {
    /// Create a builder for constructing a Context
    pub fn builder(api: Arc<dyn ControlPlaneApi>) -> ContextBuilder {
        ContextBuilder::new(api)
    }

    /// Create a context with tracing events and default timing
    pub fn new(api: Arc<dyn ControlPlaneApi>) -> Self {
        Self::builder(api).build()
    }

    /// Publish an event to the configured sink
    pub async fn emit(&self, event: ReconcileEvent) {
        self.events.publish(&event).await;
    }

    /// Create a context for testing with custom mock clients
    #[cfg(test)]
    pub fn for_testing(api: Arc<dyn ControlPlaneApi>, events: Arc<dyn EventSink>) -> Self {
        Self {
            api,
            events,
            reconcile: ReconcileConfig::default(),
        }
    }
}

/// Builder for constructing [`Context`] instances
pub struct ContextBuilder {
    api: Arc<dyn ControlPlaneApi>,
    events: Option<Arc<dyn EventSink>>,
    reconcile: ReconcileConfig,
}

impl ContextBuilder {
    fn new(api: Arc<dyn ControlPlaneApi>) -> Self {
        Self {
            api,
            events: None,
            reconcile: ReconcileConfig::default(),
        }
    }

    /// Override the event sink
    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Discard all events
    pub fn silent(self) -> Self {
        self.event_sink(Arc::new(NoopEventSink))
    }

    /// Set the provisioning wait timing
    pub fn reconcile_config(mut self, reconcile: ReconcileConfig) -> Self {
        self.reconcile = reconcile;
        self
    }

    /// Set only the poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.reconcile.poll_interval = interval;
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        Context {
            api: self.api,
            events: self.events.unwrap_or_else(|| Arc::new(TracingEventSink)),
            reconcile: self.reconcile,
        }
    }
}

/// Locate `name`, clearing `state` when the object no longer exists
///
/// Returns `None` after clearing; any lookup error other than NotFound
/// propagates with `state` untouched.
pub(crate) async fn locate_or_clear<S>(
    ctx: &Context,
    kind: ResourceKind,
    name: &str,
    state: &mut ResourceState<S>,
) -> Result<Option<Identity>> {
    let id = locate_optional(ctx.api.as_ref(), Service::Clusters, kind, name).await?;
    if id.is_none() {
        state.clear();
        ctx.emit(ReconcileEvent::ResourceGone {
            kind,
            name: name.to_string(),
        })
        .await;
    }
    Ok(id)
}

/// Delete `name`, treating a missing object as already deleted
///
/// NotFound is absorbed both from the lookup and from the delete call, which
/// covers the object vanishing between the two.
pub(crate) async fn delete_by_name<S>(
    ctx: &Context,
    kind: ResourceKind,
    name: &str,
    state: &mut ResourceState<S>,
) -> Result<()> {
    let event = match locate_optional(ctx.api.as_ref(), Service::Clusters, kind, name).await? {
        None => ReconcileEvent::AlreadyDeleted {
            kind,
            name: name.to_string(),
        },
        Some(id) => match ctx.api.delete(&id, &DeleteParams::delete()).await {
            Ok(()) => ReconcileEvent::Deleted {
                kind,
                name: name.to_string(),
            },
            Err(e) if e.is_not_found() => ReconcileEvent::AlreadyDeleted {
                kind,
                name: name.to_string(),
            },
            Err(e) => return Err(e),
        },
    };

    state.clear();
    ctx.emit(event).await;
    Ok(())
}
