//! Provisioning watcher
//!
//! After a cluster create is accepted the watcher polls the cluster document
//! until it reports a terminal state or the caller's deadline elapses. The
//! three outcomes are kept apart:
//!
//! - `Running` succeeds
//! - `Failed` is a hard error carrying the control plane's status detail
//! - deadline expiry is a soft outcome, reported only as a warning event
//!
//! The poll loop runs inside `tokio::time::timeout`, so it never outlives the
//! deadline.

use std::time::Duration;

use tokio::time::{sleep, timeout};

use super::Context;
use crate::client::{ControlPlaneApi, CLUSTER_STATUS_RELATION};
use crate::events::ReconcileEvent;
use crate::identity::Identity;
use crate::model::{describe_status, ClusterDocument, ProvisioningState};
use crate::{Error, Result};

/// Non-failing end of a provisioning watch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The cluster reached Running
    Running,
    /// The deadline elapsed while the cluster was still provisioning
    TimedOut,
}

/// Wait until cluster `id` reaches a terminal state or `deadline` elapses
///
/// A fetch error while polling stops the watch and propagates.
pub async fn wait_for_terminal_state(
    ctx: &Context,
    cluster: &str,
    id: &Identity,
    deadline: Duration,
) -> Result<WatchOutcome> {
    let poll = poll_until_terminal(ctx.api.as_ref(), id, ctx.reconcile.poll_interval);

    match timeout(deadline, poll).await {
        Ok(Ok(ProvisioningState::Failed)) => {
            let detail = failure_detail(ctx.api.as_ref(), id).await;
            ctx.emit(ReconcileEvent::ProvisioningFailed {
                cluster: cluster.to_string(),
                detail: detail.clone(),
            })
            .await;
            Err(Error::provisioning_failed(cluster, detail))
        }
        Ok(Ok(_)) => {
            ctx.emit(ReconcileEvent::ProvisioningSucceeded {
                cluster: cluster.to_string(),
            })
            .await;
            Ok(WatchOutcome::Running)
        }
        Ok(Err(e)) => Err(e),
        Err(_elapsed) => {
            ctx.emit(ReconcileEvent::ProvisioningTimedOut {
                cluster: cluster.to_string(),
                waited: deadline,
            })
            .await;
            Ok(WatchOutcome::TimedOut)
        }
    }
}

async fn poll_until_terminal(
    api: &dyn ControlPlaneApi,
    id: &Identity,
    interval: Duration,
) -> Result<ProvisioningState> {
    loop {
        let doc = ClusterDocument::from_value(api.get(id).await?)?;
        let state = doc.provisioning_state();
        if state.is_terminal() {
            return Ok(state);
        }
        sleep(interval).await;
    }
}

async fn failure_detail(api: &dyn ControlPlaneApi, id: &Identity) -> String {
    match api.get_relation(id, CLUSTER_STATUS_RELATION).await {
        Ok(doc) => describe_status(&doc),
        Err(e) => format!("status detail unavailable: {e}"),
    }
}
