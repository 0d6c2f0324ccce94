//! Nirmata reconciler - declarative lifecycle management for Nirmata clusters
//!
//! Reconciles two kinds of resources against the Nirmata control plane:
//! managed Kubernetes clusters and the AKS cluster types they are created
//! from. Each resource goes through Create, Read, Update and Delete driven by
//! a declarative host that supplies desired state and persists identities.
//!
//! # Modules
//!
//! - [`client`] - Control-plane API trait and its HTTP binding
//! - [`controller`] - Cluster and cluster type controllers, locator, provisioning watcher
//! - [`model`] - Desired specs and the documents sent to the control plane
//! - [`events`] - Reconciliation events and sinks
//! - [`host`] - Manifest loading, state file, concurrent command runner
//! - [`config`] - Client and reconcile configuration
//! - [`identity`] - Identities of remote objects
//! - [`telemetry`] - Tracing subscriber setup
//! - [`error`] - Error types

#![deny(missing_docs)]

use std::time::Duration;

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod host;
pub mod identity;
pub mod model;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Time between provisioning status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How long Create waits for a cluster to provision
pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Per-request timeout of the HTTP client
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
