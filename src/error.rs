//! Error types for cluster reconciliation
//!
//! Errors are structured with fields so the host can tell the absorbable
//! outcome (`NotFound`) apart from failures that must surface to the caller.

use thiserror::Error;

/// Main error type for reconciliation operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Exact-name lookup or addressed call found nothing on the remote side
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Resource kind that was looked up (e.g. "KubernetesCluster")
        kind: String,
        /// Name or token that did not resolve
        name: String,
    },

    /// Desired spec rejected before any remote call was made
    #[error("validation error for {field}: {message}")]
    Validation {
        /// Field that failed validation (e.g. "node_count")
        field: String,
        /// Description of what's invalid
        message: String,
    },

    /// Control plane answered with a non-success status
    #[error("control plane returned HTTP {status}: {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Response body or summary
        message: String,
    },

    /// Transport failure talking to the control plane
    #[error("http error: {source}")]
    Http {
        /// The underlying reqwest error
        #[from]
        source: reqwest::Error,
    },

    /// Cluster reached the terminal Failed state
    #[error("cluster {cluster} creation failed: {detail}")]
    ProvisioningFailed {
        /// Name of the cluster that failed
        cluster: String,
        /// Status detail reported by the control plane
        detail: String,
    },

    /// Remote document violates an invariant guaranteed by creation
    #[error("data integrity error: {message}")]
    DataIntegrity {
        /// Description of the violated invariant
        message: String,
    },

    /// Document could not be encoded or decoded
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Invalid client or reconcile configuration
    #[error("configuration error: {message}")]
    Config {
        /// Description of what's misconfigured
        message: String,
    },

    /// A reconcile task ended without reporting back
    #[error("reconcile task for {resource} aborted: {message}")]
    TaskAborted {
        /// Key of the resource the task was reconciling
        resource: String,
        /// Why the task ended
        message: String,
    },

    /// Local state file I/O failure
    #[error("io error: {source}")]
    Io {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a not-found error for the given kind and name
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a validation error for the given field
    pub fn validation(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a remote error from an HTTP status and message
    pub fn remote(status: u16, msg: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: msg.into(),
        }
    }

    /// Create a provisioning failure carrying the remote status detail
    pub fn provisioning_failed(cluster: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ProvisioningFailed {
            cluster: cluster.into(),
            detail: detail.into(),
        }
    }

    /// Create a data integrity error with the given message
    pub fn data_integrity(msg: impl Into<String>) -> Self {
        Self::DataIntegrity {
            message: msg.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an aborted-task error for the given resource key
    pub fn task_aborted(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::TaskAborted {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Returns true if this is the distinct "does not exist" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Self::serialization(e.to_string())
    }
}
