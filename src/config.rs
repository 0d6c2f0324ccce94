//! Client and reconcile configuration
//!
//! The binary fills these from flags with environment fallbacks; library
//! callers build them directly.

use std::time::Duration;

use crate::{Error, Result, DEFAULT_CREATE_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT};

/// Connection settings for the control-plane API
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the control plane (e.g. "https://nirmata.io")
    pub endpoint: String,
    /// API token sent as `Authorization: NIRMATA-API <token>`
    pub token: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Create a config with the default request timeout
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(Error::config("control plane endpoint is required"));
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(Error::config(format!(
                "endpoint must start with http:// or https://, got {endpoint}"
            )));
        }
        if self.token.trim().is_empty() {
            return Err(Error::config("API token is required"));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::config("request timeout must be greater than zero"));
        }
        Ok(())
    }
}

// Hand-written so the token never lands in logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Timing of the provisioning wait
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Time between status polls while a cluster provisions
    pub poll_interval: Duration,
    /// Deadline handed to Create when the host supplies none
    pub create_timeout: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            create_timeout: DEFAULT_CREATE_TIMEOUT,
        }
    }
}

impl ReconcileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::config("poll interval must be greater than zero"));
        }
        if self.create_timeout.is_zero() {
            return Err(Error::config("create timeout must be greater than zero"));
        }
        Ok(())
    }
}
