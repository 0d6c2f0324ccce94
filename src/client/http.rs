//! HTTP binding of the control-plane API

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::{ControlPlaneApi, DeleteParams};
use crate::config::ClientConfig;
use crate::identity::{Identity, ResourceKind, Service};
use crate::{Error, Result};

/// Control-plane client speaking the REST API over `reqwest`
pub struct HttpControlPlane {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpControlPlane {
    /// Create a client from validated connection settings
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.endpoint.trim().trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn api_url(&self, service: Service, path: &str) -> String {
        format!("{}/{}/api/{}", self.base_url, service.path_segment(), path)
    }

    fn object_url(&self, id: &Identity) -> String {
        self.api_url(id.service, &format!("{}/{}", id.kind.as_str(), id.uuid))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!(%method, url, "control plane request");
        self.http
            .request(method, url)
            .header(AUTHORIZATION, format!("NIRMATA-API {}", self.token))
            .header(ACCEPT, "application/json")
    }
}

#[async_trait]
impl ControlPlaneApi for HttpControlPlane {
    async fn query_by_name(
        &self,
        service: Service,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Identity> {
        let url = self.api_url(service, kind.as_str());
        let query = serde_json::json!({ "name": name }).to_string();

        let resp = self
            .request(Method::GET, &url)
            .query(&[("fields", "id,name"), ("query", query.as_str())])
            .send()
            .await?;
        let body = handle_response(resp, kind.as_str(), name).await?;

        let matches = body.as_array().ok_or_else(|| {
            Error::serialization(format!("expected an array querying {kind} '{name}'"))
        })?;

        matches
            .iter()
            .filter(|item| item.get("name").and_then(Value::as_str) == Some(name))
            .find_map(|item| item.get("id").and_then(Value::as_str))
            .map(|uuid| Identity::new(service, kind, uuid))
            .ok_or_else(|| Error::not_found(kind.as_str(), name))
    }

    async fn get(&self, id: &Identity) -> Result<Value> {
        let resp = self.request(Method::GET, &self.object_url(id)).send().await?;
        handle_response(resp, id.kind.as_str(), &id.uuid).await
    }

    async fn get_relation(&self, id: &Identity, relation: &str) -> Result<Value> {
        let url = format!("{}/{}", self.object_url(id), relation);
        let resp = self.request(Method::GET, &url).send().await?;
        handle_response(resp, relation, &id.uuid).await
    }

    async fn post(
        &self,
        service: Service,
        kind: ResourceKind,
        document: &Value,
    ) -> Result<Value> {
        let url = self.api_url(service, kind.as_str());
        let resp = self
            .request(Method::POST, &url)
            .header(CONTENT_TYPE, "application/json")
            .json(document)
            .send()
            .await?;
        handle_response(resp, kind.as_str(), "").await
    }

    async fn put(&self, target: &Identity, patch: &Value) -> Result<Value> {
        let resp = self
            .request(Method::PUT, &self.object_url(target))
            .header(CONTENT_TYPE, "application/json")
            .json(patch)
            .send()
            .await?;
        handle_response(resp, target.kind.as_str(), &target.uuid).await
    }

    async fn delete(&self, id: &Identity, params: &DeleteParams) -> Result<()> {
        let resp = self
            .request(Method::DELETE, &self.object_url(id))
            .query(&[("action", params.action.as_str())])
            .send()
            .await?;
        handle_response(resp, id.kind.as_str(), &id.uuid).await?;
        Ok(())
    }
}

/// Map a response to a document, turning 404 into [`Error::NotFound`]
async fn handle_response(resp: Response, kind: &str, name: &str) -> Result<Value> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(Error::not_found(kind, name));
    }
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(Error::remote(status.as_u16(), remote_message(&body)));
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_str(&body)?)
}

/// Prefer the control plane's own error message over the raw body
fn remote_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
