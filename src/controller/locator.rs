//! Exact-name resolution of remote objects

use crate::client::ControlPlaneApi;
use crate::identity::{Identity, ResourceKind, Service};
use crate::Result;

/// Resolve `name` to the identity of the object with exactly that name
///
/// Fails with [`crate::Error::NotFound`] when nothing matches; every other
/// failure propagates as returned by the client.
pub async fn locate(
    api: &dyn ControlPlaneApi,
    service: Service,
    kind: ResourceKind,
    name: &str,
) -> Result<Identity> {
    api.query_by_name(service, kind, name).await
}

/// Like [`locate`], but a missing object resolves to `None`
pub async fn locate_optional(
    api: &dyn ControlPlaneApi,
    service: Service,
    kind: ResourceKind,
    name: &str,
) -> Result<Option<Identity>> {
    match locate(api, service, kind, name).await {
        Ok(id) => Ok(Some(id)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
