//! Extractors

use axum::{extract::FromRequestParts, http::request::Parts};
use guacgate_router::{NodePath, RouteKey};
use tracing::debug;

use crate::error::ApiError;

/// Node addressed by the request path
///
/// Rejects with 404 when the path has no valid `/node/<server>/<port>/`
/// prefix, e.g. a non-numeric port.
#[derive(Debug, Clone)]
pub struct NodeRoute(pub RouteKey);

impl<S> FromRequestParts<S> for NodeRoute
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match NodePath::parse(parts.uri.path()) {
            Some(node) => Ok(NodeRoute(node.key)),
            None => {
                debug!("No node route in {}", parts.uri.path());
                Err(ApiError::NotFound)
            }
        }
    }
}
