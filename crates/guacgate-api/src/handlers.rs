use axum::{
    body::Bytes,
    extract::{Request, State},
    response::Response,
    Json,
};
use guacgate_proto::DescriptorBuilder;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::ApiError;
use crate::extract::NodeRoute;
use crate::models::{TokenRequest, TokenResponse};
use crate::AppState;

/// Issue an encrypted connection token
///
/// `POST /node/{server}/{port}/getToken` with body
/// `{"authtoken": "...", "width": 1280, "height": 720}`.
///
/// Returns 403 when the authtoken is missing or wrong; nothing else in the
/// body is looked at and nothing is built or encrypted in that case.
/// Returns 500 with a generic message when encryption fails.
pub async fn get_token(
    NodeRoute(route): NodeRoute,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<TokenResponse>, ApiError> {
    let body: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            debug!(server = %route.server, port = %route.port, "Malformed token request: {}", e);
            ApiError::BadRequest(e.to_string())
        })?
    };

    // A non-string authtoken counts as missing
    let authtoken = body.get("authtoken").and_then(Value::as_str);
    if let Err(e) = state.authenticator.require(authtoken) {
        warn!(
            server = %route.server,
            port = %route.port,
            "Unauthorized token request: {}",
            e
        );
        return Err(ApiError::Forbidden);
    }

    let request: TokenRequest = serde_json::from_value(body).map_err(|e| {
        debug!(server = %route.server, port = %route.port, "Invalid token request: {}", e);
        ApiError::BadRequest(e.to_string())
    })?;

    let config = &state.config;
    let descriptor = DescriptorBuilder::new(&config.connection, &config.credentials)
        .build(request.width, request.height);

    let token = state.codec.issue(&descriptor).map_err(|e| {
        error!(
            server = %route.server,
            port = %route.port,
            "Error generating token: {}",
            e
        );
        ApiError::TokenGeneration
    })?;

    info!(
        server = %route.server,
        port = %route.port,
        width = ?descriptor.width(),
        height = ?descriptor.height(),
        "Issued connection token"
    );

    Ok(Json(TokenResponse { token }))
}

/// Serve the client entry document for a node
pub async fn node_index(
    NodeRoute(route): NodeRoute,
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Response {
    debug!("Serving entry document for node {}", route);
    state.assets.index(request).await
}

/// Static assets under a node prefix or at the document root
pub async fn serve_asset(State(state): State<Arc<AppState>>, request: Request) -> Response {
    state.assets.serve(request).await
}
