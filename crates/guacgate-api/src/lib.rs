//! HTTP surface of the connection token gateway
//!
//! Routes:
//! - `POST /node/{server}/{port}/getToken` issues an encrypted token
//! - `GET /node/{server}/{port}/` serves the client entry document
//! - anything else is a static asset, under a node prefix or the root

pub mod assets;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;

pub use assets::StaticAssets;
pub use error::ApiError;

use axum::{
    routing::{get, post},
    Router,
};
use guacgate_auth::SharedSecretAuthenticator;
use guacgate_proto::{GatewayConfig, TokenCodec};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
///
/// Built once at startup and never mutated.
#[derive(Debug)]
pub struct AppState {
    pub config: GatewayConfig,
    pub authenticator: SharedSecretAuthenticator,
    pub codec: TokenCodec,
    pub assets: StaticAssets,
}

impl AppState {
    pub fn new(config: GatewayConfig, public_dir: impl Into<PathBuf>) -> Self {
        let authenticator = SharedSecretAuthenticator::new(config.credentials.secret.clone());
        let codec = TokenCodec::new(config.credentials.cipher_key.clone());

        Self {
            config,
            authenticator,
            codec,
            assets: StaticAssets::new(public_dir),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Directory holding `index.html` and the client scripts
    pub public_dir: PathBuf,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            public_dir: PathBuf::from("public"),
        }
    }
}

/// API Server
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, gateway: GatewayConfig) -> Self {
        let state = Arc::new(AppState::new(gateway, config.public_dir));
        Self { state }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), anyhow::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();

        if let Ok(addr) = listener.local_addr() {
            info!("Gateway accepting connections on {}", addr);
        }
        info!("Serving static assets from {}", self.state.assets.root().display());

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}

/// Build the gateway router over shared state
///
/// Every route and the static file service are registered here, once.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/node/{server}/{port}/getToken",
            post(handlers::get_token),
        )
        .route("/node/{server}/{port}/", get(handlers::node_index))
        .fallback(handlers::serve_asset)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
