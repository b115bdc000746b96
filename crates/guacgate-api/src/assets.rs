//! Static assets for the browser client
//!
//! One `ServeDir` is built at startup and shared by every request. Paths
//! under a node prefix are rewritten to the document root before lookup,
//! so `/node/a/1/js/app.js` and `/js/app.js` resolve to the same file.

use axum::{
    extract::Request,
    http::Uri,
    response::{IntoResponse, Response},
};
use guacgate_router::NodePath;
use std::path::{Path, PathBuf};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, trace};

/// Entry document served at each node's base path
pub const INDEX_DOCUMENT: &str = "index.html";

#[derive(Debug, Clone)]
pub struct StaticAssets {
    root: PathBuf,
    dir: ServeDir,
    index: ServeFile,
}

impl StaticAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        // Directory indexes only exist under a node prefix
        let dir = ServeDir::new(&root).append_index_html_on_directories(false);
        let index = ServeFile::new(root.join(INDEX_DOCUMENT));

        Self { root, dir, index }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serve the entry document
    pub async fn index(&self, request: Request) -> Response {
        match self.index.clone().oneshot(request).await {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        }
    }

    /// Serve a file, stripping the node prefix when present
    pub async fn serve(&self, mut request: Request) -> Response {
        strip_node_prefix(&mut request);

        match self.dir.clone().oneshot(request).await {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        }
    }
}

fn strip_node_prefix(request: &mut Request) {
    let path_and_query = match NodePath::parse(request.uri().path()) {
        Some(node) => {
            trace!(
                "Serving static asset {} for {}",
                node.remainder,
                node.base_path()
            );
            match request.uri().query() {
                Some(query) => format!("{}?{}", node.remainder, query),
                None => node.remainder.to_string(),
            }
        }
        None => {
            trace!("Serving static asset {}", request.uri().path());
            return;
        }
    };

    let mut parts = request.uri().clone().into_parts();
    parts.path_and_query = match path_and_query.parse() {
        Ok(pq) => Some(pq),
        Err(e) => {
            debug!("Could not rewrite asset path: {}", e);
            return;
        }
    };
    if let Ok(uri) = Uri::from_parts(parts) {
        *request.uri_mut() = uri;
    }
}
