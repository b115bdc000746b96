//! Path-based routing for node targets
//!
//! One gateway process fronts many backend nodes. Each request names its
//! node in the path prefix `/node/<server>/<port>/`, which yields a
//! [`RouteKey`] and the base path the node's assets are served under.

pub mod node;

pub use node::NodePath;

use std::fmt;

/// Path segment that introduces a node prefix
pub const NODE_SEGMENT: &str = "node";

/// Backend node addressed by a request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub server: String,
    pub port: String,
}

impl RouteKey {
    /// Build a key, rejecting servers containing '/' and non-numeric ports
    pub fn new(server: impl Into<String>, port: impl Into<String>) -> Option<Self> {
        let server = server.into();
        let port = port.into();
        if !is_valid_server(&server) || !is_valid_port(&port) {
            return None;
        }
        Some(Self { server, port })
    }

    /// Canonical prefix `/node/<server>/<port>`
    pub fn base_path(&self) -> String {
        format!("/{}/{}/{}", NODE_SEGMENT, self.server, self.port)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.server, self.port)
    }
}

fn is_valid_server(server: &str) -> bool {
    !server.is_empty() && !server.contains('/')
}

fn is_valid_port(port: &str) -> bool {
    !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
}
