//! Node path matching

use crate::{RouteKey, NODE_SEGMENT};
use tracing::trace;

/// A request path split into its node prefix and the remainder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath<'a> {
    pub key: RouteKey,
    /// Everything after the base path, always starting with '/'
    pub remainder: &'a str,
}

impl<'a> NodePath<'a> {
    /// Match `/node/<server>/<port>/...`
    ///
    /// The slash after the port is required, so `/node/a/1` does not match
    /// while `/node/a/1/` does (with remainder `/`). Query strings must be
    /// stripped by the caller.
    pub fn parse(path: &'a str) -> Option<Self> {
        let rest = path.strip_prefix('/')?.strip_prefix(NODE_SEGMENT)?.strip_prefix('/')?;
        let (server, rest) = rest.split_once('/')?;
        let slash = rest.find('/')?;
        let (port, remainder) = rest.split_at(slash);

        let key = match RouteKey::new(server, port) {
            Some(key) => key,
            None => {
                trace!("Path {} has a malformed node prefix", path);
                return None;
            }
        };

        Some(Self { key, remainder })
    }

    pub fn base_path(&self) -> String {
        self.key.base_path()
    }
}
