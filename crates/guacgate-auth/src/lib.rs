//! Authorization for connection token issuance
//!
//! Callers obtain a token by presenting the shared secret from the
//! credentials file. The secret travels in the request body so it never
//! lands in proxy logs or browser history.
//!
//! # Usage
//!
//! ```
//! use guacgate_auth::{AuthError, SharedSecretAuthenticator};
//!
//! let auth = SharedSecretAuthenticator::new("s3cret");
//! assert!(auth.authenticate("s3cret"));
//! assert!(matches!(auth.require(Some("guess")), Err(AuthError::InvalidSecret)));
//! assert!(matches!(auth.require(None), Err(AuthError::MissingSecret)));
//! ```

mod secret;

pub use secret::SharedSecretAuthenticator;

use thiserror::Error;

/// Authorization failures
///
/// Messages never echo the presented value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authtoken")]
    MissingSecret,

    #[error("Invalid authtoken")]
    InvalidSecret,
}
