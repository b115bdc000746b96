//! Shared secret comparison

use crate::AuthError;
use std::fmt;
use subtle::ConstantTimeEq;
use tracing::debug;

/// Validates a presented secret against the configured one
///
/// Comparison time does not depend on where the two values first differ.
#[derive(Clone)]
pub struct SharedSecretAuthenticator {
    secret: Vec<u8>,
}

impl SharedSecretAuthenticator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into().into_bytes(),
        }
    }

    /// True when `presented` equals the configured secret exactly
    pub fn authenticate(&self, presented: &str) -> bool {
        // An empty configured secret would let empty requests through
        if self.secret.is_empty() {
            return false;
        }
        self.secret.as_slice().ct_eq(presented.as_bytes()).into()
    }

    /// Gate an operation on the presented secret
    pub fn require(&self, presented: Option<&str>) -> Result<(), AuthError> {
        match presented {
            None => {
                debug!("Secret auth: no authtoken presented");
                Err(AuthError::MissingSecret)
            }
            Some(value) if self.authenticate(value) => Ok(()),
            Some(_) => {
                debug!("Secret auth: authtoken mismatch");
                Err(AuthError::InvalidSecret)
            }
        }
    }
}

impl fmt::Debug for SharedSecretAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecretAuthenticator")
            .field("secret", &"<redacted>")
            .finish()
    }
}
