//! Connection descriptor composed for each token request

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{ConnectionConfig, Credentials};

/// Width used when neither the request nor the config supplies one
pub const DEFAULT_WIDTH: u32 = 1920;

/// Height used when neither the request nor the config supplies one
pub const DEFAULT_HEIGHT: u32 = 1080;

/// Plaintext description of one remote desktop session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    #[serde(rename = "type")]
    pub protocol_type: String,
    pub settings: Map<String, Value>,
}

impl ConnectionDescriptor {
    pub fn width(&self) -> Option<u64> {
        self.settings.get("width").and_then(Value::as_u64)
    }

    pub fn height(&self) -> Option<u64> {
        self.settings.get("height").and_then(Value::as_u64)
    }

    pub fn username(&self) -> Option<&str> {
        self.settings.get("username").and_then(Value::as_str)
    }

    pub fn password(&self) -> Option<&str> {
        self.settings.get("password").and_then(Value::as_str)
    }
}

/// Builds descriptors from the loaded configuration
pub struct DescriptorBuilder<'a> {
    connection: &'a ConnectionConfig,
    credentials: &'a Credentials,
}

impl<'a> DescriptorBuilder<'a> {
    pub fn new(connection: &'a ConnectionConfig, credentials: &'a Credentials) -> Self {
        Self {
            connection,
            credentials,
        }
    }

    /// Compose a descriptor for the requested display size
    ///
    /// Each dimension resolves as request value, then configured default,
    /// then 1920x1080. A zero counts as not supplied.
    ///
    /// Configured settings are copied first, so the resolved geometry and
    /// the credential fields always replace keys of the same name.
    pub fn build(&self, width: Option<u32>, height: Option<u32>) -> ConnectionDescriptor {
        let width = resolve_dimension(width, self.connection.default_width, DEFAULT_WIDTH);
        let height = resolve_dimension(height, self.connection.default_height, DEFAULT_HEIGHT);

        let mut settings = self.connection.settings.clone();
        settings.insert("width".to_string(), Value::from(width));
        settings.insert("height".to_string(), Value::from(height));

        // Absent and blank credentials mean different things to guacd
        settings.remove("username");
        settings.remove("password");
        if self.connection.use_credentials {
            if let Some(username) = &self.credentials.username {
                settings.insert("username".to_string(), Value::from(username.as_str()));
            }
            if let Some(password) = &self.credentials.password {
                settings.insert("password".to_string(), Value::from(password.as_str()));
            }
        }

        ConnectionDescriptor {
            protocol_type: self.connection.protocol_type.clone(),
            settings,
        }
    }
}

fn resolve_dimension(requested: Option<u32>, configured: Option<u32>, fallback: u32) -> u32 {
    requested
        .filter(|v| *v > 0)
        .or(configured.filter(|v| *v > 0))
        .unwrap_or(fallback)
}
