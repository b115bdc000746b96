//! Configuration records loaded once at startup
//!
//! Field names follow the JSON files shipped next to the gateway
//! (`<protocol>_credentials` and `guacd_<protocol>.json`).

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::codec::{CipherKey, CodecError};
use crate::CIPHER_NAME;

/// Default guacd port when the connection file does not name one
pub const DEFAULT_GUACD_PORT: u16 = 4822;

/// Default log level handed to the tunnel
pub const DEFAULT_TUNNEL_LOG_LEVEL: &str = "ERRORS";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unsupported cipher '{0}' (only AES-256-CBC is supported)")]
    UnsupportedCipher(String),

    #[error("Invalid cipher key: {0}")]
    InvalidKey(#[from] CodecError),
}

#[derive(Deserialize)]
struct RawCredentials {
    authtoken: String,
    guac_key: String,
    #[serde(default)]
    cypher: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Per-protocol credentials
///
/// `Debug` output never contains the secret, the key or the password.
#[derive(Clone)]
pub struct Credentials {
    /// Shared secret callers present to obtain a token
    pub secret: String,
    /// Key shared with the tunnel
    pub cipher_key: CipherKey,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Parse a credentials file
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawCredentials = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawCredentials) -> Result<Self, ConfigError> {
        if let Some(cipher) = raw.cypher {
            if !cipher.eq_ignore_ascii_case(CIPHER_NAME) {
                return Err(ConfigError::UnsupportedCipher(cipher));
            }
        }

        Ok(Self {
            secret: raw.authtoken,
            cipher_key: CipherKey::from_bytes(raw.guac_key.as_bytes())?,
            username: raw.username,
            password: raw.password,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("secret", &"<redacted>")
            .field("cipher_key", &self.cipher_key)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// guacd connection target used by the tunnel
#[derive(Debug, Clone, Deserialize)]
pub struct GuacdConfig {
    #[serde(default = "default_guacd_port")]
    pub port: u16,
}

impl Default for GuacdConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_GUACD_PORT,
        }
    }
}

fn default_guacd_port() -> u16 {
    DEFAULT_GUACD_PORT
}

fn default_log_level() -> String {
    DEFAULT_TUNNEL_LOG_LEVEL.to_string()
}

/// Per-protocol connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    /// Remote desktop protocol (rdp, vnc, ssh, ...)
    #[serde(rename = "type")]
    pub protocol_type: String,
    #[serde(default)]
    pub default_width: Option<u32>,
    #[serde(default)]
    pub default_height: Option<u32>,
    /// Embed username/password from the credentials file in each descriptor
    #[serde(default)]
    pub use_credentials: bool,
    /// Passed through to the descriptor unchanged
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(default)]
    pub guacd: GuacdConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ConnectionConfig {
    /// Parse a connection file
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Immutable configuration shared by every request handler
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub credentials: Credentials,
    pub connection: ConnectionConfig,
}

impl GatewayConfig {
    pub fn new(credentials: Credentials, connection: ConnectionConfig) -> Self {
        Self {
            credentials,
            connection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "MySuperSecretKeyForParamsToken12";

    #[test]
    fn test_parse_credentials() {
        let json = format!(
            r#"{{"authtoken":"s3cret","guac_key":"{KEY}","username":"alice","password":"pw"}}"#
        );
        let creds = Credentials::from_json(&json).unwrap();

        assert_eq!(creds.secret, "s3cret");
        assert_eq!(creds.cipher_key.as_bytes(), KEY.as_bytes());
        assert_eq!(creds.username.as_deref(), Some("alice"));
        assert_eq!(creds.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_credentials_reject_short_key() {
        let json = r#"{"authtoken":"s3cret","guac_key":"too-short"}"#;
        let err = Credentials::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidKey(CodecError::InvalidKeyLength(9))
        ));
    }

    #[test]
    fn test_credentials_reject_long_key() {
        let json = format!(r#"{{"authtoken":"s3cret","guac_key":"{KEY}X"}}"#);
        assert!(matches!(
            Credentials::from_json(&json),
            Err(ConfigError::InvalidKey(CodecError::InvalidKeyLength(33)))
        ));
    }

    #[test]
    fn test_credentials_cipher_name() {
        let ok = format!(r#"{{"authtoken":"a","guac_key":"{KEY}","cypher":"aes-256-cbc"}}"#);
        assert!(Credentials::from_json(&ok).is_ok());

        let bad = format!(r#"{{"authtoken":"a","guac_key":"{KEY}","cypher":"AES-128-CBC"}}"#);
        assert!(matches!(
            Credentials::from_json(&bad),
            Err(ConfigError::UnsupportedCipher(c)) if c == "AES-128-CBC"
        ));
    }

    #[test]
    fn test_credentials_missing_secret() {
        let json = format!(r#"{{"guac_key":"{KEY}"}}"#);
        assert!(matches!(
            Credentials::from_json(&json),
            Err(ConfigError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let json = format!(r#"{{"authtoken":"s3cret","guac_key":"{KEY}","password":"pw"}}"#);
        let creds = Credentials::from_json(&json).unwrap();
        let debug = format!("{:?}", creds);

        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains(KEY));
        assert!(!debug.contains("\"pw\""));
    }

    #[test]
    fn test_parse_connection_config() {
        let json = r#"{
            "type": "rdp",
            "defaultWidth": 1024,
            "useCredentials": true,
            "settings": {"hostname": "10.0.0.5", "security": "any"},
            "guacd": {"port": 4823},
            "logLevel": "DEBUG"
        }"#;
        let config = ConnectionConfig::from_json(json).unwrap();

        assert_eq!(config.protocol_type, "rdp");
        assert_eq!(config.default_width, Some(1024));
        assert_eq!(config.default_height, None);
        assert!(config.use_credentials);
        assert_eq!(config.settings["hostname"], "10.0.0.5");
        assert_eq!(config.guacd.port, 4823);
        assert_eq!(config.log_level, "DEBUG");
    }

    #[test]
    fn test_connection_config_defaults() {
        let config = ConnectionConfig::from_json(r#"{"type":"vnc"}"#).unwrap();

        assert!(!config.use_credentials);
        assert!(config.settings.is_empty());
        assert_eq!(config.guacd.port, DEFAULT_GUACD_PORT);
        assert_eq!(config.log_level, DEFAULT_TUNNEL_LOG_LEVEL);
    }

    #[test]
    fn test_connection_config_requires_type() {
        assert!(ConnectionConfig::from_json(r#"{"settings":{}}"#).is_err());
        assert!(ConnectionConfig::from_json("not json").is_err());
    }
}
