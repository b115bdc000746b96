//! Request and response bodies

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of `POST /node/{server}/{port}/getToken`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Shared secret from the credentials file
    #[serde(default)]
    pub authtoken: Option<String>,
    /// Display width in pixels (number or numeric string)
    #[serde(default, deserialize_with = "dimension")]
    pub width: Option<u32>,
    /// Display height in pixels (number or numeric string)
    #[serde(default, deserialize_with = "dimension")]
    pub height: Option<u32>,
}

/// Successful token issuance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

// Browsers measure the viewport as numbers but older clients sent query strings
fn dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid dimension: {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid dimension: {:?}", s))),
        Some(other) => Err(D::Error::custom(format!("invalid dimension: {}", other))),
    }
}
