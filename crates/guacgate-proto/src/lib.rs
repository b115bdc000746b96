//! Connection token protocol definitions
//!
//! This crate defines the configuration records loaded at startup, the
//! connection descriptor handed to the tunnel, and the encrypted token
//! format the tunnel decodes.

pub mod codec;
pub mod config;
pub mod descriptor;

pub use codec::{CipherKey, CodecError, EncryptedToken, TokenCodec, IV_LEN, KEY_LEN};
pub use config::{ConfigError, ConnectionConfig, Credentials, GatewayConfig, GuacdConfig};
pub use descriptor::{ConnectionDescriptor, DescriptorBuilder, DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// The only cipher the tunnel and the gateway agree on
pub const CIPHER_NAME: &str = "AES-256-CBC";
