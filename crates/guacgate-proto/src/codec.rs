//! Encrypted token codec
//!
//! Wire format shared with the tunnel:
//!
//! ```text
//! token     = base64( {"iv": base64(iv), "value": base64(ciphertext)} )
//! plaintext = {"connection": {"type": ..., "settings": {...}}}
//! cipher    = AES-256-CBC, PKCS#7 padding, fresh 16 byte IV per token
//! ```

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::trace;

use crate::descriptor::ConnectionDescriptor;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Cipher key length in bytes
pub const KEY_LEN: usize = 32;

/// IV length in bytes (one AES block)
pub const IV_LEN: usize = 16;

/// Token codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Cipher key must be exactly 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Failed to encode token: {0}")]
    Encoding(String),

    #[error("Failed to decode token: {0}")]
    Decoding(String),
}

/// 256-bit key shared with the tunnel
#[derive(Clone)]
pub struct CipherKey([u8; KEY_LEN]);

impl CipherKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let key: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CodecError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CipherKey(<redacted>)")
    }
}

/// Outer JSON layer, field order matters to the tunnel
#[derive(Serialize, Deserialize)]
struct TokenEnvelope {
    iv: String,
    value: String,
}

#[derive(Serialize)]
struct TokenPayloadRef<'a> {
    connection: &'a ConnectionDescriptor,
}

#[derive(Deserialize)]
struct TokenPayload {
    connection: ConnectionDescriptor,
}

/// An encrypted descriptor before its transport encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedToken {
    pub iv: [u8; IV_LEN],
    pub ciphertext: Vec<u8>,
}

impl EncryptedToken {
    /// Encode into the string handed to callers
    pub fn encode(&self) -> Result<String, CodecError> {
        let envelope = TokenEnvelope {
            iv: BASE64.encode(self.iv),
            value: BASE64.encode(&self.ciphertext),
        };
        let json = serde_json::to_vec(&envelope)
            .map_err(|e| CodecError::Encoding(format!("envelope serialization: {}", e)))?;
        Ok(BASE64.encode(json))
    }

    /// Parse a token string, accepting the percent-encoded form clients put in URLs
    pub fn parse(token: &str) -> Result<Self, CodecError> {
        let token = urlencoding::decode(token.trim())
            .map_err(|e| CodecError::Decoding(format!("percent-encoding: {}", e)))?;

        let outer = BASE64
            .decode(token.as_bytes())
            .map_err(|e| CodecError::Decoding(format!("outer base64: {}", e)))?;
        let envelope: TokenEnvelope = serde_json::from_slice(&outer)
            .map_err(|e| CodecError::Decoding(format!("envelope JSON: {}", e)))?;

        let iv = BASE64
            .decode(envelope.iv.as_bytes())
            .map_err(|e| CodecError::Decoding(format!("iv base64: {}", e)))?;
        let iv: [u8; IV_LEN] = iv
            .as_slice()
            .try_into()
            .map_err(|_| CodecError::Decoding(format!("iv must be {} bytes", IV_LEN)))?;

        let ciphertext = BASE64
            .decode(envelope.value.as_bytes())
            .map_err(|e| CodecError::Decoding(format!("value base64: {}", e)))?;

        Ok(Self { iv, ciphertext })
    }
}

/// Encrypts descriptors into tokens the tunnel can open
#[derive(Debug, Clone)]
pub struct TokenCodec {
    key: CipherKey,
}

impl TokenCodec {
    pub fn new(key: CipherKey) -> Self {
        Self { key }
    }

    /// Encrypt a descriptor under a fresh random IV
    pub fn encrypt(&self, descriptor: &ConnectionDescriptor) -> Result<EncryptedToken, CodecError> {
        let mut iv = [0u8; IV_LEN];
        OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|e| CodecError::Encoding(format!("iv generation: {}", e)))?;
        self.encrypt_with_iv(descriptor, iv)
    }

    fn encrypt_with_iv(
        &self,
        descriptor: &ConnectionDescriptor,
        iv: [u8; IV_LEN],
    ) -> Result<EncryptedToken, CodecError> {
        let plaintext = serde_json::to_vec(&TokenPayloadRef {
            connection: descriptor,
        })
        .map_err(|e| CodecError::Encoding(format!("descriptor serialization: {}", e)))?;

        let ciphertext = self.seal(&iv, &plaintext)?;
        trace!(
            "Encrypted {} byte descriptor into {} bytes",
            plaintext.len(),
            ciphertext.len()
        );

        Ok(EncryptedToken { iv, ciphertext })
    }

    /// Encrypt and encode in one step
    pub fn issue(&self, descriptor: &ConnectionDescriptor) -> Result<String, CodecError> {
        self.encrypt(descriptor)?.encode()
    }

    pub fn decrypt(&self, token: &EncryptedToken) -> Result<ConnectionDescriptor, CodecError> {
        let mut plaintext = self.unseal(&token.iv, &token.ciphertext)?;

        // Some encoders zero-pad before PKCS#7
        while plaintext.last() == Some(&0) {
            plaintext.pop();
        }

        let payload: TokenPayload = serde_json::from_slice(&plaintext)
            .map_err(|e| CodecError::Decoding(format!("descriptor JSON: {}", e)))?;
        Ok(payload.connection)
    }

    /// Parse and decrypt a token string
    pub fn open(&self, token: &str) -> Result<ConnectionDescriptor, CodecError> {
        self.decrypt(&EncryptedToken::parse(token)?)
    }

    fn seal(&self, iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        let encryptor = Aes256CbcEnc::new_from_slices(self.key.as_bytes(), iv)
            .map_err(|e| CodecError::Encoding(format!("cipher init: {}", e)))?;
        Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn unseal(&self, iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, CodecError> {
        let decryptor = Aes256CbcDec::new_from_slices(self.key.as_bytes(), iv)
            .map_err(|e| CodecError::Decoding(format!("cipher init: {}", e)))?;
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CodecError::Decoding("decryption or padding check failed".to_string()))
    }
}
