//! Versioned envelope persisted under the save key.
//!
//! The transport form is a JSON object whose binary fields are standard
//! base64:
//!
//! ```json
//! {"version":1,"iv":"…","salt":"…","ciphertext":"…","hmac":"…"}
//! ```
//!
//! Decoding reads `version` first and dispatches on it; an unknown version is
//! refused before any other field is looked at.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    cipher::{Nonce, NONCE_LEN, TAG_LEN},
    kdf::{Salt, SALT_LEN},
};

pub const PAYLOAD_VERSION: u32 = 1;

/// Length of the associated data bound into every seal: version || salt.
pub const AAD_LEN: usize = 4 + SALT_LEN;

/// The record could not be decoded into well-formed fields.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("payload is not a valid record: {0}")]
    Malformed(String),
    #[error("unsupported payload version {0}")]
    UnsupportedVersion(u64),
    #[error("field `{field}` is not valid base64: {reason}")]
    Encoding { field: &'static str, reason: String },
    #[error("field `{field}` decoded to {actual} bytes, expected {expected}")]
    Length {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub version: u32,
    pub salt: Salt,
    pub nonce: Nonce,
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u64,
}

#[derive(Serialize, Deserialize)]
struct RecordV1 {
    version: u32,
    iv: String,
    salt: String,
    ciphertext: String,
    hmac: String,
}

impl EncryptedPayload {
    /// Current-version payload.
    pub fn new(salt: Salt, nonce: Nonce, ciphertext: Vec<u8>, tag: [u8; TAG_LEN]) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            salt,
            nonce,
            ciphertext,
            tag,
        }
    }

    /// Bytes authenticated alongside the ciphertext.
    pub fn associated_data(&self) -> [u8; AAD_LEN] {
        associated_data(self.version, &self.salt)
    }

    pub fn encode(&self) -> Result<String, FormatError> {
        let record = RecordV1 {
            version: self.version,
            iv: STANDARD.encode(self.nonce.as_bytes()),
            salt: STANDARD.encode(self.salt.as_bytes()),
            ciphertext: STANDARD.encode(&self.ciphertext),
            hmac: STANDARD.encode(self.tag),
        };
        serde_json::to_string(&record).map_err(|e| FormatError::Malformed(e.to_string()))
    }

    pub fn decode(transport: &str) -> Result<Self, FormatError> {
        let probe: VersionProbe =
            serde_json::from_str(transport).map_err(|e| FormatError::Malformed(e.to_string()))?;
        match probe.version {
            1 => decode_v1(transport),
            other => Err(FormatError::UnsupportedVersion(other)),
        }
    }
}

pub fn associated_data(version: u32, salt: &Salt) -> [u8; AAD_LEN] {
    let mut aad = [0u8; AAD_LEN];
    aad[..4].copy_from_slice(&version.to_be_bytes());
    aad[4..].copy_from_slice(salt.as_bytes());
    aad
}

fn decode_v1(transport: &str) -> Result<EncryptedPayload, FormatError> {
    let record: RecordV1 =
        serde_json::from_str(transport).map_err(|e| FormatError::Malformed(e.to_string()))?;

    let nonce = fixed::<NONCE_LEN>("iv", &record.iv)?;
    let salt = fixed::<SALT_LEN>("salt", &record.salt)?;
    let tag = fixed::<TAG_LEN>("hmac", &record.hmac)?;
    let ciphertext = decode_field("ciphertext", &record.ciphertext)?;

    Ok(EncryptedPayload {
        version: record.version,
        salt: Salt::from_bytes(salt),
        nonce: Nonce::from_bytes(nonce),
        ciphertext,
        tag,
    })
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, FormatError> {
    STANDARD.decode(value).map_err(|e| FormatError::Encoding {
        field,
        reason: e.to_string(),
    })
}

fn fixed<const N: usize>(field: &'static str, value: &str) -> Result<[u8; N], FormatError> {
    let bytes = decode_field(field, value)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| FormatError::Length {
        field,
        expected: N,
        actual: bytes.len(),
    })
}
