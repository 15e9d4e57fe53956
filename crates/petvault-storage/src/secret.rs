use std::{fmt, sync::Arc};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

const DEVICE_SECRET_LEN: usize = 32;

/// Secret bytes feeding key derivation. Never printed, wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(Vec<u8>);

impl Secret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn from_passphrase(passphrase: &str) -> Self {
        Self(passphrase.as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Secret").field(&"[REDACTED]").finish()
    }
}

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("no secret available from {origin}")]
    Missing { origin: String },
    #[error("keyring error: {0}")]
    Keyring(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Supplies the secret that save keys are derived from (a passphrase, an
/// environment variable, or a device key kept in the OS keychain).
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn secret(&self) -> Result<Secret, SecretError>;
}

#[async_trait]
impl<T: SecretProvider + ?Sized> SecretProvider for Arc<T> {
    async fn secret(&self) -> Result<Secret, SecretError> {
        (**self).secret().await
    }
}

/// Caller-supplied passphrase.
#[derive(Clone)]
pub struct StaticSecret {
    secret: Secret,
}

impl StaticSecret {
    pub fn new(passphrase: &str) -> Self {
        Self {
            secret: Secret::from_passphrase(passphrase),
        }
    }
}

#[async_trait]
impl SecretProvider for StaticSecret {
    async fn secret(&self) -> Result<Secret, SecretError> {
        if self.secret.is_empty() {
            return Err(SecretError::Missing {
                origin: "static passphrase".to_string(),
            });
        }
        Ok(self.secret.clone())
    }
}

/// Reads the secret from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvSecretProvider {
    var: String,
}

impl EnvSecretProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn secret(&self) -> Result<Secret, SecretError> {
        match std::env::var(&self.var) {
            Ok(value) if !value.is_empty() => Ok(Secret::from_passphrase(&value)),
            _ => Err(SecretError::Missing {
                origin: format!("env var {}", self.var),
            }),
        }
    }
}

/// Device-local secret kept in the OS keyring, generated on first use.
pub struct KeyringSecretProvider {
    service: String,
    account: String,
}

impl KeyringSecretProvider {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }
}

#[async_trait]
impl SecretProvider for KeyringSecretProvider {
    async fn secret(&self) -> Result<Secret, SecretError> {
        // Keyring operations are synchronous; wrap in async for trait compatibility.
        let entry = keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| SecretError::Keyring(e.to_string()))?;
        if let Ok(stored) = entry.get_password() {
            return decode_device_secret(&stored);
        }

        let secret = generate_device_secret();
        entry
            .set_password(&encode_device_secret(&secret))
            .map_err(|e| SecretError::Keyring(e.to_string()))?;
        Ok(secret)
    }
}

fn generate_device_secret() -> Secret {
    let mut bytes = vec![0u8; DEVICE_SECRET_LEN];
    OsRng.fill_bytes(&mut bytes);
    Secret(bytes)
}

fn encode_device_secret(secret: &Secret) -> String {
    general_purpose::STANDARD.encode(secret.as_bytes())
}

fn decode_device_secret(stored: &str) -> Result<Secret, SecretError> {
    let bytes = general_purpose::STANDARD
        .decode(stored)
        .map_err(|e| SecretError::Decode(e.to_string()))?;

    if bytes.len() != DEVICE_SECRET_LEN {
        return Err(SecretError::Decode(format!(
            "expected {DEVICE_SECRET_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(Secret(bytes))
}
