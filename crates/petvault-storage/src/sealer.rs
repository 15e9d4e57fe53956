use std::num::NonZeroU32;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::{
    cipher::{self, AuthFailure, CipherError, Nonce, SessionKeys},
    kdf::{self, Salt},
    payload::{self, EncryptedPayload, FormatError, PAYLOAD_VERSION},
    secret::Secret,
};

#[derive(Debug, Error)]
pub enum SealError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Auth(#[from] AuthFailure),
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

/// Turns plaintext into a transport record and back.
///
/// Every seal draws a fresh salt and nonce. The last derived key is memoised
/// against its salt and secret, so re-opening a record that was just written
/// or just read does not pay for PBKDF2 again.
pub struct StateSealer {
    iterations: NonZeroU32,
    cache: Mutex<Option<CachedKeys>>,
}

struct CachedKeys {
    salt: Salt,
    secret: Zeroizing<Vec<u8>>,
    keys: SessionKeys,
}

impl StateSealer {
    pub fn new(iterations: NonZeroU32) -> Self {
        Self {
            iterations,
            cache: Mutex::new(None),
        }
    }

    pub fn iterations(&self) -> NonZeroU32 {
        self.iterations
    }

    #[instrument(skip_all, fields(len = plaintext.len()))]
    pub fn seal(&self, plaintext: &[u8], secret: &Secret) -> Result<String, SealError> {
        let salt = Salt::random();
        let nonce = Nonce::random();
        let keys = self.keys_for(&salt, secret)?;
        let aad = payload::associated_data(PAYLOAD_VERSION, &salt);
        let sealed = cipher::seal(&keys, &nonce, &aad, plaintext)?;
        let record = EncryptedPayload::new(salt, nonce, sealed.ciphertext, sealed.tag);
        Ok(record.encode()?)
    }

    #[instrument(skip_all, fields(len = record.len()))]
    pub fn open(&self, record: &str, secret: &Secret) -> Result<Zeroizing<Vec<u8>>, SealError> {
        let payload = EncryptedPayload::decode(record)?;
        let keys = self.keys_for(&payload.salt, secret)?;
        let plaintext = cipher::open(
            &keys,
            &payload.nonce,
            &payload.associated_data(),
            &payload.ciphertext,
            &payload.tag,
        )?;
        Ok(plaintext)
    }

    fn keys_for(&self, salt: &Salt, secret: &Secret) -> Result<SessionKeys, CipherError> {
        if let Some(cached) = self.cache.lock().as_ref() {
            if cached.salt == *salt && cached.secret.as_slice() == secret.as_bytes() {
                return Ok(cached.keys.clone());
            }
        }

        debug!(iterations = self.iterations.get(), "deriving save key");
        let master = kdf::derive(secret.as_bytes(), salt, self.iterations);
        let keys = SessionKeys::expand(&master)?;
        *self.cache.lock() = Some(CachedKeys {
            salt: *salt,
            secret: Zeroizing::new(secret.as_bytes().to_vec()),
            keys: keys.clone(),
        });
        Ok(keys)
    }

    #[cfg(test)]
    fn cached_salt(&self) -> Option<Salt> {
        self.cache.lock().as_ref().map(|c| c.salt)
    }
}
