//! Authenticated encryption for save records.
//!
//! The derived key is expanded with HKDF into two subkeys. AES-256-GCM seals
//! the plaintext (its own 16-byte tag stays appended to the ciphertext) and
//! HMAC-SHA256 over `aad || nonce || ciphertext` yields the 32-byte envelope
//! tag. [`open`] checks the envelope tag in constant time before any
//! decryption happens, and plaintext is only returned once GCM agrees too.

use std::fmt;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Key, Nonce as GcmNonce,
};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::kdf::{DerivedKey, KEY_LEN};

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 32;

const ENC_INFO: &[u8] = b"petvault/v1/aes-256-gcm";
const MAC_INFO: &[u8] = b"petvault/v1/hmac-sha256";

type HmacSha256 = Hmac<Sha256>;

/// Tag verification failed: wrong key, tampered or truncated record.
/// Carries no detail about which check failed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("authentication failed")]
pub struct AuthFailure;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("key schedule failed: {0}")]
    KeySchedule(String),
    #[error("encrypt failed: {0}")]
    Encrypt(String),
}

/// Random 96-bit nonce, drawn fresh for every seal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    pub fn random() -> Self {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        Self(nonce.into())
    }

    pub fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

/// Encryption and MAC subkeys derived from one master key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    enc_key: [u8; KEY_LEN],
    mac_key: [u8; KEY_LEN],
}

impl SessionKeys {
    pub fn expand(master: &DerivedKey) -> Result<Self, CipherError> {
        let hk = Hkdf::<Sha256>::new(None, master.as_bytes());
        let mut keys = Self {
            enc_key: [0u8; KEY_LEN],
            mac_key: [0u8; KEY_LEN],
        };
        hk.expand(ENC_INFO, &mut keys.enc_key)
            .map_err(|e| CipherError::KeySchedule(e.to_string()))?;
        hk.expand(MAC_INFO, &mut keys.mac_key)
            .map_err(|e| CipherError::KeySchedule(e.to_string()))?;
        Ok(keys)
    }

    fn aead(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.enc_key))
    }

    fn mac(&self) -> Option<HmacSha256> {
        <HmacSha256 as Mac>::new_from_slice(&self.mac_key).ok()
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("enc_key", &"[REDACTED]")
            .field("mac_key", &"[REDACTED]")
            .finish()
    }
}

/// Output of [`seal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

pub fn seal(
    keys: &SessionKeys,
    nonce: &Nonce,
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Sealed, CipherError> {
    let ciphertext = keys
        .aead()
        .encrypt(
            GcmNonce::from_slice(nonce.as_bytes()),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CipherError::Encrypt(e.to_string()))?;

    let mut mac = keys
        .mac()
        .ok_or_else(|| CipherError::KeySchedule("invalid mac key length".to_string()))?;
    feed_mac(&mut mac, aad, nonce, &ciphertext);
    let tag: [u8; TAG_LEN] = mac.finalize().into_bytes().into();

    Ok(Sealed { ciphertext, tag })
}

pub fn open(
    keys: &SessionKeys,
    nonce: &Nonce,
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
) -> Result<Zeroizing<Vec<u8>>, AuthFailure> {
    let mut mac = keys.mac().ok_or(AuthFailure)?;
    feed_mac(&mut mac, aad, nonce, ciphertext);
    // Constant-time comparison.
    mac.verify_slice(tag).map_err(|_| AuthFailure)?;

    keys.aead()
        .decrypt(
            GcmNonce::from_slice(nonce.as_bytes()),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| AuthFailure)
}

fn feed_mac(mac: &mut HmacSha256, aad: &[u8], nonce: &Nonce, ciphertext: &[u8]) {
    mac.update(aad);
    mac.update(nonce.as_bytes());
    mac.update(ciphertext);
}
