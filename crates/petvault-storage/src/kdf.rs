use std::{fmt, num::NonZeroU32};

use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const SALT_LEN: usize = 16;
pub const KEY_LEN: usize = 32;

/// Per-save random salt. Not secret; stored next to the ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

/// 256-bit key produced by [`derive`]. Wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DerivedKey").field(&"[REDACTED]").finish()
    }
}

/// PBKDF2-HMAC-SHA256. Deterministic for identical inputs. The salt length is
/// fixed by its type, so a wrong-sized salt cannot reach this point.
pub fn derive(secret: &[u8], salt: &Salt, iterations: NonZeroU32) -> DerivedKey {
    let mut out = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(secret, salt.as_bytes(), iterations.get(), &mut out);
    let key = DerivedKey(out);
    out.zeroize();
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rounds(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).expect("non-zero")
    }

    #[test]
    fn same_inputs_give_same_key() {
        let salt = Salt::from_bytes([7u8; SALT_LEN]);
        let a = derive(b"s3cret", &salt, rounds(1_000));
        let b = derive(b"s3cret", &salt, rounds(1_000));
        assert_eq!(a, b);
    }

    #[test]
    fn salt_secret_and_rounds_all_change_the_key() {
        let salt = Salt::from_bytes([7u8; SALT_LEN]);
        let base = derive(b"s3cret", &salt, rounds(1_000));
        assert_ne!(
            base,
            derive(b"s3cret", &Salt::from_bytes([8u8; SALT_LEN]), rounds(1_000))
        );
        assert_ne!(base, derive(b"wrong", &salt, rounds(1_000)));
        assert_ne!(base, derive(b"s3cret", &salt, rounds(1_001)));
    }

    #[test]
    fn matches_rfc_7914_pbkdf2_sha256_vector() {
        // RFC 7914 section 11: P="passwd", S="salt", c=1, dkLen=64 (first 32 bytes).
        let mut out = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(b"passwd", b"salt", 1, &mut out);
        assert_eq!(
            out[..8],
            [0x55, 0xac, 0x04, 0x6e, 0x56, 0xe3, 0x08, 0x9f]
        );
    }

    #[test]
    fn random_salts_differ() {
        assert_ne!(Salt::random(), Salt::random());
    }

    #[test]
    fn debug_redacts_key_bytes() {
        let key = derive(b"s3cret", &Salt::from_bytes([0u8; SALT_LEN]), rounds(1));
        assert_eq!(format!("{key:?}"), "DerivedKey(\"[REDACTED]\")");
    }
}
