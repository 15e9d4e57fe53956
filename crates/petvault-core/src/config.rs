use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// PBKDF2 rounds used when nothing else is configured.
pub const DEFAULT_KDF_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Process-wide encryption settings. Built once at startup and handed to the
/// persistence layer by value; never mutated afterwards.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CryptoConfig {
    /// When false, saves are written as plain JSON.
    pub enabled: bool,
    /// PBKDF2-HMAC-SHA256 iteration count.
    pub key_derivation_iterations: NonZeroU32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_derivation_iterations: DEFAULT_KDF_ITERATIONS,
        }
    }
}

impl CryptoConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_iterations(iterations: NonZeroU32) -> Self {
        Self {
            enabled: true,
            key_derivation_iterations: iterations,
        }
    }
}
