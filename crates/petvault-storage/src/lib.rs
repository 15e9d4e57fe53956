//! Encryption at rest for saved pet state.
//! PBKDF2 turns the user secret into a key, AES-256-GCM plus an HMAC-SHA256
//! envelope tag seals the bytes, and a versioned base64 record carries the
//! result to any `KeyValueStore`.

pub mod cipher;
pub mod file_store;
pub mod kdf;
pub mod payload;
pub mod sealer;
pub mod secret;
