//! Core types for petvault: the pet's game state, the crypto configuration,
//! the state codec and validator, and the key-value storage contract.
//! Kept free of crypto and runtime dependencies so every layer can share it.

pub mod codec;
pub mod config;
pub mod state;
pub mod storage;
pub mod validate;
