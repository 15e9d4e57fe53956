//! Canonical byte form of [`GameState`]: compact JSON with camelCase keys.

use serde_json::Value;
use thiserror::Error;

use crate::state::GameState;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to serialize game state: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("saved bytes are not valid JSON: {0}")]
    Deserialize(#[source] serde_json::Error),
}

pub fn encode(state: &GameState) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(state).map_err(CodecError::Serialize)
}

/// Same bytes as [`encode`], as a string for text-only stores.
pub fn encode_to_string(state: &GameState) -> Result<String, CodecError> {
    serde_json::to_string(state).map_err(CodecError::Serialize)
}

/// Parse bytes into an untyped value; shape checks belong to the validator.
pub fn decode(bytes: &[u8]) -> Result<Value, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Deserialize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Message, Speaker};

    #[test]
    fn encode_is_deterministic() {
        let mut state = GameState::fresh(1_000);
        state.record_message(Message::new(Speaker::User, "hello", 1_001).expect("message"));
        assert_eq!(encode(&state).expect("first"), encode(&state).expect("second"));
    }

    #[test]
    fn string_form_matches_bytes() {
        let state = GameState::fresh(42);
        let text = encode_to_string(&state).expect("string");
        assert_eq!(text.as_bytes(), encode(&state).expect("bytes").as_slice());
        assert!(text.contains("\"createdAt\":42"));
    }

    #[test]
    fn decode_rejects_non_json() {
        let err = decode(b"\x00\x01not json").expect_err("should fail");
        assert!(matches!(err, CodecError::Deserialize(_)));
    }
}
