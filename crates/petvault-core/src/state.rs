use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Upper bound on a single message body, counted in chars.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Numeric attributes of the pet. Ranges are enforced by the simulation layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameParameters {
    pub level: f64,
    pub xp: f64,
    pub intelligence: f64,
    pub memory: f64,
    pub friendliness: f64,
    pub energy: f64,
    pub mood: f64,
}

impl Default for GameParameters {
    fn default() -> Self {
        Self {
            level: 1.0,
            xp: 0.0,
            intelligence: 5.0,
            memory: 5.0,
            friendliness: 5.0,
            energy: 80.0,
            mood: 50.0,
        }
    }
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Pet,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Pet => "pet",
        }
    }
}

/// One entry in the conversation log. Insertion order is authoritative;
/// `timestamp` is informational.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("message text is empty")]
    Empty,
    #[error("message text is {len} chars, limit is {MAX_MESSAGE_CHARS}")]
    TooLong { len: usize },
}

impl Message {
    /// Build a message with a fresh identifier.
    pub fn new(
        speaker: Speaker,
        text: impl Into<String>,
        timestamp: i64,
    ) -> Result<Self, MessageError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(MessageError::Empty);
        }
        let len = text.chars().count();
        if len > MAX_MESSAGE_CHARS {
            return Err(MessageError::TooLong { len });
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            speaker,
            text,
            timestamp,
        })
    }
}

/// Whole session state of the pet. Invariant: `created_at <= last_action_time`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub parameters: GameParameters,
    pub messages: Vec<Message>,
    pub created_at: i64,
    pub last_action_time: i64,
}

impl GameState {
    /// Default pet born at `now` (milliseconds since the epoch).
    pub fn fresh(now: i64) -> Self {
        Self {
            parameters: GameParameters::default(),
            messages: Vec::new(),
            created_at: now,
            last_action_time: now,
        }
    }

    /// Append a message and advance the action clock. The clock never moves
    /// backwards, so the creation invariant holds even with skewed timestamps.
    pub fn record_message(&mut self, message: Message) {
        self.touch(message.timestamp);
        self.messages.push(message);
    }

    /// Advance `last_action_time` to `at` if it is later.
    pub fn touch(&mut self, at: i64) {
        self.last_action_time = self.last_action_time.max(at).max(self.created_at);
    }
}

/// Shared handle to the live state. The simulation layer mutates it, the
/// persistence layer snapshots it when a save fires.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<RwLock<GameState>>,
}

impl SharedState {
    pub fn new(state: GameState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Clone of the current value.
    pub fn snapshot(&self) -> GameState {
        self.inner.read().clone()
    }

    pub fn replace(&self, state: GameState) {
        *self.inner.write() = state;
    }

    /// Mutate in place and return whatever the closure returns.
    pub fn update<R>(&self, f: impl FnOnce(&mut GameState) -> R) -> R {
        let mut guard = self.inner.write();
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_uses_default_pet() {
        let state = GameState::fresh(1_000);
        assert_eq!(state.parameters.level, 1.0);
        assert_eq!(state.parameters.energy, 80.0);
        assert_eq!(state.parameters.mood, 50.0);
        assert!(state.messages.is_empty());
        assert_eq!(state.created_at, 1_000);
        assert_eq!(state.last_action_time, 1_000);
    }

    #[test]
    fn record_message_keeps_clock_monotonic() {
        let mut state = GameState::fresh(1_000);
        state.record_message(Message::new(Speaker::User, "hi", 2_000).expect("message"));
        state.record_message(Message::new(Speaker::Pet, "hello!", 1_500).expect("message"));

        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].speaker, Speaker::Pet);
        assert_eq!(state.last_action_time, 2_000);
        assert!(state.created_at <= state.last_action_time);
    }

    #[test]
    fn message_rejects_empty_and_oversized_text() {
        assert_eq!(
            Message::new(Speaker::User, "   ", 0).expect_err("empty"),
            MessageError::Empty
        );
        let long = "x".repeat(MAX_MESSAGE_CHARS + 1);
        assert_eq!(
            Message::new(Speaker::User, long, 0).expect_err("too long"),
            MessageError::TooLong {
                len: MAX_MESSAGE_CHARS + 1
            }
        );
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let state = GameState::fresh(7);
        let value = serde_json::to_value(&state).expect("to_value");
        assert_eq!(value["createdAt"], 7);
        assert_eq!(value["lastActionTime"], 7);
        assert_eq!(value["parameters"]["friendliness"], 5.0);
    }

    #[test]
    fn shared_state_update_is_visible_to_snapshots() {
        let shared = SharedState::new(GameState::fresh(0));
        let other = shared.clone();
        shared.update(|s| s.parameters.mood = 99.0);
        assert_eq!(other.snapshot().parameters.mood, 99.0);
    }
}
