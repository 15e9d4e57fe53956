//! Structural check applied to decoded saves before they reach the running
//! application. Only presence and primitive types are checked; value ranges
//! are the simulation layer's business.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::state::GameState;

const PARAMETER_FIELDS: [&str; 7] = [
    "level",
    "xp",
    "intelligence",
    "memory",
    "friendliness",
    "energy",
    "mood",
];

/// Why a candidate was refused. `path` points at the offending field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("rejected saved state at `{path}`: {reason}")]
pub struct ValidationRejected {
    pub path: String,
    pub reason: &'static str,
}

impl ValidationRejected {
    fn at(path: impl Into<String>, reason: &'static str) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }
}

pub fn validate(candidate: Value) -> Result<GameState, ValidationRejected> {
    let root = candidate
        .as_object()
        .ok_or_else(|| ValidationRejected::at("$", "expected an object"))?;

    require_integer(root, "createdAt", "$")?;
    require_integer(root, "lastActionTime", "$")?;

    let params = root
        .get("parameters")
        .ok_or_else(|| ValidationRejected::at("$.parameters", "missing"))?
        .as_object()
        .ok_or_else(|| ValidationRejected::at("$.parameters", "expected an object"))?;
    for field in PARAMETER_FIELDS {
        match params.get(field) {
            None => {
                return Err(ValidationRejected::at(
                    format!("$.parameters.{field}"),
                    "missing",
                ))
            }
            Some(v) if !v.is_number() => {
                return Err(ValidationRejected::at(
                    format!("$.parameters.{field}"),
                    "expected a number",
                ))
            }
            Some(_) => {}
        }
    }

    let messages = root
        .get("messages")
        .ok_or_else(|| ValidationRejected::at("$.messages", "missing"))?
        .as_array()
        .ok_or_else(|| ValidationRejected::at("$.messages", "expected a sequence"))?;
    for (idx, message) in messages.iter().enumerate() {
        check_message(message, idx)?;
    }

    serde_json::from_value(candidate)
        .map_err(|_| ValidationRejected::at("$", "does not deserialize into game state"))
}

fn check_message(message: &Value, idx: usize) -> Result<(), ValidationRejected> {
    let path = format!("$.messages[{idx}]");
    let obj = message
        .as_object()
        .ok_or_else(|| ValidationRejected::at(path.clone(), "expected an object"))?;
    require_string(obj, "id", &path)?;
    require_string(obj, "text", &path)?;
    require_integer(obj, "timestamp", &path)?;
    match obj.get("speaker").and_then(Value::as_str) {
        Some("user") | Some("pet") => Ok(()),
        Some(_) => Err(ValidationRejected::at(
            format!("{path}.speaker"),
            "expected \"user\" or \"pet\"",
        )),
        None => Err(ValidationRejected::at(
            format!("{path}.speaker"),
            "missing or not a string",
        )),
    }
}

fn require_integer(
    obj: &Map<String, Value>,
    field: &str,
    base: &str,
) -> Result<(), ValidationRejected> {
    match obj.get(field) {
        Some(v) if v.is_i64() || v.is_u64() => Ok(()),
        Some(_) => Err(ValidationRejected::at(
            format!("{base}.{field}"),
            "expected an integer timestamp",
        )),
        None => Err(ValidationRejected::at(format!("{base}.{field}"), "missing")),
    }
}

fn require_string(
    obj: &Map<String, Value>,
    field: &str,
    base: &str,
) -> Result<(), ValidationRejected> {
    match obj.get(field) {
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(ValidationRejected::at(
            format!("{base}.{field}"),
            "expected a string",
        )),
        None => Err(ValidationRejected::at(format!("{base}.{field}"), "missing")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::state::{Message, Speaker};

    fn valid() -> Value {
        json!({
            "parameters": {
                "level": 1, "xp": 0, "intelligence": 5, "memory": 5,
                "friendliness": 5, "energy": 80, "mood": 50
            },
            "messages": [
                { "id": "m1", "speaker": "user", "text": "hi", "timestamp": 1001 }
            ],
            "createdAt": 1000,
            "lastActionTime": 1001
        })
    }

    #[test]
    fn accepts_well_formed_state() {
        let state = validate(valid()).expect("valid");
        assert_eq!(state.parameters.energy, 80.0);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].speaker, Speaker::User);
    }

    #[test]
    fn accepts_what_the_codec_produces() {
        let mut state = GameState::fresh(5);
        state.record_message(Message::new(Speaker::Pet, "purr", 6).expect("message"));
        let value = serde_json::to_value(&state).expect("to_value");
        assert_eq!(validate(value).expect("valid"), state);
    }

    #[test]
    fn rejects_missing_mood() {
        let mut value = valid();
        value["parameters"]
            .as_object_mut()
            .expect("object")
            .remove("mood");
        let err = validate(value).expect_err("should reject");
        assert_eq!(err.path, "$.parameters.mood");
    }

    #[test]
    fn rejects_messages_that_are_not_a_sequence() {
        let mut value = valid();
        value["messages"] = json!({ "0": "hello" });
        let err = validate(value).expect_err("should reject");
        assert_eq!(err.path, "$.messages");
    }

    #[test]
    fn rejects_non_numeric_timestamps() {
        let mut value = valid();
        value["createdAt"] = json!("yesterday");
        assert_eq!(validate(value).expect_err("reject").path, "$.createdAt");

        let mut value = valid();
        value["lastActionTime"] = json!(10.5);
        assert_eq!(validate(value).expect_err("reject").path, "$.lastActionTime");
    }

    #[test]
    fn rejects_string_parameter() {
        let mut value = valid();
        value["parameters"]["xp"] = json!("10");
        let err = validate(value).expect_err("reject");
        assert_eq!(err.path, "$.parameters.xp");
        assert_eq!(err.reason, "expected a number");
    }

    #[test]
    fn rejects_unknown_speaker() {
        let mut value = valid();
        value["messages"][0]["speaker"] = json!("narrator");
        assert_eq!(
            validate(value).expect_err("reject").path,
            "$.messages[0].speaker"
        );
    }

    #[test]
    fn does_not_range_check_values() {
        let mut value = valid();
        value["parameters"]["mood"] = json!(-500);
        assert_eq!(validate(value).expect("valid").parameters.mood, -500.0);
    }

    #[test]
    fn rejects_non_object_root() {
        assert_eq!(validate(json!([1, 2, 3])).expect_err("reject").path, "$");
        assert_eq!(validate(Value::Null).expect_err("reject").path, "$");
    }
}
