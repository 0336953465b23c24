//! Moderation output interpreter
//!
//! The model is asked for `{"allowed": bool, "reason": string}` but nothing
//! guarantees it complies. Interpretation fails open: whenever the decision
//! cannot be read, the text is allowed.
//!
//! Coercion of `allowed`:
//! - JSON booleans are taken as-is
//! - strings `"true"`/`"false"` (trimmed, any case) map to their boolean
//! - numbers map to `false` only when exactly zero
//! - anything else (null, other strings, arrays, objects) is `true`

use serde_json::{Map, Value};

use crate::models::ModerationDecision;

pub const NO_REASON_GIVEN: &str = "no reason given";
pub const NON_JSON_REASON: &str = "LLM returned non-JSON; assuming allowed";

/// Turn raw model text into a decision
pub fn interpret(raw_text: &str) -> ModerationDecision {
    match serde_json::from_str::<Value>(raw_text) {
        Ok(Value::Object(fields)) => from_fields(&fields),
        _ => ModerationDecision {
            allowed: true,
            reason: NON_JSON_REASON.to_string(),
        },
    }
}

fn from_fields(fields: &Map<String, Value>) -> ModerationDecision {
    let allowed = fields.get("allowed").map(coerce_allowed).unwrap_or(true);

    let reason = match fields.get("reason") {
        None | Some(Value::Null) => NO_REASON_GIVEN.to_string(),
        Some(Value::String(reason)) => reason.clone(),
        Some(other) => other.to_string(),
    };

    ModerationDecision { allowed, reason }
}

fn coerce_allowed(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.trim().eq_ignore_ascii_case("false"),
        Value::Number(number) => number.as_f64().map_or(true, |n| n != 0.0),
        _ => true,
    }
}
