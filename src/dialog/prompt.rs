//! Prompt primitive — inbound answer normalization, recognition, validation.
//!
//! A step asks by returning a [`PromptSpec`]; the manager sends its payload and
//! suspends the frame. On the next turn the answer is normalized to a single
//! string, recognized against the prompt kind, and optionally handed to the
//! dialog's validator. Unrecognized or rejected answers re-send the same
//! payload and leave the step index where it is.

use serde::{Deserialize, Serialize};

use crate::cards::Activity;

use super::state::{PromptKind, PromptState, StepResult};

/// What a user sent this turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnPayload {
    /// Free text.
    Text { text: String },
    /// A structured card submission.
    Value { value: serde_json::Value },
    /// Completion event from the sign-in provider.
    TokenResponse { token: String },
}

impl TurnPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn value(value: serde_json::Value) -> Self {
        Self::Value { value }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self::TokenResponse {
            token: token.into(),
        }
    }

    /// The answer as a single trimmed, non-empty string.
    ///
    /// Card values resolve to their `"value"` field, or to the only field of a
    /// one-field object. Token events never count as an answer.
    pub fn answer(&self) -> Option<String> {
        let raw = match self {
            Self::Text { text } => Some(text.clone()),
            Self::Value { value } => normalize_value(value),
            Self::TokenResponse { .. } => None,
        }?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn normalize_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(b) => Some(if *b { "yes" } else { "no" }.to_string()),
        serde_json::Value::Object(map) => {
            if let Some(v) = map.get("value").and_then(|v| v.as_str()) {
                return Some(v.to_string());
            }
            if map.len() == 1 {
                return map.values().next().and_then(|v| v.as_str()).map(String::from);
            }
            None
        }
        _ => None,
    }
}

/// A question a step wants asked.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSpec {
    pub kind: PromptKind,
    pub activities: Vec<Activity>,
    pub validate: bool,
}

impl PromptSpec {
    pub fn text(activity: Activity) -> Self {
        Self {
            kind: PromptKind::Text,
            activities: vec![activity],
            validate: false,
        }
    }

    pub fn choice(activity: Activity, choices: Vec<String>) -> Self {
        Self {
            kind: PromptKind::Choice { choices },
            activities: vec![activity],
            validate: false,
        }
    }

    pub fn confirm(activity: Activity) -> Self {
        Self {
            kind: PromptKind::Confirm,
            activities: vec![activity],
            validate: false,
        }
    }

    /// Route the recognized answer through the dialog's validator.
    pub fn validated(mut self) -> Self {
        self.validate = true;
        self
    }

    pub fn into_state(self) -> PromptState {
        PromptState {
            kind: self.kind,
            validate: self.validate,
            activities: self.activities,
        }
    }
}

/// A validator's verdict on a recognized answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// Accept, possibly replacing the value (e.g. a resolved identity).
    Accepted(StepResult),
    /// Re-prompt. Any rejection message has already been sent.
    Rejected,
    /// Give up on this frame; it ends with no result.
    Abandon,
}

/// Match a yes/no answer.
pub fn recognize_confirm(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "yes" | "y" | "ok" | "okay" | "sure" | "true" | "confirm" => Some(true),
        "no" | "n" | "cancel" | "false" | "nope" => Some(false),
        _ => None,
    }
}

/// Match an answer against a fixed set of choices, case-insensitively.
/// Returns the canonical spelling.
pub fn recognize_choice(answer: &str, choices: &[String]) -> Option<String> {
    let answer = answer.trim();
    choices
        .iter()
        .find(|c| c.eq_ignore_ascii_case(answer))
        .cloned()
}

/// Sign-in magic codes are six ASCII digits.
pub fn is_magic_code(answer: &str) -> bool {
    let answer = answer.trim();
    answer.len() == 6 && answer.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_answer_is_trimmed() {
        assert_eq!(
            TurnPayload::text("  Engineering Hub ").answer().as_deref(),
            Some("Engineering Hub")
        );
        assert_eq!(TurnPayload::text("   ").answer(), None);
    }

    #[test]
    fn card_values_normalize_to_one_string() {
        let cases = [
            (serde_json::json!({"value": "TeamSite"}), Some("TeamSite")),
            (serde_json::json!({"siteType": "Communication"}), Some("Communication")),
            (serde_json::json!("yes"), Some("yes")),
            (serde_json::json!(true), Some("yes")),
            (serde_json::json!({"a": "x", "b": "y"}), None),
            (serde_json::json!({"count": 3}), None),
            (serde_json::json!(42), None),
        ];
        for (value, expected) in cases {
            assert_eq!(
                TurnPayload::value(value.clone()).answer().as_deref(),
                expected,
                "value {value}"
            );
        }
    }

    #[test]
    fn token_event_is_not_an_answer() {
        assert_eq!(TurnPayload::token("abc").answer(), None);
    }

    #[test]
    fn confirm_recognition() {
        assert_eq!(recognize_confirm("Yes"), Some(true));
        assert_eq!(recognize_confirm(" y "), Some(true));
        assert_eq!(recognize_confirm("NO"), Some(false));
        assert_eq!(recognize_confirm("maybe"), None);
    }

    #[test]
    fn choice_recognition_returns_canonical_value() {
        let choices = vec!["TeamSite".to_string(), "Communication".to_string()];
        assert_eq!(recognize_choice("teamsite", &choices).as_deref(), Some("TeamSite"));
        assert_eq!(recognize_choice("wiki", &choices), None);
    }

    #[test]
    fn magic_codes() {
        assert!(is_magic_code("123456"));
        assert!(is_magic_code(" 654321 "));
        assert!(!is_magic_code("12345"));
        assert!(!is_magic_code("12a456"));
    }

    #[test]
    fn payload_wire_format() {
        let payload: TurnPayload =
            serde_json::from_value(serde_json::json!({"type": "text", "text": "hi"})).unwrap();
        assert_eq!(payload, TurnPayload::text("hi"));
        let payload: TurnPayload =
            serde_json::from_value(serde_json::json!({"type": "token_response", "token": "t"}))
                .unwrap();
        assert_eq!(payload, TurnPayload::token("t"));
    }
}
