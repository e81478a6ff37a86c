//! Validation boundary between raw AI output and typed flashcards.
//!
//! Everything the AI returns is untrusted JSON. Nothing reaches the review
//! session without passing through [`validate_flashcard_response`] or
//! [`validate_single_flashcard`], which either return typed cards or a
//! [`ValidationError`] listing every violated field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::card::{CardType, ValidatedFlashcard};

/// One violated field, addressed by a dotted path such as `0.cardType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub reason: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.reason)
        } else {
            write!(f, "{}: {}", self.path, self.reason)
        }
    }
}

/// Structured contract failure carrying one issue per violated field.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} ({} issue(s))", .issues.len())]
pub struct ValidationError {
    pub message: String,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, issues: Vec<ValidationIssue>) -> Self {
        Self {
            message: message.into(),
            issues,
        }
    }

    /// Human-readable lines, one per issue.
    pub fn details(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }

    /// Whether any issue points at exactly `path`.
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|issue| issue.path == path)
    }
}

/// How `cardType` values outside the enumeration are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardTypePolicy {
    /// Reject anything that is not an exact literal.
    #[default]
    Strict,
    /// Guess the closest variant with [`normalize_card_type`].
    Lenient,
}

/// Validates an AI response that must be an array of flashcards.
///
/// An empty array is valid; deciding what "no cards" means is up to the
/// caller.
pub fn validate_flashcard_response(
    raw: &Value,
    policy: CardTypePolicy,
) -> Result<Vec<ValidatedFlashcard>, ValidationError> {
    let Some(items) = raw.as_array() else {
        return Err(ValidationError::new(
            "AI returned invalid response format",
            vec![ValidationIssue::new(
                "",
                format!(
                    "Expected an array of flashcards but received: {}",
                    json_kind(raw)
                ),
            )],
        ));
    };

    let mut cards = Vec::with_capacity(items.len());
    let mut issues = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let prefix = index.to_string();
        match item.as_object() {
            Some(object) => {
                if let Some(card) = check_card(object, Some(&prefix), policy, &mut issues) {
                    cards.push(card);
                }
            }
            None => issues.push(ValidationIssue::new(
                prefix,
                format!("Expected a flashcard object but received: {}", json_kind(item)),
            )),
        }
    }

    if issues.is_empty() {
        Ok(cards)
    } else {
        Err(ValidationError::new("AI response failed validation", issues))
    }
}

/// Validates an AI response that must be a single flashcard object.
pub fn validate_single_flashcard(
    raw: &Value,
    policy: CardTypePolicy,
) -> Result<ValidatedFlashcard, ValidationError> {
    let Some(object) = raw.as_object() else {
        return Err(ValidationError::new(
            "AI returned invalid card format",
            vec![ValidationIssue::new(
                "",
                format!(
                    "Expected a flashcard object but received: {}",
                    json_kind(raw)
                ),
            )],
        ));
    };

    let mut issues = Vec::new();
    match check_card(object, None, policy, &mut issues) {
        Some(card) if issues.is_empty() => Ok(card),
        _ => Err(ValidationError::new("AI returned invalid card data", issues)),
    }
}

/// Legacy best-effort mapping of an AI `cardType` label.
///
/// Never fails. Exact literals map to themselves; otherwise anything that
/// mentions typing becomes [`CardType::BasicTyping`] and the rest falls back
/// to [`CardType::Basic`]. "Reversed" labels are deliberately not treated as
/// typing cards.
pub fn normalize_card_type(label: &str) -> CardType {
    if let Some(exact) = CardType::from_literal(label) {
        return exact;
    }

    let lower = label.to_lowercase();
    let guessed = if lower.contains("type") || lower.contains("typing") {
        CardType::BasicTyping
    } else {
        CardType::Basic
    };

    tracing::warn!(
        "Unexpected card type from AI: {:?}, inferred {}",
        label,
        guessed
    );
    guessed
}

fn check_card(
    object: &Map<String, Value>,
    prefix: Option<&str>,
    policy: CardTypePolicy,
    issues: &mut Vec<ValidationIssue>,
) -> Option<ValidatedFlashcard> {
    let path = |field: &str| match prefix {
        Some(prefix) => format!("{prefix}.{field}"),
        None => field.to_string(),
    };
    let before = issues.len();

    let card_type = match object.get("cardType") {
        None | Some(Value::Null) => {
            issues.push(ValidationIssue::new(path("cardType"), "Required"));
            None
        }
        Some(Value::String(label)) => match (CardType::from_literal(label), policy) {
            (Some(card_type), _) => Some(card_type),
            (None, CardTypePolicy::Lenient) => Some(normalize_card_type(label)),
            (None, CardTypePolicy::Strict) => {
                issues.push(ValidationIssue::new(
                    path("cardType"),
                    format!(
                        "Invalid card type {:?}, expected {:?} or {:?}",
                        label,
                        CardType::Basic.as_str(),
                        CardType::BasicTyping.as_str()
                    ),
                ));
                None
            }
        },
        Some(other) => {
            issues.push(ValidationIssue::new(
                path("cardType"),
                format!("Expected string, received {}", json_kind(other)),
            ));
            None
        }
    };

    let front = check_text(object, "front", "Card front cannot be empty", &path, issues);
    let back = check_text(object, "back", "Card back cannot be empty", &path, issues);

    if issues.len() != before {
        return None;
    }

    Some(ValidatedFlashcard {
        card_type: card_type?,
        front: front?,
        back: back?,
    })
}

fn check_text(
    object: &Map<String, Value>,
    field: &str,
    empty_reason: &str,
    path: &impl Fn(&str) -> String,
    issues: &mut Vec<ValidationIssue>,
) -> Option<String> {
    match object.get(field) {
        None | Some(Value::Null) => {
            issues.push(ValidationIssue::new(path(field), "Required"));
            None
        }
        Some(Value::String(text)) if text.trim().is_empty() => {
            issues.push(ValidationIssue::new(path(field), empty_reason));
            None
        }
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => {
            issues.push(ValidationIssue::new(
                path(field),
                format!("Expected string, received {}", json_kind(other)),
            ));
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_array_is_returned_in_order() {
        let raw = json!([
            {"cardType": "Basic", "front": "What is ATP?", "back": "Energy currency"},
            {"cardType": "Basic (type in the answer)", "front": "Symbol for water?", "back": "H2O"}
        ]);

        let cards = validate_flashcard_response(&raw, CardTypePolicy::Strict).unwrap();

        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].front, "What is ATP?");
        assert_eq!(cards[1].card_type, CardType::BasicTyping);
    }

    #[test]
    fn test_empty_array_is_valid() {
        let cards = validate_flashcard_response(&json!([]), CardTypePolicy::Strict).unwrap();
        assert!(cards.is_empty());
    }

    #[test]
    fn test_cloze_is_rejected_with_path() {
        let raw = json!([{"cardType": "Cloze", "front": "x", "back": "y"}]);

        let err = validate_flashcard_response(&raw, CardTypePolicy::Strict).unwrap_err();

        assert_eq!(err.issues.len(), 1);
        assert!(err.has_issue_at("0.cardType"));
        assert!(err.details()[0].starts_with("0.cardType: Invalid card type \"Cloze\""));
    }

    #[test]
    fn test_non_array_is_rejected() {
        let err =
            validate_flashcard_response(&json!({"cardType": "Basic"}), CardTypePolicy::Strict)
                .unwrap_err();
        assert_eq!(err.message, "AI returned invalid response format");
        assert_eq!(
            err.details(),
            vec!["Expected an array of flashcards but received: object".to_string()]
        );
    }

    #[test]
    fn test_every_violation_is_reported() {
        let raw = json!([
            {"cardType": "Basic", "front": "ok", "back": "ok"},
            {"cardType": 3, "front": "", "back": null},
            "not a card"
        ]);

        let err = validate_flashcard_response(&raw, CardTypePolicy::Strict).unwrap_err();

        assert!(err.has_issue_at("1.cardType"));
        assert!(err.has_issue_at("1.front"));
        assert!(err.has_issue_at("1.back"));
        assert!(err.has_issue_at("2"));
        assert!(!err.issues.iter().any(|issue| issue.path.starts_with("0")));
    }

    #[test]
    fn test_whitespace_only_text_counts_as_empty() {
        let raw = json!({"cardType": "Basic", "front": "   ", "back": "A"});
        let err = validate_single_flashcard(&raw, CardTypePolicy::Strict).unwrap_err();
        assert_eq!(err.details(), vec!["front: Card front cannot be empty".to_string()]);
    }

    #[test]
    fn test_single_card_drops_extra_fields() {
        let raw = json!({
            "id": "from-the-ai",
            "cardType": "Basic",
            "front": "Q",
            "back": "A",
            "cloze": "{{c1::Q}}"
        });
        let card = validate_single_flashcard(&raw, CardTypePolicy::Strict).unwrap();
        assert_eq!(
            serde_json::to_value(&card).unwrap(),
            json!({"cardType": "Basic", "front": "Q", "back": "A"})
        );
    }

    #[test]
    fn test_single_card_rejects_arrays() {
        let err = validate_single_flashcard(&json!([]), CardTypePolicy::Strict).unwrap_err();
        assert_eq!(err.message, "AI returned invalid card format");
    }

    #[test]
    fn test_lenient_policy_normalizes_labels() {
        let raw = json!([
            {"cardType": "Typing", "front": "Q1", "back": "A1"},
            {"cardType": "Basic (and reversed card)", "front": "Q2", "back": "A2"}
        ]);

        let cards = validate_flashcard_response(&raw, CardTypePolicy::Lenient).unwrap();

        assert_eq!(cards[0].card_type, CardType::BasicTyping);
        assert_eq!(cards[1].card_type, CardType::Basic);
    }

    #[test]
    fn test_lenient_policy_still_requires_text() {
        let raw = json!([{"cardType": "whatever", "front": "", "back": "A"}]);
        let err = validate_flashcard_response(&raw, CardTypePolicy::Lenient).unwrap_err();
        assert!(err.has_issue_at("0.front"));
    }

    #[test]
    fn test_normalize_card_type() {
        assert_eq!(normalize_card_type("Basic"), CardType::Basic);
        assert_eq!(
            normalize_card_type("Basic (type in the answer)"),
            CardType::BasicTyping
        );
        assert_eq!(normalize_card_type("type-in"), CardType::BasicTyping);
        assert_eq!(normalize_card_type("Reverse"), CardType::Basic);
        assert_eq!(normalize_card_type("Cloze"), CardType::Basic);
    }
}
