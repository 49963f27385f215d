// src/scoring/normalize.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::quiz::QuestionType;

/// Marker for a value that did not resolve to any option index.
pub const INVALID_INDEX: i64 = -1;

/// Chapter label used when a question carries no chapter.
pub const UNSPECIFIED_CHAPTER: &str = "Unspecified";

/// Canonical comparison form, one variant per question type.
///
/// Malformed input never fails normalization: unresolvable selections fall
/// back to concrete defaults (index 0, numeric 0, truthiness), which is a
/// deliberate contract — a garbled answer becomes a specific, usually wrong,
/// answer rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CanonicalAnswer {
    /// MCQ: zero-based option index. `None` means the question bank's
    /// correct marker resolved to nothing.
    Choice(Option<i64>),
    /// MSQ: option indices; order is not significant for comparison.
    MultiChoice(Vec<i64>),
    /// NAT: numeric value. Comparison is exact, no tolerance.
    Numeric(f64),
    /// TrueFalse.
    Boolean(bool),
}

/// Resolves a raw value to a zero-based option index.
///
/// Integers pass through, numeric strings are parsed, remaining strings are
/// matched against the option texts (first match wins). Anything else yields
/// the invalid marker.
pub fn resolve_index(value: &Value, options: &[String]) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(INVALID_INDEX),
        Value::String(s) => {
            if let Ok(i) = s.trim().parse::<i64>() {
                return i;
            }
            if let Ok(f) = s.trim().parse::<f64>() {
                return f as i64;
            }
            options
                .iter()
                .position(|opt| opt == s)
                .map(|p| p as i64)
                .unwrap_or(INVALID_INDEX)
        }
        _ => INVALID_INDEX,
    }
}

/// Numeric parse with the fail-open default: non-parseable becomes 0.
pub fn parse_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Boolean coercion: native booleans pass through, "true"/"false" strings
/// (case-insensitive, trimmed) map accordingly, everything else falls back
/// to general truthiness.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => !s.is_empty(),
        },
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Blank chapters (after trimming) collapse to the shared default label.
pub fn chapter_label(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNSPECIFIED_CHAPTER.to_string()
    } else {
        trimmed.to_string()
    }
}

fn first_element(value: &Value) -> Value {
    match value {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        other => other.clone(),
    }
}

fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Canonicalizes the question bank's raw correct markers.
pub fn normalize_correct(
    question_type: QuestionType,
    correct: &[Value],
    options: &[String],
) -> CanonicalAnswer {
    match question_type {
        QuestionType::Mcq => {
            // A list of markers only contributes its first resolved index.
            let idx = correct
                .first()
                .map(|v| resolve_index(v, options))
                .unwrap_or(INVALID_INDEX);
            CanonicalAnswer::Choice((idx != INVALID_INDEX).then_some(idx))
        }
        QuestionType::Msq => CanonicalAnswer::MultiChoice(
            correct
                .iter()
                .map(|v| resolve_index(v, options))
                .filter(|&i| i != INVALID_INDEX)
                .collect(),
        ),
        QuestionType::Nat => {
            CanonicalAnswer::Numeric(correct.first().map(parse_number).unwrap_or(0.0))
        }
        QuestionType::TrueFalse => {
            CanonicalAnswer::Boolean(correct.first().map(coerce_bool).unwrap_or(false))
        }
    }
}

/// Canonicalizes a client-submitted selection.
pub fn normalize_selected(
    question_type: QuestionType,
    selected: &Value,
    options: &[String],
) -> CanonicalAnswer {
    match question_type {
        QuestionType::Mcq => {
            let raw = first_element(selected);
            let idx = resolve_index(&raw, options);
            // Unresolvable selections pin to option 0 instead of staying unset.
            CanonicalAnswer::Choice(Some(if idx == INVALID_INDEX { 0 } else { idx }))
        }
        QuestionType::Msq => CanonicalAnswer::MultiChoice(
            as_list(selected)
                .iter()
                .map(|v| resolve_index(v, options))
                .filter(|&i| i != INVALID_INDEX)
                .collect(),
        ),
        QuestionType::Nat => CanonicalAnswer::Numeric(parse_number(&first_element(selected))),
        QuestionType::TrueFalse => CanonicalAnswer::Boolean(coerce_bool(&first_element(selected))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn index_resolution_matches_option_text() {
        let options = opts(&["A", "B", "C"]);
        assert_eq!(resolve_index(&json!("B"), &options), 1);
        assert_eq!(resolve_index(&json!("C"), &options), 2);
    }

    #[test]
    fn index_resolution_integers_pass_through() {
        let options = opts(&["A", "B"]);
        assert_eq!(resolve_index(&json!(1), &options), 1);
        assert_eq!(resolve_index(&json!("1"), &options), 1);
    }

    #[test]
    fn index_resolution_no_match_is_invalid() {
        let options = opts(&["A", "B"]);
        assert_eq!(resolve_index(&json!("Z"), &options), INVALID_INDEX);
        assert_eq!(resolve_index(&json!(null), &options), INVALID_INDEX);
        assert_eq!(resolve_index(&json!("Z"), &[]), INVALID_INDEX);
    }

    #[test]
    fn mcq_selected_text_and_index_normalize_identically() {
        let options = opts(&["A", "B", "C"]);
        let by_text = normalize_selected(QuestionType::Mcq, &json!("B"), &options);
        let by_index = normalize_selected(QuestionType::Mcq, &json!(1), &options);
        assert_eq!(by_text, by_index);
        assert_eq!(by_text, CanonicalAnswer::Choice(Some(1)));
    }

    #[test]
    fn mcq_unresolvable_selection_defaults_to_zero() {
        let options = opts(&["A", "B"]);
        assert_eq!(
            normalize_selected(QuestionType::Mcq, &json!("nope"), &options),
            CanonicalAnswer::Choice(Some(0))
        );
    }

    #[test]
    fn mcq_unresolvable_correct_is_empty() {
        assert_eq!(
            normalize_correct(QuestionType::Mcq, &[json!("missing")], &[]),
            CanonicalAnswer::Choice(None)
        );
        assert_eq!(
            normalize_correct(QuestionType::Mcq, &[], &[]),
            CanonicalAnswer::Choice(None)
        );
    }

    #[test]
    fn msq_drops_unresolved_entries() {
        let options = opts(&["A", "B", "C", "D"]);
        let correct = [json!("A"), json!("zzz"), json!("C")];
        assert_eq!(
            normalize_correct(QuestionType::Msq, &correct, &options),
            CanonicalAnswer::MultiChoice(vec![0, 2])
        );
    }

    #[test]
    fn msq_selected_scalar_is_wrapped() {
        let options = opts(&["A", "B"]);
        assert_eq!(
            normalize_selected(QuestionType::Msq, &json!("B"), &options),
            CanonicalAnswer::MultiChoice(vec![1])
        );
    }

    #[test]
    fn nat_non_parseable_defaults_to_zero() {
        assert_eq!(
            normalize_selected(QuestionType::Nat, &json!("abc"), &[]),
            CanonicalAnswer::Numeric(0.0)
        );
        assert_eq!(
            normalize_correct(QuestionType::Nat, &[json!("42")], &[]),
            CanonicalAnswer::Numeric(42.0)
        );
    }

    #[test]
    fn nat_takes_first_list_element() {
        assert_eq!(
            normalize_selected(QuestionType::Nat, &json!(["3.5", "9"]), &[]),
            CanonicalAnswer::Numeric(3.5)
        );
    }

    #[test]
    fn boolean_coercion() {
        assert_eq!(
            normalize_selected(QuestionType::TrueFalse, &json!(" TRUE "), &[]),
            CanonicalAnswer::Boolean(true)
        );
        assert_eq!(
            normalize_selected(QuestionType::TrueFalse, &json!("False"), &[]),
            CanonicalAnswer::Boolean(false)
        );
        // General truthiness for everything else.
        assert_eq!(
            normalize_selected(QuestionType::TrueFalse, &json!(""), &[]),
            CanonicalAnswer::Boolean(false)
        );
        assert_eq!(
            normalize_selected(QuestionType::TrueFalse, &json!(1), &[]),
            CanonicalAnswer::Boolean(true)
        );
        assert_eq!(
            normalize_selected(QuestionType::TrueFalse, &json!(null), &[]),
            CanonicalAnswer::Boolean(false)
        );
    }

    #[test]
    fn chapter_label_defaults_when_blank() {
        assert_eq!(chapter_label("  "), UNSPECIFIED_CHAPTER);
        assert_eq!(chapter_label(" Algebra "), "Algebra");
    }
}
