// src/scoring/score.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::quiz::{Difficulty, QuestionType};

use super::normalize::{self, CanonicalAnswer};

/// One scored answer in canonical form. This is exactly what attempts
/// persist, so the shape is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub question_text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub selected: CanonicalAnswer,
    pub correct: CanonicalAnswer,
    pub is_correct: bool,
    pub marks_awarded: f64,
    pub difficulty: Difficulty,
    pub chapter: String,
}

/// The scoring engine's view of one question-bank entry.
#[derive(Debug, Clone)]
pub struct QuestionKey {
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub correct: Vec<Value>,
    pub marks: f64,
    pub negative_marks: f64,
    pub difficulty: Difficulty,
    pub chapter: String,
}

impl QuestionKey {
    /// Fallback for answers whose question id is not in the quiz: trust the
    /// answer's self-reported type, no options, no marks at stake.
    pub fn fallback(question_type: QuestionType) -> Self {
        Self {
            question_type,
            options: Vec::new(),
            correct: Vec::new(),
            marks: 0.0,
            negative_marks: 0.0,
            difficulty: Difficulty::Easy,
            chapter: String::new(),
        }
    }
}

/// Compares two canonical values. MSQ compares as a sorted sequence,
/// length included; NAT is exact float equality.
pub fn is_match(selected: &CanonicalAnswer, correct: &CanonicalAnswer) -> bool {
    match (selected, correct) {
        (CanonicalAnswer::Choice(a), CanonicalAnswer::Choice(b)) => b.is_some() && a == b,
        (CanonicalAnswer::MultiChoice(a), CanonicalAnswer::MultiChoice(b)) => {
            let mut a = a.clone();
            let mut b = b.clone();
            a.sort_unstable();
            b.sort_unstable();
            a == b
        }
        (CanonicalAnswer::Numeric(a), CanonicalAnswer::Numeric(b)) => a == b,
        (CanonicalAnswer::Boolean(a), CanonicalAnswer::Boolean(b)) => a == b,
        _ => false,
    }
}

/// Marks awarded for one answer: full marks when correct, negative marks
/// only when the question actually configures them, never a reward for a
/// wrong answer.
pub fn award(is_correct: bool, marks: f64, negative_marks: f64) -> f64 {
    if is_correct {
        marks
    } else if negative_marks > 0.0 {
        -negative_marks
    } else {
        0.0
    }
}

/// Normalizes and scores one submitted answer against its question.
pub fn grade_answer(
    key: &QuestionKey,
    question_id: i64,
    question_text: &str,
    selected_raw: &Value,
) -> GradedAnswer {
    let correct = normalize::normalize_correct(key.question_type, &key.correct, &key.options);
    let selected = normalize::normalize_selected(key.question_type, selected_raw, &key.options);
    let is_correct = is_match(&selected, &correct);
    let marks_awarded = award(is_correct, key.marks, key.negative_marks);

    GradedAnswer {
        question_id,
        question_text: question_text.to_string(),
        question_type: key.question_type,
        selected,
        correct,
        is_correct,
        marks_awarded,
        difficulty: key.difficulty,
        chapter: normalize::chapter_label(&key.chapter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mcq_key() -> QuestionKey {
        QuestionKey {
            question_type: QuestionType::Mcq,
            options: vec!["A".into(), "B".into(), "C".into()],
            correct: vec![json!("B")],
            marks: 2.0,
            negative_marks: 1.0,
            difficulty: Difficulty::Easy,
            chapter: "Intro".into(),
        }
    }

    #[test]
    fn mcq_correct_text_selection_awards_full_marks() {
        let graded = grade_answer(&mcq_key(), 1, "q", &json!("B"));
        assert!(graded.is_correct);
        assert_eq!(graded.marks_awarded, 2.0);
        assert_eq!(graded.chapter, "Intro");
    }

    #[test]
    fn mcq_wrong_selection_costs_negative_marks() {
        let graded = grade_answer(&mcq_key(), 1, "q", &json!("A"));
        assert!(!graded.is_correct);
        assert_eq!(graded.marks_awarded, -1.0);
    }

    #[test]
    fn negative_marks_zero_never_goes_below_zero() {
        let mut key = mcq_key();
        key.negative_marks = 0.0;
        let graded = grade_answer(&key, 1, "q", &json!("A"));
        assert!(!graded.is_correct);
        assert_eq!(graded.marks_awarded, 0.0);
    }

    #[test]
    fn msq_order_does_not_matter() {
        let key = QuestionKey {
            question_type: QuestionType::Msq,
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct: vec![json!("A"), json!("C")],
            marks: 3.0,
            negative_marks: 0.0,
            difficulty: Difficulty::Medium,
            chapter: String::new(),
        };
        let graded = grade_answer(&key, 7, "q", &json!(["C", "A"]));
        assert!(graded.is_correct);
        assert_eq!(graded.marks_awarded, 3.0);
        assert_eq!(graded.chapter, "Unspecified");
    }

    #[test]
    fn msq_length_mismatch_is_wrong() {
        assert!(!is_match(
            &CanonicalAnswer::MultiChoice(vec![0, 1]),
            &CanonicalAnswer::MultiChoice(vec![0, 1, 2])
        ));
        assert!(!is_match(
            &CanonicalAnswer::MultiChoice(vec![0, 1]),
            &CanonicalAnswer::MultiChoice(vec![0, 2])
        ));
    }

    #[test]
    fn nat_compares_parsed_floats_exactly() {
        let key = QuestionKey {
            question_type: QuestionType::Nat,
            options: Vec::new(),
            correct: vec![json!("42")],
            marks: 1.0,
            negative_marks: 0.0,
            difficulty: Difficulty::Hard,
            chapter: String::new(),
        };
        assert!(grade_answer(&key, 1, "q", &json!("42")).is_correct);
        assert!(grade_answer(&key, 1, "q", &json!("42.0")).is_correct);
        assert!(!grade_answer(&key, 1, "q", &json!("42.001")).is_correct);
    }

    #[test]
    fn mcq_without_resolvable_correct_never_matches() {
        let key = QuestionKey {
            question_type: QuestionType::Mcq,
            options: vec!["A".into()],
            correct: vec![json!("missing")],
            marks: 1.0,
            negative_marks: 0.0,
            difficulty: Difficulty::Easy,
            chapter: String::new(),
        };
        let graded = grade_answer(&key, 1, "q", &json!("A"));
        assert!(!graded.is_correct);
    }

    #[test]
    fn fallback_key_scores_to_zero_marks() {
        let key = QuestionKey::fallback(QuestionType::Mcq);
        let graded = grade_answer(&key, 99, "orphan", &json!("2"));
        assert!(!graded.is_correct);
        assert_eq!(graded.marks_awarded, 0.0);
        assert_eq!(graded.selected, CanonicalAnswer::Choice(Some(2)));
    }
}
