// src/scoring/aggregate.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::quiz::Difficulty;

use super::score::GradedAnswer;

/// Count bucket shared by attempt aggregates and the running tallies.
/// An answer counts as correct here when it actually earned marks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub total: i64,
    pub correct: i64,
    pub wrong: i64,
}

impl Bucket {
    fn add(&mut self, earned_marks: bool) {
        self.total += 1;
        if earned_marks {
            self.correct += 1;
        } else {
            self.wrong += 1;
        }
    }
}

/// Per-difficulty bucket triple for one chapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChapterSplit {
    pub easy: Bucket,
    pub medium: Bucket,
    pub hard: Bucket,
}

impl ChapterSplit {
    pub fn bucket_mut(&mut self, difficulty: Difficulty) -> &mut Bucket {
        match difficulty {
            Difficulty::Easy => &mut self.easy,
            Difficulty::Medium => &mut self.medium,
            Difficulty::Hard => &mut self.hard,
        }
    }

    pub fn bucket(&self, difficulty: Difficulty) -> &Bucket {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }
}

/// Counts and marks for one difficulty within one attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DifficultyStats {
    pub total: i64,
    pub correct: i64,
    pub wrong: i64,
    pub marks: f64,
}

/// Everything the persistence layer needs from one scored submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptBreakdown {
    pub easy: DifficultyStats,
    pub medium: DifficultyStats,
    pub hard: DifficultyStats,
    pub total_questions: i64,
    pub total_correct: i64,
    pub total_wrong: i64,
    pub obtained_marks: f64,
    pub obtained_negative: f64,
    /// Chapter label -> per-difficulty buckets.
    pub chapters: BTreeMap<String, ChapterSplit>,
}

impl AttemptBreakdown {
    pub fn stats_mut(&mut self, difficulty: Difficulty) -> &mut DifficultyStats {
        match difficulty {
            Difficulty::Easy => &mut self.easy,
            Difficulty::Medium => &mut self.medium,
            Difficulty::Hard => &mut self.hard,
        }
    }
}

/// Folds all scored answers of one submission.
///
/// `total_questions` counts submitted answers, not quiz questions: omitted
/// questions are simply absent from every aggregate.
pub fn aggregate_attempt(answers: &[GradedAnswer]) -> AttemptBreakdown {
    let mut breakdown = AttemptBreakdown::default();

    for answer in answers {
        let earned = answer.marks_awarded > 0.0;

        let stats = breakdown.stats_mut(answer.difficulty);
        stats.total += 1;
        if earned {
            stats.correct += 1;
        } else {
            stats.wrong += 1;
        }
        stats.marks += answer.marks_awarded;

        breakdown.total_questions += 1;
        if earned {
            breakdown.total_correct += 1;
        } else {
            breakdown.total_wrong += 1;
        }
        breakdown.obtained_marks += answer.marks_awarded;
        if answer.marks_awarded < 0.0 {
            breakdown.obtained_negative += answer.marks_awarded.abs();
        }

        breakdown
            .chapters
            .entry(answer.chapter.clone())
            .or_default()
            .bucket_mut(answer.difficulty)
            .add(earned);
    }

    breakdown
}

/// Quiz-level ceilings, summed over the entire question bank (not just the
/// attempted questions): (total possible marks, total possible negative).
pub fn quiz_ceilings(marks: &[(f64, f64)]) -> (f64, f64) {
    marks.iter().fold((0.0, 0.0), |(m, n), (marks, negative)| {
        (m + marks, n + negative)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::QuestionType;
    use crate::scoring::CanonicalAnswer;

    fn graded(
        difficulty: Difficulty,
        chapter: &str,
        is_correct: bool,
        marks_awarded: f64,
    ) -> GradedAnswer {
        GradedAnswer {
            question_id: 1,
            question_text: "q".into(),
            question_type: QuestionType::Mcq,
            selected: CanonicalAnswer::Choice(Some(0)),
            correct: CanonicalAnswer::Choice(Some(0)),
            is_correct,
            marks_awarded,
            difficulty,
            chapter: chapter.into(),
        }
    }

    #[test]
    fn buckets_split_by_difficulty() {
        let answers = vec![
            graded(Difficulty::Easy, "Intro", true, 2.0),
            graded(Difficulty::Easy, "Intro", false, -1.0),
            graded(Difficulty::Hard, "Advanced", true, 5.0),
        ];
        let b = aggregate_attempt(&answers);

        assert_eq!(b.easy.total, 2);
        assert_eq!(b.easy.correct, 1);
        assert_eq!(b.easy.wrong, 1);
        assert_eq!(b.easy.marks, 1.0);
        assert_eq!(b.medium.total, 0);
        assert_eq!(b.hard.correct, 1);

        assert_eq!(b.total_questions, 3);
        assert_eq!(b.total_correct, 2);
        assert_eq!(b.total_wrong, 1);
        assert_eq!(b.obtained_marks, 6.0);
        assert_eq!(b.obtained_negative, 1.0);
    }

    #[test]
    fn chapter_map_mirrors_bucket_shape() {
        let answers = vec![
            graded(Difficulty::Easy, "Algebra", true, 1.0),
            graded(Difficulty::Easy, "Algebra", false, 0.0),
            graded(Difficulty::Medium, "Geometry", true, 2.0),
        ];
        let b = aggregate_attempt(&answers);

        let algebra = &b.chapters["Algebra"];
        assert_eq!(algebra.easy, Bucket { total: 2, correct: 1, wrong: 1 });
        let geometry = &b.chapters["Geometry"];
        assert_eq!(geometry.medium, Bucket { total: 1, correct: 1, wrong: 0 });
    }

    #[test]
    fn zero_mark_correct_answer_counts_as_wrong_in_buckets() {
        // The bucket criterion is marks earned, not the correctness flag.
        let answers = vec![graded(Difficulty::Easy, "Intro", true, 0.0)];
        let b = aggregate_attempt(&answers);
        assert_eq!(b.easy.correct, 0);
        assert_eq!(b.easy.wrong, 1);
        assert_eq!(b.total_correct, 0);
    }

    #[test]
    fn overall_totals_equal_chapter_sums() {
        let answers = vec![
            graded(Difficulty::Easy, "A", true, 1.0),
            graded(Difficulty::Medium, "A", false, -0.5),
            graded(Difficulty::Hard, "B", true, 3.0),
            graded(Difficulty::Easy, "", false, 0.0),
        ];
        let b = aggregate_attempt(&answers);
        let chapter_total: i64 = b
            .chapters
            .values()
            .map(|c| c.easy.total + c.medium.total + c.hard.total)
            .sum();
        assert_eq!(chapter_total, b.total_questions);
    }

    #[test]
    fn ceilings_sum_whole_question_bank() {
        let marks = [(2.0, 1.0), (3.0, 0.0), (5.0, 2.0)];
        assert_eq!(quiz_ceilings(&marks), (10.0, 3.0));
    }

    #[test]
    fn empty_submission_aggregates_to_zero() {
        let b = aggregate_attempt(&[]);
        assert_eq!(b.total_questions, 0);
        assert_eq!(b.obtained_marks, 0.0);
        assert!(b.chapters.is_empty());
    }
}
