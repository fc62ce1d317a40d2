// src/engine/scorer.rs

use crate::engine::ledger::AnswerLedger;
use crate::models::question::Question;

/// Classification totals over every served question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub correct: usize,
    pub wrong: usize,
    pub unanswered: usize,
    pub total: usize,
}

/// Grades the ledger against the served questions, resolving
/// `is_correct` on every entry. Classification is total: each question
/// is exactly one of correct, wrong, or unanswered, and unanswered
/// questions stay in the denominator.
///
/// Comparison is by option identity, never by position, so shuffled
/// options grade identically to unshuffled ones.
pub fn grade(ledger: &mut AnswerLedger, questions: &[Question]) -> Tally {
    let mut tally = Tally {
        correct: 0,
        wrong: 0,
        unanswered: 0,
        total: questions.len(),
    };

    for question in questions {
        let Some(entry) = ledger.get_mut(question.id) else {
            tally.unanswered += 1;
            continue;
        };
        match entry.selected_option_id.as_deref() {
            None => {
                entry.is_correct = None;
                tally.unanswered += 1;
            }
            Some(selected) => {
                let correct = question.correct_option_id() == Some(selected);
                entry.is_correct = Some(correct);
                if correct {
                    tally.correct += 1;
                } else {
                    tally.wrong += 1;
                }
            }
        }
    }

    tally
}

/// Percentage score, rounded half-away-from-zero (`Math.round`
/// semantics for positive values: 7/9 -> 78, 1/3 -> 33).
pub fn percentage(correct: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    (100.0 * correct as f64 / total as f64).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionOption;
    use sqlx::types::Json;

    fn question(id: i64, correct_option: &str) -> Question {
        let options = ["a", "b", "c", "d"]
            .iter()
            .map(|&oid| QuestionOption {
                id: oid.to_string(),
                text: format!("Option {}", oid),
                correct: oid == correct_option,
            })
            .collect();
        Question {
            id,
            category: "general".to_string(),
            question_type: "multiple_choice".to_string(),
            prompt: format!("Question {}", id),
            options: Json(options),
            difficulty: "medium".to_string(),
            explanation: None,
            points: 1,
            created_at: None,
        }
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(percentage(7, 9), 78);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13); // 12.5 rounds up
        assert_eq!(percentage(0, 5), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn empty_paper_scores_zero() {
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn classification_is_total() {
        let questions = vec![question(1, "a"), question(2, "b"), question(3, "c")];
        let mut ledger = AnswerLedger::new([1, 2, 3]);
        ledger.select(1, "a"); // correct
        ledger.select(2, "d"); // wrong
        // 3 left unanswered

        let tally = grade(&mut ledger, &questions);
        assert_eq!(
            tally,
            Tally {
                correct: 1,
                wrong: 1,
                unanswered: 1,
                total: 3
            }
        );
        assert_eq!(ledger.get(1).unwrap().is_correct, Some(true));
        assert_eq!(ledger.get(2).unwrap().is_correct, Some(false));
        assert_eq!(ledger.get(3).unwrap().is_correct, None);
    }

    #[test]
    fn grading_matches_after_option_shuffle() {
        use rand::seq::SliceRandom;

        let plain = vec![question(1, "b"), question(2, "d")];

        // Same questions with options permuted in place; the correct
        // flag travels with its option.
        let mut shuffled = plain.clone();
        let mut rng = rand::thread_rng();
        for q in &mut shuffled {
            q.options.0.shuffle(&mut rng);
        }

        // Identical selections, expressed by option identity.
        let mut ledger_a = AnswerLedger::new([1, 2]);
        ledger_a.select(1, "b");
        ledger_a.select(2, "a");
        let mut ledger_b = AnswerLedger::new([1, 2]);
        ledger_b.select(1, "b");
        ledger_b.select(2, "a");

        let plain_tally = grade(&mut ledger_a, &plain);
        let shuffled_tally = grade(&mut ledger_b, &shuffled);
        assert_eq!(plain_tally, shuffled_tally);
        assert_eq!(plain_tally.correct, 1);
        assert_eq!(plain_tally.wrong, 1);
    }
}
