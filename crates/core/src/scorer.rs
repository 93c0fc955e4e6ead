use crate::answers::AnswerSheet;
use crate::model::{Question, QuestionId};

//
// ─── LETTER CODEC ──────────────────────────────────────────────────────────────
//

/// Decodes an answer letter to its option index: `A → 0`, `B → 1`, …
///
/// Empty input, multi-character input, or anything other than a single
/// ASCII uppercase letter decodes to `None`.
#[must_use]
pub fn letter_to_index(letter: &str) -> Option<usize> {
    let mut chars = letter.trim().chars();
    let first = chars.next()?;
    if chars.next().is_some() || !first.is_ascii_uppercase() {
        return None;
    }
    Some(first as usize - 'A' as usize)
}

/// Encodes an option index back to its answer letter: `0 → A`, `1 → B`, …
#[must_use]
pub fn index_to_letter(index: usize) -> Option<char> {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map(|i| char::from(b'A' + i))
}

//
// ─── RESULT TYPES ──────────────────────────────────────────────────────────────
//

/// Per-question entry of the review list shown after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview {
    pub question_id: QuestionId,
    /// 1-based question number for display.
    pub number: usize,
    pub chosen_index: Option<usize>,
    pub chosen_letter: Option<char>,
    pub correct_index: Option<usize>,
    /// The raw letter as supplied, for downstream display.
    pub correct_letter: String,
    pub is_correct: bool,
}

/// Aggregate outcome of a scored drill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillOutcome {
    pub total: usize,
    pub correct: usize,
    /// Answered but wrong.
    pub incorrect: usize,
    /// Never answered; always scored incorrect.
    pub skipped: usize,
    /// `round(100 * correct / total)`, 0 for an empty drill.
    pub score_percentage: u32,
    pub reviews: Vec<QuestionReview>,
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Scores a finished drill against the learner's answer sheet.
///
/// A question counts as correct only when the decoded correct letter and the
/// learner's chosen index are both present and equal; an undecodable letter
/// or an unanswered position scores incorrect, never an error.
#[must_use]
pub fn score(questions: &[Question], answers: &AnswerSheet) -> DrillOutcome {
    let mut reviews = Vec::with_capacity(questions.len());
    let mut correct = 0;
    let mut incorrect = 0;
    let mut skipped = 0;

    for (position, question) in questions.iter().enumerate() {
        let correct_index = letter_to_index(question.correct_answer());
        let chosen_index = answers.get(position);
        let is_correct =
            matches!((correct_index, chosen_index), (Some(want), Some(got)) if want == got);

        if is_correct {
            correct += 1;
        } else if chosen_index.is_some() {
            incorrect += 1;
        } else {
            skipped += 1;
        }

        reviews.push(QuestionReview {
            question_id: question.id().clone(),
            number: position + 1,
            chosen_index,
            chosen_letter: chosen_index.and_then(index_to_letter),
            correct_index,
            correct_letter: question.correct_answer().to_owned(),
            is_correct,
        });
    }

    let total = questions.len();
    let score_percentage = if total == 0 {
        0
    } else {
        (100.0 * correct as f64 / total as f64).round() as u32
    };

    DrillOutcome {
        total,
        correct,
        incorrect,
        skipped,
        score_percentage,
        reviews,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, correct: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            None,
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct,
            "Logical Reasoning",
            "Medium",
        )
        .unwrap()
    }

    #[test]
    fn letter_codec_decodes_uppercase_only() {
        assert_eq!(letter_to_index("A"), Some(0));
        assert_eq!(letter_to_index("E"), Some(4));
        assert_eq!(letter_to_index("Z"), Some(25));
        assert_eq!(letter_to_index(""), None);
        assert_eq!(letter_to_index("a"), None);
        assert_eq!(letter_to_index("AB"), None);
        assert_eq!(letter_to_index("3"), None);
    }

    #[test]
    fn letter_codec_encodes_back() {
        assert_eq!(index_to_letter(0), Some('A'));
        assert_eq!(index_to_letter(25), Some('Z'));
        assert_eq!(index_to_letter(26), None);
    }

    #[test]
    fn perfect_score_is_100() {
        let questions = vec![question("q-1", "A"), question("q-2", "B"), question("q-3", "C")];
        let answers = AnswerSheet::from_entries([(0, 0), (1, 1), (2, 2)]);

        let outcome = score(&questions, &answers);
        assert_eq!(outcome.correct, 3);
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.score_percentage, 100);
        assert!(outcome.reviews.iter().all(|r| r.is_correct));
    }

    #[test]
    fn two_of_three_rounds_to_67() {
        let questions = vec![question("q-1", "A"), question("q-2", "B"), question("q-3", "C")];
        let answers = AnswerSheet::from_entries([(0, 0), (1, 0), (2, 2)]);

        let outcome = score(&questions, &answers);
        assert_eq!(outcome.correct, 2);
        assert_eq!(outcome.incorrect, 1);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.score_percentage, 67);
    }

    #[test]
    fn unanswered_scores_incorrect_and_skipped() {
        let questions = vec![question("q-1", "A"), question("q-2", "B")];
        let answers = AnswerSheet::from_entries([(0, 0)]);

        let outcome = score(&questions, &answers);
        assert_eq!(outcome.correct, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.score_percentage, 50);

        let review = &outcome.reviews[1];
        assert!(!review.is_correct);
        assert_eq!(review.chosen_index, None);
        assert_eq!(review.chosen_letter, None);
        assert_eq!(review.correct_index, Some(1));
    }

    #[test]
    fn empty_drill_scores_zero() {
        let outcome = score(&[], &AnswerSheet::new());
        assert_eq!(outcome.total, 0);
        assert_eq!(outcome.score_percentage, 0);
        assert!(outcome.reviews.is_empty());
    }

    #[test]
    fn undecodable_letter_never_matches() {
        let questions = vec![question("q-1", "?")];
        let answers = AnswerSheet::from_entries([(0, 0)]);

        let outcome = score(&questions, &answers);
        assert_eq!(outcome.correct, 0);
        assert_eq!(outcome.incorrect, 1);
        let review = &outcome.reviews[0];
        assert_eq!(review.correct_index, None);
        assert_eq!(review.correct_letter, "?");
    }

    #[test]
    fn review_carries_letters_for_display() {
        let questions = vec![question("q-1", "D")];
        let answers = AnswerSheet::from_entries([(0, 3)]);

        let outcome = score(&questions, &answers);
        let review = &outcome.reviews[0];
        assert_eq!(review.number, 1);
        assert_eq!(review.chosen_letter, Some('D'));
        assert_eq!(review.correct_letter, "D");
        assert!(review.is_correct);
    }
}
