use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question needs at least two answer choices, got {got}")]
    TooFewChoices { got: usize },

    #[error("correct answer letter cannot be empty")]
    EmptyCorrectAnswer,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single question as supplied by the question service.
///
/// Immutable after construction; a drill never mutates its questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    passage_text: Option<String>,
    choices: Vec<String>,
    correct_answer: String,
    question_type: String,
    difficulty_level: String,
}

impl Question {
    /// Creates a new question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is empty, fewer than two choices
    /// are given, or the correct-answer letter is empty.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        passage_text: Option<String>,
        choices: Vec<String>,
        correct_answer: impl Into<String>,
        question_type: impl Into<String>,
        difficulty_level: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if choices.len() < 2 {
            return Err(QuestionError::TooFewChoices { got: choices.len() });
        }
        let correct_answer = correct_answer.into();
        if correct_answer.trim().is_empty() {
            return Err(QuestionError::EmptyCorrectAnswer);
        }

        let passage_text = passage_text.filter(|p| !p.trim().is_empty());

        Ok(Self {
            id,
            text,
            passage_text,
            choices,
            correct_answer: correct_answer.trim().to_owned(),
            question_type: question_type.into(),
            difficulty_level: difficulty_level.into(),
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn passage_text(&self) -> Option<&str> {
        self.passage_text.as_deref()
    }

    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    #[must_use]
    pub fn choice_count(&self) -> usize {
        self.choices.len()
    }

    /// The correct answer letter, verbatim as supplied (e.g. `"B"`).
    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn question_type(&self) -> &str {
        &self.question_type
    }

    #[must_use]
    pub fn difficulty_level(&self) -> &str {
        &self.difficulty_level
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
