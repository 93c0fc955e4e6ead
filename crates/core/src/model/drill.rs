use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::answers::AnswerSheet;
use crate::highlight::{HighlightMap, HighlightRange};
use crate::model::ids::{DrillId, QuestionId};
use crate::model::question::Question;
use crate::navigation::QuestionCursor;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DrillError {
    #[error("option index {option} is out of range for a question with {choices} choices")]
    OptionOutOfRange { option: usize, choices: usize },

    #[error("no question at the current position")]
    NoCurrentQuestion,

    #[error("drill has already been submitted")]
    AlreadySubmitted,
}

//
// ─── STATUS / ORIGIN ───────────────────────────────────────────────────────────
//

/// Lifecycle of a drill attempt: `generated -> in_progress -> submitted`,
/// monotonic, no reverse transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DrillStatus {
    Generated,
    InProgress,
    Submitted,
}

impl DrillStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DrillStatus::Generated => "generated",
            DrillStatus::InProgress => "in_progress",
            DrillStatus::Submitted => "submitted",
        }
    }
}

/// Where a drill came from; diagnostic drills skip the progress save and
/// route their result to a different consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrillOrigin {
    #[default]
    Practice,
    Diagnostic,
}

impl DrillOrigin {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DrillOrigin::Practice => "practice",
            DrillOrigin::Diagnostic => "diagnostic",
        }
    }

    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, DrillOrigin::Diagnostic)
    }
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Base time budget per question before the percentage scaling.
pub const SECONDS_PER_QUESTION: u32 = 90;

/// How the default time budget is scaled when requesting a drill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimePercentage {
    Seventy,
    #[default]
    Standard,
    HundredThirty,
    Untimed,
}

impl TimePercentage {
    /// Scaling factor, `None` for untimed drills.
    #[must_use]
    pub fn multiplier(&self) -> Option<f64> {
        match self {
            TimePercentage::Seventy => Some(0.7),
            TimePercentage::Standard => Some(1.0),
            TimePercentage::HundredThirty => Some(1.3),
            TimePercentage::Untimed => None,
        }
    }
}

/// Options recognized when requesting a new drill from the question service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillConfig {
    question_count: u32,
    difficulties: Vec<String>,
    skills: Vec<String>,
    time_percentage: TimePercentage,
    allow_repeated_questions: bool,
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            question_count: 5,
            difficulties: vec!["Medium".to_owned()],
            skills: Vec::new(),
            time_percentage: TimePercentage::Standard,
            allow_repeated_questions: false,
        }
    }
}

impl DrillConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_question_count(mut self, question_count: u32) -> Self {
        self.question_count = question_count;
        self
    }

    #[must_use]
    pub fn with_difficulties(mut self, difficulties: Vec<String>) -> Self {
        self.difficulties = difficulties;
        self
    }

    #[must_use]
    pub fn with_skills(mut self, skills: Vec<String>) -> Self {
        self.skills = skills;
        self
    }

    #[must_use]
    pub fn with_time_percentage(mut self, time_percentage: TimePercentage) -> Self {
        self.time_percentage = time_percentage;
        self
    }

    #[must_use]
    pub fn with_allow_repeated_questions(mut self, allow: bool) -> Self {
        self.allow_repeated_questions = allow;
        self
    }

    // Accessors
    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn difficulties(&self) -> &[String] {
        &self.difficulties
    }

    #[must_use]
    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    #[must_use]
    pub fn time_percentage(&self) -> TimePercentage {
        self.time_percentage
    }

    #[must_use]
    pub fn allow_repeated_questions(&self) -> bool {
        self.allow_repeated_questions
    }

    /// Time budget for the requested drill: 90 seconds per question scaled
    /// by the timing percentage, `None` when untimed.
    #[must_use]
    pub fn time_limit_seconds(&self) -> Option<u32> {
        let multiplier = self.time_percentage.multiplier()?;
        let base = f64::from(self.question_count * SECONDS_PER_QUESTION);
        Some((base * multiplier).round() as u32)
    }
}

//
// ─── DRILL SESSION ─────────────────────────────────────────────────────────────
//

/// One attempt at a fixed, ordered list of questions.
///
/// The aggregate root: answers, highlights, and the cursor live here, and
/// the session store owns the only mutable handle for the lifetime of an
/// attempt. Questions never change after load.
#[derive(Debug, Clone, PartialEq)]
pub struct DrillSession {
    id: DrillId,
    origin: DrillOrigin,
    questions: Vec<Question>,
    time_limit_seconds: Option<u32>,
    started_at: Option<DateTime<Utc>>,
    status: DrillStatus,
    cursor: QuestionCursor,
    answers: AnswerSheet,
    highlights: HighlightMap,
}

impl DrillSession {
    /// Creates a freshly generated drill. A zero time limit normalizes to
    /// untimed.
    #[must_use]
    pub fn new(
        id: DrillId,
        origin: DrillOrigin,
        questions: Vec<Question>,
        time_limit_seconds: Option<u32>,
    ) -> Self {
        Self {
            id,
            origin,
            questions,
            time_limit_seconds: time_limit_seconds.filter(|limit| *limit > 0),
            started_at: None,
            status: DrillStatus::Generated,
            cursor: QuestionCursor::new(),
            answers: AnswerSheet::new(),
            highlights: HighlightMap::new(),
        }
    }

    /// Rehydrates a drill from persisted progress.
    ///
    /// The cursor is clamped against the restored question list, the
    /// highlight map is re-merged, and answers at stale positions or with
    /// option indices past the question's choices are dropped, so malformed
    /// or stale progress can bend the session but never break its invariants.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_restored(
        id: DrillId,
        origin: DrillOrigin,
        questions: Vec<Question>,
        time_limit_seconds: Option<u32>,
        started_at: Option<DateTime<Utc>>,
        status: DrillStatus,
        current_index: usize,
        answers: AnswerSheet,
        mut highlights: HighlightMap,
    ) -> Self {
        let mut cursor = QuestionCursor::at(current_index);
        cursor.clamp(questions.len());
        highlights.normalize();

        let answers = AnswerSheet::from_entries(answers.iter().filter(|(position, option)| {
            questions
                .get(*position)
                .is_some_and(|question| *option < question.choice_count())
        }));

        Self {
            id,
            origin,
            questions,
            time_limit_seconds: time_limit_seconds.filter(|limit| *limit > 0),
            started_at,
            status,
            cursor,
            answers,
            highlights,
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> &DrillId {
        &self.id
    }

    #[must_use]
    pub fn origin(&self) -> DrillOrigin {
        self.origin
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn time_limit_seconds(&self) -> Option<u32> {
        self.time_limit_seconds
    }

    #[must_use]
    pub fn is_untimed(&self) -> bool {
        self.time_limit_seconds.is_none()
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn status(&self) -> DrillStatus {
        self.status
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.cursor.index()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.cursor.index())
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn highlights(&self) -> &HighlightMap {
        &self.highlights
    }

    /// Whole seconds since the drill started, 0 when not yet started.
    #[must_use]
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u32 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        u32::try_from((now - started_at).num_seconds().max(0)).unwrap_or(u32::MAX)
    }

    //
    // ── Mutations ──
    //

    /// First transition out of "not yet started": sets `started_at` exactly
    /// once and moves to `in_progress`. Returns whether anything changed;
    /// later calls are no-ops.
    pub fn begin(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != DrillStatus::Generated {
            return false;
        }
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.status = DrillStatus::InProgress;
        true
    }

    /// Records the chosen option for the current question.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::NoCurrentQuestion` for an empty drill and
    /// `DrillError::OptionOutOfRange` when the index does not name one of
    /// the question's choices; the answer sheet never holds out-of-range
    /// option indices.
    pub fn select_answer(&mut self, option_index: usize) -> Result<(), DrillError> {
        let question = self
            .current_question()
            .ok_or(DrillError::NoCurrentQuestion)?;
        let choices = question.choice_count();
        if option_index >= choices {
            return Err(DrillError::OptionOutOfRange {
                option: option_index,
                choices,
            });
        }
        self.answers.select(self.cursor.index(), option_index);
        Ok(())
    }

    /// Moves to the next question; no-op at the last one.
    pub fn advance(&mut self) -> bool {
        self.cursor.next(self.questions.len())
    }

    /// Moves to the previous question; no-op at the first one.
    pub fn retreat(&mut self) -> bool {
        self.cursor.previous()
    }

    #[must_use]
    pub fn at_last_question(&self) -> bool {
        !self.questions.is_empty() && self.cursor.index() == self.questions.len() - 1
    }

    pub fn add_highlight(&mut self, question_id: &QuestionId, range: HighlightRange) {
        self.highlights.add(question_id, range);
    }

    pub fn remove_highlight(&mut self, question_id: &QuestionId, range: HighlightRange) {
        self.highlights.remove(question_id, range);
    }

    pub fn set_highlights(&mut self, question_id: &QuestionId, ranges: Vec<HighlightRange>) {
        self.highlights.set(question_id, ranges);
    }

    pub fn clear_highlights(&mut self, question_id: &QuestionId) {
        self.highlights.clear(question_id);
    }

    pub fn clear_all_highlights(&mut self) {
        self.highlights.clear_all();
    }

    /// Re-merges the highlight map; the session store's invariant hook.
    pub fn normalize_highlights(&mut self) {
        self.highlights.normalize();
    }

    /// Forward transition into `submitted`.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::AlreadySubmitted` on a second call; the status
    /// machine is monotonic and never moves backward.
    pub fn mark_submitted(&mut self) -> Result<(), DrillError> {
        if self.status == DrillStatus::Submitted {
            return Err(DrillError::AlreadySubmitted);
        }
        self.status = DrillStatus::Submitted;
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn build_question(id: u32) -> Question {
        Question::new(
            QuestionId::new(format!("q-{id}")),
            format!("Question {id}"),
            None,
            vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            "A",
            "Logical Reasoning",
            "Medium",
        )
        .unwrap()
    }

    fn build_session(count: u32) -> DrillSession {
        let questions = (1..=count).map(build_question).collect();
        DrillSession::new(
            DrillId::new("dr-test"),
            DrillOrigin::Practice,
            questions,
            Some(450),
        )
    }

    #[test]
    fn config_default_shape() {
        let config = DrillConfig::default();
        assert_eq!(config.question_count(), 5);
        assert_eq!(config.difficulties(), &["Medium".to_owned()][..]);
        assert!(config.skills().is_empty());
        assert_eq!(config.time_percentage(), TimePercentage::Standard);
        assert!(!config.allow_repeated_questions());
    }

    #[test]
    fn config_time_limits_scale() {
        let config = DrillConfig::default();
        assert_eq!(config.time_limit_seconds(), Some(450));

        let fast = config.clone().with_time_percentage(TimePercentage::Seventy);
        assert_eq!(fast.time_limit_seconds(), Some(315));

        let slow = config
            .clone()
            .with_time_percentage(TimePercentage::HundredThirty);
        assert_eq!(slow.time_limit_seconds(), Some(585));

        let untimed = config.with_time_percentage(TimePercentage::Untimed);
        assert_eq!(untimed.time_limit_seconds(), None);
    }

    #[test]
    fn zero_time_limit_means_untimed() {
        let session = DrillSession::new(
            DrillId::new("dr-1"),
            DrillOrigin::Practice,
            vec![build_question(1)],
            Some(0),
        );
        assert!(session.is_untimed());
    }

    #[test]
    fn begin_sets_started_at_exactly_once() {
        let mut session = build_session(2);
        let now = fixed_now();
        assert_eq!(session.status(), DrillStatus::Generated);

        assert!(session.begin(now));
        assert_eq!(session.status(), DrillStatus::InProgress);
        assert_eq!(session.started_at(), Some(now));

        let later = now + chrono::Duration::seconds(30);
        assert!(!session.begin(later));
        assert_eq!(session.started_at(), Some(now));
    }

    #[test]
    fn select_answer_validates_option_range() {
        let mut session = build_session(2);
        session.select_answer(4).unwrap();
        assert_eq!(session.answers().get(0), Some(4));

        let err = session.select_answer(5).unwrap_err();
        assert_eq!(
            err,
            DrillError::OptionOutOfRange {
                option: 5,
                choices: 5
            }
        );
    }

    #[test]
    fn select_answer_on_empty_drill_fails() {
        let mut session = DrillSession::new(
            DrillId::new("dr-empty"),
            DrillOrigin::Practice,
            Vec::new(),
            None,
        );
        assert_eq!(session.current_question(), None);
        assert_eq!(session.select_answer(0).unwrap_err(), DrillError::NoCurrentQuestion);
    }

    #[test]
    fn navigation_walks_and_stops_at_bounds() {
        let mut session = build_session(5);
        assert!(!session.retreat());

        for _ in 0..4 {
            assert!(session.advance());
        }
        assert_eq!(session.current_index(), 4);
        assert!(session.at_last_question());
        assert!(!session.advance());
        assert_eq!(session.current_index(), 4);
    }

    #[test]
    fn answers_follow_the_cursor() {
        let mut session = build_session(3);
        session.select_answer(0).unwrap();
        session.advance();
        session.select_answer(2).unwrap();

        assert_eq!(session.answers().get(0), Some(0));
        assert_eq!(session.answers().get(1), Some(2));
        assert_eq!(session.answers().get(2), None);
    }

    #[test]
    fn mark_submitted_is_one_way() {
        let mut session = build_session(1);
        session.begin(fixed_now());
        session.mark_submitted().unwrap();
        assert_eq!(session.status(), DrillStatus::Submitted);
        assert_eq!(session.mark_submitted().unwrap_err(), DrillError::AlreadySubmitted);
    }

    #[test]
    fn restore_clamps_cursor_and_merges_highlights() {
        let q1 = QuestionId::new("q-1");
        let mut highlights = HighlightMap::new();
        highlights.set(
            &q1,
            vec![
                HighlightRange::new(4, 6).unwrap(),
                HighlightRange::new(1, 5).unwrap(),
            ],
        );

        let session = DrillSession::from_restored(
            DrillId::new("dr-r"),
            DrillOrigin::Practice,
            vec![build_question(1), build_question(2)],
            Some(300),
            Some(fixed_now()),
            DrillStatus::InProgress,
            9,
            AnswerSheet::from_entries([(0, 1)]),
            highlights,
        );

        assert_eq!(session.current_index(), 1);
        assert_eq!(session.highlights().get(&q1), &[HighlightRange::new(1, 6).unwrap()]);
        assert_eq!(session.status(), DrillStatus::InProgress);
    }

    #[test]
    fn restore_drops_answers_that_no_longer_fit() {
        let session = DrillSession::from_restored(
            DrillId::new("dr-r2"),
            DrillOrigin::Practice,
            vec![build_question(1), build_question(2)],
            None,
            None,
            DrillStatus::InProgress,
            0,
            // Position 7 outlived a shrunken question list; option 9 names a
            // choice the five-choice question never had.
            AnswerSheet::from_entries([(0, 2), (1, 9), (7, 0)]),
            HighlightMap::new(),
        );

        assert_eq!(session.answers().get(0), Some(2));
        assert_eq!(session.answers().get(1), None);
        assert_eq!(session.answers().get(7), None);
        assert_eq!(session.answers().len(), 1);
    }

    #[test]
    fn elapsed_seconds_measures_from_start() {
        let mut session = build_session(1);
        let now = fixed_now();
        assert_eq!(session.elapsed_seconds(now), 0);

        session.begin(now);
        let later = now + chrono::Duration::seconds(125);
        assert_eq!(session.elapsed_seconds(later), 125);

        // A clock that went backwards never yields negative elapsed time.
        let earlier = now - chrono::Duration::seconds(10);
        assert_eq!(session.elapsed_seconds(earlier), 0);
    }
}
