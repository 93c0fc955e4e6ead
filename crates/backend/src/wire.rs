//! Payloads exchanged with the remote service, and the conversions between
//! them and the domain types.
//!
//! Progress fields arrive as loosely typed JSON (the remote stores whatever
//! the last client sent), so the answer and highlight decoders are total:
//! entries that fail coercion are dropped individually instead of failing
//! the whole restore.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use drill_core::answers::AnswerSheet;
use drill_core::highlight::{HighlightMap, HighlightRange, merge_ranges};
use drill_core::model::{
    DrillConfig, DrillId, DrillOrigin, DrillSession, DrillStatus, Question, QuestionId,
    TimePercentage,
};
use drill_core::scorer::QuestionReview;

use crate::api::BackendError;

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

/// Body for requesting a new drill.
#[derive(Debug, Clone, Serialize)]
pub struct DrillRequest {
    pub user_id: String,
    pub question_count: u32,
    pub difficulties: Vec<String>,
    pub skills: Vec<String>,
    /// `70 | 100 | 130` as numbers, or the string `"untimed"`.
    pub time_percentage: Value,
    pub drill_type: String,
}

impl DrillRequest {
    #[must_use]
    pub fn from_config(user_id: impl Into<String>, config: &DrillConfig, origin: DrillOrigin) -> Self {
        let time_percentage = match config.time_percentage() {
            TimePercentage::Seventy => Value::from(70),
            TimePercentage::Standard => Value::from(100),
            TimePercentage::HundredThirty => Value::from(130),
            TimePercentage::Untimed => Value::from("untimed"),
        };
        Self {
            user_id: user_id.into(),
            question_count: config.question_count(),
            difficulties: config.difficulties().to_vec(),
            skills: config.skills().to_vec(),
            time_percentage,
            drill_type: origin.as_str().to_owned(),
        }
    }
}

//
// ─── DRILL PAYLOAD ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPayload {
    pub id: String,
    pub question_text: String,
    #[serde(default)]
    pub answer_choices: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub passage_text: Option<String>,
}

impl QuestionPayload {
    /// Converts into the domain `Question`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Decode` when the payload fails question
    /// validation (empty text, fewer than two choices, blank letter).
    pub fn into_question(self) -> Result<Question, BackendError> {
        Question::new(
            QuestionId::new(self.id),
            self.question_text,
            self.passage_text,
            self.answer_choices,
            self.correct_answer,
            self.question_type.unwrap_or_default(),
            self.difficulty_level.unwrap_or_default(),
        )
        .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

/// A drill as the remote service returns it, progress fields included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillPayload {
    pub drill_id: String,
    #[serde(default)]
    pub questions: Vec<QuestionPayload>,
    #[serde(default)]
    pub time_limit_seconds: Option<u32>,
    #[serde(default)]
    pub current_question_index: Option<usize>,
    #[serde(default)]
    pub user_answers: Option<Map<String, Value>>,
    #[serde(default)]
    pub user_highlights: Option<Map<String, Value>>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub drill_type: Option<String>,
}

impl DrillPayload {
    /// Assembles the domain session: strict on questions, tolerant on
    /// progress (unknown statuses fall back to generated, malformed answer
    /// and highlight entries are dropped, the index is clamped downstream).
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Decode` when a question fails validation.
    pub fn into_session(self) -> Result<DrillSession, BackendError> {
        let origin = match self.drill_type.as_deref() {
            Some("diagnostic") => DrillOrigin::Diagnostic,
            _ => DrillOrigin::Practice,
        };
        let status = match self.status.as_deref() {
            Some("in_progress") => DrillStatus::InProgress,
            Some("submitted") | Some("completed") => DrillStatus::Submitted,
            _ => DrillStatus::Generated,
        };

        let questions = self
            .questions
            .into_iter()
            .map(QuestionPayload::into_question)
            .collect::<Result<Vec<_>, _>>()?;

        let answers = self
            .user_answers
            .as_ref()
            .map(decode_answers)
            .unwrap_or_default();
        let highlights = self
            .user_highlights
            .as_ref()
            .map(decode_highlights)
            .unwrap_or_default();
        let started_at = self.started_at.as_deref().and_then(parse_timestamp);

        Ok(DrillSession::from_restored(
            DrillId::new(self.drill_id),
            origin,
            questions,
            self.time_limit_seconds,
            started_at,
            status,
            self.current_question_index.unwrap_or(0),
            answers,
            highlights,
        ))
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Body for saving partial progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub current_question_index: usize,
    /// `{position: option_index}` with string keys; the remote stores JSON.
    pub user_answers: Map<String, Value>,
    /// `{question_id: [[start, end], …]}`.
    pub user_highlights: Map<String, Value>,
}

impl ProgressPayload {
    #[must_use]
    pub fn from_session(session: &DrillSession) -> Self {
        let mut user_answers = Map::new();
        for (position, option) in session.answers().iter() {
            user_answers.insert(position.to_string(), Value::from(option));
        }

        let mut user_highlights = Map::new();
        for (question_id, ranges) in session.highlights().iter() {
            let pairs = ranges
                .iter()
                .map(|r| Value::Array(vec![Value::from(r.start()), Value::from(r.end())]))
                .collect();
            user_highlights.insert(question_id.as_str().to_owned(), Value::Array(pairs));
        }

        Self {
            current_question_index: session.current_index(),
            user_answers,
            user_highlights,
        }
    }
}

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

/// One scored answer as the submission sink expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    /// The learner's letter, absent when unanswered.
    pub user_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
}

impl AnswerRecord {
    #[must_use]
    pub fn from_review(review: &QuestionReview) -> Self {
        Self {
            question_id: review.question_id.as_str().to_owned(),
            user_answer: review.chosen_letter.map(String::from),
            correct_answer: review.correct_letter.clone(),
            is_correct: review.is_correct,
        }
    }
}

/// The remote acknowledgment of a submission.
///
/// Informational only: the locally computed outcome is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub drill_id: String,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub score: f64,
}

//
// ─── TOLERANT DECODE ───────────────────────────────────────────────────────────
//

/// Decodes persisted answers, coercing string keys and string-or-number
/// values to integers. Entries that fail coercion are dropped; the decode
/// itself never fails.
#[must_use]
pub fn decode_answers(raw: &Map<String, Value>) -> AnswerSheet {
    let mut sheet = AnswerSheet::new();
    for (key, value) in raw {
        let Ok(position) = key.trim().parse::<usize>() else {
            continue;
        };
        let Some(option) = coerce_index(value) else {
            continue;
        };
        sheet.select(position, option);
    }
    sheet
}

fn coerce_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }
}

/// Decodes persisted highlights into a merged map.
///
/// Accepts `[start, end]` pairs or `{"start": …, "end": …}` objects; pairs
/// that are malformed, reversed, or zero-width are dropped. Questions whose
/// ranges all drop are omitted entirely, preserving the minimal-map shape.
#[must_use]
pub fn decode_highlights(raw: &Map<String, Value>) -> HighlightMap {
    let mut map = HighlightMap::new();
    for (question_id, value) in raw {
        let Value::Array(pairs) = value else {
            continue;
        };
        let ranges = pairs.iter().filter_map(coerce_range).collect();
        map.set(&QuestionId::new(question_id.clone()), merge_ranges(ranges));
    }
    map
}

fn coerce_range(value: &Value) -> Option<HighlightRange> {
    let (start, end) = match value {
        Value::Array(parts) if parts.len() == 2 => {
            (coerce_offset(&parts[0])?, coerce_offset(&parts[1])?)
        }
        Value::Object(fields) => (
            coerce_offset(fields.get("start")?)?,
            coerce_offset(fields.get("end")?)?,
        ),
        _ => return None,
    };
    HighlightRange::new(start, end).ok()
}

fn coerce_offset(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Parses the service's timestamps: RFC 3339 from the API layer, or the
/// bare `YYYY-MM-DD HH:MM:SS` form its database default produces.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
