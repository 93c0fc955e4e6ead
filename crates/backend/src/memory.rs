use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use drill_core::model::{DrillId, SECONDS_PER_QUESTION};

use crate::api::{BackendError, ProgressStore, QuestionSupply, SubmissionSink, TaskNotifier};
use crate::wire::{
    AnswerRecord, DrillPayload, DrillRequest, ProgressPayload, QuestionPayload, SubmissionReceipt,
};

/// A submission as the in-memory sink captured it.
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub drill_id: String,
    pub answers: Vec<AnswerRecord>,
    pub time_taken_seconds: Option<u32>,
}

#[derive(Default)]
struct Inner {
    question_bank: Vec<QuestionPayload>,
    drills: HashMap<String, DrillPayload>,
    progress: HashMap<String, ProgressPayload>,
    submissions: Vec<SubmissionRecord>,
    started: Vec<String>,
    completed_tasks: Vec<(String, String)>,
    fail_submissions: bool,
    fail_progress: bool,
}

/// In-memory implementation of every remote contract, for tests and
/// prototyping. Seed it with a question bank or whole drill payloads, then
/// inspect what the engine sent it.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds questions the supply may hand out to new drills.
    pub fn seed_questions(&self, questions: Vec<QuestionPayload>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.question_bank.extend(questions);
        }
    }

    /// Registers a drill so `fetch_drill` can return it.
    pub fn insert_drill(&self, payload: DrillPayload) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.drills.insert(payload.drill_id.clone(), payload);
        }
    }

    /// Makes every subsequent submission fail, to exercise the non-fatal
    /// error paths.
    pub fn fail_submissions(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_submissions = fail;
        }
    }

    /// Makes every subsequent progress save fail.
    pub fn fail_progress(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_progress = fail;
        }
    }

    // Test inspection
    #[must_use]
    pub fn submissions(&self) -> Vec<SubmissionRecord> {
        self.inner
            .lock()
            .map(|inner| inner.submissions.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.submissions.len())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn saved_progress(&self, drill_id: &DrillId) -> Option<ProgressPayload> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.progress.get(drill_id.as_str()).cloned())
    }

    #[must_use]
    pub fn was_started(&self, drill_id: &DrillId) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.started.iter().any(|id| id == drill_id.as_str()))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn completed_tasks(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .map(|inner| inner.completed_tasks.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, BackendError> {
        self.inner
            .lock()
            .map_err(|e| BackendError::Connection(e.to_string()))
    }
}

fn time_limit_for(request: &DrillRequest) -> Option<u32> {
    let multiplier = match &request.time_percentage {
        Value::Number(n) => match n.as_u64() {
            Some(70) => 0.7,
            Some(130) => 1.3,
            _ => 1.0,
        },
        _ => return None,
    };
    let base = f64::from(request.question_count * SECONDS_PER_QUESTION);
    Some((base * multiplier).round() as u32)
}

#[async_trait]
impl QuestionSupply for InMemoryBackend {
    async fn create_drill(&self, request: &DrillRequest) -> Result<DrillPayload, BackendError> {
        let mut inner = self.lock()?;
        if inner.question_bank.is_empty() {
            return Err(BackendError::NotFound);
        }

        let count = request.question_count as usize;
        let questions: Vec<QuestionPayload> = inner
            .question_bank
            .iter()
            .cycle()
            .take(count)
            .cloned()
            .collect();

        let payload = DrillPayload {
            drill_id: Uuid::new_v4().to_string(),
            questions,
            time_limit_seconds: time_limit_for(request),
            current_question_index: Some(0),
            user_answers: None,
            user_highlights: None,
            started_at: None,
            status: Some("generated".to_owned()),
            drill_type: Some(request.drill_type.clone()),
        };
        inner.drills.insert(payload.drill_id.clone(), payload.clone());
        Ok(payload)
    }

    async fn fetch_drill(&self, drill_id: &DrillId) -> Result<DrillPayload, BackendError> {
        let inner = self.lock()?;
        inner
            .drills
            .get(drill_id.as_str())
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn mark_started(&self, drill_id: &DrillId) -> Result<(), BackendError> {
        let mut inner = self.lock()?;
        if !inner.drills.contains_key(drill_id.as_str()) {
            return Err(BackendError::NotFound);
        }
        inner.started.push(drill_id.as_str().to_owned());
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for InMemoryBackend {
    async fn save_progress(
        &self,
        drill_id: &DrillId,
        progress: &ProgressPayload,
    ) -> Result<(), BackendError> {
        let mut inner = self.lock()?;
        if inner.fail_progress {
            return Err(BackendError::Status(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
        inner
            .progress
            .insert(drill_id.as_str().to_owned(), progress.clone());
        Ok(())
    }
}

#[async_trait]
impl SubmissionSink for InMemoryBackend {
    async fn submit(
        &self,
        drill_id: &DrillId,
        answers: &[AnswerRecord],
        time_taken_seconds: Option<u32>,
    ) -> Result<SubmissionReceipt, BackendError> {
        let mut inner = self.lock()?;
        if inner.fail_submissions {
            return Err(BackendError::Status(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }

        let correct = answers.iter().filter(|a| a.is_correct).count() as u32;
        let total = answers.len() as u32;
        inner.submissions.push(SubmissionRecord {
            drill_id: drill_id.as_str().to_owned(),
            answers: answers.to_vec(),
            time_taken_seconds,
        });

        Ok(SubmissionReceipt {
            drill_id: drill_id.as_str().to_owned(),
            total_questions: total,
            correct_answers: correct,
            score: if total == 0 {
                0.0
            } else {
                f64::from(correct) / f64::from(total) * 100.0
            },
        })
    }
}

#[async_trait]
impl TaskNotifier for InMemoryBackend {
    async fn complete_task(&self, task_id: &str, drill_id: &DrillId) -> Result<(), BackendError> {
        let mut inner = self.lock()?;
        inner
            .completed_tasks
            .push((task_id.to_owned(), drill_id.as_str().to_owned()));
        Ok(())
    }
}
