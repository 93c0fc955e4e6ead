use std::env;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;

use drill_core::model::DrillId;

use crate::api::{BackendError, ProgressStore, QuestionSupply, SubmissionSink, TaskNotifier};
use crate::wire::{AnswerRecord, DrillPayload, DrillRequest, ProgressPayload, SubmissionReceipt};

const DEFAULT_BASE_URL: &str = "http://localhost:5001";

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
}

impl BackendConfig {
    /// Reads `DRILL_API_BASE_URL`, falling back to the local default.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            env::var("DRILL_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        Self { base_url }
    }

    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

//
// ─── HTTP BACKEND ──────────────────────────────────────────────────────────────
//

/// The remote service over HTTP; one shared client, all four contracts.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::new(BackendConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn check_status(response: Response) -> Result<Response, BackendError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(BackendError::NotFound),
        status => Err(BackendError::Status(status)),
    }
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    drill_id: &'a str,
    answers: &'a [AnswerRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    time_taken: Option<u32>,
}

#[derive(Serialize)]
struct CompleteTaskBody<'a> {
    drill_id: &'a str,
}

#[async_trait]
impl QuestionSupply for HttpBackend {
    async fn create_drill(&self, request: &DrillRequest) -> Result<DrillPayload, BackendError> {
        let response = self
            .client
            .post(self.url("/api/skill-builder/drill"))
            .json(request)
            .send()
            .await?;
        Ok(check_status(response)?.json().await?)
    }

    async fn fetch_drill(&self, drill_id: &DrillId) -> Result<DrillPayload, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/api/skill-builder/drills/{drill_id}")))
            .query(&[("include_questions", "true")])
            .send()
            .await?;
        Ok(check_status(response)?.json().await?)
    }

    async fn mark_started(&self, drill_id: &DrillId) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url(&format!("/api/skill-builder/drill/{drill_id}/start")))
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for HttpBackend {
    async fn save_progress(
        &self,
        drill_id: &DrillId,
        progress: &ProgressPayload,
    ) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url(&format!("/api/skill-builder/drills/{drill_id}/progress")))
            .json(progress)
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }
}

#[async_trait]
impl SubmissionSink for HttpBackend {
    async fn submit(
        &self,
        drill_id: &DrillId,
        answers: &[AnswerRecord],
        time_taken_seconds: Option<u32>,
    ) -> Result<SubmissionReceipt, BackendError> {
        let body = SubmitBody {
            drill_id: drill_id.as_str(),
            answers,
            time_taken: time_taken_seconds,
        };
        let response = self
            .client
            .post(self.url("/api/skill-builder/drill/submit"))
            .json(&body)
            .send()
            .await?;
        Ok(check_status(response)?.json().await?)
    }
}

#[async_trait]
impl TaskNotifier for HttpBackend {
    async fn complete_task(&self, task_id: &str, drill_id: &DrillId) -> Result<(), BackendError> {
        let body = CompleteTaskBody {
            drill_id: drill_id.as_str(),
        };
        let response = self
            .client
            .post(self.url(&format!(
                "/api/personalization/study-plan/task/{task_id}/complete"
            )))
            .json(&body)
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }
}
