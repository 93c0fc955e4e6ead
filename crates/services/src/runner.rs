use std::sync::Arc;

use tracing::{info, warn};

use backend::wire::{AnswerRecord, DrillRequest, ProgressPayload};
use backend::{ProgressStore, QuestionSupply, SubmissionSink, TaskNotifier};
use drill_core::Clock;
use drill_core::expiry::ExpiryController;
use drill_core::highlight::{HighlightMap, HighlightRange};
use drill_core::model::{
    DrillConfig, DrillId, DrillOrigin, DrillSession, DrillStatus, Question, QuestionId,
};
use drill_core::scorer::{self, DrillOutcome};

use crate::error::SessionError;
use crate::store::SessionStore;

//
// ─── RESULT PLUMBING ───────────────────────────────────────────────────────────
//

/// What asked for the submission. At most one of the two ever reaches the
/// scoring path per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    Expiry,
}

/// Which downstream surface a finished drill's result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultDestination {
    PracticeReview,
    DiagnosticReveal,
}

/// Everything the result surfaces need from a finished drill.
#[derive(Debug, Clone)]
pub struct DrillReport {
    pub drill_id: DrillId,
    pub origin: DrillOrigin,
    pub outcome: DrillOutcome,
    pub highlights: HighlightMap,
    pub time_taken_seconds: Option<u32>,
}

/// Downstream consumer of finished drills, keyed by origin.
pub trait ResultConsumer: Send + Sync {
    fn deliver(&self, destination: ResultDestination, report: &DrillReport);
}

/// Consumer that drops every report; useful when no surface is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardResults;

impl ResultConsumer for DiscardResults {
    fn deliver(&self, _destination: ResultDestination, _report: &DrillReport) {}
}

//
// ─── RUNNER ────────────────────────────────────────────────────────────────────
//

/// Controlling logic of the drill screen.
///
/// Wires the countdown's expiry event and the learner's manual submit into a
/// single scoring/submission path, guarded by a one-shot latch so the two can
/// never both fire. Owns the [`SessionStore`] and talks to the remote
/// collaborators; their failures on the fire-and-forget paths are logged and
/// never reach the caller.
pub struct DrillRunner {
    clock: Clock,
    store: SessionStore,
    expiry: ExpiryController,
    submitted: bool,
    task_ref: Option<String>,
    supply: Arc<dyn QuestionSupply>,
    progress: Arc<dyn ProgressStore>,
    submissions: Arc<dyn SubmissionSink>,
    tasks: Arc<dyn TaskNotifier>,
    results: Arc<dyn ResultConsumer>,
}

impl DrillRunner {
    #[must_use]
    pub fn new(
        clock: Clock,
        supply: Arc<dyn QuestionSupply>,
        progress: Arc<dyn ProgressStore>,
        submissions: Arc<dyn SubmissionSink>,
        tasks: Arc<dyn TaskNotifier>,
        results: Arc<dyn ResultConsumer>,
    ) -> Self {
        Self {
            clock,
            store: SessionStore::new(),
            expiry: ExpiryController::new(),
            submitted: false,
            task_ref: None,
            supply,
            progress,
            submissions,
            tasks,
            results,
        }
    }

    /// Associates the session with an external study task; after a
    /// successful submission the task is marked complete.
    pub fn link_task(&mut self, task_id: impl Into<String>) {
        self.task_ref = Some(task_id.into());
    }

    // Accessors
    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn session(&self) -> Option<&DrillSession> {
        self.store.session()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.store.session().and_then(DrillSession::current_question)
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> Option<u32> {
        self.expiry.remaining_seconds()
    }

    #[must_use]
    pub fn has_submitted(&self) -> bool {
        self.submitted
    }

    pub fn set_config(&mut self, config: DrillConfig) {
        self.store.set_config(config);
    }

    //
    // ── Session lifecycle ──
    //

    /// Installs a session, resetting the countdown and the submission latch.
    ///
    /// A session restored in the submitted state arrives with the latch
    /// already closed, so nothing can score or submit it again.
    pub fn install(&mut self, session: DrillSession) {
        self.expiry.reset();
        self.submitted = session.status() == DrillStatus::Submitted;
        self.task_ref = None;
        self.store.install(session);
    }

    /// Requests a new drill shaped by the current configuration and installs
    /// it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Backend` when the drill cannot be created or
    /// decoded; the previous session, if any, is left in place.
    pub async fn create_drill(
        &mut self,
        user_id: &str,
        origin: DrillOrigin,
    ) -> Result<(), SessionError> {
        let request = DrillRequest::from_config(user_id, self.store.config(), origin);
        let payload = self.supply.create_drill(&request).await?;
        let session = payload.into_session()?;
        info!(drill_id = %session.id(), ?origin, "drill created");
        self.install(session);
        Ok(())
    }

    /// Fetches an interrupted drill with its saved progress and installs it.
    ///
    /// Malformed persisted entries are dropped individually during decode;
    /// restoration succeeds with the valid subset.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Backend` when the drill is missing or its
    /// question payload fails to decode.
    pub async fn resume_drill(&mut self, drill_id: &DrillId) -> Result<(), SessionError> {
        let payload = self.supply.fetch_drill(drill_id).await?;
        let session = payload.into_session()?;
        info!(drill_id = %session.id(), "drill resumed");
        self.install(session);
        Ok(())
    }

    /// Lazy start: first render of a question moves the session to
    /// `in_progress`, stamps `started_at` once, and starts the countdown
    /// from the time already elapsed (so a reload resumes correctly).
    ///
    /// A session restored past its deadline expires right here, producing
    /// the one auto-submission; the report is returned when that happens.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub async fn begin(&mut self) -> Result<Option<DrillReport>, SessionError> {
        if self.submitted {
            return Ok(None);
        }
        let now = self.clock.now();
        let (began, drill_id, limit, elapsed) = self.store.update(|session| {
            let began = session.begin(now);
            (
                began,
                session.id().clone(),
                session.time_limit_seconds(),
                session.elapsed_seconds(now),
            )
        })?;

        if began {
            // Best-effort; the local session is authoritative either way.
            if let Err(error) = self.supply.mark_started(&drill_id).await {
                warn!(drill_id = %drill_id, error = %error, "failed to mark drill started");
            }
        }

        if self.expiry.start(limit, elapsed).is_some() {
            return self.submit(SubmitTrigger::Expiry).await;
        }
        Ok(None)
    }

    /// Consumes one second of the countdown.
    ///
    /// On the tick that reaches zero, runs the expiry-triggered submission;
    /// every other tick returns `None`. A tick arriving after a manual
    /// submission hits the latch and has no effect.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when the expiry fires against an
    /// already-cleared store.
    pub async fn tick(&mut self) -> Result<Option<DrillReport>, SessionError> {
        if self.expiry.tick().is_some() {
            return self.submit(SubmitTrigger::Expiry).await;
        }
        Ok(None)
    }

    /// The single scoring/submission path.
    ///
    /// The first caller — manual submit or timer expiry — wins the latch,
    /// scores the drill locally, marks it submitted, and pushes the answers
    /// to the submission sink. A failed push is logged and the local result
    /// stands: the learner sees a score regardless of remote acknowledgment.
    /// Every later caller gets `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub async fn submit(
        &mut self,
        trigger: SubmitTrigger,
    ) -> Result<Option<DrillReport>, SessionError> {
        if self.submitted {
            return Ok(None);
        }
        let now = self.clock.now();

        let session = self.store.session().ok_or(SessionError::NoSession)?;
        let outcome = scorer::score(session.questions(), session.answers());
        let records: Vec<AnswerRecord> = outcome
            .reviews
            .iter()
            .map(AnswerRecord::from_review)
            .collect();
        let drill_id = session.id().clone();
        let origin = session.origin();
        let highlights = session.highlights().clone();
        let time_taken = session.started_at().map(|_| session.elapsed_seconds(now));

        self.submitted = true;
        self.store.update(|session| session.mark_submitted())??;
        info!(drill_id = %drill_id, ?trigger, score = outcome.score_percentage, "drill submitted");

        if let Err(error) = self
            .submissions
            .submit(&drill_id, &records, time_taken)
            .await
        {
            warn!(drill_id = %drill_id, error = %error, "answer submission failed; local score stands");
        }

        if let Some(task_id) = self.task_ref.clone() {
            if let Err(error) = self.tasks.complete_task(&task_id, &drill_id).await {
                warn!(task_id = %task_id, error = %error, "task completion notification failed");
            }
        }

        let destination = match origin {
            DrillOrigin::Practice => ResultDestination::PracticeReview,
            DrillOrigin::Diagnostic => ResultDestination::DiagnosticReveal,
        };
        let report = DrillReport {
            drill_id,
            origin,
            outcome,
            highlights,
            time_taken_seconds: time_taken,
        };
        self.results.deliver(destination, &report);
        Ok(Some(report))
    }

    /// Leaves the drill screen.
    ///
    /// For a practice session still underway, saves progress best-effort so
    /// the attempt can resume later; diagnostic and already-submitted
    /// sessions skip the save (the latter keeps exit from racing a
    /// submission write). The session is then torn down.
    pub async fn exit(&mut self) {
        if let Some(session) = self.store.session() {
            let skip = session.origin().is_diagnostic()
                || session.status() == DrillStatus::Submitted;
            if !skip {
                let payload = ProgressPayload::from_session(session);
                let drill_id = session.id().clone();
                if let Err(error) = self.progress.save_progress(&drill_id, &payload).await {
                    warn!(drill_id = %drill_id, error = %error, "progress save failed");
                }
            }
        }
        self.teardown();
    }

    /// Drops the session and returns the countdown and latch to idle.
    /// Configuration is untouched.
    pub fn teardown(&mut self) {
        self.expiry.reset();
        self.submitted = false;
        self.task_ref = None;
        self.store.reset_session();
    }

    //
    // ── Pass-through interaction, all via the store's single update path ──
    //

    /// # Errors
    ///
    /// Returns `SessionError::NoSession` or the drill-level validation error.
    pub fn select_answer(&mut self, option_index: usize) -> Result<(), SessionError> {
        self.store.select_answer(option_index)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub fn advance(&mut self) -> Result<bool, SessionError> {
        self.store.advance()
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub fn retreat(&mut self) -> Result<bool, SessionError> {
        self.store.retreat()
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub fn add_highlight(
        &mut self,
        question_id: &QuestionId,
        range: HighlightRange,
    ) -> Result<(), SessionError> {
        self.store.add_highlight(question_id, range)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub fn remove_highlight(
        &mut self,
        question_id: &QuestionId,
        range: HighlightRange,
    ) -> Result<(), SessionError> {
        self.store.remove_highlight(question_id, range)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub fn clear_highlights(&mut self, question_id: &QuestionId) -> Result<(), SessionError> {
        self.store.clear_highlights(question_id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
