use chrono::{DateTime, Utc};

use drill_core::highlight::HighlightRange;
use drill_core::model::{DrillConfig, DrillSession, QuestionId};

use crate::error::SessionError;

/// Owns the live drill session and its request configuration.
///
/// The session is exclusively held here for the lifetime of one attempt: no
/// other component keeps a mutable reference, and every mutation funnels
/// through [`SessionStore::update`], which re-normalizes the highlight map
/// afterwards. That single path is what keeps the map invariant (merged,
/// minimal, no empty entries) without any further synchronization.
#[derive(Debug, Default)]
pub struct SessionStore {
    session: Option<DrillSession>,
    config: DrillConfig,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn session(&self) -> Option<&DrillSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn config(&self) -> &DrillConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: DrillConfig) {
        self.config = config;
    }

    /// Replaces the session with a literal new one.
    ///
    /// The incoming highlight map is normalized before storing, so a session
    /// assembled from persisted or hand-built state enters in a valid shape.
    pub fn install(&mut self, mut session: DrillSession) {
        session.normalize_highlights();
        self.session = Some(session);
    }

    /// The single mutation entry point.
    ///
    /// Runs `f` against the session, then re-normalizes the highlight map so
    /// no mutation can leave unmerged or empty highlight entries behind.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub fn update<T>(
        &mut self,
        f: impl FnOnce(&mut DrillSession) -> T,
    ) -> Result<T, SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoSession)?;
        let out = f(session);
        session.normalize_highlights();
        Ok(out)
    }

    /// Drops the session, answers, and position; configuration is untouched.
    pub fn reset_session(&mut self) {
        self.session = None;
    }

    /// Returns the configuration to its defaults and drops the session.
    pub fn reset_all(&mut self) {
        self.config = DrillConfig::default();
        self.reset_session();
    }

    //
    // ── Convenience mutators, all routed through `update` ──
    //

    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub fn begin(&mut self, now: DateTime<Utc>) -> Result<bool, SessionError> {
        self.update(|session| session.begin(now))
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded, or the
    /// drill-level error for an out-of-range option.
    pub fn select_answer(&mut self, option_index: usize) -> Result<(), SessionError> {
        self.update(|session| session.select_answer(option_index))?
            .map_err(SessionError::from)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub fn advance(&mut self) -> Result<bool, SessionError> {
        self.update(DrillSession::advance)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub fn retreat(&mut self) -> Result<bool, SessionError> {
        self.update(DrillSession::retreat)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub fn add_highlight(
        &mut self,
        question_id: &QuestionId,
        range: HighlightRange,
    ) -> Result<(), SessionError> {
        self.update(|session| session.add_highlight(question_id, range))
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub fn remove_highlight(
        &mut self,
        question_id: &QuestionId,
        range: HighlightRange,
    ) -> Result<(), SessionError> {
        self.update(|session| session.remove_highlight(question_id, range))
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub fn clear_highlights(&mut self, question_id: &QuestionId) -> Result<(), SessionError> {
        self.update(|session| session.clear_highlights(question_id))
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no drill is loaded.
    pub fn clear_all_highlights(&mut self) -> Result<(), SessionError> {
        self.update(DrillSession::clear_all_highlights)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::{DrillId, DrillOrigin, Question, TimePercentage};
    use drill_core::time::fixed_now;

    fn build_question(id: u32) -> Question {
        Question::new(
            QuestionId::new(format!("q-{id}")),
            format!("Question {id}"),
            None,
            vec!["a".into(), "b".into(), "c".into()],
            "A",
            "Logical Reasoning",
            "Medium",
        )
        .unwrap()
    }

    fn build_session() -> DrillSession {
        DrillSession::new(
            DrillId::new("dr-1"),
            DrillOrigin::Practice,
            vec![build_question(1), build_question(2)],
            Some(180),
        )
    }

    #[test]
    fn update_without_session_is_a_routing_decision() {
        let mut store = SessionStore::new();
        let err = store.advance().unwrap_err();
        assert!(matches!(err, SessionError::NoSession));
    }

    #[test]
    fn update_renormalizes_highlights() {
        let mut store = SessionStore::new();
        store.install(build_session());
        let q = QuestionId::new("q-1");

        // Two overlapping adds end up as one merged range.
        store
            .add_highlight(&q, HighlightRange::new(2, 4).unwrap())
            .unwrap();
        store
            .add_highlight(&q, HighlightRange::new(3, 6).unwrap())
            .unwrap();

        let session = store.session().unwrap();
        assert_eq!(
            session.highlights().get(&q),
            &[HighlightRange::new(2, 6).unwrap()]
        );
    }

    #[test]
    fn removing_last_highlight_leaves_no_empty_entry() {
        let mut store = SessionStore::new();
        store.install(build_session());
        let q = QuestionId::new("q-1");
        let range = HighlightRange::new(1, 5).unwrap();

        store.add_highlight(&q, range).unwrap();
        store.remove_highlight(&q, range).unwrap();

        let session = store.session().unwrap();
        assert!(session.highlights().get(&q).is_empty());
        assert!(!session.highlights().contains(&q));
        assert!(session.highlights().is_empty());
    }

    #[test]
    fn install_normalizes_foreign_highlight_state() {
        let mut session = build_session();
        let q = QuestionId::new("q-1");
        // Raw, unmerged ranges straight into the session.
        session.set_highlights(
            &q,
            vec![
                HighlightRange::new(5, 8).unwrap(),
                HighlightRange::new(1, 6).unwrap(),
            ],
        );

        let mut store = SessionStore::new();
        store.install(session);
        assert_eq!(
            store.session().unwrap().highlights().get(&q),
            &[HighlightRange::new(1, 8).unwrap()]
        );
    }

    #[test]
    fn reset_session_keeps_config() {
        let mut store = SessionStore::new();
        store.set_config(DrillConfig::default().with_question_count(10));
        store.install(build_session());

        store.reset_session();
        assert!(!store.has_session());
        assert_eq!(store.config().question_count(), 10);
    }

    #[test]
    fn reset_all_restores_default_config() {
        let mut store = SessionStore::new();
        store.set_config(
            DrillConfig::default()
                .with_question_count(10)
                .with_time_percentage(TimePercentage::Untimed),
        );
        store.install(build_session());

        store.reset_all();
        assert!(!store.has_session());
        assert_eq!(store.config(), &DrillConfig::default());
    }

    #[test]
    fn begin_and_select_route_through_update() {
        let mut store = SessionStore::new();
        store.install(build_session());

        assert!(store.begin(fixed_now()).unwrap());
        store.select_answer(2).unwrap();
        assert_eq!(store.session().unwrap().answers().get(0), Some(2));

        let err = store.select_answer(3).unwrap_err();
        assert!(matches!(err, SessionError::Drill(_)));
    }
}
