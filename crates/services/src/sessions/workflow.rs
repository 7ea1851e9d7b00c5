use std::sync::{Arc, Mutex, PoisonError};

use donish_core::gate::{self, ContentConsumption, Role};
use donish_core::grading::GradeReport;
use donish_core::model::{
    AnswerEdit, AttemptId, AttemptRecord, LessonId, Question, QuestionId, RewardOutcome,
    SessionState, TestSettings,
};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use storage::repository::{
    AttemptRepository, QuestionBankRepository, RewardLedgerRepository, SessionStateRepository,
    Storage,
};
use tracing::{debug, info, warn};

use super::plan::SessionBuilder;
use super::progress::SessionProgress;
use super::service::{AnswerOutcome, TestSession};
use crate::Clock;
use crate::error::SessionError;
use crate::focus::{FocusMonitor, FocusProbe, FocusSubscription};

/// Who is entering the test and what lesson content they have consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GateInput {
    pub role: Role,
    pub consumption: ContentConsumption,
}

impl GateInput {
    #[must_use]
    pub fn new(role: Role, consumption: ContentConsumption) -> Self {
        Self { role, consumption }
    }
}

/// Stored result of a graded submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedAttempt {
    pub attempt_id: AttemptId,
    pub report: GradeReport,
    /// `None` for failed attempts.
    pub reward: Option<RewardOutcome>,
}

/// Result of a submission request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing was graded or recorded.
    Incomplete { unanswered: usize },
    Graded(GradedAttempt),
}

/// A session being taken, plus its optional focus monitor.
#[derive(Debug)]
pub struct ActiveSession {
    session: TestSession,
    graded: Option<GradedAttempt>,
    focus: Option<FocusSubscription>,
}

impl ActiveSession {
    fn new(state: SessionState) -> Self {
        Self {
            session: TestSession::new(state),
            graded: None,
            focus: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> &TestSession {
        &self.session
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.session.lesson_id()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.session.current_question()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        self.session.progress()
    }

    #[must_use]
    pub fn is_graded(&self) -> bool {
        self.graded.is_some()
    }

    #[must_use]
    pub fn graded(&self) -> Option<&GradedAttempt> {
        self.graded.as_ref()
    }

    /// True while the focus monitor reports the surface as unfocused or hidden.
    #[must_use]
    pub fn obscured(&self) -> bool {
        self.focus
            .as_ref()
            .is_some_and(FocusSubscription::is_obscured)
    }

    #[must_use]
    pub fn focus(&self) -> Option<&FocusSubscription> {
        self.focus.as_ref()
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_graded() {
            Err(SessionError::Finished)
        } else {
            Ok(())
        }
    }

    fn stop_focus(&mut self) {
        if let Some(focus) = self.focus.take() {
            focus.cancel();
        }
    }
}

/// Orchestrates test sessions against the persistence adapter.
///
/// Saves are fire-and-forget: a failed write is logged and the in-memory
/// session keeps the edit.
#[derive(Clone)]
pub struct TestSessionService {
    clock: Clock,
    settings: TestSettings,
    questions: Arc<dyn QuestionBankRepository>,
    sessions: Arc<dyn SessionStateRepository>,
    attempts: Arc<dyn AttemptRepository>,
    rewards: Arc<dyn RewardLedgerRepository>,
    rng: Arc<Mutex<StdRng>>,
}

impl TestSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: TestSettings,
        questions: Arc<dyn QuestionBankRepository>,
        sessions: Arc<dyn SessionStateRepository>,
        attempts: Arc<dyn AttemptRepository>,
        rewards: Arc<dyn RewardLedgerRepository>,
    ) -> Self {
        Self {
            clock,
            settings,
            questions,
            sessions,
            attempts,
            rewards,
            rng: Arc::new(Mutex::new(StdRng::from_rng(&mut rand::rng()))),
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, settings: TestSettings, storage: &Storage) -> Self {
        Self::new(
            clock,
            settings,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.rewards),
        )
    }

    /// Use a deterministic draw sequence.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    #[must_use]
    pub fn settings(&self) -> &TestSettings {
        &self.settings
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut dyn RngCore) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *rng)
    }

    fn check_gate(access: &GateInput) -> Result<(), SessionError> {
        let decision = gate::evaluate(access.role, &access.consumption);
        if decision.allowed {
            Ok(())
        } else {
            Err(SessionError::GateClosed {
                pending: decision.pending,
            })
        }
    }

    async fn persist(&self, session: &TestSession) {
        if let Err(err) = self.sessions.save(session.state()).await {
            warn!(lesson_id = %session.lesson_id(), error = %err, "failed to save session state");
        }
    }

    async fn load_persisted(&self, lesson_id: LessonId) -> Option<SessionState> {
        match self.sessions.load(lesson_id).await {
            Ok(Some(state)) => match state.check_well_formed(lesson_id) {
                Ok(()) => Some(state),
                Err(err) => {
                    warn!(%lesson_id, error = %err, "discarding malformed session state");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(%lesson_id, error = %err, "failed to load session state");
                None
            }
        }
    }

    async fn open(&self, state: SessionState) -> Result<ActiveSession, SessionError> {
        if state.questions.is_empty() {
            return Err(SessionError::EmptyBank(state.lesson_id));
        }
        let active = ActiveSession::new(state);
        self.persist(&active.session).await;
        Ok(active)
    }

    /// Enter the test for a lesson, resuming saved progress when present.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::GateClosed` when a student has not consumed the
    /// lesson content, `SessionError::EmptyBank` when nothing can be drawn, and
    /// `SessionError::Storage` if the bank cannot be read.
    pub async fn start(
        &self,
        lesson_id: LessonId,
        access: &GateInput,
    ) -> Result<ActiveSession, SessionError> {
        Self::check_gate(access)?;
        let bank = self.questions.questions_for_lesson(lesson_id).await?;
        let builder = SessionBuilder::from_settings(&self.settings);

        let state = match self.load_persisted(lesson_id).await {
            Some(persisted) => {
                let state = self.with_rng(|rng| builder.resume(&bank, persisted, rng));
                info!(
                    %lesson_id,
                    session_id = %state.session_id,
                    kept = state.locked.len(),
                    total = state.questions.len(),
                    "resumed test session"
                );
                state
            }
            None => self.draw_fresh(lesson_id, &bank, builder),
        };

        self.open(state).await
    }

    /// Discard any saved progress and draw a brand-new session.
    ///
    /// # Errors
    ///
    /// Same as `start`.
    pub async fn restart(
        &self,
        lesson_id: LessonId,
        access: &GateInput,
    ) -> Result<ActiveSession, SessionError> {
        Self::check_gate(access)?;
        if let Err(err) = self.sessions.clear(lesson_id).await {
            warn!(%lesson_id, error = %err, "failed to clear session state before restart");
        }
        let bank = self.questions.questions_for_lesson(lesson_id).await?;
        let builder = SessionBuilder::from_settings(&self.settings);
        let state = self.draw_fresh(lesson_id, &bank, builder);
        self.open(state).await
    }

    fn draw_fresh(
        &self,
        lesson_id: LessonId,
        bank: &[Question],
        builder: SessionBuilder,
    ) -> SessionState {
        let questions = self.with_rng(|rng| builder.fresh(bank, rng));
        let state = SessionState::new(lesson_id, questions, self.clock.now());
        info!(
            %lesson_id,
            session_id = %state.session_id,
            bank = bank.len(),
            drawn = state.questions.len(),
            "started test session"
        );
        state
    }

    /// Record an answer edit; locked questions are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` after grading and `SessionError::Answer`
    /// when the edit does not fit the question.
    pub async fn answer(
        &self,
        active: &mut ActiveSession,
        question_id: QuestionId,
        edit: AnswerEdit,
    ) -> Result<AnswerOutcome, SessionError> {
        active.ensure_open()?;
        let outcome = active.session.answer(question_id, edit)?;
        match outcome {
            AnswerOutcome::Recorded => self.persist(&active.session).await,
            AnswerOutcome::Ignored => {
                debug!(%question_id, "ignored edit on locked question");
            }
        }
        Ok(outcome)
    }

    /// Advance, locking the question being left if it has an answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` after grading.
    pub async fn next(&self, active: &mut ActiveSession) -> Result<bool, SessionError> {
        active.ensure_open()?;
        let before = active.session.current_index();
        let locked = active.session.next();
        if locked {
            debug!(index = before, "locked question on forward navigation");
        }
        if locked || active.session.current_index() != before {
            self.persist(&active.session).await;
        }
        Ok(locked)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Finished` after grading.
    pub async fn previous(&self, active: &mut ActiveSession) -> Result<(), SessionError> {
        active.ensure_open()?;
        let before = active.session.current_index();
        active.session.previous();
        if active.session.current_index() != before {
            self.persist(&active.session).await;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Finished` after grading and
    /// `SessionError::Navigation` for an index outside the session.
    pub async fn jump_to(
        &self,
        active: &mut ActiveSession,
        index: usize,
    ) -> Result<(), SessionError> {
        active.ensure_open()?;
        let before = active.session.current_index();
        active.session.jump_to(index)?;
        if index != before {
            self.persist(&active.session).await;
        }
        Ok(())
    }

    /// Lock the displayed question, then grade if every question is answered.
    ///
    /// An incomplete session is reported, not graded. A graded session gets its
    /// attempt appended, a reward when it passed, and its saved state cleared.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` when already graded and
    /// `SessionError::Storage` if the attempt or reward cannot be written.
    pub async fn submit(&self, active: &mut ActiveSession) -> Result<SubmitOutcome, SessionError> {
        active.ensure_open()?;
        let lesson_id = active.lesson_id();

        if active.session.lock_current() {
            debug!(index = active.session.current_index(), "locked question on submit");
            self.persist(&active.session).await;
        }

        let unanswered = active.session.unanswered();
        if unanswered > 0 {
            info!(%lesson_id, unanswered, "submission rejected");
            return Ok(SubmitOutcome::Incomplete { unanswered });
        }

        let report = active.session.grade(self.settings.pass_threshold());
        let now = self.clock.now();
        let record = AttemptRecord::new(
            lesson_id,
            active.session.session_id(),
            report.score,
            report.correct,
            report.total,
            report.passed,
            now,
        )?;
        let attempt_id = self.attempts.append_attempt(&record).await?;
        info!(
            %lesson_id,
            attempt_id,
            score = report.score,
            passed = report.passed,
            "attempt recorded"
        );

        active.graded = Some(GradedAttempt {
            attempt_id,
            report,
            reward: None,
        });
        active.stop_focus();

        if let Err(err) = self.sessions.clear(lesson_id).await {
            warn!(%lesson_id, error = %err, "failed to clear session state after grading");
        }

        self.finalize_reward(active).await?;

        let graded = active.graded.clone().ok_or(SessionError::Finished)?;
        Ok(SubmitOutcome::Graded(graded))
    }

    /// Credit the reward for a graded, passing session.
    ///
    /// Safe to call again after a failed credit: the ledger holds one entry
    /// per attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the ledger cannot be written.
    pub async fn finalize_reward(
        &self,
        active: &mut ActiveSession,
    ) -> Result<Option<RewardOutcome>, SessionError> {
        let Some(graded) = active.graded.as_mut() else {
            return Ok(None);
        };
        if !graded.report.passed {
            return Ok(None);
        }

        let outcome = self
            .rewards
            .credit(graded.attempt_id, self.settings.reward_amount(), self.clock.now())
            .await?;
        if outcome.is_new() {
            info!(
                attempt_id = graded.attempt_id,
                amount = outcome.entry().amount,
                "reward credited"
            );
        }
        graded.reward = Some(outcome.clone());
        Ok(Some(outcome))
    }

    /// Start watching focus for an open session with the configured poll interval.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` after grading.
    pub fn attach_focus(
        &self,
        active: &mut ActiveSession,
        probe: Arc<dyn FocusProbe>,
    ) -> Result<(), SessionError> {
        active.ensure_open()?;
        active.stop_focus();
        active.focus = Some(FocusMonitor::spawn(
            probe,
            self.settings.focus_poll_interval(),
        ));
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
