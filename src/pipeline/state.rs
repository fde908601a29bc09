//! Pipeline run model and shared application state.
//!
//! [`PipelineRun`] tracks one capture → recognize → answer execution; its
//! absence from [`SessionState`] *is* the idle state, which is also how the
//! at-most-one-run rule is enforced.
//!
//! [`SessionState`] is the single source of truth for everything the UI
//! needs: auth gate, capture session, progress flags, the current answer and
//! its history, plus a config snapshot.
//!
//! [`SharedState`] is a type alias for `Arc<Mutex<SessionState>>`: cheap to
//! clone and safe to share across threads.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::auth::AuthGate;
use crate::capture::FrameSource;
use crate::config::AppConfig;
use crate::provider::DEFAULT_MODEL;

use super::history::AnswerHistory;

// ---------------------------------------------------------------------------
// RunStage
// ---------------------------------------------------------------------------

/// Stages of a single pipeline run.
///
/// ```text
/// (no run) ──trigger──▶ CapturingFrame ──▶ Recognizing ──▶ AwaitingAnswer ──▶ Done
///                            │                  │                 │
///                            │ frame not ready  └──OCR error──────┴──▶ Failed
///                            ▼
///                        (discarded silently)
/// ```
///
/// Terminal stages are folded back into [`SessionState`] and the run record
/// is discarded; "idle" is represented by `SessionState::run` being `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    /// Grabbing a still frame from the capture source.
    CapturingFrame,
    /// OCR is running on the blocking thread pool.
    Recognizing,
    /// The answer backend call is in flight.
    AwaitingAnswer,
    /// The run finished, with or without a new answer.
    Done,
    /// Recognition or the answer call failed.
    Failed,
}

impl RunStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStage::Done | RunStage::Failed)
    }

    /// A short label for log lines and the UI status bar.
    pub fn label(&self) -> &'static str {
        match self {
            RunStage::CapturingFrame => "capturing frame",
            RunStage::Recognizing => "recognizing",
            RunStage::AwaitingAnswer => "awaiting answer",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineRun
// ---------------------------------------------------------------------------

/// Working record for one pipeline execution.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Monotonic sequence number, assigned when the run claims the slot.
    pub seq: u64,
    pub stage: RunStage,
    /// Recognized text, present once recognition has succeeded.
    pub text: Option<String>,
    /// Answer text, present only on a run that completed with one.
    pub answer: Option<String>,
}

impl PipelineRun {
    pub fn new(seq: u64) -> Self {
        Self {
            seq,
            stage: RunStage::CapturingFrame,
            text: None,
            answer: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage indicators
// ---------------------------------------------------------------------------

/// Display status of one progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    InProgress,
    Complete,
}

impl StageStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::InProgress => "in progress",
            StageStatus::Complete => "complete",
        }
    }
}

/// The three progress indicators shown while a session is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageIndicators {
    pub capture: StageStatus,
    pub recognition: StageStatus,
    pub answer: StageStatus,
}

// ---------------------------------------------------------------------------
// SchedulerConfig
// ---------------------------------------------------------------------------

/// Live auto-solve settings.
///
/// `auto_mode_enabled` is session-only and starts `false` on every launch;
/// the interval is seeded from the persisted config.  The interval can never
/// drop below one second:
///
/// ```
/// use screen_solver::pipeline::SchedulerConfig;
///
/// let mut scheduler = SchedulerConfig::default();
/// scheduler.set_interval_secs(0);
/// assert_eq!(scheduler.interval_secs(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Whether the auto-solve timer should run (given auth + session).
    pub auto_mode_enabled: bool,
    interval_secs: u64,
}

impl SchedulerConfig {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            auto_mode_enabled: false,
            interval_secs: interval_secs.max(1),
        }
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Set the timer period, lifting anything below one second up to one.
    pub fn set_interval_secs(&mut self, secs: u64) {
        self.interval_secs = secs.max(1);
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(30)
    }
}

// ---------------------------------------------------------------------------
// CaptureSession
// ---------------------------------------------------------------------------

/// An open capture session: the frame source plus a liveness flag.
///
/// The flag goes `false` if the source ends underneath us (e.g. the display
/// disappears) before the session itself is torn down; a dead session refuses
/// pipeline runs just like a missing one.
pub struct CaptureSession {
    source: Arc<dyn FrameSource>,
    active: bool,
}

impl CaptureSession {
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        Self {
            source,
            active: true,
        }
    }

    pub fn source(&self) -> &Arc<dyn FrameSource> {
        &self.source
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Mark the session's source as ended.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Shared application state — the single source of truth for the UI.
///
/// Held behind [`SharedState`] (`Arc<Mutex<SessionState>>`).  The pipeline
/// runner mutates it; the egui update loop reads it each frame.
pub struct SessionState {
    /// Sign-in gate.  Checked (with a live expiry test) before every run.
    pub auth: AuthGate,

    /// The open capture session, if any.
    pub session: Option<CaptureSession>,

    /// Auto-solve timer settings (enabled flag + period).
    pub scheduler: SchedulerConfig,

    /// Model identifier sent with answer requests.  Session-only; resets to
    /// the default on every launch.
    pub model: String,

    /// The in-flight pipeline run.  `None` means idle, and a new trigger may
    /// claim the slot.
    pub run: Option<PipelineRun>,

    /// Count of runs that ever claimed the slot (dropped triggers excluded).
    pub runs_started: u64,

    /// `true` only while OCR is actually running.
    pub processing: bool,

    /// `true` only while the answer backend call is in flight.
    pub waiting_for_answer: bool,

    /// The answer currently shown, surviving across failed runs.
    ///
    /// `None` until the first successful run (unless restored from the
    /// previous session's config).
    pub answer: Option<String>,

    /// Every answer produced this session, for prev/next browsing.
    pub history: AnswerHistory,

    /// Current application configuration.
    pub config: AppConfig,

    /// Where to persist `config`.  `None` (e.g. in tests) disables writes.
    pub settings_path: Option<PathBuf>,
}

impl SessionState {
    /// Create a new `SessionState` seeded from `config`.
    pub fn new(config: AppConfig) -> Self {
        let answer = config.ui.last_answer.clone();
        let scheduler = SchedulerConfig::new(config.capture.interval_secs);

        Self {
            auth: AuthGate::new(),
            session: None,
            scheduler,
            model: DEFAULT_MODEL.to_string(),
            run: None,
            runs_started: 0,
            processing: false,
            waiting_for_answer: false,
            answer,
            history: AnswerHistory::new(),
            config,
            settings_path: None,
        }
    }

    /// Is there a capture session whose source is still live?
    pub fn session_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_active())
    }

    /// Is a pipeline run currently occupying the slot?
    pub fn run_in_flight(&self) -> bool {
        self.run.is_some()
    }

    /// Derive the three progress indicators from the current flags.
    ///
    /// The rules are asymmetric: an idle session shows recognition as
    /// complete, and a first-ever answer wait shows recognition as pending
    /// again because no prior answer anchors it.
    pub fn indicators(&self) -> StageIndicators {
        let active = self.session_active();
        let has_answer = self.answer.is_some();

        let capture = if active {
            StageStatus::Complete
        } else {
            StageStatus::Pending
        };

        let recognition = if active && self.processing {
            StageStatus::InProgress
        } else if active && (has_answer || !self.waiting_for_answer) {
            StageStatus::Complete
        } else {
            StageStatus::Pending
        };

        let answer = if self.waiting_for_answer {
            StageStatus::InProgress
        } else if has_answer {
            StageStatus::Complete
        } else {
            StageStatus::Pending
        };

        StageIndicators {
            capture,
            recognition,
            answer,
        }
    }

    /// Snapshot the pieces needed to write settings to disk, or `None` when
    /// persistence is disabled.
    pub fn persistable(&self) -> Option<(AppConfig, PathBuf)> {
        self.settings_path
            .as_ref()
            .map(|path| (self.config.clone(), path.clone()))
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`SessionState`].
///
/// Cheap to clone (`Arc` clone).  Lock with `.lock().unwrap()` for a short
/// critical section; do **not** hold the lock across `.await` points.
pub type SharedState = Arc<Mutex<SessionState>>;

/// Construct a new [`SharedState`] wrapping a fresh [`SessionState`].
pub fn new_shared_state(config: AppConfig) -> SharedState {
    Arc::new(Mutex::new(SessionState::new(config)))
}

/// Write the current config to the settings file, when one is configured.
///
/// The config is cloned out of the lock first; the disk write happens with
/// the lock released.
pub fn persist_settings(state: &SharedState) {
    let snapshot = { state.lock().unwrap().persistable() };
    if let Some((config, path)) = snapshot {
        if let Err(e) = config.save_to(&path) {
            log::warn!("settings: failed to write {}: {e}", path.display());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MockFrameSource;

    fn with_session(state: &mut SessionState) {
        state.session = Some(CaptureSession::new(Arc::new(MockFrameSource::ready(
            800, 600,
        ))));
    }

    // ---- RunStage ---

    #[test]
    fn only_done_and_failed_are_terminal() {
        assert!(!RunStage::CapturingFrame.is_terminal());
        assert!(!RunStage::Recognizing.is_terminal());
        assert!(!RunStage::AwaitingAnswer.is_terminal());
        assert!(RunStage::Done.is_terminal());
        assert!(RunStage::Failed.is_terminal());
    }

    #[test]
    fn run_starts_at_the_capture_stage() {
        let run = PipelineRun::new(7);
        assert_eq!(run.seq, 7);
        assert_eq!(run.stage, RunStage::CapturingFrame);
        assert!(run.text.is_none());
        assert!(run.answer.is_none());
    }

    #[test]
    fn stage_labels_are_distinct() {
        let stages = [
            RunStage::CapturingFrame,
            RunStage::Recognizing,
            RunStage::AwaitingAnswer,
            RunStage::Done,
            RunStage::Failed,
        ];
        for (i, a) in stages.iter().enumerate() {
            for b in &stages[i + 1..] {
                assert_ne!(a.label(), b.label());
            }
        }
    }

    // ---- SchedulerConfig ---

    #[test]
    fn interval_never_drops_below_one_second() {
        let mut scheduler = SchedulerConfig::new(0);
        assert_eq!(scheduler.interval_secs(), 1);

        scheduler.set_interval_secs(45);
        assert_eq!(scheduler.interval_secs(), 45);
        assert_eq!(scheduler.interval(), Duration::from_secs(45));

        scheduler.set_interval_secs(0);
        assert_eq!(scheduler.interval_secs(), 1);
    }

    #[test]
    fn default_scheduler_is_off_at_thirty_seconds() {
        let scheduler = SchedulerConfig::default();
        assert!(!scheduler.auto_mode_enabled);
        assert_eq!(scheduler.interval_secs(), 30);
    }

    // ---- CaptureSession ---

    #[test]
    fn session_starts_active_and_can_end() {
        let mut session = CaptureSession::new(Arc::new(MockFrameSource::ready(10, 10)));
        assert!(session.is_active());
        session.deactivate();
        assert!(!session.is_active());
    }

    // ---- Indicators ---

    #[test]
    fn no_session_shows_everything_pending() {
        let state = SessionState::default();
        let ind = state.indicators();
        assert_eq!(ind.capture, StageStatus::Pending);
        assert_eq!(ind.recognition, StageStatus::Pending);
        assert_eq!(ind.answer, StageStatus::Pending);
    }

    #[test]
    fn idle_session_shows_capture_and_recognition_complete() {
        let mut state = SessionState::default();
        with_session(&mut state);

        let ind = state.indicators();
        assert_eq!(ind.capture, StageStatus::Complete);
        assert_eq!(ind.recognition, StageStatus::Complete);
        assert_eq!(ind.answer, StageStatus::Pending);
    }

    #[test]
    fn recognition_shows_in_progress_while_processing() {
        let mut state = SessionState::default();
        with_session(&mut state);
        state.processing = true;

        assert_eq!(state.indicators().recognition, StageStatus::InProgress);
    }

    #[test]
    fn processing_without_a_session_stays_pending() {
        let mut state = SessionState::default();
        state.processing = true;

        assert_eq!(state.indicators().recognition, StageStatus::Pending);
    }

    #[test]
    fn answer_shows_in_progress_while_waiting() {
        let mut state = SessionState::default();
        with_session(&mut state);
        state.waiting_for_answer = true;

        let ind = state.indicators();
        assert_eq!(ind.answer, StageStatus::InProgress);
        // First-ever wait: no prior answer anchors the recognition stage.
        assert_eq!(ind.recognition, StageStatus::Pending);
    }

    #[test]
    fn prior_answer_keeps_recognition_complete_during_wait() {
        let mut state = SessionState::default();
        with_session(&mut state);
        state.answer = Some("previous".into());
        state.waiting_for_answer = true;

        let ind = state.indicators();
        assert_eq!(ind.recognition, StageStatus::Complete);
        assert_eq!(ind.answer, StageStatus::InProgress);
    }

    #[test]
    fn settled_answer_shows_complete() {
        let mut state = SessionState::default();
        with_session(&mut state);
        state.answer = Some("42".into());

        let ind = state.indicators();
        assert_eq!(ind.answer, StageStatus::Complete);
        assert_eq!(ind.recognition, StageStatus::Complete);
    }

    #[test]
    fn restored_answer_shows_complete_without_a_session() {
        let mut config = AppConfig::default();
        config.ui.last_answer = Some("restored".into());

        let state = SessionState::new(config);
        let ind = state.indicators();
        assert_eq!(ind.capture, StageStatus::Pending);
        assert_eq!(ind.answer, StageStatus::Complete);
    }

    // ---- SessionState / SharedState ---

    #[test]
    fn fresh_state_is_idle_and_signed_out() {
        let state = SessionState::default();
        assert!(!state.auth.is_authenticated());
        assert!(!state.session_active());
        assert!(!state.run_in_flight());
        assert_eq!(state.runs_started, 0);
        assert!(!state.processing);
        assert!(!state.waiting_for_answer);
        assert!(state.answer.is_none());
        assert!(state.history.is_empty());
        assert_eq!(state.model, crate::provider::DEFAULT_MODEL);
    }

    #[test]
    fn dead_session_counts_as_inactive() {
        let mut state = SessionState::default();
        with_session(&mut state);
        assert!(state.session_active());

        if let Some(session) = state.session.as_mut() {
            session.deactivate();
        }
        assert!(!state.session_active());
    }

    #[test]
    fn persistable_is_none_until_a_path_is_set() {
        let mut state = SessionState::default();
        assert!(state.persistable().is_none());

        state.settings_path = Some(PathBuf::from("/tmp/settings.toml"));
        let (_, path) = state.persistable().expect("some");
        assert_eq!(path, PathBuf::from("/tmp/settings.toml"));
    }

    #[test]
    fn shared_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedState>();
    }

    #[test]
    fn shared_state_can_be_cloned_and_mutated() {
        let state = new_shared_state(AppConfig::default());
        let state2 = Arc::clone(&state);

        state.lock().unwrap().processing = true;
        assert!(state2.lock().unwrap().processing);
    }
}
