//! Pipeline runner: one capture → recognize → answer execution per trigger.
//!
//! ```text
//! trigger (Solve button / timer tick)
//!        │
//!        ▼
//! claim the run slot ──slot taken──▶ dropped (InFlight)
//!        │  auth + session checked under the same lock
//!        ▼
//! FrameSource::snapshot ──any error──▶ discarded silently (NotReady)
//!        │
//!        ▼
//! Recognizer::recognize        [spawn_blocking, processing = true]
//!        │  empty text ──▶ Done without an answer call (NoText)
//!        ▼
//! AnswerProvider::ask          [waiting_for_answer = true]
//!        │  ok  ──▶ answer + history + persisted prefs ──▶ Done
//!        └─ err ──▶ Failed, previous answer untouched
//! ```
//!
//! Triggers may arrive from the UI and the auto timer at the same time; the
//! run slot in [`SessionState`] serialises them, and the loser of the race is
//! dropped rather than queued.
//!
//! [`SessionState`]: super::state::SessionState

use std::sync::Arc;

use thiserror::Error;

use crate::ocr::{OcrError, Recognizer};
use crate::provider::{AnswerProvider, AskError};

use super::state::{persist_settings, PipelineRun, RunStage, SharedState};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors that settle a run as failed, or refuse a trigger outright.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No valid token; the trigger is refused before a run is created.
    #[error("not signed in")]
    Unauthenticated,

    /// No live capture session; the trigger is refused before a run is
    /// created.
    #[error("screen capture is not active")]
    NoSession,

    /// Text recognition failed.
    #[error("recognition failed: {0}")]
    Recognition(#[from] OcrError),

    /// The answer backend call failed.
    #[error("answer request failed: {0}")]
    Provider(#[from] AskError),

    /// Unexpected internal failure (e.g. the blocking OCR task panicked).
    #[error("internal error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// RunOutcome
// ---------------------------------------------------------------------------

/// How a [`PipelineRunner::run_once`] invocation settled without failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A new answer was produced and appended to the history.
    Answered(String),
    /// Recognition found no text; the answer call was skipped.
    NoText,
    /// The frame source had nothing to grab; nothing changed.
    NotReady,
    /// Another run already held the slot; this trigger was dropped.
    InFlight,
}

// ---------------------------------------------------------------------------
// PipelineRunner
// ---------------------------------------------------------------------------

/// Executes pipeline runs against the shared state.
///
/// Stateless apart from its collaborators: all per-run bookkeeping lives in
/// the shared [`PipelineRun`] slot, so the UI can watch a run progress and a
/// concurrent trigger can see the slot is taken.
pub struct PipelineRunner {
    state: SharedState,
    recognizer: Arc<dyn Recognizer>,
    provider: Arc<dyn AnswerProvider>,
}

impl PipelineRunner {
    pub fn new(
        state: SharedState,
        recognizer: Arc<dyn Recognizer>,
        provider: Arc<dyn AnswerProvider>,
    ) -> Self {
        Self {
            state,
            recognizer,
            provider,
        }
    }

    /// Execute one capture → recognize → answer cycle.
    ///
    /// Exit paths:
    /// - `Ok(InFlight)` — another run held the slot; nothing changed.
    /// - `Err(Unauthenticated)` / `Err(NoSession)` — preconditions failed;
    ///   no run was created.
    /// - `Ok(NotReady)` — the frame grab failed; the run is discarded
    ///   silently and the progress flags keep their previous values.
    /// - `Err(Recognition)` / `Err(Provider)` / `Err(Internal)` — the run
    ///   settled as failed; the current answer keeps its previous value.
    /// - `Ok(NoText)` — recognition found nothing; done without asking.
    /// - `Ok(Answered)` — a new answer landed in the state and the history.
    ///
    /// Every path leaves `processing` and `waiting_for_answer` false, except
    /// `NotReady`, which leaves them untouched.
    pub async fn run_once(&self) -> Result<RunOutcome, PipelineError> {
        // ── Claim the run slot ──────────────────────────────────────────
        let (seq, source, model) = {
            let mut st = self.state.lock().unwrap();

            if st.run_in_flight() {
                log::debug!("pipeline: trigger dropped, a run is already in flight");
                return Ok(RunOutcome::InFlight);
            }
            if !st.auth.is_authenticated() {
                return Err(PipelineError::Unauthenticated);
            }
            let source = match st.session.as_ref().filter(|s| s.is_active()) {
                Some(session) => Arc::clone(session.source()),
                None => return Err(PipelineError::NoSession),
            };

            st.runs_started += 1;
            let seq = st.runs_started;
            st.run = Some(PipelineRun::new(seq));
            (seq, source, st.model.clone())
        };

        // ── Grab a frame ────────────────────────────────────────────────
        let frame = match source.snapshot() {
            Ok(frame) => frame,
            Err(e) => {
                // Nothing to read yet.  Discard the run without touching the
                // progress flags; the next trigger simply tries again.
                log::debug!("pipeline: run #{seq} skipped, {e}");
                self.state.lock().unwrap().run = None;
                return Ok(RunOutcome::NotReady);
            }
        };
        log::debug!(
            "pipeline: run #{seq} captured a {}x{} frame ({} bytes)",
            frame.width,
            frame.height,
            frame.data.len()
        );

        // ── Recognize (blocking OCR on the thread pool) ─────────────────
        {
            let mut st = self.state.lock().unwrap();
            if let Some(run) = st.run.as_mut() {
                run.stage = RunStage::Recognizing;
            }
            st.processing = true;
        }

        let recognizer = Arc::clone(&self.recognizer);
        let recognized = tokio::task::spawn_blocking(move || recognizer.recognize(&frame)).await;

        let text = match recognized {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                log::warn!("pipeline: run #{seq} recognition failed: {e}");
                self.settle(seq, RunStage::Failed);
                return Err(PipelineError::Recognition(e));
            }
            Err(e) => {
                log::error!("pipeline: run #{seq} recognition task panicked: {e}");
                self.settle(seq, RunStage::Failed);
                return Err(PipelineError::Internal(e.to_string()));
            }
        };

        let question = text.trim().to_string();

        let no_text = {
            let mut st = self.state.lock().unwrap();
            st.processing = false;
            if let Some(run) = st.run.as_mut() {
                run.text = Some(question.clone());
            }
            if question.is_empty() {
                true
            } else {
                if let Some(run) = st.run.as_mut() {
                    run.stage = RunStage::AwaitingAnswer;
                }
                st.waiting_for_answer = true;
                false
            }
        };

        if no_text {
            log::debug!("pipeline: run #{seq} recognized no text, skipping the answer call");
            self.settle(seq, RunStage::Done);
            return Ok(RunOutcome::NoText);
        }

        // ── Ask the answer backend ──────────────────────────────────────
        log::debug!(
            "pipeline: run #{seq} asking {model} ({} chars of question)",
            question.len()
        );

        match self.provider.ask(&question, &model).await {
            Ok(answer) => {
                {
                    let mut st = self.state.lock().unwrap();
                    st.waiting_for_answer = false;
                    if let Some(run) = st.run.as_mut() {
                        run.stage = RunStage::Done;
                        run.answer = Some(answer.clone());
                    }
                    st.run = None;
                    st.answer = Some(answer.clone());
                    st.history.push(answer.clone());
                    st.config.ui.last_answer = Some(answer.clone());
                }
                persist_settings(&self.state);
                log::debug!("pipeline: run #{seq} settled as {}", RunStage::Done.label());
                Ok(RunOutcome::Answered(answer))
            }
            Err(e) => {
                log::warn!("pipeline: run #{seq} answer request failed: {e}");
                self.settle(seq, RunStage::Failed);
                Err(PipelineError::Provider(e))
            }
        }
    }

    /// Fold a terminal stage into the shared state: reset both progress
    /// flags and release the run slot.
    fn settle(&self, seq: u64, stage: RunStage) {
        let mut st = self.state.lock().unwrap();
        if let Some(run) = st.run.as_mut() {
            run.stage = stage;
        }
        st.processing = false;
        st.waiting_for_answer = false;
        st.run = None;
        log::debug!("pipeline: run #{seq} settled as {}", stage.label());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
