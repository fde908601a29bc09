//! Session controller: the single mutation surface over [`SharedState`].
//!
//! Every user-facing action funnels through one method here; each method
//! mutates the state under the lock, then re-reconciles the auto-solve timer
//! so it always reflects the latest inputs:
//!
//! - `sign_in` / `sign_out`
//! - `start_capture` / `stop_capture`
//! - `solve_now`
//! - `set_auto_mode` / `set_interval` / `set_model` / `set_dark_mode`
//! - `navigate` (answer history browsing)
//!
//! All methods take `&self` and are safe to call straight from the egui
//! thread; anything slow runs on the tokio runtime behind the scenes.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::auth::AuthError;
use crate::capture::{CaptureError, ScreenCapture};
use crate::config::AppConfig;
use crate::ocr::Recognizer;
use crate::pipeline::{
    new_shared_state, persist_settings, AutoScheduler, CaptureSession, PipelineRunner,
    ScheduleInputs, SharedState,
};
use crate::provider::AnswerProvider;

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

pub struct SessionController {
    state: SharedState,
    capture: Arc<dyn ScreenCapture>,
    runner: Arc<PipelineRunner>,
    scheduler: AutoScheduler,
    runtime: Handle,
}

impl SessionController {
    /// Wire up the controller: shared state seeded from `config`, a runner
    /// over the given collaborators, and a (stopped) auto-solve scheduler.
    ///
    /// A token persisted by a previous session is re-validated here; a stale
    /// one is dropped instead of trusted.
    pub fn new(
        config: AppConfig,
        capture: Arc<dyn ScreenCapture>,
        recognizer: Arc<dyn Recognizer>,
        provider: Arc<dyn AnswerProvider>,
        runtime: Handle,
    ) -> Self {
        let state = new_shared_state(config);
        let runner = Arc::new(PipelineRunner::new(
            Arc::clone(&state),
            recognizer,
            provider,
        ));
        let scheduler = AutoScheduler::new(Arc::clone(&runner), runtime.clone());

        let controller = Self {
            state,
            capture,
            runner,
            scheduler,
            runtime,
        };
        controller.restore_auth();
        controller
    }

    fn restore_auth(&self) {
        let raw = { self.state.lock().unwrap().config.auth.token.clone() };
        if let Some(raw) = raw {
            let stored = { self.state.lock().unwrap().auth.store(&raw) };
            match stored {
                Ok(()) => log::info!("auth: restored the previous session"),
                Err(e) => {
                    log::info!("auth: dropping the persisted token ({e})");
                    self.state.lock().unwrap().config.auth.token = None;
                }
            }
        }
    }

    /// Route settings persistence to `path`.  `main` wires the real settings
    /// file; tests point this at a temp dir or leave it unset.
    pub fn set_settings_path(&self, path: PathBuf) {
        self.state.lock().unwrap().settings_path = Some(path);
    }

    /// Shared state handle for the view layer.  Lock per frame, drop fast.
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn scheduler_running(&self) -> bool {
        self.scheduler.is_running()
    }

    // ── Auth ────────────────────────────────────────────────────────────

    /// Validate and store a bearer token, then persist it for next launch.
    pub fn sign_in(&self, raw_token: &str) -> Result<(), AuthError> {
        let raw = raw_token.trim();
        {
            let mut st = self.state.lock().unwrap();
            st.auth.store(raw)?;
            st.config.auth.token = Some(raw.to_string());
        }
        persist_settings(&self.state);
        self.reconcile_scheduler();
        log::info!("auth: signed in");
        Ok(())
    }

    /// Drop the auth session: the capture session dies with it, the shown
    /// answer is cleared and the token is forgotten.  The answer history
    /// survives until the app exits.
    pub fn sign_out(&self) {
        {
            let mut st = self.state.lock().unwrap();
            st.auth.clear();
            st.config.auth.token = None;
            st.session = None;
            st.answer = None;
            st.config.ui.last_answer = None;
        }
        persist_settings(&self.state);
        self.reconcile_scheduler();
        log::info!("auth: signed out");
    }

    // ── Capture session ─────────────────────────────────────────────────

    /// Ask the platform for a frame source and open a session with it.
    ///
    /// A fresh session starts from a clean slate: the shown answer and both
    /// progress flags are cleared.
    pub fn start_capture(&self) -> Result<(), CaptureError> {
        {
            let st = self.state.lock().unwrap();
            if !st.auth.is_authenticated() {
                return Err(CaptureError::PermissionDenied(
                    "sign in before starting a capture session".into(),
                ));
            }
        }

        let source = self.capture.request()?;
        {
            let mut st = self.state.lock().unwrap();
            st.session = Some(CaptureSession::new(source));
            st.answer = None;
            st.processing = false;
            st.waiting_for_answer = false;
        }
        self.reconcile_scheduler();
        log::info!("capture: session started");
        Ok(())
    }

    /// End the capture session; the frame source is dropped with it.
    pub fn stop_capture(&self) {
        {
            let mut st = self.state.lock().unwrap();
            st.session = None;
        }
        self.reconcile_scheduler();
        log::info!("capture: session ended");
    }

    // ── Solving ─────────────────────────────────────────────────────────

    /// Fire one pipeline run in the background.  The outcome lands in the
    /// shared state; a trigger that loses the race to an in-flight run is
    /// simply dropped.
    pub fn solve_now(&self) {
        let runner = Arc::clone(&self.runner);
        self.runtime.spawn(async move {
            match runner.run_once().await {
                Ok(outcome) => log::debug!("manual run settled as {outcome:?}"),
                Err(e) => log::warn!("manual run failed: {e}"),
            }
        });
    }

    // ── Settings ────────────────────────────────────────────────────────

    pub fn set_auto_mode(&self, enabled: bool) {
        {
            let mut st = self.state.lock().unwrap();
            st.scheduler.auto_mode_enabled = enabled;
        }
        self.reconcile_scheduler();
    }

    /// Update the timer period (lifted to at least one second) and persist
    /// it.  A running timer is recreated and starts counting from zero.
    pub fn set_interval(&self, secs: u64) {
        {
            let mut st = self.state.lock().unwrap();
            st.scheduler.set_interval_secs(secs);
            st.config.capture.interval_secs = st.scheduler.interval_secs();
        }
        persist_settings(&self.state);
        self.reconcile_scheduler();
    }

    /// Switch the model used for future runs.  Session-only; not persisted.
    pub fn set_model(&self, model: impl Into<String>) {
        self.state.lock().unwrap().model = model.into();
    }

    pub fn set_dark_mode(&self, dark: bool) {
        {
            let mut st = self.state.lock().unwrap();
            st.config.ui.dark_mode = dark;
        }
        persist_settings(&self.state);
    }

    // ── History ─────────────────────────────────────────────────────────

    /// Move the history cursor and mirror the selected entry into the shown
    /// answer (which is also what gets restored next launch).
    pub fn navigate(&self, delta: isize) {
        {
            let mut st = self.state.lock().unwrap();
            st.history.navigate(delta);
            let current = st.history.current().map(str::to_string);
            if let Some(current) = current {
                st.answer = Some(current.clone());
                st.config.ui.last_answer = Some(current);
            }
        }
        persist_settings(&self.state);
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn reconcile_scheduler(&self) {
        let inputs = {
            let st = self.state.lock().unwrap();
            ScheduleInputs {
                authenticated: st.auth.is_authenticated(),
                capture_active: st.session_active(),
                auto_mode_enabled: st.scheduler.auto_mode_enabled,
                period: st.scheduler.interval(),
            }
        };
        self.scheduler.reconcile(inputs);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
