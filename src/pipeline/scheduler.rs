//! Auto-solve timer: a two-state (stopped / running) reconciliation loop.
//!
//! ```text
//! inputs = (authenticated, capture_active, auto_mode_enabled, period)
//!          │ any input change
//!          ▼
//! AutoScheduler::reconcile(inputs)
//!   ├─ abort the existing timer task (teardown always happens first)
//!   └─ all three gates true?
//!        └─ spawn a fresh interval task
//!             └─ every period: spawn runner.run_once() and move on
//! ```
//!
//! The timer never awaits a run.  Each tick fires and forgets; when a run is
//! still in flight the runner's slot guard drops the new trigger, so a slow
//! answer can never stack up a queue of captures.
//!
//! An interval change looks exactly like any other input change: the old
//! timer is torn down and a new one starts counting a full period from zero.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::runner::PipelineRunner;

// ---------------------------------------------------------------------------
// ScheduleInputs
// ---------------------------------------------------------------------------

/// Everything the scheduler's state machine depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleInputs {
    pub authenticated: bool,
    pub capture_active: bool,
    pub auto_mode_enabled: bool,
    pub period: Duration,
}

impl ScheduleInputs {
    /// The timer runs iff every gate holds.
    pub fn should_run(&self) -> bool {
        self.authenticated && self.capture_active && self.auto_mode_enabled
    }
}

// ---------------------------------------------------------------------------
// AutoScheduler
// ---------------------------------------------------------------------------

/// Owns the (at most one) auto-solve timer task.
///
/// `reconcile` is idempotent and cheap; callers invoke it after *every*
/// relevant state change rather than tracking which input moved.
pub struct AutoScheduler {
    runner: Arc<PipelineRunner>,
    runtime: Handle,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl AutoScheduler {
    pub fn new(runner: Arc<PipelineRunner>, runtime: Handle) -> Self {
        Self {
            runner,
            runtime,
            timer: Mutex::new(None),
        }
    }

    /// Bring the timer in line with `inputs`: tear down whatever is running,
    /// then start a fresh timer when all gates hold.
    pub fn reconcile(&self, inputs: ScheduleInputs) {
        let mut slot = self.timer.lock().unwrap();

        if let Some(timer) = slot.take() {
            timer.abort();
            log::debug!("scheduler: timer torn down");
        }

        if !inputs.should_run() {
            return;
        }

        let runner = Arc::clone(&self.runner);
        let period = inputs.period;
        log::info!("scheduler: auto-solving every {period:?}");

        *slot = Some(self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick of a tokio interval fires immediately; swallow
            // it so the first real trigger lands one full period from now.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let runner = Arc::clone(&runner);
                tokio::spawn(async move {
                    match runner.run_once().await {
                        Ok(outcome) => log::debug!("scheduler: tick settled as {outcome:?}"),
                        Err(e) => log::warn!("scheduler: tick failed: {e}"),
                    }
                });
            }
        }));
    }

    /// `true` while a timer task is alive.
    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }
}

impl Drop for AutoScheduler {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.timer.lock() {
            if let Some(timer) = slot.take() {
                timer.abort();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{test_token, unix_now_plus};
    use crate::capture::MockFrameSource;
    use crate::config::AppConfig;
    use crate::ocr::MockRecognizer;
    use crate::pipeline::state::{new_shared_state, CaptureSession, SharedState};
    use crate::provider::{AnswerProvider, AskError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Instant provider that counts how many ticks reached it.
    struct TickProvider {
        calls: AtomicUsize,
    }

    impl TickProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnswerProvider for TickProvider {
        async fn ask(&self, _question: &str, _model: &str) -> Result<String, AskError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("tick {n}"))
        }
    }

    /// Provider that parks every call until released.
    struct HoldProvider {
        release: Arc<Notify>,
        calls: AtomicUsize,
    }

    impl HoldProvider {
        fn new(release: Arc<Notify>) -> Self {
            Self {
                release,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnswerProvider for HoldProvider {
        async fn ask(&self, _question: &str, _model: &str) -> Result<String, AskError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok("held answer".into())
        }
    }

    fn signed_in_state() -> SharedState {
        let state = new_shared_state(AppConfig::default());
        {
            let mut st = state.lock().unwrap();
            st.auth
                .store(&test_token(unix_now_plus(3_600)))
                .expect("store token");
            st.session = Some(CaptureSession::new(Arc::new(MockFrameSource::ready(
                640, 480,
            ))));
        }
        state
    }

    fn make_scheduler(
        state: &SharedState,
        provider: Arc<dyn AnswerProvider>,
    ) -> AutoScheduler {
        let runner = Arc::new(PipelineRunner::new(
            Arc::clone(state),
            Arc::new(MockRecognizer::ok("what is on screen?")),
            provider,
        ));
        AutoScheduler::new(runner, Handle::current())
    }

    fn inputs(
        authenticated: bool,
        capture_active: bool,
        auto_mode_enabled: bool,
        period_ms: u64,
    ) -> ScheduleInputs {
        ScheduleInputs {
            authenticated,
            capture_active,
            auto_mode_enabled,
            period: Duration::from_millis(period_ms),
        }
    }

    /// Poll `cond` until it holds, with a hard 5 s ceiling.
    async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "timed out waiting for {what}");
    }

    #[test]
    fn all_gates_must_hold_for_running() {
        assert!(inputs(true, true, true, 30).should_run());
        assert!(!inputs(false, true, true, 30).should_run());
        assert!(!inputs(true, false, true, 30).should_run());
        assert!(!inputs(true, true, false, 30).should_run());
    }

    #[tokio::test]
    async fn stays_stopped_while_any_gate_is_closed() {
        let state = signed_in_state();
        let provider = Arc::new(TickProvider::new());
        let scheduler = make_scheduler(&state, provider.clone());

        scheduler.reconcile(inputs(false, true, true, 20));
        assert!(!scheduler.is_running());
        scheduler.reconcile(inputs(true, false, true, 20));
        assert!(!scheduler.is_running());
        scheduler.reconcile(inputs(true, true, false, 20));
        assert!(!scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn first_tick_waits_one_full_period() {
        let state = signed_in_state();
        let provider = Arc::new(TickProvider::new());
        let scheduler = make_scheduler(&state, provider.clone());

        scheduler.reconcile(inputs(true, true, true, 120));
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(provider.calls(), 0, "tick arrived before a full period");

        {
            let provider = Arc::clone(&provider);
            wait_until("the first tick", move || provider.calls() >= 1).await;
        }
    }

    #[tokio::test]
    async fn ticks_append_answers_in_order() {
        let state = signed_in_state();
        let provider = Arc::new(TickProvider::new());
        let scheduler = make_scheduler(&state, provider.clone());

        scheduler.reconcile(inputs(true, true, true, 25));
        {
            let provider = Arc::clone(&provider);
            wait_until("three ticks", move || provider.calls() >= 3).await;
        }

        scheduler.reconcile(inputs(true, true, false, 25));
        assert!(!scheduler.is_running());

        // Let any run that was mid-flight at teardown settle.
        {
            let state = Arc::clone(&state);
            wait_until("in-flight runs to settle", move || {
                state.lock().unwrap().run.is_none()
            })
            .await;
        }
        tokio::time::sleep(Duration::from_millis(30)).await;

        let st = state.lock().unwrap();
        let calls = provider.calls();
        assert!(calls >= 3);
        assert_eq!(st.history.len(), calls);
        assert_eq!(st.history.cursor(), Some(calls - 1));
        assert_eq!(st.history.current(), Some(format!("tick {calls}").as_str()));
    }

    #[tokio::test]
    async fn teardown_stops_future_ticks() {
        let state = signed_in_state();
        let provider = Arc::new(TickProvider::new());
        let scheduler = make_scheduler(&state, provider.clone());

        scheduler.reconcile(inputs(true, true, true, 20));
        {
            let provider = Arc::clone(&provider);
            wait_until("a tick", move || provider.calls() >= 1).await;
        }

        scheduler.reconcile(inputs(true, true, false, 20));
        assert!(!scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(60)).await;
        let settled = provider.calls();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(provider.calls(), settled);
    }

    #[tokio::test]
    async fn reconcile_stopped_twice_is_harmless() {
        let state = signed_in_state();
        let scheduler = make_scheduler(&state, Arc::new(TickProvider::new()));

        scheduler.reconcile(inputs(true, true, false, 20));
        scheduler.reconcile(inputs(true, false, false, 20));
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn interval_change_recreates_the_timer() {
        let state = signed_in_state();
        let provider = Arc::new(TickProvider::new());
        let scheduler = make_scheduler(&state, provider.clone());

        scheduler.reconcile(inputs(true, true, true, 25));
        assert!(scheduler.is_running());

        // Same gates, new period: teardown + recreate, still exactly one timer.
        scheduler.reconcile(inputs(true, true, true, 40));
        assert!(scheduler.is_running());

        {
            let provider = Arc::clone(&provider);
            wait_until("ticks on the new period", move || provider.calls() >= 2).await;
        }

        scheduler.reconcile(inputs(true, true, false, 40));
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn overlapping_ticks_are_dropped_while_a_run_is_parked() {
        let state = signed_in_state();
        let release = Arc::new(Notify::new());
        let provider = Arc::new(HoldProvider::new(Arc::clone(&release)));
        let scheduler = make_scheduler(&state, provider.clone());

        scheduler.reconcile(inputs(true, true, true, 20));
        {
            let provider = Arc::clone(&provider);
            wait_until("the first tick to park", move || provider.calls() == 1).await;
        }

        // Several periods elapse while the first run is parked at the
        // provider; every one of those triggers must be dropped.
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(provider.calls(), 1);
        assert_eq!(state.lock().unwrap().runs_started, 1);

        scheduler.reconcile(inputs(true, true, false, 20));
        release.notify_one();

        {
            let state = Arc::clone(&state);
            wait_until("the parked run to finish", move || {
                let st = state.lock().unwrap();
                st.run.is_none() && st.history.len() == 1
            })
            .await;
        }
    }

    #[tokio::test]
    async fn dropping_the_scheduler_aborts_the_timer() {
        let state = signed_in_state();
        let provider = Arc::new(TickProvider::new());

        {
            let scheduler = make_scheduler(&state, provider.clone());
            scheduler.reconcile(inputs(true, true, true, 20));
            {
                let provider = Arc::clone(&provider);
                wait_until("a tick", move || provider.calls() >= 1).await;
            }
        }

        tokio::time::sleep(Duration::from_millis(60)).await;
        let settled = provider.calls();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(provider.calls(), settled);
    }
}
