//! Pipeline module for Screen Solver.
//!
//! This module wires the capture → OCR → answer pipeline and exposes the
//! shared state that the UI reads every frame.
//!
//! # Architecture
//!
//! ```text
//! Solve button ────────┐               ┌──────── timer tick (auto mode)
//!                      ▼               ▼
//!             PipelineRunner::run_once()      ← at most one run at a time
//!                      │
//!                      ├─ FrameSource::snapshot    (sync, silent on failure)
//!                      ├─ Recognizer::recognize    (spawn_blocking)
//!                      └─ AnswerProvider::ask      (async HTTP)
//!                      │
//!                      ▼
//! SessionState (Arc<Mutex<…>>) ←─── read by egui update() each frame
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use screen_solver::config::AppConfig;
//! use screen_solver::pipeline::{
//!     new_shared_state, AutoScheduler, PipelineRunner, ScheduleInputs,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let shared_state = new_shared_state(config);
//!
//!     // (recognizer and provider constructed from config)
//!     # use screen_solver::ocr::Recognizer;
//!     # use screen_solver::provider::AnswerProvider;
//!     # fn make_recognizer() -> Arc<dyn Recognizer> { unimplemented!() }
//!     # fn make_provider() -> Arc<dyn AnswerProvider> { unimplemented!() }
//!
//!     let runner = Arc::new(PipelineRunner::new(
//!         shared_state.clone(),
//!         make_recognizer(),
//!         make_provider(),
//!     ));
//!
//!     // Manual trigger:
//!     runner.run_once().await.ok();
//!
//!     // Auto mode:
//!     let scheduler =
//!         AutoScheduler::new(Arc::clone(&runner), tokio::runtime::Handle::current());
//!     scheduler.reconcile(ScheduleInputs {
//!         authenticated: true,
//!         capture_active: true,
//!         auto_mode_enabled: true,
//!         period: std::time::Duration::from_secs(30),
//!     });
//! }
//! ```

pub mod history;
pub mod runner;
pub mod scheduler;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use history::AnswerHistory;
pub use runner::{PipelineError, PipelineRunner, RunOutcome};
pub use scheduler::{AutoScheduler, ScheduleInputs};
pub use state::{
    new_shared_state, persist_settings, CaptureSession, PipelineRun, RunStage, SchedulerConfig,
    SessionState, SharedState, StageIndicators, StageStatus,
};
