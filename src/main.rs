//! Application entry point — Screen Solver.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the collaborators: screen capture, OCR, answer backend.
//! 5. Wire the [`SessionController`] — this re-validates any persisted
//!    auth token and drops a stale one.
//! 6. Run [`eframe::run_native`] — blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use eframe::egui;
use screen_solver::{
    app::SolverApp,
    capture::{PrimaryDisplayCapture, ScreenCapture},
    config::{AppConfig, AppPaths},
    controller::SessionController,
    ocr::{Recognizer, TesseractRecognizer},
    provider::{AnswerProvider, HttpAnswerProvider},
};

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options() -> eframe::NativeOptions {
    let vp = egui::ViewportBuilder::default()
        .with_inner_size([520.0, 640.0])
        .with_min_inner_size([420.0, 480.0]);

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Screen Solver starting up");

    // 2. Configuration
    let paths = AppPaths::new();
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (2 worker threads — OCR and HTTP each take one).
    //    Kept alive in this scope for as long as the window runs.
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Collaborators
    let capture: Arc<dyn ScreenCapture> = Arc::new(PrimaryDisplayCapture);

    let recognizer = TesseractRecognizer::from_config(&config.ocr);
    match recognizer.probe() {
        Ok(banner) => log::info!("OCR backend ready: {banner}"),
        Err(e) => log::warn!(
            "OCR backend unavailable ({e}); runs will fail until `{}` is installed",
            config.ocr.command
        ),
    }
    let recognizer: Arc<dyn Recognizer> = Arc::new(recognizer);

    let provider: Arc<dyn AnswerProvider> =
        Arc::new(HttpAnswerProvider::from_config(&config.provider));
    log::info!("answer backend: {}", config.provider.base_url);

    // 5. Controller over the shared state
    let controller = Arc::new(SessionController::new(
        config,
        capture,
        recognizer,
        provider,
        rt.handle().clone(),
    ));
    controller.set_settings_path(paths.settings_file.clone());

    // 6. Build the egui app and run it (blocks until the window is closed)
    let app = SolverApp::new(controller);

    eframe::run_native(
        "Screen Solver",
        native_options(),
        Box::new(move |_cc| Ok(Box::new(app))),
    )
}
