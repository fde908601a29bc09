//! Screen Solver desktop window — egui/eframe application.
//!
//! # Architecture
//!
//! [`SolverApp`] is the top-level [`eframe::App`].  It owns no pipeline state
//! of its own: every frame it takes one short lock on the shared
//! [`SessionState`](crate::pipeline::SessionState), copies what it needs into
//! a [`UiSnapshot`], and renders from the copy.  All button handlers call
//! into the [`SessionController`]; slow work runs on the tokio runtime and
//! its results land back in the shared state for a later frame to pick up.
//!
//! # Screens
//!
//! | Screen | Shown when | Contents |
//! |--------|------------|----------|
//! | Sign in | no valid token | token field + sign-in button |
//! | Start | signed in, no capture session | start-capture button |
//! | Session | capture session open | stage bars, answer pane, settings |
//!
//! Blocking messages (bad token, capture permission refused) appear as a
//! centred notice window over whichever screen is active.

use std::sync::Arc;
use std::time::Duration;

use eframe::egui;

use crate::controller::SessionController;
use crate::pipeline::{StageIndicators, StageStatus};
use crate::provider::SUPPORTED_MODELS;

// ---------------------------------------------------------------------------
// UiSnapshot
// ---------------------------------------------------------------------------

/// Everything one frame needs from the shared state, copied under a single
/// short lock so rendering never holds the mutex.
struct UiSnapshot {
    authenticated: bool,
    email: Option<String>,
    session_active: bool,
    indicators: StageIndicators,
    processing: bool,
    waiting_for_answer: bool,
    answer: Option<String>,
    history_len: usize,
    history_cursor: Option<usize>,
    auto_mode: bool,
    interval_secs: u64,
    model: String,
    dark_mode: bool,
}

// ---------------------------------------------------------------------------
// SolverApp
// ---------------------------------------------------------------------------

/// eframe application — the Screen Solver window.
pub struct SolverApp {
    /// Single mutation surface over the shared session state.
    controller: Arc<SessionController>,

    // ── UI-only state ────────────────────────────────────────────────────
    /// Contents of the token field on the sign-in screen.
    token_input: String,
    /// Blocking message shown as a centred notice window, if any.
    notice: Option<String>,
    /// Whether the settings section is expanded on the session screen.
    show_settings: bool,
}

impl SolverApp {
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self {
            controller,
            token_input: String::new(),
            notice: None,
            show_settings: false,
        }
    }

    /// Copy the frame's worth of shared state.  Lock held only here.
    fn snapshot(&self) -> UiSnapshot {
        let st = self.controller.state().lock().unwrap();
        UiSnapshot {
            authenticated: st.auth.is_authenticated(),
            email: st.auth.token().and_then(|t| t.email().map(str::to_string)),
            session_active: st.session_active(),
            indicators: st.indicators(),
            processing: st.processing,
            waiting_for_answer: st.waiting_for_answer,
            answer: st.answer.clone(),
            history_len: st.history.len(),
            history_cursor: st.history.cursor(),
            auto_mode: st.scheduler.auto_mode_enabled,
            interval_secs: st.scheduler.interval_secs(),
            model: st.model.clone(),
            dark_mode: st.config.ui.dark_mode,
        }
    }

    // ── Sign-in screen ───────────────────────────────────────────────────

    fn draw_sign_in(&mut self, ui: &mut egui::Ui) {
        ui.add_space(32.0);
        ui.vertical_centered(|ui| {
            ui.heading("Screen Solver");
            ui.add_space(4.0);
            ui.label(
                egui::RichText::new("Paste your access token to get started")
                    .color(egui::Color32::from_rgb(140, 140, 140))
                    .size(12.0),
            );

            ui.add_space(16.0);
            let field = ui.add(
                egui::TextEdit::singleline(&mut self.token_input)
                    .hint_text("access token")
                    .password(true)
                    .desired_width(300.0),
            );
            let submitted =
                field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            ui.add_space(8.0);
            if ui.button("Sign in").clicked() || submitted {
                self.submit_token();
            }
        });
    }

    fn submit_token(&mut self) {
        match self.controller.sign_in(&self.token_input) {
            Ok(()) => {
                self.token_input.clear();
                self.notice = None;
            }
            Err(e) => self.notice = Some(format!("Could not sign in: {e}")),
        }
    }

    // ── Start screen ─────────────────────────────────────────────────────

    fn draw_start(&mut self, ui: &mut egui::Ui, snap: &UiSnapshot) {
        ui.add_space(32.0);
        ui.vertical_centered(|ui| {
            ui.heading("Screen Solver");
            if let Some(ref email) = snap.email {
                ui.label(
                    egui::RichText::new(format!("signed in as {email}"))
                        .color(egui::Color32::from_rgb(140, 140, 140))
                        .size(11.0),
                );
            }

            ui.add_space(20.0);
            if ui.button("Start screen capture").clicked() {
                if let Err(e) = self.controller.start_capture() {
                    self.notice = Some(e.to_string());
                }
            }

            ui.add_space(8.0);
            if ui.button("Sign out").clicked() {
                self.controller.sign_out();
            }
        });
    }

    // ── Session screen ───────────────────────────────────────────────────

    fn draw_session(&mut self, ui: &mut egui::Ui, snap: &UiSnapshot) {
        // Status row: session badge on the left, settings toggle on the right.
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new("capture session active")
                    .color(egui::Color32::from_rgb(80, 200, 120))
                    .size(11.0),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let label = if self.show_settings { "Hide settings" } else { "Settings" };
                if ui.small_button(label).clicked() {
                    self.show_settings = !self.show_settings;
                }
            });
        });

        ui.add_space(6.0);
        self.draw_indicators(ui, &snap.indicators);

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            let solve = egui::Button::new("Solve now");
            if ui.add_enabled(!snap.waiting_for_answer, solve).clicked() {
                self.controller.solve_now();
            }
            if snap.auto_mode && self.controller.scheduler_running() {
                ui.label(
                    egui::RichText::new(format!("solving every {} s", snap.interval_secs))
                        .color(egui::Color32::from_rgb(140, 140, 140))
                        .size(11.0),
                );
            }
        });

        ui.add_space(8.0);
        self.draw_answer_pane(ui, snap);

        if self.show_settings {
            ui.add_space(8.0);
            ui.separator();
            self.draw_settings(ui, snap);
        }
    }

    /// Three stage bars: capture, recognition, answer.  Colour mirrors the
    /// status exactly as the shared state reports it.
    fn draw_indicators(&self, ui: &mut egui::Ui, indicators: &StageIndicators) {
        let stages = [
            ("Capture", indicators.capture),
            ("Recognize", indicators.recognition),
            ("Answer", indicators.answer),
        ];
        ui.columns(stages.len(), |cols| {
            for (col, (name, status)) in cols.iter_mut().zip(stages) {
                let color = Self::status_color(status);
                let (rect, _) = col.allocate_exact_size(
                    egui::vec2(col.available_width(), 6.0),
                    egui::Sense::hover(),
                );
                col.painter().rect_filled(rect, 2.0, color);
                col.add_space(2.0);
                col.label(egui::RichText::new(name).size(12.0));
                col.label(egui::RichText::new(status.label()).color(color).size(10.0));
            }
        });
    }

    /// Answer text with history navigation when more than one answer exists.
    fn draw_answer_pane(&mut self, ui: &mut egui::Ui, snap: &UiSnapshot) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Answer").strong().size(12.0));
            if snap.history_len > 1 {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let cursor = snap.history_cursor.unwrap_or(0);
                    let next = egui::Button::new(">").small();
                    if ui.add_enabled(cursor + 1 < snap.history_len, next).clicked() {
                        self.controller.navigate(1);
                    }
                    ui.label(
                        egui::RichText::new(format!("{} of {}", cursor + 1, snap.history_len))
                            .color(egui::Color32::from_rgb(140, 140, 140))
                            .size(10.0),
                    );
                    let prev = egui::Button::new("<").small();
                    if ui.add_enabled(cursor > 0, prev).clicked() {
                        self.controller.navigate(-1);
                    }
                });
            }
        });

        egui::ScrollArea::vertical()
            .max_height(240.0)
            .auto_shrink([false, true])
            .show(ui, |ui| match snap.answer {
                Some(ref answer) => {
                    ui.label(egui::RichText::new(answer.as_str()).size(13.0));
                }
                None => {
                    let hint = if snap.waiting_for_answer {
                        "waiting for an answer..."
                    } else if snap.processing {
                        "reading the screen..."
                    } else {
                        "No answer yet. Press Solve now or turn on auto solve."
                    };
                    ui.label(
                        egui::RichText::new(hint)
                            .color(egui::Color32::from_rgb(130, 130, 130))
                            .italics()
                            .size(12.0),
                    );
                }
            });
    }

    fn draw_settings(&mut self, ui: &mut egui::Ui, snap: &UiSnapshot) {
        ui.add_space(4.0);

        let mut auto = snap.auto_mode;
        if ui.checkbox(&mut auto, "Solve automatically").changed() {
            self.controller.set_auto_mode(auto);
        }

        let mut interval = snap.interval_secs;
        let slider = egui::Slider::new(&mut interval, 15..=300)
            .step_by(15.0)
            .suffix(" s")
            .text("every");
        if ui.add_enabled(snap.auto_mode, slider).changed() {
            self.controller.set_interval(interval);
        }

        egui::ComboBox::from_label("model")
            .selected_text(snap.model.clone())
            .show_ui(ui, |ui| {
                for &model in SUPPORTED_MODELS.iter() {
                    if ui.selectable_label(snap.model == model, model).clicked() {
                        self.controller.set_model(model);
                    }
                }
            });

        let mut dark = snap.dark_mode;
        if ui.checkbox(&mut dark, "Dark mode").changed() {
            self.controller.set_dark_mode(dark);
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("Stop capture").clicked() {
                self.controller.stop_capture();
            }
            if ui.button("Sign out").clicked() {
                self.controller.sign_out();
            }
        });
    }

    // ── Notice window ────────────────────────────────────────────────────

    /// Centred blocking notice; stays up until the user dismisses it.
    fn draw_notice(&mut self, ctx: &egui::Context) {
        let mut dismissed = false;
        if let Some(ref notice) = self.notice {
            egui::Window::new("Notice")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                .show(ctx, |ui| {
                    ui.label(notice.as_str());
                    ui.add_space(6.0);
                    ui.vertical_centered(|ui| {
                        if ui.button("OK").clicked() {
                            dismissed = true;
                        }
                    });
                });
        }
        if dismissed {
            self.notice = None;
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn status_color(status: StageStatus) -> egui::Color32 {
        match status {
            StageStatus::Pending => egui::Color32::from_rgb(120, 120, 120),
            StageStatus::InProgress => egui::Color32::from_rgb(68, 136, 255),
            StageStatus::Complete => egui::Color32::from_rgb(80, 200, 120),
        }
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for SolverApp {
    /// Called every frame by eframe.  Snapshots the shared state, then
    /// renders whichever screen matches it.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let snap = self.snapshot();

        // --- Theme ---------------------------------------------------------
        ctx.set_visuals(if snap.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });

        // --- Schedule the next repaint ------------------------------------
        // Runs mutate the shared state from the tokio runtime; poll faster
        // while one is in flight so indicator changes land promptly.
        let cadence = if snap.processing || snap.waiting_for_answer {
            Duration::from_millis(100)
        } else {
            Duration::from_millis(500)
        };
        ctx.request_repaint_after(cadence);

        // --- Render the active screen -------------------------------------
        egui::CentralPanel::default().show(ctx, |ui| {
            if !snap.authenticated {
                self.draw_sign_in(ui);
            } else if !snap.session_active {
                self.draw_start(ui, &snap);
            } else {
                self.draw_session(ui, &snap);
            }
        });

        self.draw_notice(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("screen solver closing");
    }
}
