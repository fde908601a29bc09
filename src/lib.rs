//! Screen Solver — answer whatever is on your screen.
//!
//! A small desktop assistant: it grabs the primary display, runs the frame
//! through OCR, sends the recognised text to an answer backend, and shows
//! the reply in an egui window.  Runs repeat on a timer when auto mode is
//! on.
//!
//! ```text
//!   screen ──▶ capture ──▶ ocr ──▶ provider ──▶ answer pane
//!                  └────── pipeline runner ──────┘
//! ```
//!
//! Module map:
//!
//! * [`capture`]    — display enumeration and PNG frame grabs
//! * [`ocr`]        — external OCR process behind a [`ocr::Recognizer`] trait
//! * [`provider`]   — HTTP client for the answer backend
//! * [`auth`]       — bearer-token gate (payload decode + expiry checks)
//! * [`pipeline`]   — shared state, single-run pipeline, auto-solve timer
//! * [`controller`] — the mutation surface the UI calls
//! * [`app`]        — egui screens
//! * [`config`]     — TOML settings on disk

pub mod app;
pub mod auth;
pub mod capture;
pub mod config;
pub mod controller;
pub mod ocr;
pub mod pipeline;
pub mod provider;
