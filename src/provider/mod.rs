//! Answer backend client for Screen Solver.
//!
//! The app never talks to model vendors directly; a small backend fronts
//! them and exposes one route per vendor.  This module holds the trait the
//! pipeline depends on, the HTTP implementation, and the model catalog the
//! settings screen offers.

pub mod client;

pub use client::{
    endpoint_for, AnswerProvider, AskError, HttpAnswerProvider, DEFAULT_MODEL, SUPPORTED_MODELS,
};
