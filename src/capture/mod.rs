//! Screen capture for Screen Solver.
//!
//! ```text
//! ScreenCapture::request() ──► Arc<dyn FrameSource> ──► snapshot() ──► FrameImage (PNG)
//!        (session start)           (held by session)      (each run)
//! ```
//!
//! Production uses [`PrimaryDisplayCapture`] / [`DisplaySource`] on top of
//! the `xcap` crate; pipeline tests swap in in-memory sources.

pub mod source;

pub use source::{
    CaptureError, DisplaySource, FrameImage, FrameSource, PrimaryDisplayCapture, ScreenCapture,
};

#[cfg(test)]
pub use source::MockFrameSource;
