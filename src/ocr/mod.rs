//! Text recognition for Screen Solver.
//!
//! A single seam (`Recognizer`) plus the production implementation that
//! shells out to the Tesseract CLI.  Blocking; the pipeline wraps calls in
//! `spawn_blocking`.

pub mod recognizer;

pub use recognizer::{OcrError, Recognizer, TesseractRecognizer};

#[cfg(test)]
pub use recognizer::MockRecognizer;
