//! Text recognition over captured frames.
//!
//! `Recognizer` is the seam the pipeline calls; `TesseractRecognizer` shells
//! out to the Tesseract CLI, piping the PNG through stdin and reading plain
//! text back from stdout.  Recognition is blocking and CPU-bound, so async
//! callers run it through `tokio::task::spawn_blocking`.

use std::io::Write;
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::capture::FrameImage;
use crate::config::OcrConfig;

// ---------------------------------------------------------------------------
// OcrError
// ---------------------------------------------------------------------------

/// Errors raised by a recognition attempt.
#[derive(Debug, Clone, Error)]
pub enum OcrError {
    /// The OCR binary could not be started (not installed, not on PATH).
    #[error("could not launch OCR command `{0}`: {1}")]
    Spawn(String, String),
    /// Feeding the image or collecting output failed mid-flight.
    #[error("OCR I/O error: {0}")]
    Io(String),
    /// The OCR process ran but exited unsuccessfully.
    #[error("OCR failed ({status}): {stderr}")]
    Failed { status: String, stderr: String },
    /// The OCR process printed bytes that are not valid UTF-8.
    #[error("OCR produced non-UTF-8 output")]
    InvalidOutput,
}

// ---------------------------------------------------------------------------
// Recognizer trait
// ---------------------------------------------------------------------------

/// Extracts text from a PNG-encoded frame.
///
/// Returning an empty (or whitespace-only) string is *not* an error: it means
/// the frame genuinely contained no text, and the pipeline treats the run as
/// complete without asking anything.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &FrameImage) -> Result<String, OcrError>;
}

// Compile-time proof that the trait stays object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Recognizer>) {}
};

// ---------------------------------------------------------------------------
// TesseractRecognizer
// ---------------------------------------------------------------------------

/// `Recognizer` backed by the Tesseract CLI.
///
/// Invocation: `<command> stdin stdout -l <language>` with the PNG written to
/// the child's stdin.  No temp files touch the disk.
pub struct TesseractRecognizer {
    command: String,
    language: String,
}

impl TesseractRecognizer {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            language: config.language.clone(),
        }
    }

    /// Run `<command> --version` and return the first banner line.
    ///
    /// Called once at startup so a missing Tesseract install is logged before
    /// the first pipeline run trips over it.
    pub fn probe(&self) -> Result<String, OcrError> {
        let output = Command::new(&self.command)
            .arg("--version")
            .output()
            .map_err(|e| OcrError::Spawn(self.command.clone(), e.to_string()))?;

        // Older Tesseract releases print the version banner on stderr.
        let banner = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        let text = String::from_utf8_lossy(&banner);
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, image: &FrameImage) -> Result<String, OcrError> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OcrError::Spawn(self.command.clone(), e.to_string()))?;

        // Write the PNG, then drop the handle so the child sees EOF.
        // Tesseract reads the whole image before producing any output, so
        // write-then-collect cannot deadlock on the pipe.
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(&image.data) {
                drop(stdin);
                let _ = child.wait();
                return Err(OcrError::Io(e.to_string()));
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::Io(e.to_string()))?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8(output.stdout).map_err(|_| OcrError::InvalidOutput)?;
        Ok(text.trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// Mock (tests only)
// ---------------------------------------------------------------------------

/// Canned `Recognizer` for pipeline tests.  Counts invocations so tests can
/// assert which paths reached recognition at all.
#[cfg(test)]
pub struct MockRecognizer {
    result: Result<String, OcrError>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockRecognizer {
    pub fn ok(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn err(error: OcrError) -> Self {
        Self {
            result: Err(error),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl Recognizer for MockRecognizer {
    fn recognize(&self, image: &FrameImage) -> Result<String, OcrError> {
        // Contract check: the pipeline never feeds an empty image.
        assert!(!image.data.is_empty(), "recognizer fed an empty image");
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.result.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> FrameImage {
        FrameImage {
            data: vec![0x89, b'P', b'N', b'G'],
            width: 4,
            height: 4,
        }
    }

    #[test]
    fn missing_binary_reports_spawn_error() {
        let recognizer = TesseractRecognizer::from_config(&OcrConfig {
            command: "/definitely/not/a/real/ocr-binary".into(),
            language: "eng".into(),
        });
        assert!(matches!(
            recognizer.recognize(&frame()),
            Err(OcrError::Spawn(_, _))
        ));
    }

    #[test]
    fn probe_missing_binary_reports_spawn_error() {
        let recognizer = TesseractRecognizer::from_config(&OcrConfig {
            command: "/definitely/not/a/real/ocr-binary".into(),
            language: "eng".into(),
        });
        assert!(matches!(recognizer.probe(), Err(OcrError::Spawn(_, _))));
    }

    #[test]
    fn mock_returns_canned_text() {
        let recognizer = MockRecognizer::ok("what is 2 + 2?");
        let text = recognizer.recognize(&frame()).expect("recognize");
        assert_eq!(text, "what is 2 + 2?");
        assert_eq!(recognizer.calls(), 1);
    }

    #[test]
    fn mock_returns_canned_error() {
        let recognizer = MockRecognizer::err(OcrError::InvalidOutput);
        assert!(matches!(
            recognizer.recognize(&frame()),
            Err(OcrError::InvalidOutput)
        ));
    }

    #[test]
    fn recognizer_is_object_safe() {
        let boxed: Box<dyn Recognizer> = Box::new(MockRecognizer::ok("x"));
        assert!(boxed.recognize(&frame()).is_ok());
    }
}
