//! Screen frame acquisition.
//!
//! Two seams: `ScreenCapture` hands out a live `FrameSource` (one per capture
//! session), and the `FrameSource` yields PNG-encoded still frames on demand.
//! The production implementation reads the primary monitor through `xcap`;
//! tests substitute in-memory sources.

use std::sync::Arc;

use thiserror::Error;
use xcap::image::codecs::png::PngEncoder;
use xcap::image::{ExtendedColorType, ImageEncoder, RgbaImage};
use xcap::Monitor;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors raised while requesting a source or grabbing a frame.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    /// The platform refused to hand out a capture source at all.  Surfaced
    /// to the user as a blocking notice.
    #[error("screen capture unavailable: {0}")]
    PermissionDenied(String),
    /// The source exists but has nothing to paint yet (zero-sized frame).
    /// Transient; the next attempt may succeed.
    #[error("frame source is not ready")]
    NotReady,
    /// Grabbing or encoding the frame failed.
    #[error("frame capture failed: {0}")]
    Failed(String),
}

// ---------------------------------------------------------------------------
// FrameImage
// ---------------------------------------------------------------------------

/// A still frame grabbed from a live source, PNG-encoded.
#[derive(Debug, Clone)]
pub struct FrameImage {
    /// PNG bytes, ready to pipe into the OCR command.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A live source of frames, held for the lifetime of a capture session.
pub trait FrameSource: Send + Sync {
    /// Current frame dimensions in pixels; `(0, 0)` while the source has
    /// nothing to show.
    fn dimensions(&self) -> (u32, u32);

    /// Grab a still image of the current frame.  Synchronous and quick; the
    /// pipeline treats any error here as "not ready yet" and stays silent.
    fn snapshot(&self) -> Result<FrameImage, CaptureError>;
}

/// Hands out frame sources.  Called once when the user starts a capture
/// session; the returned source lives until the session ends.
pub trait ScreenCapture: Send + Sync {
    fn request(&self) -> Result<Arc<dyn FrameSource>, CaptureError>;
}

// Compile-time proof that both traits stay object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn FrameSource>, _: Box<dyn ScreenCapture>) {}
};

// ---------------------------------------------------------------------------
// Primary-display implementation (xcap)
// ---------------------------------------------------------------------------

/// `ScreenCapture` backed by the platform's monitor list.
///
/// `request` probes the monitor enumeration, so a permission problem
/// surfaces here at session start rather than inside a later pipeline run.
pub struct PrimaryDisplayCapture;

impl ScreenCapture for PrimaryDisplayCapture {
    fn request(&self) -> Result<Arc<dyn FrameSource>, CaptureError> {
        let monitors =
            Monitor::all().map_err(|e| CaptureError::PermissionDenied(e.to_string()))?;
        if monitors.is_empty() {
            return Err(CaptureError::PermissionDenied(
                "no monitors available".into(),
            ));
        }
        Ok(Arc::new(DisplaySource))
    }
}

/// `FrameSource` reading the primary monitor.
///
/// Monitors are re-enumerated per call rather than cached: displays can come
/// and go while a session is open, and a cached `Monitor` handle goes stale
/// when that happens.
pub struct DisplaySource;

impl DisplaySource {
    fn grab_primary() -> Result<RgbaImage, CaptureError> {
        let monitors = Monitor::all().map_err(|e| CaptureError::Failed(e.to_string()))?;
        let monitor = monitors.first().ok_or(CaptureError::NotReady)?;
        monitor
            .capture_image()
            .map_err(|e| CaptureError::Failed(e.to_string()))
    }
}

impl FrameSource for DisplaySource {
    fn dimensions(&self) -> (u32, u32) {
        match Monitor::all() {
            Ok(monitors) => monitors
                .first()
                .map(|m| (m.width(), m.height()))
                .unwrap_or((0, 0)),
            Err(_) => (0, 0),
        }
    }

    fn snapshot(&self) -> Result<FrameImage, CaptureError> {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return Err(CaptureError::NotReady);
        }

        let image = Self::grab_primary()?;
        let data = encode_png(&image)?;
        Ok(FrameImage {
            data,
            width: image.width(),
            height: image.height(),
        })
    }
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CaptureError> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| CaptureError::Failed(e.to_string()))?;
    Ok(buffer)
}

// ---------------------------------------------------------------------------
// Mock (tests only)
// ---------------------------------------------------------------------------

/// In-memory `FrameSource` for pipeline tests: either yields a fixed-size
/// fake PNG, reports a blank (not ready) frame, or fails outright.
#[cfg(test)]
pub struct MockFrameSource {
    width: u32,
    height: u32,
    fail: bool,
}

#[cfg(test)]
impl MockFrameSource {
    /// A source with a frame to hand out.
    pub fn ready(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fail: false,
        }
    }

    /// A source that has nothing to paint yet.
    pub fn blank() -> Self {
        Self {
            width: 0,
            height: 0,
            fail: false,
        }
    }

    /// A source whose snapshot attempt always errors.
    pub fn failing() -> Self {
        Self {
            width: 800,
            height: 600,
            fail: true,
        }
    }
}

#[cfg(test)]
impl FrameSource for MockFrameSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn snapshot(&self) -> Result<FrameImage, CaptureError> {
        if self.fail {
            return Err(CaptureError::Failed("synthetic capture failure".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::NotReady);
        }
        Ok(FrameImage {
            data: vec![0x89, b'P', b'N', b'G', 0, 0, 0, 0],
            width: self.width,
            height: self.height,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_source_reports_not_ready() {
        let source = MockFrameSource::blank();
        assert_eq!(source.dimensions(), (0, 0));
        assert!(matches!(source.snapshot(), Err(CaptureError::NotReady)));
    }

    #[test]
    fn ready_source_yields_a_frame() {
        let source = MockFrameSource::ready(1920, 1080);
        let frame = source.snapshot().expect("snapshot");
        assert_eq!((frame.width, frame.height), (1920, 1080));
        assert!(!frame.data.is_empty());
    }

    #[test]
    fn failing_source_reports_failed() {
        let source = MockFrameSource::failing();
        assert!(matches!(source.snapshot(), Err(CaptureError::Failed(_))));
    }

    #[test]
    fn encode_png_produces_a_png_header() {
        let image = RgbaImage::new(4, 4);
        let bytes = encode_png(&image).expect("encode");
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn error_messages_are_user_presentable() {
        let denied = CaptureError::PermissionDenied("os said no".into());
        assert!(denied.to_string().contains("unavailable"));
        assert!(CaptureError::NotReady.to_string().contains("not ready"));
    }
}
