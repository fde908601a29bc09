//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ProviderConfig
// ---------------------------------------------------------------------------

/// Settings for the answer backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the backend that fans questions out to the model vendors.
    ///
    /// The vendor route (`/api/deepseek` or `/api/chatgpt`) is appended per
    /// request based on the selected model identifier.
    pub base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// OcrConfig
// ---------------------------------------------------------------------------

/// Settings for the text-recognition step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Executable invoked for OCR.  Must accept a PNG on stdin and print the
    /// recognized text on stdout (`tesseract stdin stdout` compatible).
    pub command: String,
    /// Recognition language passed to the OCR command (e.g. `"eng"`).
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: "tesseract".into(),
            language: "eng".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Settings for screen capture and the auto-solve timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Auto-solve timer period in seconds.  The settings screen offers
    /// 15 – 300 in steps of 15; any stored value below 1 is lifted to 1 when
    /// the scheduler picks it up.
    pub interval_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Appearance and last-session display state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Dark colour scheme when `true`, light otherwise.
    pub dark_mode: bool,
    /// Most recent answer, restored into the answer pane on the next launch.
    pub last_answer: Option<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            dark_mode: false,
            last_answer: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AuthConfig
// ---------------------------------------------------------------------------

/// Persisted sign-in state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Raw bearer token from the last sign-in.  Re-validated (expiry check)
    /// on startup; a stale token is dropped rather than trusted.
    pub token: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { token: None }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// Auto mode and the selected model are not persisted: both reset to their
/// defaults on every launch.
///
/// # Persistence
///
/// ```rust,no_run
/// use screen_solver::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Answer backend settings.
    pub provider: ProviderConfig,
    /// Text-recognition settings.
    pub ocr: OcrConfig,
    /// Capture / auto-solve timer settings.
    pub capture: CaptureConfig,
    /// Appearance and last-session display state.
    pub ui: UiConfig,
    /// Persisted sign-in state.
    pub auth: AuthConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            ocr: OcrConfig::default(),
            capture: CaptureConfig::default(),
            ui: UiConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
