//! Core `AnswerProvider` trait and `HttpAnswerProvider` implementation.
//!
//! The backend exposes one route per model vendor (`/api/deepseek`,
//! `/api/chatgpt`) behind a shared `{ question, model } → { answer }` wire
//! format.  All connection details come from [`ProviderConfig`]; nothing is
//! hardcoded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ProviderConfig;

// ---------------------------------------------------------------------------
// Model catalog
// ---------------------------------------------------------------------------

/// Model identifiers offered in the settings screen.  The first entry is the
/// launch default; the selection itself is session-only state.
pub const SUPPORTED_MODELS: [&str; 4] =
    ["deepseek-chat", "deepseek-reasoner", "gpt-4o", "o1-preview"];

/// Model every session starts on.
pub const DEFAULT_MODEL: &str = SUPPORTED_MODELS[0];

/// Backend route for a model identifier.
///
/// Routing is by vendor prefix: `deepseek*` models go to the DeepSeek route,
/// everything else to the ChatGPT route.
///
/// ```
/// use screen_solver::provider::endpoint_for;
///
/// assert_eq!(endpoint_for("deepseek-reasoner"), "/api/deepseek");
/// assert_eq!(endpoint_for("gpt-4o"), "/api/chatgpt");
/// ```
pub fn endpoint_for(model: &str) -> &'static str {
    if model.starts_with("deepseek") {
        "/api/deepseek"
    } else {
        "/api/chatgpt"
    }
}

// ---------------------------------------------------------------------------
// AskError
// ---------------------------------------------------------------------------

/// Errors that can occur while fetching an answer.
#[derive(Debug, Error)]
pub enum AskError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("answer backend rejected the request ({status}): {message}")]
    Api { status: u16, message: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse answer response: {0}")]
    Parse(String),

    /// The backend reported success but sent no usable answer text.
    #[error("answer backend returned an empty answer")]
    EmptyAnswer,
}

impl From<reqwest::Error> for AskError {
    fn from(e: reqwest::Error) -> Self {
        AskError::Request(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// AnswerProvider trait
// ---------------------------------------------------------------------------

/// Async trait for fetching an answer to a recognized question.
///
/// Implementors must be `Send + Sync` so they can be shared across threads
/// (e.g. wrapped in `Arc<dyn AnswerProvider>`).
///
/// # Arguments
/// * `question` – Recognized question text.  Never empty; the pipeline skips
///                the call entirely for blank recognitions.
/// * `model`    – Model identifier, normally one of [`SUPPORTED_MODELS`].
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    async fn ask(&self, question: &str, model: &str) -> Result<String, AskError>;
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    model: &'a str,
}

/// Success bodies carry `answer`; failure bodies carry `error`.  Both fields
/// are optional so a half-formed body still parses and gets classified by
/// the HTTP status.
#[derive(Debug, Deserialize)]
struct AskResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// ---------------------------------------------------------------------------
// HttpAnswerProvider
// ---------------------------------------------------------------------------

/// Calls the answer backend over HTTP.
///
/// # No request timeout
/// The client is built without a per-request timeout: reasoning models can
/// legitimately take minutes, and a pipeline run only settles when the call
/// resolves one way or the other.
pub struct HttpAnswerProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnswerProvider {
    /// Build a provider from application config.
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AnswerProvider for HttpAnswerProvider {
    /// POST `{ question, model }` to the vendor route for `model` and return
    /// the `answer` field of the body.
    async fn ask(&self, question: &str, model: &str) -> Result<String, AskError> {
        let url = format!("{}{}", self.base_url, endpoint_for(model));

        let response = self
            .client
            .post(&url)
            .json(&AskRequest { question, model })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Failure bodies are `{ "error": … }`, but a proxy in between may
            // hand back something else entirely; fall back to the status line.
            let message = response
                .json::<AskResponse>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(AskError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: AskResponse = response
            .json()
            .await
            .map_err(|e| AskError::Parse(e.to_string()))?;

        let answer = body
            .answer
            .map(|a| a.trim().to_string())
            .unwrap_or_default();
        if answer.is_empty() {
            return Err(AskError::EmptyAnswer);
        }

        Ok(answer)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_is_by_vendor_prefix() {
        assert_eq!(endpoint_for("deepseek-chat"), "/api/deepseek");
        assert_eq!(endpoint_for("deepseek-reasoner"), "/api/deepseek");
        assert_eq!(endpoint_for("gpt-4o"), "/api/chatgpt");
        assert_eq!(endpoint_for("o1-preview"), "/api/chatgpt");
        // Unknown identifiers fall through to the ChatGPT route.
        assert_eq!(endpoint_for("mystery-model"), "/api/chatgpt");
    }

    #[test]
    fn default_model_is_in_the_catalog() {
        assert!(SUPPORTED_MODELS.contains(&DEFAULT_MODEL));
        assert_eq!(DEFAULT_MODEL, "deepseek-chat");
    }

    #[test]
    fn from_config_builds_without_panic() {
        let config = ProviderConfig::default();
        let _provider = HttpAnswerProvider::from_config(&config);
    }

    #[test]
    fn from_config_trims_trailing_slash() {
        let provider = HttpAnswerProvider::from_config(&ProviderConfig {
            base_url: "http://localhost:3000/".into(),
        });
        assert_eq!(provider.base_url, "http://localhost:3000");
    }

    #[test]
    fn request_serialises_to_the_wire_shape() {
        let request = AskRequest {
            question: "what is 2 + 2?",
            model: "deepseek-chat",
        };
        let value = serde_json::to_value(&request).expect("serialise");
        assert_eq!(
            value,
            serde_json::json!({ "question": "what is 2 + 2?", "model": "deepseek-chat" })
        );
    }

    #[test]
    fn response_parses_with_either_field_missing() {
        let ok: AskResponse = serde_json::from_str(r#"{ "answer": "4" }"#).expect("parse");
        assert_eq!(ok.answer.as_deref(), Some("4"));
        assert!(ok.error.is_none());

        let err: AskResponse = serde_json::from_str(r#"{ "error": "nope" }"#).expect("parse");
        assert!(err.answer.is_none());
        assert_eq!(err.error.as_deref(), Some("nope"));
    }

    /// Verify that `HttpAnswerProvider` is object-safe (usable as
    /// `dyn AnswerProvider`).
    #[test]
    fn provider_is_object_safe() {
        let provider: Box<dyn AnswerProvider> =
            Box::new(HttpAnswerProvider::from_config(&ProviderConfig::default()));
        drop(provider);
    }
}
