//! Bearer-token decoding and the sign-in gate.
//!
//! Tokens are compact JWS strings (`header.payload.signature`).  Only the
//! payload is inspected: the `exp` claim decides validity, and no signature
//! verification happens on this side.  The answer backend verifies; this
//! gate just keeps doomed requests from being fired.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

// ---------------------------------------------------------------------------
// AuthError
// ---------------------------------------------------------------------------

/// Errors raised while decoding or validating a token.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The string is not three dot-separated parts.
    #[error("token is not a valid compact JWS")]
    Malformed,
    /// The payload part is not valid base64url.
    #[error("token payload is not valid base64url: {0}")]
    PayloadEncoding(String),
    /// The payload decodes but is not a JSON claims object.
    #[error("token payload is not valid JSON: {0}")]
    PayloadJson(String),
    /// The claims object carries no `exp` field.
    #[error("token has no expiry claim")]
    MissingExpiry,
    /// The token's expiry instant is already in the past.
    #[error("token expired at {0} (unix seconds)")]
    Expired(u64),
}

// ---------------------------------------------------------------------------
// AuthToken
// ---------------------------------------------------------------------------

/// Claims we care about.  Everything else in the payload is ignored.
#[derive(Debug, Clone, Deserialize)]
struct Claims {
    exp: Option<u64>,
    #[serde(default)]
    email: Option<String>,
}

/// A decoded bearer token.
#[derive(Debug, Clone)]
pub struct AuthToken {
    raw: String,
    exp: u64,
    email: Option<String>,
}

impl AuthToken {
    /// Decode the payload of a compact JWS string.
    ///
    /// Succeeds for expired tokens too; expiry is a separate question
    /// answered by [`AuthToken::is_expired_at`].
    pub fn decode(raw: &str) -> Result<Self, AuthError> {
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() != 3 {
            return Err(AuthError::Malformed);
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|e| AuthError::PayloadEncoding(e.to_string()))?;
        let claims: Claims =
            serde_json::from_slice(&bytes).map_err(|e| AuthError::PayloadJson(e.to_string()))?;
        let exp = claims.exp.ok_or(AuthError::MissingExpiry)?;

        Ok(Self {
            raw: raw.to_string(),
            exp,
            email: claims.email,
        })
    }

    /// The compact string exactly as handed over at sign-in.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// `email` claim, when the issuer included one.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Expiry instant in unix seconds.
    pub fn expires_at_unix(&self) -> u64 {
        self.exp
    }

    /// Whether the token is expired as of `now`.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        now >= UNIX_EPOCH + Duration::from_secs(self.exp)
    }
}

// ---------------------------------------------------------------------------
// AuthGate
// ---------------------------------------------------------------------------

/// Holds the active token, if any, and answers "are we signed in?".
///
/// The expiry check runs against the wall clock on every query, so a token
/// that lapses mid-session flips the gate without any explicit event.
#[derive(Debug, Default)]
pub struct AuthGate {
    token: Option<AuthToken>,
}

impl AuthGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a token.  Malformed and already-expired tokens are
    /// rejected and the gate keeps its previous token.
    pub fn store(&mut self, raw: &str) -> Result<(), AuthError> {
        let token = AuthToken::decode(raw)?;
        if token.is_expired_at(SystemTime::now()) {
            return Err(AuthError::Expired(token.expires_at_unix()));
        }
        self.token = Some(token);
        Ok(())
    }

    /// Forget the active token.
    pub fn clear(&mut self) {
        self.token = None;
    }

    /// Signed in with a token that is still valid right now?
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(SystemTime::now())
    }

    /// Clock-injectable variant of [`AuthGate::is_authenticated`].
    pub fn is_authenticated_at(&self, now: SystemTime) -> bool {
        self.token.as_ref().is_some_and(|t| !t.is_expired_at(now))
    }

    /// The active token, expired or not.
    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Build an unsigned token with the given `exp` claim.  The signature part is
/// junk, which is fine: only the payload is decoded.
#[cfg(test)]
pub fn test_token(exp_unix: u64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({ "exp": exp_unix, "email": "dev@example.com" }).to_string(),
    );
    format!("{header}.{payload}.sig")
}

/// Unix seconds for "now + offset", for building test tokens.
#[cfg(test)]
pub fn unix_now_plus(offset_secs: i64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_secs() as i64;
    (now + offset_secs).max(0) as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
