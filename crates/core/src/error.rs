//! Error types for the ShopChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Transport failures abort a streamed response; malformed tool calls are
//! recovered locally by the finalizer.

use thiserror::Error;

/// Coarse classification of a [`TransportError`], used by callers to pick
/// a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Authentication,
    RateLimit,
    Generic,
}

/// Failures raised while requesting or reading a streamed completion.
///
/// None of these are recoverable inside the aggregator; they propagate to
/// the caller unchanged.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Malformed upstream payload: {0}")]
    MalformedPayload(String),
}

impl TransportError {
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Self::AuthenticationFailed(_) => TransportErrorKind::Authentication,
            Self::RateLimited { .. } => TransportErrorKind::RateLimit,
            _ => TransportErrorKind::Generic,
        }
    }
}

/// A tool call whose accumulated arguments are not valid JSON.
///
/// Produced during finalization; the offending call is dropped from the
/// message and never dispatched.
#[derive(Debug, Error)]
#[error("Malformed arguments for tool call {id} ({name}): {source}")]
pub struct MalformedToolCallError {
    pub id: String,
    pub name: String,
    pub arguments: String,
    #[source]
    pub source: serde_json::Error,
}
