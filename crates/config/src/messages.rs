//! User-facing error message templates.
//!
//! The chat layer renders these when a streamed response fails; the text is
//! configurable so storefronts can localize it.

use serde::{Deserialize, Serialize};
use shopchat_core::TransportErrorKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorMessages {
    pub missing_message: String,
    pub api_unsupported: String,
    pub auth_failed: String,
    pub api_key_error: String,
    pub rate_limit_exceeded: String,
    pub rate_limit_details: String,
    pub generic_error: String,
}

impl Default for ErrorMessages {
    fn default() -> Self {
        Self {
            missing_message: "Message is required".into(),
            api_unsupported: "This endpoint only supports server-sent events (SSE) requests or history requests.".into(),
            auth_failed: "Authentication failed with OpenAI API".into(),
            api_key_error: "Please check your OpenAI API key in environment variables".into(),
            rate_limit_exceeded: "Rate limit exceeded".into(),
            rate_limit_details: "Please try again later".into(),
            generic_error: "Failed to get response from OpenAI".into(),
        }
    }
}

impl ErrorMessages {
    /// Summary and detail lines for a failed stream.
    ///
    /// `error_text` is only used as the detail line for generic failures.
    pub fn for_kind(&self, kind: TransportErrorKind, error_text: &str) -> (String, String) {
        match kind {
            TransportErrorKind::Authentication => {
                (self.auth_failed.clone(), self.api_key_error.clone())
            }
            TransportErrorKind::RateLimit => (
                self.rate_limit_exceeded.clone(),
                self.rate_limit_details.clone(),
            ),
            TransportErrorKind::Generic => (self.generic_error.clone(), error_text.to_string()),
        }
    }
}
