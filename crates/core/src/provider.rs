//! Provider trait: the abstraction over streaming completion backends.
//!
//! A Provider knows how to send an assembled request to a remote model and
//! hand back the response as an ordered channel of [`StreamEvent`]s.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::TransportError;
use crate::message::PromptMessage;
use crate::tool::FunctionDeclaration;

/// A fully assembled outbound request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "gpt-4o-mini")
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Resolved system prompt text
    pub system: String,

    /// Flattened conversation history
    pub messages: Vec<PromptMessage>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<FunctionDeclaration>,
}

/// A partial tool call. Several deltas with the same `index` make up one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_fragment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments_fragment: Option<String>,
}

/// One incremental event of a streamed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A text fragment.
    TextDelta { text: String },

    /// A fragment of a tool call.
    ToolCallDelta(ToolCallDelta),

    /// The model finished; nothing after this belongs to the response.
    Finish { reason: String },
}

impl StreamEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }

    pub fn finish(reason: impl Into<String>) -> Self {
        Self::Finish {
            reason: reason.into(),
        }
    }
}

/// Receiving half of a streamed response.
pub type EventReceiver = tokio::sync::mpsc::Receiver<Result<StreamEvent, TransportError>>;

/// The core Provider trait.
///
/// The chat service calls `stream()` without knowing which backend answers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and get the response as an ordered event channel.
    ///
    /// Failures before the first event (auth, rate limit, HTTP status) are
    /// returned directly; failures mid-stream arrive as `Err` items.
    async fn stream(&self, request: CompletionRequest) -> Result<EventReceiver, TransportError>;
}
