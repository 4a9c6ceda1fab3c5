//! Message and content block domain types.
//!
//! Caller history arrives as loosely-typed [`HistoryMessage`]s, is flattened
//! into [`PromptMessage`]s for the upstream request, and the streamed reply is
//! materialized as a [`ConversationMessage`] made of [`ContentBlock`]s.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (also covers system and tool-result roles after adaptation)
    User,
    /// The AI assistant
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Plain text payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
}

/// A tool invocation requested by the model.
///
/// `input` is always parsed JSON; calls whose arguments failed to parse are
/// never turned into a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUseBlock {
    /// Call ID (from the provider, or synthesized per response)
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Parsed arguments
    pub input: Value,
}

/// One unit of a finalized message's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(TextBlock),
    ToolUse(ToolUseBlock),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextBlock { text: text.into() })
    }

    pub fn as_tool_use(&self) -> Option<&ToolUseBlock> {
        match self {
            Self::ToolUse(block) => Some(block),
            Self::Text(_) => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Text(block) => json!({ "type": "text", "text": block.text }),
            Self::ToolUse(block) => json!({
                "type": "tool_use",
                "id": block.id,
                "name": block.name,
                "input": block.input,
            }),
        }
    }
}

/// Message payload: either bare text or an ordered list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A single, immutable message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Who sent this message
    pub role: Role,

    /// The payload
    pub content: MessageContent,

    /// Why generation stopped (set on synthesized assistant replies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

impl ConversationMessage {
    /// Create a plain-text user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
            stop_reason: None,
        }
    }

    /// Create an assistant reply from finalized blocks.
    pub fn assistant(blocks: Vec<ContentBlock>, stop_reason: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
            stop_reason: Some(stop_reason.into()),
        }
    }

    /// The content blocks (empty for bare-text messages).
    pub fn blocks(&self) -> &[ContentBlock] {
        match &self.content {
            MessageContent::Blocks(blocks) => blocks,
            MessageContent::Text(_) => &[],
        }
    }

    /// Tool-use blocks, in message order.
    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolUseBlock> {
        self.blocks().iter().filter_map(ContentBlock::as_tool_use)
    }

    /// All text carried by the message, concatenated.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text(t) => Some(t.text.as_str()),
                    ContentBlock::ToolUse(_) => None,
                })
                .collect(),
        }
    }
}

/// Caller-supplied history entry with an arbitrary role and JSON content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: Value,
}

impl HistoryMessage {
    pub fn new(role: impl Into<String>, content: impl Into<Value>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

impl From<&ConversationMessage> for HistoryMessage {
    fn from(message: &ConversationMessage) -> Self {
        let content = match &message.content {
            MessageContent::Text(text) => Value::String(text.clone()),
            MessageContent::Blocks(blocks) => {
                Value::Array(blocks.iter().map(ContentBlock::to_value).collect())
            }
        };
        Self {
            role: message.role.as_str().to_string(),
            content,
        }
    }
}

/// A flattened history entry as sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}
