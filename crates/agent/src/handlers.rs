//! Callbacks invoked while a conversation streams.
//!
//! Every method has a no-op default, so a handler only implements the
//! notifications it cares about.

use async_trait::async_trait;
use shopchat_core::message::{ConversationMessage, ToolUseBlock};

/// Receives live text, the finished message, and tool-use requests.
///
/// Call order for one response: `on_text` for each fragment as it arrives,
/// then `on_message` once, then `on_tool_use` for each tool-use block in
/// message order. Each `on_tool_use` completes before the next starts.
#[async_trait]
pub trait StreamHandlers: Send {
    fn on_text(&mut self, _fragment: &str) {}

    fn on_message(&mut self, _message: &ConversationMessage) {}

    async fn on_tool_use(&mut self, _block: &ToolUseBlock) {}
}

/// Handlers that ignore everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandlers;

impl StreamHandlers for NoopHandlers {}
