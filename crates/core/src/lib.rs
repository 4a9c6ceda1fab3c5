//! # ShopChat Core
//!
//! Domain types, traits, and error definitions shared by every ShopChat crate.
//! This crate has **no transport dependencies**; it defines the shapes that
//! flow between the request adapters, the stream aggregator, and providers.
//!
//! ## Layout
//!
//! - [`message`]: conversation messages and their content blocks
//! - [`tool`]: tool descriptors and the function declarations sent upstream
//! - [`provider`]: streamed response events and the `Provider` trait
//! - [`error`]: transport and tool-call error taxonomy

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{MalformedToolCallError, TransportError, TransportErrorKind};
pub use message::{
    ContentBlock, ConversationMessage, HistoryMessage, MessageContent, PromptMessage, Role,
    TextBlock, ToolUseBlock,
};
pub use provider::{CompletionRequest, EventReceiver, Provider, StreamEvent, ToolCallDelta};
pub use tool::{FunctionDeclaration, ToolDescriptor};
