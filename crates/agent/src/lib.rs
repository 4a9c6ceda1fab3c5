//! # ShopChat Agent
//!
//! Streams one conversation turn through a provider and reduces the
//! response into live text notifications plus a single assistant message.
//!
//! ```text
//! history ─┐
//! tools   ─┼─> CompletionRequest ─> Provider ─> StreamEvents ─> aggregate ─> finalize ─> dispatch
//! prompt  ─┘                                                     (on_text)              (on_message, on_tool_use)
//! ```

pub mod aggregator;
pub mod finalize;
pub mod handlers;
pub mod history;
pub mod service;
pub mod tools;

pub use aggregator::{AggregationState, MAX_TOOL_CALLS, Step, ToolCallAccumulator, aggregate};
pub use finalize::{Finalized, STOP_REASON, dispatch, finalize};
pub use handlers::{NoopHandlers, StreamHandlers};
pub use history::adapt_history;
pub use service::{ChatService, ConversationRequest};
pub use tools::{GENERIC_HINT, adapt_tools, keyword_hint};
