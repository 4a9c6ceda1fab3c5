//! Flattening caller history into the upstream role/text shape.
//!
//! The conversion is lossy on purpose: anything that is not a text block is
//! sent as its JSON text, so tool-use and tool-result blocks from earlier
//! turns still reach the model in a readable form.

use serde_json::Value;
use shopchat_core::message::{HistoryMessage, PromptMessage, Role};

/// Adapt caller history, preserving order.
pub fn adapt_history(messages: &[HistoryMessage]) -> Vec<PromptMessage> {
    messages
        .iter()
        .map(|m| PromptMessage {
            role: adapt_role(&m.role),
            content: content_text(&m.content),
        })
        .collect()
}

/// `assistant` stays assistant; every other role is sent as `user`.
fn adapt_role(role: &str) -> Role {
    if role == "assistant" {
        Role::Assistant
    } else {
        Role::User
    }
}

fn content_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(item_text).collect::<Vec<_>>().join("\n"),
        other => other.to_string(),
    }
}

fn item_text(item: &Value) -> String {
    if item.get("type").and_then(Value::as_str) != Some("text") {
        return item.to_string();
    }
    match item.get("text") {
        Some(Value::String(text)) => text.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}
