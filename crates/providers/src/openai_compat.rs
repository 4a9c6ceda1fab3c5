//! OpenAI-compatible streaming provider.
//!
//! Works with OpenAI and any endpoint exposing `/v1/chat/completions` with
//! server-sent events. The provider only translates wire chunks into
//! [`StreamEvent`]s; reassembling tool calls is the aggregator's job.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use shopchat_config::AppConfig;
use shopchat_core::error::TransportError;
use shopchat_core::message::PromptMessage;
use shopchat_core::provider::*;
use shopchat_core::tool::FunctionDeclaration;
use tracing::{debug, trace, warn};

const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// An OpenAI-compatible streaming provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create a provider from the loaded configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        if !config.has_api_key() {
            warn!(
                base_url = %config.base_url,
                "No API key configured, requests will be unauthenticated"
            );
        }
        Self::new(
            "openai",
            config.base_url.as_str(),
            config.api_key.clone().unwrap_or_default(),
        )
    }

    /// System prompt first, then the flattened history.
    fn to_api_messages(system: &str, messages: &[PromptMessage]) -> Vec<ApiMessage> {
        std::iter::once(ApiMessage {
            role: "system".into(),
            content: system.to_string(),
        })
        .chain(messages.iter().map(|m| ApiMessage {
            role: m.role.as_str().into(),
            content: m.content.clone(),
        }))
        .collect()
    }

    /// Convert tool declarations to OpenAI API format.
    fn to_api_tools(tools: &[FunctionDeclaration]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": Self::to_api_messages(&request.system, &request.messages),
            "stream": true,
        });

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        body
    }
}

/// Map a non-200 HTTP status to a transport error.
fn status_error(status: u16, retry_after: Option<u64>, body: String) -> TransportError {
    match status {
        401 | 403 => TransportError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        429 => TransportError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        _ => TransportError::Api {
            status_code: status,
            message: body,
        },
    }
}

/// Payload of an SSE `data:` line, if the line carries one.
fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

/// Translate one `data: {...}` payload into stream events.
///
/// Text comes first, then tool-call fragments, then the finish signal, which
/// mirrors the order the fields take effect within one chunk.
fn decode_chunk(data: &str) -> Result<Vec<StreamEvent>, TransportError> {
    let chunk: StreamResponse = serde_json::from_str(data)
        .map_err(|e| TransportError::MalformedPayload(format!("{e}: {data}")))?;

    if let Some(error) = chunk.error {
        return Err(TransportError::Api {
            status_code: 200,
            message: error.message,
        });
    }

    let mut events = Vec::new();
    let Some(choice) = chunk.choices.unwrap_or_default().into_iter().next() else {
        return Ok(events);
    };
    let delta = choice.delta.unwrap_or_default();

    if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
        events.push(StreamEvent::TextDelta { text: content });
    }

    for tc in delta.tool_calls.unwrap_or_default() {
        let Some(index) = tc.index.and_then(|i| u32::try_from(i).ok()) else {
            warn!(index = ?tc.index, "Ignoring tool call delta without a usable index");
            continue;
        };
        let (name_fragment, arguments_fragment) = match tc.function {
            Some(f) => (f.name, f.arguments),
            None => (None, None),
        };
        events.push(StreamEvent::ToolCallDelta(ToolCallDelta {
            index,
            id: tc.id,
            name_fragment,
            arguments_fragment,
        }));
    }

    if let Some(reason) = choice.finish_reason {
        events.push(StreamEvent::Finish { reason });
    }

    Ok(events)
}

#[async_trait]
impl shopchat_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, request: CompletionRequest) -> Result<EventReceiver, TransportError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending streaming request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status != 200 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider streaming error");
            return Err(status_error(status, retry_after, error_body));
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Read the SSE byte stream; the task ends when the receiver is dropped
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(TransportError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.extend_from_slice(&bytes);

                // Lines are split on raw bytes so multi-byte characters can straddle chunks
                while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                    let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                    let line = String::from_utf8_lossy(&raw);
                    let line = line.trim_end_matches(['\r', '\n']);

                    // Skip empty lines, comments and non-data fields
                    let Some(data) = sse_data(line) else {
                        continue;
                    };

                    if data == "[DONE]" {
                        trace!(provider = %provider_name, "Stream completed");
                        return;
                    }

                    match decode_chunk(data) {
                        Ok(events) => {
                            for event in events {
                                if tx.send(Ok(event)).await.is_err() {
                                    return; // receiver dropped
                                }
                            }
                        }
                        Err(e) => {
                            warn!(provider = %provider_name, error = %e, "Bad SSE chunk");
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }

            trace!(provider = %provider_name, "Stream body ended without [DONE]");
        });

        Ok(rx)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Option<Vec<StreamChoice>>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call delta: arrives incrementally across chunks.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    #[serde(default)]
    index: Option<i64>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}
