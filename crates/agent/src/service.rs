//! The chat service: request assembly, streaming, finalization, dispatch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shopchat_config::{AppConfig, ConfigError, DEFAULT_MAX_TOKENS, PromptCatalog};
use shopchat_core::error::TransportError;
use shopchat_core::message::{ConversationMessage, HistoryMessage};
use shopchat_core::provider::{CompletionRequest, Provider};
use shopchat_core::tool::ToolDescriptor;
use shopchat_providers::OpenAiCompatProvider;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::aggregator::{AggregationState, aggregate};
use crate::finalize::{Finalized, dispatch, finalize};
use crate::handlers::StreamHandlers;
use crate::history::adapt_history;
use crate::tools::adapt_tools;

/// One conversation turn as supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationRequest {
    /// Conversation history, oldest first
    pub messages: Vec<HistoryMessage>,

    /// System prompt to use; the catalog default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_type: Option<String>,

    /// Tools the model may call
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

/// Streams conversations through a provider and reduces them to messages.
pub struct ChatService {
    /// The completion backend
    provider: Arc<dyn Provider>,

    /// System prompts by type
    prompts: PromptCatalog,

    /// The model to request
    model: String,

    /// Max tokens per response
    max_tokens: u32,
}

impl ChatService {
    /// Create a new chat service.
    pub fn new(
        provider: Arc<dyn Provider>,
        prompts: PromptCatalog,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            prompts,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Set the max tokens per response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    /// Build a service backed by the OpenAI-compatible provider.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let prompts = config.prompt_catalog()?;
        let provider = Arc::new(OpenAiCompatProvider::from_config(config));
        Ok(Self::new(provider, prompts, config.default_model.as_str())
            .with_max_tokens(config.max_tokens))
    }

    /// System prompt text for `prompt_type`, or the default prompt.
    pub fn system_prompt(&self, prompt_type: Option<&str>) -> &str {
        self.prompts
            .resolve(prompt_type.unwrap_or(self.prompts.default_type()))
    }

    /// Assemble the upstream request for one turn.
    pub fn build_request(&self, request: &ConversationRequest) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: self.system_prompt(request.prompt_type.as_deref()).to_string(),
            messages: adapt_history(&request.messages),
            tools: adapt_tools(&request.tools),
        }
    }

    /// Stream one turn and return the assistant's reply.
    ///
    /// Text fragments reach `handlers.on_text` as they arrive. After the
    /// stream closes, `on_message` runs once and then `on_tool_use` runs for
    /// each tool call in order. If the stream fails, the error is returned
    /// and neither `on_message` nor `on_tool_use` runs.
    pub async fn stream_conversation<H>(
        &self,
        request: ConversationRequest,
        handlers: &mut H,
    ) -> Result<ConversationMessage, TransportError>
    where
        H: StreamHandlers + ?Sized,
    {
        let completion = self.build_request(&request);
        debug!(
            provider = %self.provider.name(),
            model = %completion.model,
            prompt_type = ?request.prompt_type,
            messages = completion.messages.len(),
            tools = completion.tools.len(),
            "Starting conversation stream"
        );

        let state = match self.read_stream(completion, handlers).await {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    provider = %self.provider.name(),
                    kind = ?e.kind(),
                    error = %e,
                    "Conversation stream failed"
                );
                return Err(e);
            }
        };
        let finish_reason = state.finish_reason().map(String::from);

        let Finalized { message, discarded } = finalize(state);
        info!(
            finish_reason = ?finish_reason,
            blocks = message.blocks().len(),
            tool_uses = message.tool_uses().count(),
            discarded = discarded.len(),
            "Conversation stream finalized"
        );

        dispatch(&message, handlers).await;
        Ok(message)
    }

    async fn read_stream<H>(
        &self,
        completion: CompletionRequest,
        handlers: &mut H,
    ) -> Result<AggregationState, TransportError>
    where
        H: StreamHandlers + ?Sized,
    {
        let rx = self.provider.stream(completion).await?;
        aggregate(ReceiverStream::new(rx), |fragment| handlers.on_text(fragment)).await
    }
}
