//! Stream aggregation: folding response events into one terminal state.
//!
//! The aggregator is a two-state machine. It stays `Open` while events
//! arrive and becomes `Closed` on the first `Finish` event or when the
//! sequence runs out. Text fragments are forwarded to the live-text observer
//! as they arrive; tool-call fragments are buffered per index and only
//! parsed later, by the finalizer.

use std::collections::BTreeMap;

use futures::{Stream, StreamExt};
use shopchat_core::error::TransportError;
use shopchat_core::provider::{StreamEvent, ToolCallDelta};
use tracing::{debug, trace, warn};

/// Highest number of distinct tool calls accepted in one response.
/// Deltas with `index >= MAX_TOOL_CALLS` are dropped.
pub const MAX_TOOL_CALLS: u32 = 128;

/// Reassembles one tool call from its fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallAccumulator {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Result of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Still open; keep reading.
    Continue,
    /// A terminal event was seen; stop reading.
    Finished,
}

/// Per-response aggregation state. Never shared across responses.
#[derive(Debug)]
pub struct AggregationState {
    text: String,
    tool_calls: BTreeMap<u32, ToolCallAccumulator>,
    terminal: bool,
    finish_reason: Option<String>,
    /// Distinguishes synthesized call ids of this response
    nonce: String,
}

impl AggregationState {
    pub fn new() -> Self {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        Self::with_nonce(&nonce[..12])
    }

    /// State whose synthesized ids use a fixed `nonce`.
    pub fn with_nonce(nonce: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            tool_calls: BTreeMap::new(),
            terminal: false,
            finish_reason: None,
            nonce: nonce.into(),
        }
    }

    /// Apply one event. `on_text` receives each text fragment as-is.
    ///
    /// Once closed, further events are ignored.
    pub fn apply(&mut self, event: StreamEvent, on_text: &mut impl FnMut(&str)) -> Step {
        if self.terminal {
            trace!("Ignoring event after terminal state");
            return Step::Finished;
        }

        match event {
            StreamEvent::TextDelta { text } => {
                on_text(&text);
                self.text.push_str(&text);
                Step::Continue
            }
            StreamEvent::ToolCallDelta(delta) => {
                self.apply_tool_delta(delta);
                Step::Continue
            }
            StreamEvent::Finish { reason } => {
                debug!(reason = %reason, "Finish event received");
                self.finish_reason = Some(reason);
                self.terminal = true;
                Step::Finished
            }
        }
    }

    fn apply_tool_delta(&mut self, delta: ToolCallDelta) {
        if delta.index >= MAX_TOOL_CALLS {
            warn!(
                index = delta.index,
                max = MAX_TOOL_CALLS,
                "Dropping tool call delta with out-of-range index"
            );
            return;
        }

        let nonce = &self.nonce;
        let acc = self.tool_calls.entry(delta.index).or_insert_with(|| {
            let id = delta
                .id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{nonce}_{}", delta.index));
            trace!(index = delta.index, id = %id, "New tool call");
            ToolCallAccumulator {
                id,
                ..Default::default()
            }
        });

        if let Some(name) = delta.name_fragment {
            acc.name.push_str(&name);
        }
        if let Some(arguments) = delta.arguments_fragment {
            acc.arguments.push_str(&arguments);
        }
    }

    /// Close on sequence exhaustion. Idempotent.
    pub fn close(&mut self) {
        self.terminal = true;
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Reason carried by the `Finish` event, if one was seen.
    pub fn finish_reason(&self) -> Option<&str> {
        self.finish_reason.as_deref()
    }

    /// Tool call accumulators in ascending index order.
    pub fn tool_calls(&self) -> impl Iterator<Item = (u32, &ToolCallAccumulator)> {
        self.tool_calls.iter().map(|(index, acc)| (*index, acc))
    }

    pub(crate) fn into_parts(self) -> (String, BTreeMap<u32, ToolCallAccumulator>) {
        (self.text, self.tool_calls)
    }
}

impl Default for AggregationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Consume `events` until a `Finish` event or exhaustion.
///
/// Events after `Finish` are never polled. Any error item aborts aggregation
/// and the partial state is dropped.
pub async fn aggregate<S>(
    events: S,
    on_text: impl FnMut(&str),
) -> Result<AggregationState, TransportError>
where
    S: Stream<Item = Result<StreamEvent, TransportError>> + Unpin,
{
    aggregate_into(AggregationState::new(), events, on_text).await
}

/// Like [`aggregate`], starting from a caller-provided state.
pub async fn aggregate_into<S>(
    mut state: AggregationState,
    mut events: S,
    mut on_text: impl FnMut(&str),
) -> Result<AggregationState, TransportError>
where
    S: Stream<Item = Result<StreamEvent, TransportError>> + Unpin,
{
    while let Some(item) = events.next().await {
        if state.apply(item?, &mut on_text) == Step::Finished {
            break;
        }
    }
    state.close();
    Ok(state)
}
