//! Finalization and callback dispatch.
//!
//! Turns a closed [`AggregationState`] into the assistant's reply and then
//! hands that reply to the caller's handlers.

use shopchat_core::error::MalformedToolCallError;
use shopchat_core::message::{ContentBlock, ConversationMessage, ToolUseBlock};
use tracing::{debug, warn};

use crate::aggregator::AggregationState;
use crate::handlers::StreamHandlers;

/// Stop reason recorded on every synthesized reply.
pub const STOP_REASON: &str = "end_turn";

/// The finished reply plus the tool calls that had to be dropped.
#[derive(Debug)]
pub struct Finalized {
    pub message: ConversationMessage,
    pub discarded: Vec<MalformedToolCallError>,
}

/// Build the reply: text first, then parsed tool calls in index order.
///
/// Calls with an empty name or empty arguments are skipped. Calls whose
/// arguments are not valid JSON are dropped and reported in `discarded`.
pub fn finalize(state: AggregationState) -> Finalized {
    let (text, tool_calls) = state.into_parts();
    let mut blocks = Vec::with_capacity(tool_calls.len() + 1);
    let mut discarded = Vec::new();

    if !text.is_empty() {
        blocks.push(ContentBlock::text(text));
    }

    for (index, acc) in tool_calls {
        if acc.name.is_empty() || acc.arguments.is_empty() {
            debug!(index, id = %acc.id, "Skipping incomplete tool call");
            continue;
        }

        match serde_json::from_str(&acc.arguments) {
            Ok(input) => blocks.push(ContentBlock::ToolUse(ToolUseBlock {
                id: acc.id,
                name: acc.name,
                input,
            })),
            Err(source) => {
                let err = MalformedToolCallError {
                    id: acc.id,
                    name: acc.name,
                    arguments: acc.arguments,
                    source,
                };
                warn!(
                    index,
                    tool_call_id = %err.id,
                    tool = %err.name,
                    error = %err.source,
                    "Discarding tool call with malformed arguments"
                );
                discarded.push(err);
            }
        }
    }

    Finalized {
        message: ConversationMessage::assistant(blocks, STOP_REASON),
        discarded,
    }
}

/// Notify `on_message`, then each tool use in order, awaiting every call.
pub async fn dispatch<H>(message: &ConversationMessage, handlers: &mut H)
where
    H: StreamHandlers + ?Sized,
{
    handlers.on_message(message);

    for block in message.tool_uses() {
        debug!(tool_call_id = %block.id, tool = %block.name, "Dispatching tool use");
        handlers.on_tool_use(block).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shopchat_core::provider::{StreamEvent, ToolCallDelta};
    use serde_json::json;

    fn state_from(events: Vec<StreamEvent>) -> AggregationState {
        let mut state = AggregationState::with_nonce("t");
        for event in events {
            state.apply(event, &mut |_: &str| {});
        }
        state.close();
        state
    }

    fn call(index: u32, id: Option<&str>, name: Option<&str>, args: Option<&str>) -> StreamEvent {
        StreamEvent::ToolCallDelta(ToolCallDelta {
            index,
            id: id.map(String::from),
            name_fragment: name.map(String::from),
            arguments_fragment: args.map(String::from),
        })
    }

    #[derive(Default)]
    struct Recorder {
        log: Vec<String>,
    }

    #[async_trait]
    impl StreamHandlers for Recorder {
        fn on_message(&mut self, message: &ConversationMessage) {
            self.log.push(format!("message:{}", message.blocks().len()));
        }

        async fn on_tool_use(&mut self, block: &ToolUseBlock) {
            self.log.push(format!("start:{}", block.id));
            tokio::task::yield_now().await;
            self.log.push(format!("end:{}", block.id));
        }
    }

    #[test]
    fn text_only_response() {
        let finalized = finalize(state_from(vec![StreamEvent::text("Hi "), StreamEvent::text("there")]));
        assert_eq!(finalized.message.blocks(), &[ContentBlock::text("Hi there")]);
        assert_eq!(finalized.message.stop_reason.as_deref(), Some(STOP_REASON));
        assert!(finalized.discarded.is_empty());
    }

    #[test]
    fn tool_call_is_parsed() {
        let finalized = finalize(state_from(vec![
            call(0, Some("c1"), Some("search"), None),
            call(0, None, None, Some("{\"q\":")),
            call(0, None, None, Some("\"shoes\"}")),
        ]));
        assert_eq!(
            finalized.message.blocks(),
            &[ContentBlock::ToolUse(ToolUseBlock {
                id: "c1".into(),
                name: "search".into(),
                input: json!({"q": "shoes"}),
            })]
        );
    }

    #[test]
    fn text_block_precedes_tool_blocks() {
        let finalized = finalize(state_from(vec![
            call(0, Some("c1"), Some("get_cart"), Some("{}")),
            StreamEvent::text("One moment."),
        ]));
        let blocks = finalized.message.blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], ContentBlock::text("One moment."));
        assert!(blocks[1].as_tool_use().is_some());
    }

    #[test]
    fn malformed_arguments_are_discarded_in_isolation() {
        let finalized = finalize(state_from(vec![
            StreamEvent::text("Sure."),
            call(0, Some("bad"), Some("x"), Some("not-json")),
            call(1, Some("good"), Some("get_cart"), Some("{}")),
        ]));

        let ids: Vec<_> = finalized.message.tool_uses().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["good"]);
        assert_eq!(finalized.message.text(), "Sure.");
        assert_eq!(finalized.discarded.len(), 1);
        assert_eq!(finalized.discarded[0].id, "bad");
        assert_eq!(finalized.discarded[0].arguments, "not-json");
    }

    #[test]
    fn incomplete_tool_calls_are_skipped() {
        let finalized = finalize(state_from(vec![
            call(0, Some("no-args"), Some("get_cart"), None),
            call(1, Some("no-name"), None, Some("{}")),
        ]));
        assert!(finalized.message.blocks().is_empty());
        assert!(finalized.discarded.is_empty());
    }

    #[test]
    fn tool_blocks_follow_index_order() {
        let finalized = finalize(state_from(vec![
            call(1, Some("second"), Some("update_cart"), None),
            call(0, Some("first"), Some("get_cart"), None),
            call(1, None, None, Some("{\"qty\":1}")),
            call(0, None, None, Some("{}")),
        ]));
        let ids: Vec<_> = finalized.message.tool_uses().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn empty_response_yields_empty_message() {
        let finalized = finalize(state_from(vec![]));
        assert!(finalized.message.blocks().is_empty());
    }

    #[tokio::test]
    async fn dispatch_is_sequential_and_ordered() {
        let finalized = finalize(state_from(vec![
            call(0, Some("a"), Some("update_cart"), Some("{}")),
            call(1, Some("b"), Some("get_cart"), Some("{}")),
        ]));

        let mut recorder = Recorder::default();
        dispatch(&finalized.message, &mut recorder).await;
        assert_eq!(
            recorder.log,
            vec!["message:2", "start:a", "end:a", "start:b", "end:b"]
        );
    }

    #[tokio::test]
    async fn dispatch_without_tool_uses_only_notifies_message() {
        let finalized = finalize(state_from(vec![call(0, Some("x"), Some("x"), Some("oops"))]));
        let mut recorder = Recorder::default();
        dispatch(&finalized.message, &mut recorder).await;
        assert_eq!(recorder.log, vec!["message:0"]);
    }
}
