//! Streaming tests against a throwaway local HTTP server.

use shopchat_core::message::{PromptMessage, Role};
use shopchat_core::provider::{CompletionRequest, Provider, StreamEvent, ToolCallDelta};
use shopchat_core::{TransportError, TransportErrorKind};
use shopchat_providers::OpenAiCompatProvider;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve exactly one HTTP response, then close the connection.
async fn serve_once(status_line: &'static str, content_type: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        // Drain the request headers and body before answering
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        let response = format!(
            "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    format!("http://{addr}/v1")
}

fn request() -> CompletionRequest {
    CompletionRequest {
        model: "gpt-4o-mini".into(),
        max_tokens: 2000,
        system: "You are a shop assistant".into(),
        messages: vec![PromptMessage {
            role: Role::User,
            content: "Find shoes".into(),
        }],
        tools: vec![],
    }
}

async fn collect(base_url: String) -> Result<Vec<Result<StreamEvent, TransportError>>, TransportError> {
    let provider = OpenAiCompatProvider::new("test", base_url, "sk-test");
    let mut rx = provider.stream(request()).await?;
    let mut events = Vec::new();
    while let Some(item) = rx.recv().await {
        events.push(item);
    }
    Ok(events)
}

#[tokio::test]
async fn streams_text_and_tool_call_events() {
    let body = [
        r#"data: {"choices":[{"delta":{"role":"assistant","content":"Hi "},"finish_reason":null}]}"#,
        "",
        ": keep-alive",
        r#"data: {"choices":[{"delta":{"content":"there"},"finish_reason":null}]}"#,
        "",
        r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"c1","function":{"name":"search_shop_catalog","arguments":"{\"q\":"}}]},"finish_reason":null}]}"#,
        "",
        r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"shoes\"}"}}]},"finish_reason":null}]}"#,
        "",
        r#"data: {"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
        "",
        "data: [DONE]",
        "",
    ]
    .join("\n");

    let base_url = serve_once("HTTP/1.1 200 OK", "text/event-stream", body).await;
    let events: Vec<StreamEvent> = collect(base_url)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.unwrap())
        .collect();

    assert_eq!(
        events,
        vec![
            StreamEvent::text("Hi "),
            StreamEvent::text("there"),
            StreamEvent::ToolCallDelta(ToolCallDelta {
                index: 0,
                id: Some("c1".into()),
                name_fragment: Some("search_shop_catalog".into()),
                arguments_fragment: Some("{\"q\":".into()),
            }),
            StreamEvent::ToolCallDelta(ToolCallDelta {
                index: 0,
                id: None,
                name_fragment: None,
                arguments_fragment: Some("\"shoes\"}".into()),
            }),
            StreamEvent::finish("tool_calls"),
        ]
    );
}

#[tokio::test]
async fn body_without_done_marker_just_ends() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"},\"finish_reason\":null}]}\n\n".to_string();
    let base_url = serve_once("HTTP/1.1 200 OK", "text/event-stream", body).await;

    let events = collect(base_url).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].as_ref().unwrap(), &StreamEvent::text("ok"));
}

#[tokio::test]
async fn malformed_chunk_surfaces_as_error_item() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\ndata: {oops\n\n".to_string();
    let base_url = serve_once("HTTP/1.1 200 OK", "text/event-stream", body).await;

    let events = collect(base_url).await.unwrap();
    assert_eq!(events.len(), 2);
    assert!(events[0].is_ok());
    assert!(matches!(events[1], Err(TransportError::MalformedPayload(_))));
}

#[tokio::test]
async fn unauthorized_fails_before_streaming() {
    let body = r#"{"error":{"message":"Incorrect API key provided"}}"#.to_string();
    let base_url = serve_once("HTTP/1.1 401 Unauthorized", "application/json", body).await;

    let err = collect(base_url).await.unwrap_err();
    assert_eq!(err.kind(), TransportErrorKind::Authentication);
}

#[tokio::test]
async fn rate_limit_fails_before_streaming() {
    let base_url = serve_once("HTTP/1.1 429 Too Many Requests", "application/json", "{}".into()).await;

    let err = collect(base_url).await.unwrap_err();
    assert_eq!(err.kind(), TransportErrorKind::RateLimit);
}

#[tokio::test]
async fn server_error_keeps_status_and_body() {
    let base_url =
        serve_once("HTTP/1.1 503 Service Unavailable", "text/plain", "try later".into()).await;

    match collect(base_url).await.unwrap_err() {
        TransportError::Api {
            status_code,
            message,
        } => {
            assert_eq!(status_code, 503);
            assert_eq!(message, "try later");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_network_error() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = collect(format!("http://{addr}/v1")).await.unwrap_err();
    assert!(matches!(err, TransportError::Network(_)));
}
