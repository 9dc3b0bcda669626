// ABOUTME: Integration tests driving StreamClient end to end over a replay transport.
// ABOUTME: Covers chat, comparison, malformed frames, cancellation, and exclusivity.

use std::sync::Arc;
use std::time::Duration;

use selectstream::prelude::*;

const WAIT: Duration = Duration::from_secs(5);

fn chat_frame(json: &str) -> String {
    format!("data: {}\n", json)
}

async fn settle<S: selectstream::session::Session>(handle: &StreamHandle<S>) -> S::State {
    tokio::time::timeout(WAIT, handle.wait())
        .await
        .expect("session should reach a terminal state")
}

fn pair() -> Vec<ModelSelection> {
    vec![
        ModelSelection::new("openai", "gpt-4o"),
        ModelSelection::new("anthropic", "claude-sonnet"),
    ]
}

#[tokio::test]
async fn test_chat_hello_world() {
    let transport = Arc::new(ReplayTransport::new());
    transport.respond(
        Route::ChatStream,
        [
            chat_frame(r#"{"content":"Hel","conversationId":"abc"}"#),
            chat_frame(r#"{"content":"lo ","conversationId":"abc"}"#),
            chat_frame(r#"{"content":"world","conversationId":"abc"}"#),
            chat_frame(r#"{"done":true,"conversationId":"abc"}"#),
        ],
    );
    let client = StreamClient::with_shared_transport(transport.clone());

    let handle = client.open_chat_stream(ChatParams::new("openai", "gpt-4o", "Hi"));
    let state = settle(&handle).await;

    assert_eq!(state.text, "Hello world");
    assert_eq!(state.session_id.as_deref(), Some("abc"));
    assert!(!state.streaming);
    assert!(state.error.is_none());
    assert_eq!(state.status, SessionStatus::Done);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].route, Route::ChatStream);
    assert_eq!(requests[0].body["messages"][0]["content"], "Hi");
}

#[tokio::test]
async fn test_chat_text_is_independent_of_transport_chunking() {
    let body = [
        r#"data: {"content":"Grüße, "}"#,
        r#"data: {"content":"мир "}"#,
        r#"data: {"content":"🦀!"}"#,
        r#"data: {"done":true,"conversationId":7}"#,
        "",
    ]
    .join("\n");

    for size in [1, 2, 3, 5, 7, 16, body.len()] {
        let transport = ReplayTransport::new();
        transport.push(Route::ChatStream, Reply::chunked(&body, size));
        let client = StreamClient::with_transport(transport);

        let handle = client.open_chat_stream(ChatParams::new("openai", "gpt-4o", "Hi"));
        let state = settle(&handle).await;
        assert_eq!(state.text, "Grüße, мир 🦀!", "chunk size {}", size);
        assert_eq!(state.session_id.as_deref(), Some("7"));
    }
}

#[tokio::test]
async fn test_chat_malformed_frame_skipped() {
    let transport = ReplayTransport::new();
    transport.respond(
        Route::ChatStream,
        [
            chat_frame(r#"{"content":"A"}"#),
            "data: {\"content\": oops}\n".to_string(),
            ": keep-alive\n".to_string(),
            chat_frame(r#"{"content":"B"}"#),
            chat_frame(r#"{"done":true}"#),
        ],
    );
    let client = StreamClient::with_transport(transport);

    let state = settle(&client.open_chat_stream(ChatParams::new("openai", "gpt-4o", "Hi"))).await;
    assert_eq!(state.text, "AB");
    assert!(state.error.is_none());
    assert_eq!(state.status, SessionStatus::Done);
}

#[tokio::test]
async fn test_chat_server_error_keeps_partial_text() {
    let transport = ReplayTransport::new();
    transport.respond(
        Route::ChatStream,
        [
            chat_frame(r#"{"content":"Starting"}"#),
            chat_frame(r#"{"error":"API connection lost"}"#),
            chat_frame(r#"{"content":" never applied"}"#),
        ],
    );
    let client = StreamClient::with_transport(transport);

    let state = settle(&client.open_chat_stream(ChatParams::new("openai", "gpt-4o", "Hi"))).await;
    assert_eq!(state.status, SessionStatus::Failed);
    assert_eq!(state.text, "Starting");
    assert_eq!(state.error.as_deref(), Some("API connection lost"));
}

#[tokio::test]
async fn test_chat_structured_server_error() {
    let transport = ReplayTransport::new();
    transport.respond(
        Route::ChatStream,
        [
            chat_frame(r#"{"content":"x","done":null}"#),
            chat_frame(r#"{"error":{"message":"quota exceeded"}}"#),
        ],
    );
    let client = StreamClient::with_transport(transport);

    let state = settle(&client.open_chat_stream(ChatParams::new("openai", "gpt-4o", "Hi"))).await;
    assert_eq!(state.status, SessionStatus::Failed);
    assert_eq!(state.text, "x");
    assert_eq!(state.error.as_deref(), Some("quota exceeded"));
}

#[tokio::test]
async fn test_chat_transport_rejection_fails_session() {
    let transport = ReplayTransport::new();
    transport.reject(Route::ChatStream, 400, "API key not configured for openai");
    let client = StreamClient::with_transport(transport);

    let state = settle(&client.open_chat_stream(ChatParams::new("openai", "gpt-4o", "Hi"))).await;
    assert_eq!(state.status, SessionStatus::Failed);
    assert!(state.text.is_empty());
    assert_eq!(
        state.error.as_deref(),
        Some("API error (400): API key not configured for openai")
    );
}

#[tokio::test]
async fn test_chat_close_without_done_fails() {
    let transport = ReplayTransport::new();
    transport.respond(
        Route::ChatStream,
        [
            chat_frame(r#"{"content":"cut"}"#),
            "data: {\"content\":\"dangling\"}".to_string(),
        ],
    );
    let client = StreamClient::with_transport(transport);

    let state = settle(&client.open_chat_stream(ChatParams::new("openai", "gpt-4o", "Hi"))).await;
    assert_eq!(state.status, SessionStatus::Failed);
    assert_eq!(state.text, "cut");
    assert_eq!(state.error.as_deref(), Some("Stream closed unexpectedly"));
}

#[tokio::test]
async fn test_chat_cancel_mid_stream_preserves_text() {
    let transport = ReplayTransport::new();
    transport.respond_then_stall(
        Route::ChatStream,
        [chat_frame(r#"{"content":"partial"}"#)],
    );
    let client = StreamClient::with_transport(transport);
    let handle = client.open_chat_stream(ChatParams::new("openai", "gpt-4o", "Hi"));

    tokio::time::timeout(WAIT, async {
        while handle.state().text.is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("first chunk should arrive");

    assert!(handle.cancel());
    let state = handle.state();
    assert!(!state.streaming);
    assert_eq!(state.error.as_deref(), Some(CANCELLED_MESSAGE));
    assert_eq!(state.text, "partial");
    assert_eq!(state.status, SessionStatus::Cancelled);

    assert_eq!(settle(&handle).await, state);
    assert!(!handle.cancel());
}

#[tokio::test]
async fn test_cancel_ignores_already_buffered_bytes() {
    let transport = ReplayTransport::new();
    transport.respond(
        Route::ChatStream,
        [
            chat_frame(r#"{"content":"buffered"}"#),
            chat_frame(r#"{"done":true,"conversationId":"late"}"#),
        ],
    );
    let client = StreamClient::with_transport(transport);

    // The read loop has not been polled yet on this single-threaded runtime.
    let handle = client.open_chat_stream(ChatParams::new("openai", "gpt-4o", "Hi"));
    assert!(handle.cancel());

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    let state = handle.state();
    assert_eq!(state.status, SessionStatus::Cancelled);
    assert!(state.text.is_empty());
    assert!(state.session_id.is_none());
}

#[tokio::test]
async fn test_new_session_cancels_previous() {
    let transport = ReplayTransport::new();
    transport
        .respond_then_stall(Route::ChatStream, [chat_frame(r#"{"content":"first"}"#)])
        .respond(
            Route::ChatStream,
            [
                chat_frame(r#"{"content":"second"}"#),
                chat_frame(r#"{"done":true,"conversationId":"c2"}"#),
            ],
        );
    let client = StreamClient::with_transport(transport);

    let first = client.open_chat_stream(ChatParams::new("openai", "gpt-4o", "one"));
    tokio::time::timeout(WAIT, async {
        while first.state().text.is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("first stream should be live");

    let second = client.open_chat_stream(ChatParams::new("openai", "gpt-4o", "two"));
    assert_eq!(first.status(), SessionStatus::Cancelled);

    let state = settle(&second).await;
    assert_eq!(state.text, "second");
    assert_eq!(state.status, SessionStatus::Done);
    assert_eq!(first.state().text, "first");
    assert!(!client.cancel_active());
}

#[tokio::test]
async fn test_comparison_failure_isolation() {
    let transport = ReplayTransport::new();
    transport.respond(
        Route::CompareStream,
        [
            chat_frame(r#"{"event":"start","providers":2}"#),
            chat_frame(r#"{"event":"chunk","provider":"openai","model":"gpt-4o","chunk":"Sure","time":0.2,"first_chunk":true}"#),
            chat_frame(r#"{"event":"chunk","provider":"anthropic","model":"claude-sonnet","chunk":"Hello ","time":0.3,"first_chunk":true}"#),
            chat_frame(r#"{"event":"error","provider":"openai","model":"gpt-4o","error":"rate limited"}"#),
            chat_frame(r#"{"event":"chunk","provider":"anthropic","model":"claude-sonnet","chunk":"there","time":0.5}"#),
            chat_frame(r#"{"event":"complete","provider":"anthropic","model":"claude-sonnet","data":{"time":0.8,"tokens":2}}"#),
            chat_frame(r#"{"event":"done","comparisonId":31}"#),
        ],
    );
    let client = StreamClient::with_transport(transport);

    let handle = client.open_comparison_stream(ComparisonParams::new("Say hi", pair()));
    let state = settle(&handle).await;

    let x = state.get("openai", "gpt-4o").unwrap();
    assert!(x.is_failed());
    assert!(!x.is_streaming());
    assert_eq!(x.response, "rate limited");

    let y = state.get("anthropic", "claude-sonnet").unwrap();
    assert!(!y.is_failed());
    assert!(!y.is_streaming());
    assert_eq!(y.response, "Hello there");
    assert_eq!(y.first_chunk_secs, Some(0.3));
    assert_eq!(y.elapsed_secs, 0.8);

    assert!(!state.streaming);
    assert!(state.error.is_none());
    assert_eq!(state.session_id.as_deref(), Some("31"));
}

#[tokio::test]
async fn test_comparison_placeholders_visible_before_network() {
    let transport = ReplayTransport::new();
    transport.respond_then_stall(Route::CompareStream, Vec::<Vec<u8>>::new());
    let client = StreamClient::with_transport(transport);

    let handle = client.open_comparison_stream(ComparisonParams::new("Say hi", pair()));
    let state = handle.state();
    assert_eq!(state.providers.len(), 2);
    assert!(state.providers.iter().all(|p| p.is_streaming()));
    assert!(state.streaming);

    handle.cancel();
    let state = handle.state();
    assert!(state.providers.iter().all(|p| p.status == ProviderStatus::Cancelled));
    assert!(state.providers.iter().all(|p| !p.is_failed()));
}

#[tokio::test]
async fn test_comparison_session_error_event() {
    let transport = ReplayTransport::new();
    transport.respond(
        Route::CompareStream,
        [
            chat_frame(r#"{"event":"chunk","provider":"openai","model":"gpt-4o","chunk":"so far"}"#),
            chat_frame(r#"{"event":"error","error":"Comparison failed"}"#),
        ],
    );
    let client = StreamClient::with_transport(transport);

    let state = settle(&client.open_comparison_stream(ComparisonParams::new("Say hi", pair()))).await;
    assert_eq!(state.status, SessionStatus::Failed);
    assert_eq!(state.error.as_deref(), Some("Comparison failed"));
    assert_eq!(state.get("openai", "gpt-4o").unwrap().response, "so far");
}

#[tokio::test]
async fn test_comparison_unknown_event_skipped() {
    let transport = ReplayTransport::new();
    transport.respond(
        Route::CompareStream,
        [
            chat_frame(r#"{"event":"heartbeat"}"#),
            chat_frame(r#"{"event":"chunk","provider":"openai","model":"gpt-4o","chunk":"A"}"#),
            "data: {broken\n".to_string(),
            chat_frame(r#"{"event":"chunk","provider":"openai","model":"gpt-4o","chunk":"B"}"#),
            chat_frame(r#"{"event":"complete","provider":"openai","model":"gpt-4o"}"#),
            chat_frame(r#"{"event":"complete","provider":"anthropic","model":"claude-sonnet"}"#),
            chat_frame(r#"{"event":"done"}"#),
        ],
    );
    let client = StreamClient::with_transport(transport);

    let state = settle(&client.open_comparison_stream(ComparisonParams::new("Say hi", pair()))).await;
    assert_eq!(state.status, SessionStatus::Done);
    assert_eq!(state.get("openai", "gpt-4o").unwrap().response, "AB");
    assert!(state.session_id.is_none());
}
