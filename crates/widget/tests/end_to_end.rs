//! Widget → client → relay → fake upstream, end to end

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{self, HeaderName};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chat_relay_client::StreamClientConfig;
use chat_relay_core::{ChatMessage, Role, SessionId};
use chat_relay_server::{RelayConfig, RelayServer};
use chat_relay_widget::{
    ChatWidget, RequestVariant, SubmitOutcome, WidgetOptions, WidgetPhase, DEFAULT_FALLBACK,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

type Captured = Arc<Mutex<Vec<Value>>>;

fn sse_body(frames: Vec<&'static str>, hang: bool) -> Body {
    Body::from_stream(async_stream::stream! {
        for frame in frames {
            yield Ok::<_, Infallible>(Bytes::from_static(frame.as_bytes()));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        if hang {
            std::future::pending::<()>().await;
        }
    })
}

async fn stream_run(State(seen): State<Captured>, Json(envelope): Json<Value>) -> Response {
    let text = envelope["content"]["query"]["prompt"][0]["content"]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    seen.lock().unwrap().push(envelope);

    let (frames, hang) = match text.as_str() {
        "fail" => return (StatusCode::SERVICE_UNAVAILABLE, "overloaded").into_response(),
        "slow" => (vec!["data: {\"content\":\"Hi\"}\n\n"], true),
        "quiet" => (vec![": ping\n\n", "data: [DONE]\n\n"], false),
        _ => (
            vec![
                "data: {\"content\":\"Hi\"}\n",
                "\ndata: {\"content\":\" there\"}\n\n",
            ],
            false,
        ),
    };

    ([(header::CONTENT_TYPE, "text/event-stream")], sse_body(frames, hang)).into_response()
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Real relay in front of a fake upstream. Returns the relay URL and the
/// envelopes the upstream received.
async fn pipeline() -> (String, Captured) {
    let seen = Captured::default();
    let upstream = serve(
        Router::new()
            .route("/stream_run", post(stream_run))
            .with_state(seen.clone()),
    )
    .await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let relay = RelayServer::new(
        RelayConfig::builder()
            .upstream_url(format!("{}/stream_run", upstream))
            .bearer_token("server-secret")
            .build(),
    )
    .unwrap();
    tokio::spawn(async move {
        relay.serve(listener).await.unwrap();
    });

    (format!("http://{}/chat", addr), seen)
}

/// Fake relay recording the widget's request bodies.
async fn recording_relay(echo_header: bool) -> (String, Captured) {
    async fn chat(State((seen, echo)): State<(Captured, bool)>, Json(body): Json<Value>) -> Response {
        seen.lock().unwrap().push(body);
        let frames = vec!["data: {\"content\":\"ok\",\"conversation_id\":\"conv-7\"}\n\n"];
        let mut response =
            ([(header::CONTENT_TYPE, "text/event-stream")], sse_body(frames, false)).into_response();
        if echo {
            response.headers_mut().insert(
                HeaderName::from_static("x-session-id"),
                "relay-sess".parse().unwrap(),
            );
        }
        response
    }

    let seen = Captured::default();
    let base = serve(
        Router::new()
            .route("/chat", post(chat))
            .with_state((seen.clone(), echo_header)),
    )
    .await;
    (format!("{}/chat", base), seen)
}

fn widget(relay_url: &str) -> ChatWidget {
    ChatWidget::new(WidgetOptions::new(relay_url, "anon")).unwrap()
}

async fn wait_for_reply(widget: &ChatWidget, text: &str) {
    for _ in 0..200 {
        if widget.snapshot().in_progress.as_deref() == Some(text) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("reply never reached {:?}", text);
}

#[tokio::test]
async fn test_reply_is_streamed_into_transcript() {
    let (relay, upstream) = pipeline().await;
    let widget = widget(&relay);

    let outcome = widget.submit("hello").await;
    assert_eq!(outcome, SubmitOutcome::Completed);

    let snapshot = widget.snapshot();
    assert_eq!(snapshot.phase, WidgetPhase::Idle);
    assert_eq!(snapshot.in_progress, None);
    assert_eq!(snapshot.transcript.len(), 2);
    assert_eq!(snapshot.transcript[0], ChatMessage::user("hello"));
    assert_eq!(snapshot.transcript[1].role, Role::Assistant);
    assert_eq!(snapshot.transcript[1].content, "Hi there");

    // The relay generated the session id and echoed it back.
    let envelope = upstream.lock().unwrap()[0].clone();
    assert_eq!(envelope["content"]["query"]["prompt"][0]["content"]["text"], "hello");
    assert_eq!(
        snapshot.session_id,
        Some(SessionId::new(envelope["session_id"].as_str().unwrap()))
    );
}

#[tokio::test]
async fn test_upstream_failure_becomes_error_message() {
    let (relay, _) = pipeline().await;
    let widget = widget(&relay);

    let outcome = widget.submit("fail").await;
    assert!(matches!(
        outcome,
        SubmitOutcome::Failed(ref e) if e.status() == Some(503)
    ));

    let snapshot = widget.snapshot();
    assert_eq!(snapshot.phase, WidgetPhase::Idle);
    assert_eq!(snapshot.transcript.len(), 2);
    assert_eq!(snapshot.transcript[0], ChatMessage::user("fail"));
    assert_eq!(snapshot.transcript[1].role, Role::Assistant);
    assert!(snapshot.transcript[1].content.contains("server error"));
    assert!(snapshot.transcript[1].content.ends_with("(overloaded)"));
    assert!(!snapshot.transcript[1].content.contains('{'));
}

#[tokio::test]
async fn test_abort_discards_partial_reply() {
    let (relay, _) = pipeline().await;
    let widget = Arc::new(widget(&relay));

    let running = {
        let widget = widget.clone();
        tokio::spawn(async move { widget.submit("slow").await })
    };

    wait_for_reply(&widget, "Hi").await;
    assert_eq!(widget.phase(), WidgetPhase::Streaming);

    widget.abort();
    widget.abort();

    let snapshot = widget.snapshot();
    assert_eq!(snapshot.phase, WidgetPhase::Idle);
    assert_eq!(snapshot.transcript, vec![ChatMessage::user("slow")]);

    // Ready for the next turn right away.
    assert_eq!(widget.submit("hello").await, SubmitOutcome::Completed);
    assert_eq!(running.await.unwrap(), SubmitOutcome::Aborted);

    let transcript = widget.snapshot().transcript;
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[2].content, "Hi there");
}

#[tokio::test]
async fn test_empty_reply_uses_fallback() {
    let (relay, _) = pipeline().await;
    let widget = widget(&relay);

    assert_eq!(widget.submit("quiet").await, SubmitOutcome::Completed);

    let transcript = widget.snapshot().transcript;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1], ChatMessage::assistant(DEFAULT_FALLBACK));
}

#[tokio::test]
async fn test_busy_and_blank_submits_are_ignored() {
    let (relay, upstream) = pipeline().await;
    let widget = Arc::new(widget(&relay));

    assert_eq!(widget.submit("   ").await, SubmitOutcome::Empty);

    let running = {
        let widget = widget.clone();
        tokio::spawn(async move { widget.submit("slow").await })
    };
    wait_for_reply(&widget, "Hi").await;

    assert_eq!(widget.submit("again").await, SubmitOutcome::Busy);
    assert_eq!(widget.snapshot().transcript.len(), 1);

    widget.abort();
    assert_eq!(running.await.unwrap(), SubmitOutcome::Aborted);
    assert_eq!(upstream.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_dropped_submit_returns_to_idle() {
    let (relay, _) = pipeline().await;
    let widget = widget(&relay);

    let result = tokio::time::timeout(Duration::from_millis(300), widget.submit("slow")).await;
    assert!(result.is_err());

    let snapshot = widget.snapshot();
    assert_eq!(snapshot.phase, WidgetPhase::Idle);
    assert_eq!(snapshot.transcript, vec![ChatMessage::user("slow")]);
}

#[tokio::test]
async fn test_idle_timeout_becomes_error_message() {
    let (relay, _) = pipeline().await;
    let options = WidgetOptions::new(relay.as_str(), "anon").with_client_config(
        StreamClientConfig::builder()
            .idle_timeout(Duration::from_millis(200))
            .build(),
    );
    let widget = ChatWidget::new(options).unwrap();

    let outcome = widget.submit("slow").await;
    assert!(matches!(outcome, SubmitOutcome::Failed(_)));

    let transcript = widget.snapshot().transcript;
    assert_eq!(transcript.len(), 2);
    assert!(transcript[1].content.contains("too long"));
}

#[tokio::test]
async fn test_first_request_sends_empty_session_then_reuses_echoed_one() {
    let (relay, requests) = recording_relay(true).await;
    let widget = widget(&relay);

    assert_eq!(widget.submit("hello").await, SubmitOutcome::Completed);
    assert_eq!(widget.submit("again").await, SubmitOutcome::Completed);

    let requests = requests.lock().unwrap().clone();
    assert_eq!(requests[0], json!({"userMessage": "hello", "sessionId": ""}));
    // The header arrives before any frame, so it wins over `conversation_id`.
    assert_eq!(requests[1], json!({"userMessage": "again", "sessionId": "relay-sess"}));
}

#[tokio::test]
async fn test_session_adopted_from_frame_and_cleared_on_reset() {
    let (relay, requests) = recording_relay(false).await;
    let widget = widget(&relay);

    widget.submit("hello").await;
    assert_eq!(widget.snapshot().session_id, Some(SessionId::new("conv-7")));

    widget.submit("again").await;
    widget.reset();

    let snapshot = widget.snapshot();
    assert!(snapshot.transcript.is_empty());
    assert_eq!(snapshot.session_id, None);

    widget.submit("fresh").await;

    let requests = requests.lock().unwrap().clone();
    assert_eq!(requests[1]["sessionId"], "conv-7");
    assert_eq!(requests[2]["sessionId"], "");
}

#[tokio::test]
async fn test_conversation_variant_sends_transcript() {
    let (relay, requests) = recording_relay(false).await;
    let options = WidgetOptions::new(relay.as_str(), "anon")
        .with_variant(RequestVariant::Conversation)
        .with_system_prompt("be brief");
    let widget = ChatWidget::new(options).unwrap();

    widget.submit("hi").await;
    widget.submit("more").await;

    let requests = requests.lock().unwrap().clone();
    assert_eq!(
        requests[1],
        json!({"messages": [
            {"role": "system", "content": "be brief"},
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "ok"},
            {"role": "user", "content": "more"}
        ]})
    );
}
