//! HTTP handlers for the relay endpoint

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use chat_relay_core::SessionId;
use chat_relay_protocol::{RelayRequest, UpstreamEnvelope, SESSION_HEADER};
use futures::TryStreamExt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{RelayError, Result};
use crate::state::RelayState;

/// CORS preflight: empty 200, headers come from the CORS layers
pub async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

pub async fn health_handler() -> &'static str {
    "OK"
}

/// Validate the chat request, forward it upstream and stream the answer back
/// byte for byte.
pub async fn relay_handler(State(state): State<Arc<RelayState>>, body: Bytes) -> Result<Response> {
    let request = RelayRequest::parse(&body)?;

    // Read per request so a missing secret fails closed without a restart.
    let credential = state
        .config
        .credential()
        .ok_or(RelayError::MissingCredential)?;

    let session = request.session_id().unwrap_or_else(SessionId::generate);
    let envelope = UpstreamEnvelope::new(request.prompt_text(), &session, state.config.project_id);

    info!(
        session = %session.redacted(),
        multi_turn = matches!(request, RelayRequest::Conversation { .. }),
        "relaying chat request"
    );

    let upstream = state.upstream.forward(&envelope, credential).await?;
    info!(status = upstream.status().as_u16(), "streaming upstream response");

    let stream = upstream
        .bytes_stream()
        .inspect_err(|e| warn!(error = %e, "upstream stream broke mid-response"));

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache")
        .header(CONNECTION, "keep-alive");

    match HeaderValue::from_str(session.as_str()) {
        Ok(value) => builder = builder.header(SESSION_HEADER, value),
        Err(_) => warn!("session id is not a valid header value, not echoed"),
    }

    builder
        .body(Body::from_stream(stream))
        .map_err(|e| RelayError::Internal(e.to_string()))
}
