//! Chat widget orchestration

use chat_relay_client::{ResponseMeta, StreamClient, StreamHandler, StreamOutcome};
use chat_relay_core::{
    CancellationReason, CancellationToken, ChatMessage, SessionSlot, StreamError,
};
use chat_relay_protocol::{ContentExtractor, RelayRequest};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::types::{
    error_message, RequestVariant, SubmitOutcome, WidgetOptions, WidgetPhase, WidgetSnapshot,
};

#[derive(Default)]
struct WidgetState {
    transcript: Vec<ChatMessage>,
    accumulator: String,
    phase: WidgetPhase,
    session: SessionSlot,
    active: Option<CancellationToken>,
    /// Bumped whenever a turn starts or is abandoned. Callbacks of an older
    /// turn are ignored.
    turn: u64,
}

impl WidgetState {
    fn is_current(&self, turn: u64) -> bool {
        self.turn == turn
    }

    /// Abandon the running turn, if any, and return to idle.
    fn abandon(&mut self, reason: CancellationReason) {
        if let Some(token) = self.active.take() {
            token.cancel(reason);
        }
        self.accumulator.clear();
        self.phase = WidgetPhase::Idle;
        self.turn += 1;
    }
}

/// Keeps the transcript and drives one streamed turn at a time.
///
/// ```rust,ignore
/// let widget = ChatWidget::new(WidgetOptions::new("http://127.0.0.1:8787/chat", "anon"))?;
/// widget.submit("hello").await;
/// println!("{:?}", widget.snapshot().transcript.last());
/// ```
pub struct ChatWidget {
    state: Arc<RwLock<WidgetState>>,
    client: StreamClient,
    extractor: Arc<ContentExtractor>,
    options: WidgetOptions,
}

impl ChatWidget {
    pub fn new(options: WidgetOptions) -> Result<Self> {
        let client = StreamClient::new(options.client.clone())?;
        Ok(Self::with_client(options, client))
    }

    pub fn with_client(options: WidgetOptions, client: StreamClient) -> Self {
        Self {
            state: Arc::new(RwLock::new(WidgetState::default())),
            client,
            extractor: Arc::new(ContentExtractor::standard()),
            options,
        }
    }

    /// Replace the delta extraction rules.
    pub fn with_extractor(mut self, extractor: ContentExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    pub fn phase(&self) -> WidgetPhase {
        self.state.read().phase
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        let state = self.state.read();
        WidgetSnapshot {
            transcript: state.transcript.clone(),
            in_progress: state
                .phase
                .is_busy()
                .then(|| state.accumulator.clone()),
            phase: state.phase,
            session_id: state.session.get().cloned(),
        }
    }

    /// Send `text` as the next user turn and stream the reply.
    ///
    /// Blank text or a turn already in flight makes this a no-op. Otherwise
    /// the user message is appended right away and the call resolves once
    /// the turn has ended.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Empty;
        }

        let (turn, signal, body) = {
            let mut state = self.state.write();
            if state.phase.is_busy() {
                debug!("submit ignored, a turn is in flight");
                return SubmitOutcome::Busy;
            }

            state.transcript.push(ChatMessage::user(text));
            state.accumulator.clear();
            state.phase = WidgetPhase::AwaitingFirstByte;
            state.turn += 1;

            let signal = CancellationToken::new();
            state.active = Some(signal.clone());

            (state.turn, signal, self.request_body(&state, text))
        };

        info!(turn, "submitting chat turn");

        let _finish = TurnGuard {
            state: &self.state,
            turn,
        };
        let mut handler = TurnHandler {
            state: self.state.clone(),
            extractor: self.extractor.clone(),
            fallback: self.options.fallback_text.clone(),
            turn,
        };

        let outcome = self
            .client
            .open(
                &self.options.relay_url,
                &body,
                &self.options.anon_key,
                &signal,
                &mut handler,
            )
            .await;

        match outcome {
            StreamOutcome::Completed => SubmitOutcome::Completed,
            StreamOutcome::Failed(error) => SubmitOutcome::Failed(error),
            StreamOutcome::Aborted => SubmitOutcome::Aborted,
        }
    }

    /// Abort the running turn. The partial reply is discarded and the widget
    /// is ready for the next submit at once. Idempotent.
    pub fn abort(&self) {
        let mut state = self.state.write();
        if state.phase.is_busy() {
            info!("aborting chat turn");
            state.abandon(CancellationReason::UserRequest);
        }
    }

    /// Abort any running turn, clear the transcript and forget the session.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.abandon(CancellationReason::UserRequest);
        state.transcript.clear();
        state.session.clear();
    }

    fn request_body(&self, state: &WidgetState, text: &str) -> RelayRequest {
        match self.options.variant {
            RequestVariant::Single => RelayRequest::single(text, state.session.as_wire()),
            RequestVariant::Conversation => {
                let mut messages = Vec::with_capacity(state.transcript.len() + 1);
                if let Some(prompt) = &self.options.system_prompt {
                    messages.push(ChatMessage::system(prompt.clone()));
                }
                messages.extend(state.transcript.iter().cloned());
                RelayRequest::conversation(messages)
            }
        }
    }
}

impl Drop for ChatWidget {
    fn drop(&mut self) {
        if let Some(token) = self.state.write().active.take() {
            token.cancel(CancellationReason::Teardown);
        }
    }
}

/// Returns the widget to idle when a turn ends, including when the submit
/// future is dropped half-way.
struct TurnGuard<'a> {
    state: &'a Arc<RwLock<WidgetState>>,
    turn: u64,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.write();
        if state.is_current(self.turn) {
            if let Some(token) = state.active.take() {
                token.cancel(CancellationReason::Teardown);
            }
            state.accumulator.clear();
            state.phase = WidgetPhase::Idle;
        }
    }
}

/// Feeds one turn's stream events into the shared widget state.
struct TurnHandler {
    state: Arc<RwLock<WidgetState>>,
    extractor: Arc<ContentExtractor>,
    fallback: String,
    turn: u64,
}

impl TurnHandler {
    fn finalize(&self, message: ChatMessage) {
        let mut state = self.state.write();
        if !state.is_current(self.turn) {
            return;
        }
        state.transcript.push(message);
        state.accumulator.clear();
        state.phase = WidgetPhase::Finalizing;
    }
}

impl StreamHandler for TurnHandler {
    fn on_open(&mut self, meta: &ResponseMeta) {
        let mut state = self.state.write();
        if !state.is_current(self.turn) {
            return;
        }
        if let Some(id) = &meta.session_id {
            if state.session.offer(id) {
                debug!("session id adopted from response header");
            }
        }
    }

    fn on_data(&mut self, data: &str) {
        let extraction = self.extractor.inspect(data);

        let mut state = self.state.write();
        if !state.is_current(self.turn) {
            return;
        }
        if let Some(id) = extraction.session_id.as_deref() {
            state.session.offer(id);
        }
        state.accumulator.push_str(&extraction.text);
        state.phase = WidgetPhase::Streaming;
    }

    fn on_complete(&mut self) {
        let reply = {
            let state = self.state.read();
            state.accumulator.clone()
        };

        let message = if reply.is_empty() {
            debug!("turn completed without text, using fallback");
            ChatMessage::assistant(self.fallback.clone())
        } else {
            ChatMessage::assistant(reply)
        };
        self.finalize(message);
    }

    fn on_error(&mut self, error: StreamError) {
        warn!(%error, "chat turn failed");
        self.finalize(ChatMessage::assistant(error_message(&error)));
    }

    fn on_aborted(&mut self) {
        let mut state = self.state.write();
        if state.is_current(self.turn) {
            state.accumulator.clear();
        }
    }
}
