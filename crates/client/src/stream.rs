//! Streaming POST client

use chat_relay_core::{CancellationToken, StreamError};
use chat_relay_protocol::{FrameParser, SESSION_HEADER};
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::StreamClientConfig;
use crate::handler::{ResponseMeta, StreamHandler, StreamOutcome, Terminal};

/// Result of racing one suspension point against cancellation and the idle
/// window.
enum Guarded<T> {
    Ready(T),
    Cancelled,
    TimedOut(Duration),
}

/// Posts a JSON body and consumes the SSE response incrementally.
#[derive(Debug, Clone)]
pub struct StreamClient {
    http: reqwest::Client,
    config: StreamClientConfig,
}

impl StreamClient {
    /// Create a client with its own connection pool.
    pub fn new(config: StreamClientConfig) -> Result<Self, StreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(StreamError::transport)?;

        Ok(Self { http, config })
    }

    /// Create a client on top of an existing `reqwest::Client`.
    pub fn with_http_client(http: reqwest::Client, config: StreamClientConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &StreamClientConfig {
        &self.config
    }

    /// Send `body` to `url` and stream the response into `handler`.
    ///
    /// Each frame with data is handed to [`StreamHandler::on_event`] whole,
    /// then every non-empty `data:` line of it reaches
    /// [`StreamHandler::on_data`] in arrival order, then exactly one terminal
    /// callback fires. The returned outcome mirrors that callback.
    ///
    /// `signal` is checked at every suspension point and between data
    /// segments; once it fires no further data is delivered and the handler
    /// sees `on_aborted` instead of any error.
    pub async fn open<B, H>(
        &self,
        url: &str,
        body: &B,
        credential: &str,
        signal: &CancellationToken,
        handler: &mut H,
    ) -> StreamOutcome
    where
        B: Serialize + ?Sized,
        H: StreamHandler + ?Sized,
    {
        let mut terminal = Terminal::new(handler);
        self.run(url, body, credential, signal, &mut terminal).await;

        let outcome = terminal.into_outcome();
        debug!(?outcome, "stream finished");
        outcome
    }

    async fn run<B, H>(
        &self,
        url: &str,
        body: &B,
        credential: &str,
        signal: &CancellationToken,
        terminal: &mut Terminal<'_, H>,
    ) where
        B: Serialize + ?Sized,
        H: StreamHandler + ?Sized,
    {
        if url.trim().is_empty() {
            terminal.fail(StreamError::InvalidRequest("url is empty".to_string()));
            return;
        }

        if signal.is_cancelled() {
            debug!("signal already aborted, request not sent");
            terminal.abort();
            return;
        }

        let payload = match serde_json::to_vec(body) {
            Ok(payload) => payload,
            Err(e) => {
                terminal.fail(StreamError::InvalidRequest(format!(
                    "body is not serializable: {}",
                    e
                )));
                return;
            }
        };

        let mut request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload);

        if !credential.is_empty() {
            request = request.bearer_auth(credential).header("apikey", credential);
        }
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        debug!(url, "opening stream");

        let response = match self.guard(signal, request.send()).await {
            Guarded::Ready(Ok(response)) => response,
            Guarded::Ready(Err(e)) => {
                Self::settle_transport_error(terminal, signal, StreamError::transport(e));
                return;
            }
            Guarded::Cancelled => {
                terminal.abort();
                return;
            }
            Guarded::TimedOut(window) => {
                terminal.fail(StreamError::IdleTimeout(window));
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = match self.guard(signal, response.text()).await {
                Guarded::Ready(Ok(text)) => text,
                Guarded::Ready(Err(e)) => {
                    warn!(error = %e, "failed to read error body");
                    String::new()
                }
                Guarded::Cancelled => {
                    terminal.abort();
                    return;
                }
                Guarded::TimedOut(_) => String::new(),
            };

            debug!(status = status.as_u16(), "relay answered with an error status");
            terminal.fail(StreamError::Http {
                status: status.as_u16(),
                body,
            });
            return;
        }

        let meta = ResponseMeta {
            status: status.as_u16(),
            session_id: response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        };
        terminal.open(&meta);

        let mut parser = FrameParser::new();
        let mut chunks = std::pin::pin!(response.bytes_stream());
        let mut frames = 0usize;

        loop {
            match self.guard(signal, chunks.next()).await {
                Guarded::Ready(Some(Ok(chunk))) => {
                    for frame in parser.feed_bytes(&chunk) {
                        if frame.data.is_empty() {
                            continue;
                        }
                        frames += 1;

                        if signal.is_cancelled() {
                            terminal.abort();
                            return;
                        }
                        terminal.event(&frame);

                        for segment in frame.segments().filter(|s| !s.is_empty()) {
                            if signal.is_cancelled() {
                                terminal.abort();
                                return;
                            }
                            terminal.data(segment);
                        }
                    }
                }
                Guarded::Ready(Some(Err(e))) => {
                    Self::settle_transport_error(terminal, signal, StreamError::transport(e));
                    return;
                }
                Guarded::Ready(None) => {
                    parser.finish();
                    debug!(frames, "stream reached end of input");
                    terminal.complete();
                    return;
                }
                Guarded::Cancelled => {
                    terminal.abort();
                    return;
                }
                Guarded::TimedOut(window) => {
                    warn!(frames, ?window, "stream went idle");
                    terminal.fail(StreamError::IdleTimeout(window));
                    return;
                }
            }
        }
    }

    /// A transport error caused by our own abort is reported as an abort.
    fn settle_transport_error<H: StreamHandler + ?Sized>(
        terminal: &mut Terminal<'_, H>,
        signal: &CancellationToken,
        error: StreamError,
    ) {
        if signal.is_cancelled() {
            terminal.abort();
        } else {
            warn!(%error, "stream transport error");
            terminal.fail(error);
        }
    }

    async fn guard<F: Future>(&self, signal: &CancellationToken, fut: F) -> Guarded<F::Output> {
        let idle = self.config.idle_timeout;

        tokio::select! {
            biased;
            _ = signal.cancelled() => Guarded::Cancelled,
            out = with_idle_timeout(idle, fut) => match out {
                Some(value) => Guarded::Ready(value),
                None => Guarded::TimedOut(idle.unwrap_or_default()),
            },
        }
    }
}

async fn with_idle_timeout<F: Future>(idle: Option<Duration>, fut: F) -> Option<F::Output> {
    match idle {
        Some(window) => tokio::time::timeout(window, fut).await.ok(),
        None => Some(fut.await),
    }
}
