//! Callbacks invoked while a stream is being consumed

use chat_relay_core::StreamError;
use chat_relay_protocol::SseFrame;

/// Metadata of a successful (2xx) response, reported before any data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    /// Value of the relay's echoed session header, if present
    pub session_id: Option<String>,
}

/// Receives the incremental output of [`StreamClient::open`].
///
/// `on_event` and `on_data` may fire any number of times. Afterwards exactly one of
/// `on_complete`, `on_error` or `on_aborted` fires, once.
///
/// [`StreamClient::open`]: crate::StreamClient::open
pub trait StreamHandler: Send {
    /// Response headers arrived with a 2xx status.
    fn on_open(&mut self, _meta: &ResponseMeta) {}

    /// A whole frame with non-empty data, before its lines reach `on_data`.
    fn on_event(&mut self, _frame: &SseFrame) {}

    /// One logical data segment (one `data:` line of a frame).
    fn on_data(&mut self, data: &str);

    /// Stream ended cleanly.
    fn on_complete(&mut self);

    /// Non-2xx response, transport failure or idle timeout.
    fn on_error(&mut self, error: StreamError);

    /// The cancellation token fired.
    fn on_aborted(&mut self) {}
}

type DataFn = Box<dyn FnMut(&str) + Send>;
type DoneFn = Box<dyn FnMut() + Send>;
type ErrorFn = Box<dyn FnMut(StreamError) + Send>;

/// Closure-based [`StreamHandler`].
///
/// ```rust
/// use chat_relay_client::Callbacks;
///
/// let handler = Callbacks::new(|data| println!("delta: {}", data))
///     .with_complete(|| println!("done"))
///     .with_error(|e| eprintln!("failed: {}", e));
/// ```
pub struct Callbacks {
    data: DataFn,
    complete: Option<DoneFn>,
    error: Option<ErrorFn>,
    aborted: Option<DoneFn>,
}

impl Callbacks {
    pub fn new(on_data: impl FnMut(&str) + Send + 'static) -> Self {
        Self {
            data: Box::new(on_data),
            complete: None,
            error: None,
            aborted: None,
        }
    }

    pub fn with_complete(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }

    pub fn with_error(mut self, f: impl FnMut(StreamError) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub fn with_aborted(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.aborted = Some(Box::new(f));
        self
    }
}

impl StreamHandler for Callbacks {
    fn on_data(&mut self, data: &str) {
        (self.data)(data)
    }

    fn on_complete(&mut self) {
        if let Some(f) = self.complete.as_mut() {
            f()
        }
    }

    fn on_error(&mut self, error: StreamError) {
        if let Some(f) = self.error.as_mut() {
            f(error)
        }
    }

    fn on_aborted(&mut self) {
        if let Some(f) = self.aborted.as_mut() {
            f()
        }
    }
}

/// How a stream ended. Mirrors the terminal callback that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Failed(StreamError),
    Aborted,
}

/// Wraps a handler so that at most one terminal callback ever reaches it.
pub(crate) struct Terminal<'a, H: StreamHandler + ?Sized> {
    handler: &'a mut H,
    outcome: Option<StreamOutcome>,
}

impl<'a, H: StreamHandler + ?Sized> Terminal<'a, H> {
    pub(crate) fn new(handler: &'a mut H) -> Self {
        Self {
            handler,
            outcome: None,
        }
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.outcome.is_some()
    }

    pub(crate) fn open(&mut self, meta: &ResponseMeta) {
        if !self.is_settled() {
            self.handler.on_open(meta);
        }
    }

    pub(crate) fn event(&mut self, frame: &SseFrame) {
        if !self.is_settled() {
            self.handler.on_event(frame);
        }
    }

    pub(crate) fn data(&mut self, data: &str) {
        if !self.is_settled() {
            self.handler.on_data(data);
        }
    }

    pub(crate) fn complete(&mut self) {
        if !self.is_settled() {
            self.outcome = Some(StreamOutcome::Completed);
            self.handler.on_complete();
        }
    }

    pub(crate) fn fail(&mut self, error: StreamError) {
        if !self.is_settled() {
            self.outcome = Some(StreamOutcome::Failed(error.clone()));
            self.handler.on_error(error);
        }
    }

    pub(crate) fn abort(&mut self) {
        if !self.is_settled() {
            self.outcome = Some(StreamOutcome::Aborted);
            self.handler.on_aborted();
        }
    }

    pub(crate) fn into_outcome(self) -> StreamOutcome {
        // `open` always settles before returning; an unsettled guard means
        // the stream was dropped mid-way, which callers observe as an abort.
        self.outcome.unwrap_or(StreamOutcome::Aborted)
    }
}
