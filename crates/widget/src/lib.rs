//! # Chat Relay Widget
//!
//! UI-agnostic state machine behind a chat widget. It keeps the transcript,
//! drives one streamed turn at a time through the
//! [`StreamClient`](chat_relay_client::StreamClient) and turns deltas into
//! the visible in-progress reply.
//!
//! A turn moves through [`WidgetPhase`]:
//!
//! ```text
//! Idle -> AwaitingFirstByte -> Streaming -> Finalizing -> Idle
//! ```
//!
//! Completion appends the reply (or a fallback when it was empty), an error
//! appends a message with a hint derived from the HTTP status, and an abort
//! appends nothing.

mod error;
mod types;
mod widget;

pub use error::{Result, WidgetError};
pub use types::{
    error_hint, error_message, RequestVariant, SubmitOutcome, WidgetOptions, WidgetPhase,
    WidgetSnapshot, DEFAULT_FALLBACK,
};
pub use widget::ChatWidget;
