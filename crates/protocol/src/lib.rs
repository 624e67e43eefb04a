//! # Chat Relay Protocol
//!
//! Runtime-agnostic pieces of the relay pipeline. This crate has no async
//! runtime and no HTTP client: it turns raw stream bytes into SSE frames,
//! frames into text deltas, and defines the JSON bodies exchanged between the
//! widget, the relay and the upstream provider.
//!
//! ```rust
//! use chat_relay_protocol::{ContentExtractor, FrameParser};
//!
//! let mut parser = FrameParser::new();
//! let extractor = ContentExtractor::standard();
//!
//! let mut reply = String::new();
//! for chunk in ["data: {\"content\":\"Hi\"}\n", "\ndata: {\"content\":\" there\"}\n\n"] {
//!     for frame in parser.feed(chunk) {
//!         for segment in frame.segments() {
//!             reply.push_str(&extractor.extract(segment));
//!         }
//!     }
//! }
//! parser.finish();
//!
//! assert_eq!(reply, "Hi there");
//! ```

mod error;
mod extract;
mod sse;
mod wire;

pub use error::{ProtocolError, Result};
pub use extract::{
    chat_event_delta, completion_delta, flat_field, json_string, session_id_of, workflow_answer,
    ContentExtractor, Extraction, ExtractionRule, DONE_SENTINEL,
};
pub use sse::{FrameParser, SseFrame};
pub use wire::{
    ErrorBody, PromptPart, PromptText, RelayRequest, UpstreamContent, UpstreamEnvelope,
    UpstreamQuery, SESSION_HEADER,
};
