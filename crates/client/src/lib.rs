//! # Chat Relay Client
//!
//! Sends one chat request to the relay and consumes the streamed reply.
//!
//! The client posts a JSON body, feeds the response bytes through the
//! [`FrameParser`](chat_relay_protocol::FrameParser) and hands every data
//! segment to a [`StreamHandler`]. Cancellation is cooperative through a
//! [`CancellationToken`](chat_relay_core::CancellationToken).
//!
//! ## Example
//!
//! ```rust,ignore
//! use chat_relay_client::{Callbacks, StreamClient, StreamClientConfig};
//! use chat_relay_core::CancellationToken;
//! use chat_relay_protocol::RelayRequest;
//!
//! let client = StreamClient::new(StreamClientConfig::default())?;
//! let signal = CancellationToken::new();
//!
//! let mut handler = Callbacks::new(|data| print!("{}", data))
//!     .with_complete(|| println!())
//!     .with_error(|e| eprintln!("{}", e));
//!
//! client
//!     .open(
//!         "http://127.0.0.1:8787/chat",
//!         &RelayRequest::single("hello", ""),
//!         "anon-key",
//!         &signal,
//!         &mut handler,
//!     )
//!     .await;
//! ```

mod config;
mod handler;
mod stream;

pub use config::{StreamClientConfig, StreamClientConfigBuilder, DEFAULT_IDLE_TIMEOUT};
pub use handler::{Callbacks, ResponseMeta, StreamHandler, StreamOutcome};
pub use stream::StreamClient;
