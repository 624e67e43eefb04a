//! # Chat Relay Server
//!
//! Stateless HTTP relay between the chat widget and the upstream streaming
//! provider. The relay validates the widget's request, wraps the text in the
//! upstream envelope, attaches the server-side secret and streams the
//! upstream's `text/event-stream` body back unmodified.
//!
//! ## Example
//!
//! ```rust,ignore
//! use chat_relay_server::{RelayConfig, RelayServer};
//!
//! let config = RelayConfig::from_env()?;
//! RelayServer::new(config)?.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;
pub mod upstream;

pub use config::{RelayConfig, RelayConfigBuilder};
pub use error::{RelayError, Result};
pub use server::{with_relay_layers, RelayServer};
pub use upstream::Upstream;
