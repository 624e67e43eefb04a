//! # Chat Relay Core
//!
//! Core types shared by every crate of the chat relay: transcript messages,
//! the error taxonomy, cooperative cancellation and session ids.

pub mod cancellation;
pub mod errors;
pub mod message;
pub mod session;

pub use cancellation::*;
pub use errors::*;
pub use message::*;
pub use session::*;
