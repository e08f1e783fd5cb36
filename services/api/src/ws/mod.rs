//! WebSocket Session Management
//!
//! This module contains the logic for serving voice-command sessions over
//! WebSockets. It is structured into submodules:
//!
//! - `protocol`: Defines the JSON envelopes exchanged with the browser.
//! - `connection`: The single-writer outbound queue and open flag of a connection.
//! - `timer`: Background timers that report back on the connection that armed them.
//! - `session`: The connection lifecycle and the per-frame dispatcher.

pub mod connection;
pub mod protocol;
pub mod session;
pub mod timer;

pub use session::ws_handler;
