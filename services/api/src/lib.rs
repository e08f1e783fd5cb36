//! Vox API Library Crate
//!
//! This library contains the web-facing half of the voice command service:
//! configuration, the application state, the WebSocket session dispatcher,
//! the speech provider adapter and routing. The `api` binary is a thin
//! wrapper around this library.

pub mod audio_utils;
pub mod config;
pub mod handlers;
pub mod router;
pub mod speech;
pub mod state;
pub mod store;
pub mod ws;
