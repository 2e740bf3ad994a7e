//! Call relay WebSocket handler
//!
//! Bridges one browser WebSocket to one upstream realtime provider socket.
//!
//! # Protocol
//!
//! ## Client → Server
//!
//! - **session.init**: `{"type":"session.init","context":"..."}`, must come first
//! - **any other JSON event**: forwarded verbatim once the upstream is open
//!
//! ## Server → Client
//!
//! - **provider events**: forwarded verbatim, in arrival order
//! - **error**: `{"type":"error","code":"...","message":"..."}` for relay failures

mod handler;
pub mod messages;

pub use handler::relay_handler;
