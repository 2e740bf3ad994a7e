//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `relay` - Browser ↔ provider call relay WebSocket

pub mod api;
pub mod relay;

pub use relay::relay_handler;
