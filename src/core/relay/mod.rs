//! Call relay core.
//!
//! One browser WebSocket maps to one [`CallSession`]. The session decides
//! what to forward, when to open the provider socket and when to inject the
//! `session.update` handshake; the WebSocket handler performs the IO.

mod error;
mod prompt;
mod registry;
mod session;
mod stage;
mod wire;

pub use error::{RelayError, RelayResult};
pub use prompt::{build_instructions, build_session_update};
pub use registry::SessionRegistry;
pub use session::{CallSession, SessionAction};
pub use stage::SessionStage;
pub use wire::{SessionInit, WireEnvelope};
