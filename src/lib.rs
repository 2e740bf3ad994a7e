pub mod audio;
pub mod client;
pub mod config;
pub mod core;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use core::relay::{RelayError, RelayResult, SessionStage};
pub use state::AppState;
