use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::realtime::OpenAIRealtimeConnector;
use crate::core::relay::{RelayResult, SessionRegistry};

/// Shared application state
///
/// Holds the immutable server configuration, the connector for the upstream
/// provider and the registry of live call sessions.
pub struct AppState {
    pub config: ServerConfig,
    pub connector: OpenAIRealtimeConnector,
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Build the state, validating the upstream endpoint up front.
    pub fn new(config: ServerConfig) -> RelayResult<Arc<Self>> {
        let connector = OpenAIRealtimeConnector::new(&config.upstream)?;
        Ok(Arc::new(Self {
            config,
            connector,
            sessions: SessionRegistry::new(),
        }))
    }
}
