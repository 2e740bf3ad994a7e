use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use super::stage::SessionStage;

/// Snapshot of every live call session keyed by session id.
///
/// Written by each session's handler task; read by the health endpoint and
/// tests. Entries are removed when the browser socket finishes.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<Uuid, SessionStage>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: Uuid) {
        self.sessions.insert(id, SessionStage::AwaitingInit);
    }

    pub fn update(&self, id: Uuid, stage: SessionStage) {
        if let Some(mut entry) = self.sessions.get_mut(&id) {
            *entry = stage;
        }
    }

    pub fn remove(&self, id: &Uuid) -> Option<SessionStage> {
        self.sessions.remove(id).map(|(_, stage)| stage)
    }

    pub fn stage(&self, id: &Uuid) -> Option<SessionStage> {
        self.sessions.get(id).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions currently exchanging traffic with the provider.
    pub fn relaying_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| *entry.value() == SessionStage::Relaying)
            .count()
    }
}
