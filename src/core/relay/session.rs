//! Per-call relay state machine.
//!
//! [`CallSession`] owns no sockets. Each input (a client frame, an upstream
//! frame, a timeout) yields a list of [`SessionAction`]s which the WebSocket
//! handler executes in order. This keeps every ordering and stage rule
//! testable without a network.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::RelayError;
use super::prompt::build_session_update;
use super::stage::SessionStage;
use super::wire::{SessionInit, WireEnvelope};
use crate::config::UpstreamSettings;
use crate::core::realtime::openai::messages::{SESSION_CREATED, SESSION_INIT};

/// Side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send a text frame to the browser
    ToClient(String),
    /// Send a text frame to the provider
    ToUpstream(String),
    /// Start opening the provider socket
    OpenUpstream,
    /// Close the provider socket (or abandon the pending connect)
    CloseUpstream,
    /// Close the browser socket
    CloseClient,
}

/// Relay state for one browser connection.
#[derive(Debug)]
pub struct CallSession {
    id: Uuid,
    settings: Arc<UpstreamSettings>,
    stage: SessionStage,
    context: Option<String>,
}

impl CallSession {
    pub fn new(id: Uuid, settings: Arc<UpstreamSettings>) -> Self {
        Self {
            id,
            settings,
            stage: SessionStage::AwaitingInit,
            context: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> SessionStage {
        self.stage
    }

    /// Call context from `session.init`, fixed once set.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    fn transition(&mut self, next: SessionStage) -> bool {
        if !self.stage.can_transition_to(next) {
            warn!(
                session_id = %self.id,
                from = %self.stage,
                to = %next,
                "Rejected session stage transition"
            );
            return false;
        }
        info!(session_id = %self.id, from = %self.stage, to = %next, "Session stage changed");
        self.stage = next;
        true
    }

    fn report(&self, error: RelayError) -> SessionAction {
        warn!(session_id = %self.id, code = error.code(), "{error}");
        SessionAction::ToClient(error.to_event_json())
    }

    /// No provider credential is available. Reports once and closes the client.
    pub fn reject_missing_credential(&mut self, variable: &str) -> Vec<SessionAction> {
        let error = RelayError::ConfigurationMissing(variable.to_string());
        let report = self.report(error);
        self.transition(SessionStage::Error);
        vec![report, SessionAction::CloseClient]
    }

    /// A text frame arrived from the browser.
    pub fn on_client_text(&mut self, text: &str) -> Vec<SessionAction> {
        let envelope = match WireEnvelope::parse(text) {
            Ok(envelope) => envelope,
            Err(error) => return vec![self.report(error)],
        };

        if envelope.is(SESSION_INIT) {
            return self.on_session_init(text);
        }

        match self.stage {
            SessionStage::AwaitingInit => vec![self.report(RelayError::ProtocolViolation(
                format!(
                    "expected {SESSION_INIT} before '{}'",
                    envelope.kind_or_unknown()
                ),
            ))],
            SessionStage::UpstreamConnecting => {
                debug!(
                    session_id = %self.id,
                    kind = envelope.kind_or_unknown(),
                    "Dropping client message while upstream is connecting"
                );
                Vec::new()
            }
            SessionStage::UpstreamHandshaking | SessionStage::Relaying => {
                vec![SessionAction::ToUpstream(text.to_string())]
            }
            SessionStage::Closed | SessionStage::Error => {
                debug!(
                    session_id = %self.id,
                    kind = envelope.kind_or_unknown(),
                    "Dropping client message after upstream ended"
                );
                Vec::new()
            }
        }
    }

    fn on_session_init(&mut self, text: &str) -> Vec<SessionAction> {
        if self.stage != SessionStage::AwaitingInit {
            return vec![self.report(RelayError::ProtocolViolation(format!(
                "{SESSION_INIT} already received (stage {})",
                self.stage
            )))];
        }

        let init = match SessionInit::parse(text) {
            Ok(init) => init,
            Err(error) => return vec![self.report(error)],
        };

        info!(
            session_id = %self.id,
            context_len = init.context.len(),
            "Session initialized by client"
        );
        self.context = Some(init.context);
        self.transition(SessionStage::UpstreamConnecting);
        vec![SessionAction::OpenUpstream]
    }

    /// Binary frames are not part of the protocol.
    pub fn on_client_binary(&mut self, len: usize) -> Vec<SessionAction> {
        vec![self.report(RelayError::MalformedMessage(format!(
            "binary frames are not supported ({len} bytes)"
        )))]
    }

    /// The browser went away; tear down any upstream.
    pub fn on_client_closed(&mut self) -> Vec<SessionAction> {
        let had_upstream = self.stage.upstream_pending_or_open();
        if !self.stage.is_terminal() {
            self.transition(SessionStage::Closed);
        }
        if had_upstream {
            vec![SessionAction::CloseUpstream]
        } else {
            Vec::new()
        }
    }

    /// The provider socket finished opening.
    pub fn on_upstream_opened(&mut self) -> Vec<SessionAction> {
        if self.stage != SessionStage::UpstreamConnecting {
            debug!(session_id = %self.id, stage = %self.stage, "Upstream opened for a stale session");
            return vec![SessionAction::CloseUpstream];
        }
        self.transition(SessionStage::UpstreamHandshaking);
        Vec::new()
    }

    /// The provider socket could not be opened.
    pub fn on_upstream_connect_failed(&mut self, reason: &str) -> Vec<SessionAction> {
        if self.stage != SessionStage::UpstreamConnecting {
            return Vec::new();
        }
        let report = self.report(RelayError::UpstreamConnectFailure(reason.to_string()));
        self.transition(SessionStage::Error);
        vec![report]
    }

    /// A text frame arrived from the provider.
    pub fn on_upstream_text(&mut self, text: &str) -> Vec<SessionAction> {
        if !self.stage.has_upstream() {
            debug!(session_id = %self.id, stage = %self.stage, "Dropping stale upstream message");
            return Vec::new();
        }

        let envelope = match WireEnvelope::parse(text) {
            Ok(envelope) => envelope,
            Err(RelayError::MalformedMessage(reason)) => {
                return vec![self.report(RelayError::MalformedMessage(format!(
                    "upstream sent invalid JSON: {reason}"
                )))];
            }
            Err(error) => return vec![self.report(error)],
        };

        if self.stage == SessionStage::UpstreamHandshaking && envelope.is(SESSION_CREATED) {
            return self.complete_handshake(text);
        }

        vec![SessionAction::ToClient(text.to_string())]
    }

    fn complete_handshake(&mut self, created: &str) -> Vec<SessionAction> {
        let context = self.context.as_deref().unwrap_or_default();
        let update = build_session_update(&self.settings, context);

        match serde_json::to_string(&update) {
            Ok(update) => {
                self.transition(SessionStage::Relaying);
                vec![
                    SessionAction::ToUpstream(update),
                    SessionAction::ToClient(created.to_string()),
                ]
            }
            Err(e) => {
                let report = self.report(RelayError::UpstreamConnectFailure(format!(
                    "could not encode session.update: {e}"
                )));
                self.transition(SessionStage::Error);
                vec![report, SessionAction::CloseUpstream]
            }
        }
    }

    /// The provider socket ended. `cause` is `None` for a clean close.
    pub fn on_upstream_ended(&mut self, cause: Option<&str>) -> Vec<SessionAction> {
        if !self.stage.has_upstream() {
            return Vec::new();
        }

        let (error, next) = match cause {
            None => (
                RelayError::UpstreamClosed("provider closed the connection".to_string()),
                SessionStage::Closed,
            ),
            Some(cause) => (
                RelayError::UpstreamClosed(cause.to_string()),
                SessionStage::Error,
            ),
        };
        let report = self.report(error);
        self.transition(next);
        vec![report]
    }

    /// The handshake deadline passed without `session.created`.
    pub fn on_handshake_timeout(&mut self, timeout_secs: u64) -> Vec<SessionAction> {
        if !matches!(
            self.stage,
            SessionStage::UpstreamConnecting | SessionStage::UpstreamHandshaking
        ) {
            return Vec::new();
        }
        let report = self.report(RelayError::UpstreamHandshakeTimeout(timeout_secs));
        self.transition(SessionStage::Error);
        vec![report, SessionAction::CloseUpstream]
    }
}
