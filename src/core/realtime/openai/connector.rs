//! Upstream leg of a call: opens the provider WebSocket.
//!
//! - Endpoint: `<url>?model=<model>`
//! - Headers: `Authorization: Bearer <key>`, `OpenAI-Beta: realtime=v1`
//!
//! The connector only establishes the socket. Reading, writing and the
//! session handshake are driven by the relay.

use http::HeaderValue;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use url::Url;

use super::config::OPENAI_BETA_HEADER;
use crate::config::UpstreamSettings;
use crate::core::relay::{RelayError, RelayResult};

/// The provider socket as returned by tokio-tungstenite.
pub type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens provider connections for one configured endpoint/model.
#[derive(Debug, Clone)]
pub struct OpenAIRealtimeConnector {
    url: Url,
}

impl OpenAIRealtimeConnector {
    pub fn new(settings: &UpstreamSettings) -> RelayResult<Self> {
        let mut url = Url::parse(&settings.url).map_err(|e| {
            RelayError::UpstreamConnectFailure(format!("Invalid upstream URL '{}': {e}", settings.url))
        })?;

        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(RelayError::UpstreamConnectFailure(format!(
                    "Unsupported upstream URL scheme '{other}'"
                )));
            }
        }

        url.query_pairs_mut().append_pair("model", &settings.model);
        Ok(Self { url })
    }

    /// Full endpoint including the model query parameter.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Open the upstream socket, authenticating with `api_key`.
    pub async fn connect(&self, api_key: &str) -> RelayResult<UpstreamSocket> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| RelayError::UpstreamConnectFailure(e.to_string()))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| RelayError::UpstreamConnectFailure("Invalid credential format".to_string()))?;
        let headers = request.headers_mut();
        headers.insert(http::header::AUTHORIZATION, bearer);
        headers.insert("OpenAI-Beta", HeaderValue::from_static(OPENAI_BETA_HEADER));

        debug!(url = %self.url, "Connecting to upstream realtime provider");
        let (socket, response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RelayError::UpstreamConnectFailure(e.to_string()))?;

        info!(status = %response.status(), "Connected to upstream realtime provider");
        Ok(socket)
    }
}
