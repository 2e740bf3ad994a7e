//! Configuration module for the call relay server
//!
//! Configuration comes from `.env` files, environment variables and an
//! optional YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `env`: Environment variable loading and defaults
//! - `yaml`: YAML configuration file loading and overrides
//!
//! # Example
//! ```rust,no_run
//! use callscript_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod yaml;

use crate::core::realtime::openai::{
    DEFAULT_REALTIME_MODEL, DEFAULT_TRANSCRIPTION_MODEL, OPENAI_REALTIME_URL, OpenAIRealtimeVoice,
};

/// Name of the environment variable holding the provider credential by default.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Provider endpoint and the session parameters sent in `session.update`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamSettings {
    /// Realtime WebSocket endpoint without query string
    pub url: String,
    pub model: String,
    pub voice: OpenAIRealtimeVoice,
    pub transcription_model: String,
    pub temperature: f32,
    pub max_response_output_tokens: u32,
    /// Server VAD activation threshold (0.0 - 1.0)
    pub vad_threshold: f32,
    pub vad_prefix_padding_ms: u32,
    pub vad_silence_duration_ms: u32,
    /// Upper bound on connect + `session.created`; 0 disables the timer
    pub handshake_timeout_secs: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            url: OPENAI_REALTIME_URL.to_string(),
            model: DEFAULT_REALTIME_MODEL.to_string(),
            voice: OpenAIRealtimeVoice::Alloy,
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            temperature: 0.8,
            max_response_output_tokens: 1000,
            vad_threshold: 0.5,
            vad_prefix_padding_ms: 300,
            vad_silence_duration_ms: 500,
            handshake_timeout_secs: 30,
        }
    }
}

impl UpstreamSettings {
    pub fn handshake_timeout(&self) -> Option<Duration> {
        (self.handshake_timeout_secs > 0).then(|| Duration::from_secs(self.handshake_timeout_secs))
    }
}

/// Server configuration
///
/// Contains everything needed to run the relay:
/// - Server settings (host, port, TLS)
/// - CORS policy for the browser origin
/// - Provider credential and where to look it up at call time
/// - Upstream endpoint and session parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: "*"
    pub cors_allowed_origins: Option<String>,

    /// Static provider key, used when `api_key_env` is unset at call time
    pub openai_api_key: Option<String>,
    /// Environment variable consulted for the provider key on every call
    pub api_key_env: String,

    pub upstream: UpstreamSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            tls: None,
            cors_allowed_origins: Some("*".to_string()),
            openai_api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            upstream: UpstreamSettings::default(),
        }
    }
}

/// Zeroize the provider key when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// The `.env` file is loaded in `main.rs` before this is called.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        env::load_from_env()
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let mut config = env::load_from_env()?;
        yaml_config.apply_to(&mut config)?;
        Ok(config)
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Resolve the provider credential for a new call.
    ///
    /// The environment variable named by `api_key_env` is read at call time so
    /// rotating the key does not need a restart. Falls back to the static key.
    /// Empty values count as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                self.openai_api_key
                    .clone()
                    .filter(|key| !key.trim().is_empty())
            })
    }
}
