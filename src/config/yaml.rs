use serde::Deserialize;
use std::path::PathBuf;

use super::{ServerConfig, TlsConfig};
use crate::core::realtime::openai::OpenAIRealtimeVoice;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present
/// here override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   tls:
///     enabled: true
///     cert_path: "/etc/relay/cert.pem"
///     key_path: "/etc/relay/key.pem"
///
/// security:
///   cors_allowed_origins: "https://app.example.com"
///
/// providers:
///   openai_api_key: "sk-..."
///   api_key_env: "OPENAI_API_KEY"
///
/// upstream:
///   url: "wss://api.openai.com/v1/realtime"
///   model: "gpt-4o-realtime-preview-2024-10-01"
///   voice: "alloy"
///   transcription_model: "whisper-1"
///   temperature: 0.8
///   max_response_output_tokens: 1000
///   handshake_timeout_secs: 30
///   turn_detection:
///     threshold: 0.5
///     prefix_padding_ms: 300
///     silence_duration_ms: 500
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub security: Option<SecurityYaml>,
    pub providers: Option<ProvidersYaml>,
    pub upstream: Option<UpstreamYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// Comma-separated origins or "*"
    pub cors_allowed_origins: Option<String>,
}

/// Provider credentials from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub openai_api_key: Option<String>,
    /// Environment variable read for the key on every call
    pub api_key_env: Option<String>,
}

/// Upstream endpoint and session parameters from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct UpstreamYaml {
    pub url: Option<String>,
    pub model: Option<String>,
    pub voice: Option<OpenAIRealtimeVoice>,
    pub transcription_model: Option<String>,
    pub temperature: Option<f32>,
    pub max_response_output_tokens: Option<u32>,
    pub handshake_timeout_secs: Option<u64>,
    pub turn_detection: Option<TurnDetectionYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TurnDetectionYaml {
    pub threshold: Option<f32>,
    pub prefix_padding_ms: Option<u32>,
    pub silence_duration_ms: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }

    /// Overlay every value present in the file onto `config`.
    pub fn apply_to(&self, config: &mut ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(server) = &self.server {
            if let Some(host) = &server.host {
                config.host = host.clone();
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(tls) = &server.tls {
                config.tls = tls.resolve()?;
            }
        }

        if let Some(origins) = self
            .security
            .as_ref()
            .and_then(|s| s.cors_allowed_origins.clone())
        {
            config.cors_allowed_origins = Some(origins);
        }

        if let Some(providers) = &self.providers {
            if let Some(key) = &providers.openai_api_key {
                config.openai_api_key = Some(key.clone());
            }
            if let Some(var) = &providers.api_key_env {
                config.api_key_env = var.clone();
            }
        }

        if let Some(upstream) = &self.upstream {
            let target = &mut config.upstream;
            if let Some(url) = &upstream.url {
                target.url = url.clone();
            }
            if let Some(model) = &upstream.model {
                target.model = model.clone();
            }
            if let Some(voice) = upstream.voice {
                target.voice = voice;
            }
            if let Some(model) = &upstream.transcription_model {
                target.transcription_model = model.clone();
            }
            if let Some(temperature) = upstream.temperature {
                target.temperature = temperature;
            }
            if let Some(tokens) = upstream.max_response_output_tokens {
                target.max_response_output_tokens = tokens;
            }
            if let Some(secs) = upstream.handshake_timeout_secs {
                target.handshake_timeout_secs = secs;
            }
            if let Some(vad) = &upstream.turn_detection {
                if let Some(threshold) = vad.threshold {
                    target.vad_threshold = threshold;
                }
                if let Some(ms) = vad.prefix_padding_ms {
                    target.vad_prefix_padding_ms = ms;
                }
                if let Some(ms) = vad.silence_duration_ms {
                    target.vad_silence_duration_ms = ms;
                }
            }
        }

        Ok(())
    }
}

impl TlsYaml {
    fn resolve(&self) -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
        if !self.enabled.unwrap_or(false) {
            return Ok(None);
        }
        let cert_path = self
            .cert_path
            .as_ref()
            .ok_or("server.tls.enabled is true but server.tls.cert_path is missing")?;
        let key_path = self
            .key_path
            .as_ref()
            .ok_or("server.tls.enabled is true but server.tls.key_path is missing")?;
        Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
        }))
    }
}
