use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::{DEFAULT_API_KEY_ENV, ServerConfig, TlsConfig, UpstreamSettings};
use crate::core::realtime::openai::OpenAIRealtimeVoice;

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name} ('{raw}'): {e}").into()),
        None => Ok(None),
    }
}

fn env_bool(name: &str) -> bool {
    env_string(name)
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Build the configuration from environment variables on top of defaults.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let defaults = ServerConfig::default();
    let upstream_defaults = UpstreamSettings::default();

    let tls = if env_bool("TLS_ENABLED") {
        let cert_path = env_string("TLS_CERT_PATH")
            .ok_or("TLS_ENABLED is set but TLS_CERT_PATH is missing")?;
        let key_path =
            env_string("TLS_KEY_PATH").ok_or("TLS_ENABLED is set but TLS_KEY_PATH is missing")?;
        Some(TlsConfig {
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
        })
    } else {
        None
    };

    let api_key_env =
        env_string("OPENAI_API_KEY_ENV").unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());

    let upstream = UpstreamSettings {
        url: env_string("OPENAI_REALTIME_URL").unwrap_or(upstream_defaults.url),
        model: env_string("OPENAI_REALTIME_MODEL").unwrap_or(upstream_defaults.model),
        voice: env_string("OPENAI_REALTIME_VOICE")
            .map(|voice| OpenAIRealtimeVoice::from_str_or_default(&voice))
            .unwrap_or(upstream_defaults.voice),
        transcription_model: env_string("OPENAI_TRANSCRIPTION_MODEL")
            .unwrap_or(upstream_defaults.transcription_model),
        temperature: env_parse("OPENAI_TEMPERATURE")?.unwrap_or(upstream_defaults.temperature),
        max_response_output_tokens: env_parse("OPENAI_MAX_RESPONSE_OUTPUT_TOKENS")?
            .unwrap_or(upstream_defaults.max_response_output_tokens),
        vad_threshold: env_parse("VAD_THRESHOLD")?.unwrap_or(upstream_defaults.vad_threshold),
        vad_prefix_padding_ms: env_parse("VAD_PREFIX_PADDING_MS")?
            .unwrap_or(upstream_defaults.vad_prefix_padding_ms),
        vad_silence_duration_ms: env_parse("VAD_SILENCE_DURATION_MS")?
            .unwrap_or(upstream_defaults.vad_silence_duration_ms),
        handshake_timeout_secs: env_parse("HANDSHAKE_TIMEOUT_SECS")?
            .unwrap_or(upstream_defaults.handshake_timeout_secs),
    };

    Ok(ServerConfig {
        host: env_string("HOST").unwrap_or_else(|| defaults.host.clone()),
        port: env_parse("PORT")?.unwrap_or(defaults.port),
        tls,
        cors_allowed_origins: env_string("CORS_ALLOWED_ORIGINS")
            .or_else(|| defaults.cors_allowed_origins.clone()),
        openai_api_key: env_string(&api_key_env),
        api_key_env,
        upstream,
    })
}
