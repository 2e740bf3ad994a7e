//! Session configuration injected during the handshake.

use crate::config::UpstreamSettings;
use crate::core::realtime::openai::{
    ClientEvent, InputAudioTranscription, MaxTokens, OpenAIRealtimeAudioFormat, SessionConfig,
    TurnDetection,
};

/// Build the system prompt for a call from the caller-supplied context.
pub fn build_instructions(context: &str) -> String {
    format!(
        "You are a sales call assistant listening to a live cold call.\n\
         Client context: {context}\n\
         \n\
         While the call is in progress:\n\
         - Follow what the prospect says and suggest what the caller should say next.\n\
         - Answer objections with concrete solutions drawn from the client context.\n\
         - Keep each suggestion to two or three natural sentences.\n\
         - Focus on the prospect's pain points and how the offered services address them.\n\
         - Stay professional, friendly and genuine.\n\
         \n\
         Suggestions should read like conversation, not a script."
    )
}

/// The `session.update` command sent once the provider reports `session.created`.
pub fn build_session_update(settings: &UpstreamSettings, context: &str) -> ClientEvent {
    let pcm16 = OpenAIRealtimeAudioFormat::Pcm16.as_str().to_string();

    ClientEvent::SessionUpdate {
        session: SessionConfig {
            modalities: vec!["text".to_string(), "audio".to_string()],
            instructions: build_instructions(context),
            voice: settings.voice.as_str().to_string(),
            input_audio_format: pcm16.clone(),
            output_audio_format: pcm16,
            input_audio_transcription: InputAudioTranscription {
                model: settings.transcription_model.clone(),
            },
            turn_detection: TurnDetection::ServerVad {
                threshold: settings.vad_threshold,
                prefix_padding_ms: settings.vad_prefix_padding_ms,
                silence_duration_ms: settings.vad_silence_duration_ms,
            },
            temperature: settings.temperature,
            max_response_output_tokens: MaxTokens::Number(settings.max_response_output_tokens),
        },
    }
}
