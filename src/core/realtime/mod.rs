//! Realtime provider module.
//!
//! The relay speaks to exactly one upstream provider per call. Only the
//! OpenAI Realtime API is supported; its wire types and connector live in
//! [`openai`].

pub mod openai;

pub use openai::{
    ClientEvent, OPENAI_REALTIME_SAMPLE_RATE, OPENAI_REALTIME_URL, OpenAIRealtimeConnector,
    OpenAIRealtimeVoice, ServerEvent, SessionConfig, UpstreamSocket,
};
