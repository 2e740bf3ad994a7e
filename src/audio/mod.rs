//! Client-side audio pipeline.
//!
//! - `codec` converts between PCM16 samples and the base64 wire payload
//! - `chunker` turns device buffers into fixed-size capture chunks
//! - `playback` holds the gapless output queue
//! - `device` (feature `audio-device`) binds the above to real hardware via cpal
//!
//! The controller only sees the [`AudioSource`] and [`AudioSink`] traits, so the
//! pipeline can run headless (tests, servers) or against real devices.

mod chunker;
pub mod codec;
#[cfg(feature = "audio-device")]
mod device;
mod playback;

use thiserror::Error;

pub use chunker::SampleChunker;
pub use codec::CodecError;
#[cfg(feature = "audio-device")]
pub use device::{MicrophoneCapture, SpeakerPlayback};
pub use playback::PlaybackQueue;

/// Capture and playback sample rate expected by the provider (24kHz).
pub const SAMPLE_RATE: u32 = crate::core::realtime::OPENAI_REALTIME_SAMPLE_RATE;
/// Mono audio.
pub const CHANNELS: u16 = 1;
/// Samples per captured chunk (~170ms at 24kHz).
pub const CAPTURE_CHUNK_SAMPLES: usize = 4096;

/// Audio pipeline failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AudioError {
    /// No usable device, or the backend refused the stream
    #[error("Audio device error: {0}")]
    Device(String),

    /// PCM16 payload with an odd number of bytes
    #[error("PCM16 chunk has odd length: {0} bytes")]
    MisalignedChunk(usize),

    /// Capture was started twice without stopping
    #[error("Audio source already running")]
    AlreadyRunning,
}

/// Callback receiving each captured PCM16 chunk.
///
/// Runs on the capture thread; implementations must not block.
pub type ChunkCallback = Box<dyn FnMut(Vec<i16>) + Send + 'static>;

/// A restartable producer of fixed-size PCM16 chunks.
pub trait AudioSource: Send {
    /// Acquire the device and start delivering chunks to `on_chunk`.
    fn start(&mut self, on_chunk: ChunkCallback) -> Result<(), AudioError>;

    /// Release the device. Calling it when not running is a no-op.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// A consumer of raw PCM16 chunks played in arrival order.
pub trait AudioSink: Send + Sync {
    fn enqueue(&self, pcm16: &[u8]) -> Result<(), AudioError>;

    /// Drop anything not yet played.
    fn stop(&self);
}
