//! Gapless playback queue.
//!
//! Synthesized speech arrives as a stream of PCM16 fragments. The queue keeps
//! them strictly in arrival order and lets the output callback drain exactly
//! as many samples as the device asks for, filling with silence on underrun.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use super::codec::pcm16_to_samples;
use super::{AudioError, AudioSink};

/// Shared FIFO between the network side (producer) and the output device (consumer).
#[derive(Debug, Clone, Default)]
pub struct PlaybackQueue {
    samples: Arc<Mutex<VecDeque<i16>>>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw PCM16 chunk. Odd byte counts are rejected whole.
    pub fn push_pcm16(&self, bytes: &[u8]) -> Result<usize, AudioError> {
        let decoded = pcm16_to_samples(bytes)?;
        let count = decoded.len();
        self.samples.lock().extend(decoded);
        Ok(count)
    }

    /// Fill `out` from the head of the queue; missing samples become silence.
    ///
    /// Returns how many samples came from the queue.
    pub fn fill(&self, out: &mut [i16]) -> usize {
        let mut queue = self.samples.lock();
        let available = queue.len().min(out.len());
        for (slot, sample) in out.iter_mut().zip(queue.drain(..available)) {
            *slot = sample;
        }
        out[available..].fill(0);
        available
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    pub fn clear(&self) {
        self.samples.lock().clear();
    }
}

impl AudioSink for PlaybackQueue {
    fn enqueue(&self, pcm16: &[u8]) -> Result<(), AudioError> {
        self.push_pcm16(pcm16).map(|_| ())
    }

    fn stop(&self) {
        self.clear();
    }
}
