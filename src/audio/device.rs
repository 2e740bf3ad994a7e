//! cpal-backed microphone and speaker streams.
//!
//! cpal streams are not `Send` on every platform, so each stream is built,
//! played and dropped on its own thread. Stopping signals that thread and joins
//! it, which releases the device before `stop` returns.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleRate, Stream, StreamConfig};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{error, info};

use super::codec::pcm16_to_float;
use super::{
    AudioError, AudioSink, AudioSource, CAPTURE_CHUNK_SAMPLES, CHANNELS, ChunkCallback,
    PlaybackQueue, SAMPLE_RATE, SampleChunker,
};

fn stream_config() -> StreamConfig {
    StreamConfig {
        channels: CHANNELS,
        sample_rate: SampleRate(SAMPLE_RATE),
        buffer_size: BufferSize::Default,
    }
}

fn find_device(name: Option<&str>, input: bool) -> Result<Device, AudioError> {
    let host = cpal::default_host();

    let Some(wanted) = name else {
        let device = if input {
            host.default_input_device()
        } else {
            host.default_output_device()
        };
        return device
            .ok_or_else(|| AudioError::Device("No default audio device available".to_string()));
    };

    let enumerate_err = |e: cpal::DevicesError| {
        AudioError::Device(format!("Failed to enumerate devices: {e}"))
    };
    let matches = |d: &Device| d.name().map(|n| n == wanted).unwrap_or(false);
    let found = if input {
        host.input_devices().map_err(enumerate_err)?.find(matches)
    } else {
        host.output_devices().map_err(enumerate_err)?.find(matches)
    };

    found.ok_or_else(|| AudioError::Device(format!("Device '{wanted}' not found")))
}

/// Owns the thread that keeps one cpal stream alive.
struct StreamWorker {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl StreamWorker {
    fn spawn<F>(name: &str, build: F) -> Result<Self, AudioError>
    where
        F: FnOnce() -> Result<Stream, AudioError> + Send + 'static,
    {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), AudioError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || match build() {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // Blocks until stop() or until the sender is dropped
                    let _ = stop_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| AudioError::Device(format!("Failed to spawn audio thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { stop_tx, handle }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::Device("Audio thread exited during startup".to_string()))
            }
        }
    }

    fn stop(self) {
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            error!("Audio thread panicked while stopping");
        }
    }
}

/// Microphone capture at 24kHz mono, delivered as fixed-size PCM16 chunks.
pub struct MicrophoneCapture {
    device_name: Option<String>,
    chunk_size: usize,
    worker: Option<StreamWorker>,
}

impl MicrophoneCapture {
    /// Capture from the named input device, or the default one.
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            chunk_size: CAPTURE_CHUNK_SAMPLES,
            worker: None,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// List available input devices
    pub fn list_devices() -> Result<Vec<String>, AudioError> {
        let devices = cpal::default_host()
            .input_devices()
            .map_err(|e| AudioError::Device(format!("Failed to enumerate input devices: {e}")))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

impl AudioSource for MicrophoneCapture {
    fn start(&mut self, mut on_chunk: ChunkCallback) -> Result<(), AudioError> {
        if self.worker.is_some() {
            return Err(AudioError::AlreadyRunning);
        }

        let device_name = self.device_name.clone();
        let chunk_size = self.chunk_size;

        let worker = StreamWorker::spawn("mic-capture", move || {
            let device = find_device(device_name.as_deref(), true)?;
            info!("Using input device: {}", device.name().unwrap_or_default());

            let mut chunker = SampleChunker::new(chunk_size);
            let stream = device
                .build_input_stream(
                    &stream_config(),
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        for chunk in chunker.push(data) {
                            on_chunk(chunk);
                        }
                    },
                    |err| error!("Audio input error: {}", err),
                    None,
                )
                .map_err(|e| AudioError::Device(format!("Failed to build input stream: {e}")))?;

            stream
                .play()
                .map_err(|e| AudioError::Device(format!("Failed to start input stream: {e}")))?;
            Ok(stream)
        })?;

        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop();
            info!("Microphone capture stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        AudioSource::stop(self);
    }
}

/// Speaker output draining a shared [`PlaybackQueue`].
pub struct SpeakerPlayback {
    queue: PlaybackQueue,
    worker: Option<StreamWorker>,
}

impl SpeakerPlayback {
    /// Open the named output device (or the default) and start draining the queue.
    pub fn start(device_name: Option<String>) -> Result<Self, AudioError> {
        let queue = PlaybackQueue::new();
        let drain = queue.clone();

        let worker = StreamWorker::spawn("speaker-playback", move || {
            let device = find_device(device_name.as_deref(), false)?;
            info!("Using output device: {}", device.name().unwrap_or_default());

            let mut scratch: Vec<i16> = Vec::new();
            let stream = device
                .build_output_stream(
                    &stream_config(),
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        scratch.resize(data.len(), 0);
                        drain.fill(&mut scratch);
                        for (out, sample) in data.iter_mut().zip(pcm16_to_float(&scratch)) {
                            *out = sample;
                        }
                    },
                    |err| error!("Audio output error: {}", err),
                    None,
                )
                .map_err(|e| AudioError::Device(format!("Failed to build output stream: {e}")))?;

            stream
                .play()
                .map_err(|e| AudioError::Device(format!("Failed to start output stream: {e}")))?;
            Ok(stream)
        })?;

        Ok(Self {
            queue,
            worker: Some(worker),
        })
    }

    pub fn queue(&self) -> &PlaybackQueue {
        &self.queue
    }
}

impl AudioSink for SpeakerPlayback {
    fn enqueue(&self, pcm16: &[u8]) -> Result<(), AudioError> {
        self.queue.push_pcm16(pcm16).map(|_| ())
    }

    fn stop(&self) {
        self.queue.clear();
    }
}

impl Drop for SpeakerPlayback {
    fn drop(&mut self) {
        self.queue.clear();
        if let Some(worker) = self.worker.take() {
            worker.stop();
            info!("Speaker playback stopped");
        }
    }
}
