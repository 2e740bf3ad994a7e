//! Call client for the relay.
//!
//! [`RelayClient`] drives one call: it opens the relay socket, streams
//! captured audio, plays provider audio through an [`AudioSink`] and reports
//! script and transcript updates as [`UiEvent`]s.
//!
//! [`AudioSink`]: crate::audio::AudioSink

mod controller;
mod events;
mod transcript;

pub use controller::{ClientError, RelayClient};
pub use events::UiEvent;
pub use transcript::{TranscriptMessage, TranscriptRole};
