//! Audio playback — decoding, the real-time delivery pipeline, session control
//!
//! # Modules
//!
//! - [`decoder`] — `StreamDecoder`, the codec seam
//! - [`mp3_decoder`] — nanomp3 adapter (feature `mp3`)
//! - [`pipeline`] — `AudioPipeline`, the open track and the pull contract
//! - [`controller`] — `PlaybackController`, the STOPPED/PLAYING/PAUSED machine
//! - [`ring_buffer`] — PCM carry queue
//! - [`volume`] — software gain
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod controller;
pub mod decoder;
pub mod mocks;
pub mod mp3_decoder;
pub mod pipeline;
pub mod ring_buffer;
pub mod volume;

pub use controller::{Command, CommandError, PlaybackController, PlaybackObserver, PlaybackState};
pub use decoder::{DecodeError, StreamDecoder};
pub use mp3_decoder::Mp3Decoder;
pub use pipeline::{AudioPipeline, PipelineError};
