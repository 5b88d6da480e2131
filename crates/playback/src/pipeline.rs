//! Audio delivery pipeline — the open track, its decoder, and the pull contract.
//!
//! `AudioPipeline` owns the only open file handle and the decoder. The
//! transport pulls fixed-size buffers through [`AudioPipeline::read`], which
//! never fails and never returns a short buffer:
//!
//! | Situation | Buffer | Returns |
//! |-----------|--------|---------|
//! | nothing open | all zero | `len` |
//! | decoder produced `n < len` bytes | `n` bytes PCM, rest zero | `len` |
//! | source exhausted, nothing pending | untouched | `0` |
//!
//! Duration is estimated from the file size and the bitrate, taken from the
//! first decoded frame header or the configured fallback.

use embedded_io::{ErrorType, Read};
use platform::audio_types::{VolumePercent, PCM_BYTES_PER_SECOND};
use platform::config::PlayerConfig;
use platform::storage::{File, Storage, StorageFault};

use crate::decoder::StreamDecoder;
use crate::volume::apply_gain;

/// Why [`AudioPipeline::open`] failed. No track is open afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipelineError {
    /// The path does not resolve to a file.
    #[error("track not found")]
    NotFound,
    /// The file is zero bytes long.
    #[error("track is empty")]
    Empty,
    /// The decoder refused to start on this stream.
    #[error("decoder could not start")]
    DecoderInit,
    /// Any other storage failure.
    #[error("storage I/O error")]
    Io,
}

/// File handle plus a count of the bytes the decoder has pulled from it.
struct OpenTrack<F> {
    file: F,
    consumed: u64,
}

impl<F: ErrorType> ErrorType for OpenTrack<F> {
    type Error = F::Error;
}

impl<F: Read> Read for OpenTrack<F> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.file.read(buf)?;
        self.consumed = self.consumed.saturating_add(n as u64);
        Ok(n)
    }
}

/// The open track, its decoder, and position bookkeeping.
pub struct AudioPipeline<S: Storage, D: StreamDecoder> {
    storage: S,
    decoder: D,
    track: Option<OpenTrack<S::File>>,
    file_size: u64,
    pcm_delivered: u64,
    bitrate_kbps: u32,
    duration_known: bool,
    fallback_kbps: u32,
    gain: VolumePercent,
}

impl<S: Storage, D: StreamDecoder> AudioPipeline<S, D> {
    /// Create a pipeline reading tracks from `storage` through `decoder`.
    pub fn new(storage: S, decoder: D, config: &PlayerConfig) -> Self {
        Self {
            storage,
            decoder,
            track: None,
            file_size: 0,
            pcm_delivered: 0,
            bitrate_kbps: 0,
            duration_known: false,
            fallback_kbps: config.fallback_bitrate_kbps.max(1),
            gain: config.software_gain,
        }
    }

    /// Close the current track (if any) and open `path`.
    pub fn open(&mut self, path: &str) -> Result<(), PipelineError> {
        self.close();

        let file = self.storage.open_file(path).map_err(|e| match StorageFault::of(&e) {
            StorageFault::NotFound => PipelineError::NotFound,
            StorageFault::Full | StorageFault::Io => PipelineError::Io,
        })?;
        let size = file.size();
        if size == 0 {
            tracing::warn!("pipeline: {} is empty", path);
            return Err(PipelineError::Empty);
        }
        if let Err(e) = self.decoder.begin() {
            tracing::warn!("pipeline: decoder refused {}: {}", path, e);
            return Err(PipelineError::DecoderInit);
        }

        self.track = Some(OpenTrack { file, consumed: 0 });
        self.file_size = size;
        self.pcm_delivered = 0;
        self.bitrate_kbps = 0;
        self.duration_known = false;
        tracing::info!("pipeline: opened {} ({} bytes)", path, size);
        Ok(())
    }

    /// Release the file and decoder. Safe to call when nothing is open.
    pub fn close(&mut self) {
        if self.track.take().is_some() {
            self.decoder.end();
            tracing::debug!("pipeline: closed");
        }
        self.file_size = 0;
        self.duration_known = false;
        self.bitrate_kbps = 0;
    }

    /// `true` while a track is open.
    pub fn is_open(&self) -> bool {
        self.track.is_some()
    }

    /// Fill `buf` with the next PCM bytes. See the module table for the contract.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let Some(track) = self.track.as_mut() else {
            buf.fill(0);
            return buf.len();
        };

        let produced = self.decoder.decode(track, buf).min(buf.len());
        if produced == 0 && self.decoder.is_finished() {
            tracing::trace!("pipeline: end of track");
            return 0;
        }

        if produced > 0 && !self.duration_known {
            let kbps = self.decoder.bitrate_bps().checked_div(1000).unwrap_or(0);
            self.bitrate_kbps = if kbps > 0 { kbps } else { self.fallback_kbps };
            self.duration_known = true;
            tracing::debug!("pipeline: bitrate {} kbps", self.bitrate_kbps);
        }

        let (pcm, pad) = buf.split_at_mut(produced);
        apply_gain(pcm, self.gain);
        pad.fill(0);
        self.pcm_delivered = self.pcm_delivered.saturating_add(produced as u64);
        buf.len()
    }

    fn seconds_at(&self, bytes: u64) -> u32 {
        if !self.duration_known {
            return 0;
        }
        let bits_per_second = u64::from(self.bitrate_kbps).saturating_mul(1000);
        let seconds = bytes.saturating_mul(8).checked_div(bits_per_second).unwrap_or(0);
        u32::try_from(seconds).unwrap_or(u32::MAX)
    }

    /// Estimated track length in whole seconds, `0` until the bitrate is known.
    pub fn duration_seconds(&self) -> u32 {
        self.seconds_at(self.file_size)
    }

    /// Estimated position in whole seconds from the bytes consumed so far.
    pub fn position_seconds(&self) -> u32 {
        self.seconds_at(self.bytes_consumed())
    }

    /// Fraction of the file consumed, in `[0.0, 1.0]`.
    #[allow(clippy::cast_precision_loss)] // a ratio; f32 precision is plenty
    pub fn progress(&self) -> f32 {
        if self.file_size == 0 {
            return 0.0;
        }
        (self.bytes_consumed() as f32 / self.file_size as f32).clamp(0.0, 1.0)
    }

    /// Bytes the decoder has pulled from the open file.
    pub fn bytes_consumed(&self) -> u64 {
        self.track.as_ref().map_or(0, |t| t.consumed)
    }

    /// Size of the open file, `0` when nothing is open.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Cached bitrate in kbps, `0` until the first decoded bytes.
    pub fn bitrate_kbps(&self) -> u32 {
        self.bitrate_kbps
    }

    /// Seconds of PCM handed to the transport since open or the last reset.
    pub fn playback_seconds(&self) -> u32 {
        let seconds = self.pcm_delivered.checked_div(u64::from(PCM_BYTES_PER_SECOND)).unwrap_or(0);
        u32::try_from(seconds).unwrap_or(u32::MAX)
    }

    /// Zero the delivered-PCM counter (a new sink starts its own clock).
    pub fn reset_position(&mut self) {
        self.pcm_delivered = 0;
    }

    /// Change the software gain applied to delivered PCM.
    pub fn set_gain(&mut self, gain: VolumePercent) {
        self.gain = gain;
    }

    /// Current software gain.
    pub fn gain(&self) -> VolumePercent {
        self.gain
    }
}
