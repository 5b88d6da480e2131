//! nanomp3-based streaming MP3 decoder.
//!
//! Implements [`StreamDecoder`] using the `nanomp3` crate.
//! nanomp3 is a pure-Rust, no_std c2rust translation of minimp3 with ARM
//! soundness fixes.
//!
//! `nanomp3::Decoder` has no internal buffering, so this adapter keeps an
//! input window refilled from the track file and a PCM carry queue holding
//! the part of a decoded frame that did not fit the caller's buffer.
//!
//! # Feature flag
//!
//! The `nanomp3` dependency and the real decode path are both gated behind the
//! `mp3` feature. Without it [`StreamDecoder::begin`] fails with
//! [`DecodeError::UnsupportedFormat`].

use embedded_io::Read;

use crate::decoder::{DecodeError, StreamDecoder};
use crate::ring_buffer::RingBuffer;

/// Compressed bytes held between calls. Two worst-case frames fit, which
/// minimp3 needs to lock onto a stream.
const INPUT_LEN: usize = 4096;

/// One decoded MP3 frame as 16-bit stereo: 1152 samples × 2 ch × 2 B.
const PCM_CARRY_LEN: usize = 4608;

/// Refill-and-decode rounds allowed per [`StreamDecoder::decode`] call.
///
/// Skipping a large tag or a run of garbage is spread over several pulls
/// instead of stalling one.
#[cfg_attr(not(feature = "mp3"), allow(dead_code))]
const MAX_ROUNDS_PER_CALL: u8 = 8;

/// Layer III bitrates in kbps, MPEG-1.
const BITRATES_V1_L3: [u16; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];

/// Layer III bitrates in kbps, MPEG-2 and MPEG-2.5.
const BITRATES_V2_L3: [u16; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

/// Bitrate in kbps of the first Layer III frame header in `bytes`.
///
/// Free-format (index 0) and reserved values are skipped.
pub fn find_header_bitrate_kbps(bytes: &[u8]) -> Option<u16> {
    bytes.windows(4).find_map(|h| {
        let (b0, b1, b2) = (*h.first()?, *h.get(1)?, *h.get(2)?);
        if b0 != 0xFF || b1 & 0xE0 != 0xE0 {
            return None;
        }
        let version = (b1 >> 3) & 0x03;
        let layer = (b1 >> 1) & 0x03;
        let index = usize::from(b2 >> 4);
        let rate_index = (b2 >> 2) & 0x03;
        if version == 0b01 || layer != 0b01 || rate_index == 0b11 {
            return None;
        }
        let table = if version == 0b11 { &BITRATES_V1_L3 } else { &BITRATES_V2_L3 };
        table.get(index).copied().filter(|&kbps| kbps != 0)
    })
}

/// Streaming MP3 decoder backed by nanomp3.
pub struct Mp3Decoder {
    #[cfg(feature = "mp3")]
    inner: nanomp3::Decoder,
    #[cfg(feature = "mp3")]
    frame: [f32; nanomp3::MAX_SAMPLES_PER_FRAME],
    input: [u8; INPUT_LEN],
    start: usize,
    end: usize,
    source_done: bool,
    pcm: RingBuffer<PCM_CARRY_LEN>,
    bitrate_bps: u32,
    #[cfg(feature = "mp3")]
    rate_warned: bool,
}

impl Mp3Decoder {
    /// Create a decoder. Call [`StreamDecoder::begin`] before decoding.
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "mp3")]
            inner: nanomp3::Decoder::new(),
            #[cfg(feature = "mp3")]
            frame: [0.0; nanomp3::MAX_SAMPLES_PER_FRAME],
            input: [0; INPUT_LEN],
            start: 0,
            end: 0,
            source_done: false,
            pcm: RingBuffer::new(),
            bitrate_bps: 0,
            #[cfg(feature = "mp3")]
            rate_warned: false,
        }
    }

    fn reset(&mut self) {
        self.start = 0;
        self.end = 0;
        self.source_done = false;
        self.pcm.clear();
        self.bitrate_bps = 0;
        #[cfg(feature = "mp3")]
        {
            self.rate_warned = false;
        }
    }

    /// Slide unread input to the front and top the window up from `source`.
    #[allow(clippy::arithmetic_side_effects)] // Safety: start <= end <= INPUT_LEN
    fn refill<R: Read>(&mut self, source: &mut R) {
        if self.start > 0 {
            self.input.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        while !self.source_done && self.end < INPUT_LEN {
            let Some(window) = self.input.get_mut(self.end..) else {
                break;
            };
            match source.read(window) {
                Ok(0) => self.source_done = true,
                Ok(n) => self.end += n.min(INPUT_LEN - self.end),
                Err(e) => {
                    tracing::warn!("mp3: read failed, ending stream: {:?}", embedded_io::Error::kind(&e));
                    self.source_done = true;
                }
            }
        }
    }

    /// Decode one frame into the PCM carry queue.
    ///
    /// Returns `false` when no frame was produced within the round budget.
    #[cfg(feature = "mp3")]
    fn decode_frame<R: Read>(&mut self, source: &mut R) -> bool {
        for _ in 0..MAX_ROUNDS_PER_CALL {
            self.refill(source);
            let pending = self.input.get(self.start..self.end).unwrap_or(&[]);
            if pending.is_empty() {
                return false;
            }
            let header_kbps = find_header_bitrate_kbps(pending);
            let pending_len = pending.len();
            let (consumed, info) = self.inner.decode(pending, &mut self.frame);
            self.start = self.start.saturating_add(consumed.min(pending_len));
            match info {
                Some(info) => {
                    if let Some(kbps) = header_kbps {
                        self.bitrate_bps = u32::from(kbps).saturating_mul(1000);
                    }
                    if info.sample_rate != platform::audio_types::PCM_SAMPLE_RATE_HZ && !self.rate_warned {
                        tracing::warn!("mp3: {} Hz stream delivered unresampled", info.sample_rate);
                        self.rate_warned = true;
                    }
                    #[allow(clippy::cast_possible_truncation)]
                    let channels = info.channels.num() as usize;
                    self.push_frame(info.samples_produced, channels);
                    return true;
                }
                None if consumed == 0 => {
                    if self.source_done {
                        // Trailing bytes that will never form a frame.
                        self.start = self.end;
                        return false;
                    }
                    // A full window with no sync word in it.
                    self.start = self.end;
                }
                None => {}
            }
        }
        false
    }

    /// Convert `per_channel` samples of the scratch frame to i16 LE stereo.
    #[cfg(feature = "mp3")]
    fn push_frame(&mut self, per_channel: usize, channels: usize) {
        let channels = channels.clamp(1, 2);
        let total = per_channel.saturating_mul(channels).min(self.frame.len());
        let mut staging = [0u8; 64];
        let mut fill = 0usize;
        for group in self.frame.get(..total).unwrap_or(&[]).chunks(channels) {
            let left = to_i16(group.first().copied().unwrap_or(0.0));
            let right = if channels == 2 {
                to_i16(group.get(1).copied().unwrap_or(0.0))
            } else {
                left
            };
            for value in [left, right] {
                let [lo, hi] = value.to_le_bytes();
                if let Some(slot) = staging.get_mut(fill..fill.saturating_add(2)) {
                    slot.copy_from_slice(&[lo, hi]);
                }
                fill = fill.saturating_add(2);
            }
            if fill == staging.len() {
                if self.pcm.write_slice(&staging).is_err() {
                    tracing::warn!("mp3: PCM carry overflow, frame truncated");
                    return;
                }
                fill = 0;
            }
        }
        if self.pcm.write_slice(staging.get(..fill).unwrap_or(&[])).is_err() {
            tracing::warn!("mp3: PCM carry overflow, frame truncated");
        }
    }

    #[cfg(not(feature = "mp3"))]
    fn decode_frame<R: Read>(&mut self, source: &mut R) -> bool {
        let _ = source;
        self.source_done = true;
        false
    }

    /// `true` when the source is drained and every decoded byte was delivered.
    pub fn is_drained(&self) -> bool {
        self.source_done && self.start >= self.end && self.pcm.is_empty()
    }
}

#[cfg(feature = "mp3")]
#[allow(clippy::cast_possible_truncation)] // Safety: clamped to [-1, 1] before scaling
fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

impl Default for Mp3Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder for Mp3Decoder {
    fn begin(&mut self) -> Result<(), DecodeError> {
        self.reset();
        #[cfg(feature = "mp3")]
        {
            self.inner = nanomp3::Decoder::new();
            Ok(())
        }
        #[cfg(not(feature = "mp3"))]
        {
            Err(DecodeError::UnsupportedFormat)
        }
    }

    fn decode<R: Read>(&mut self, source: &mut R, out: &mut [u8]) -> usize {
        let mut written = 0usize;
        loop {
            written = written.saturating_add(self.pcm.read_slice(out.get_mut(written..).unwrap_or(&mut [])));
            if written >= out.len() || !self.decode_frame(source) {
                return written;
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.is_drained()
    }

    fn bitrate_bps(&self) -> u32 {
        self.bitrate_bps
    }

    fn end(&mut self) {
        self.reset();
    }
}
