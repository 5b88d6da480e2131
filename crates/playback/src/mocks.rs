//! Mock decoder for testing
//!
//! [`PcmPassthroughDecoder`] treats the file bytes as already-decoded PCM, so
//! a test controls exactly which bytes the pipeline delivers.

#![cfg(any(test, feature = "std"))]

use embedded_io::Read;

use crate::decoder::{DecodeError, StreamDecoder};

/// Decoder that copies source bytes straight to the output.
#[derive(Debug, Default, Clone)]
pub struct PcmPassthroughDecoder {
    /// Bitrate reported once the first bytes are produced (bits/s, 0 = none).
    pub reported_bps: u32,
    /// Make [`StreamDecoder::begin`] fail with [`DecodeError::InitFailed`].
    pub fail_begin: bool,
    /// Produce at most this many bytes per call, to simulate frame boundaries.
    pub max_per_call: Option<usize>,
    bitrate_bps: u32,
    finished: bool,
}

impl PcmPassthroughDecoder {
    /// Decoder reporting no bitrate and never limiting output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `bps` from the first produced bytes on.
    #[must_use]
    pub fn with_bitrate_bps(mut self, bps: u32) -> Self {
        self.reported_bps = bps;
        self
    }

    /// Cap each call at `bytes` of output.
    #[must_use]
    pub fn with_max_per_call(mut self, bytes: usize) -> Self {
        self.max_per_call = Some(bytes);
        self
    }

    /// Refuse to begin any stream.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_begin: true,
            ..Self::default()
        }
    }
}

impl StreamDecoder for PcmPassthroughDecoder {
    fn begin(&mut self) -> Result<(), DecodeError> {
        if self.fail_begin {
            return Err(DecodeError::InitFailed);
        }
        self.bitrate_bps = 0;
        self.finished = false;
        Ok(())
    }

    fn decode<R: Read>(&mut self, source: &mut R, out: &mut [u8]) -> usize {
        let limit = self.max_per_call.map_or(out.len(), |cap| cap.min(out.len()));
        let mut filled = 0usize;
        while filled < limit && !self.finished {
            let Some(window) = out.get_mut(filled..limit) else {
                break;
            };
            match source.read(window) {
                Ok(0) | Err(_) => self.finished = true,
                Ok(n) => filled = filled.saturating_add(n),
            }
        }
        if filled > 0 {
            self.bitrate_bps = self.reported_bps;
        }
        filled
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn bitrate_bps(&self) -> u32 {
        self.bitrate_bps
    }

    fn end(&mut self) {
        self.finished = true;
    }
}
