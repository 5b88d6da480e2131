//! Decoder abstraction — the seam between the pipeline and a codec.
//!
//! A [`StreamDecoder`] pulls compressed bytes from any [`embedded_io::Read`]
//! source and yields interleaved 16-bit little-endian stereo PCM at
//! 44.1 kHz, the only format the A2DP source accepts.
//!
//! # Decoder crate selection
//!
//! * **MP3**: `nanomp3` (pure-Rust, `no_std`, c2rust translation of minimp3 with
//!   soundness fixes), gated behind the `mp3` feature. See
//!   [`crate::mp3_decoder`].

use embedded_io::Read;

/// Errors a [`StreamDecoder`] may report when starting a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// The input bitstream contains invalid or corrupt data.
    #[error("invalid or corrupt bitstream")]
    InvalidData,
    /// The codec is not available in this build.
    #[error("unsupported format")]
    UnsupportedFormat,
    /// The codec failed to set up its state.
    #[error("decoder initialisation failed")]
    InitFailed,
}

/// A streaming decoder producing 16-bit LE stereo PCM.
///
/// The pipeline calls [`begin`](Self::begin) once per track, then
/// [`decode`](Self::decode) from the real-time path until
/// [`is_finished`](Self::is_finished), then [`end`](Self::end).
pub trait StreamDecoder {
    /// Prepare for a new stream, discarding any state from the previous one.
    fn begin(&mut self) -> Result<(), DecodeError>;

    /// Fill `out` with as much PCM as can be produced, reading `source` as needed.
    ///
    /// Returns the number of bytes written. A short count (even `0`) means
    /// the decoder ran out of work budget or input on this call; only
    /// [`is_finished`](Self::is_finished) marks the end of the stream. Read
    /// errors on `source` are treated as end of stream.
    fn decode<R: Read>(&mut self, source: &mut R, out: &mut [u8]) -> usize;

    /// `true` once the source is exhausted and no decoded bytes are pending.
    fn is_finished(&self) -> bool;

    /// Bitrate of the last decoded frame in bits per second, `0` if unknown.
    fn bitrate_bps(&self) -> u32;

    /// Release per-stream state.
    fn end(&mut self);
}
