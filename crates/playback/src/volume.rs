//! Software gain on delivered PCM.
//!
//! The sink owns the real volume (AVRCP absolute volume). This stage only
//! trims the decoded signal before it leaves the pipeline, so a loud library
//! can be tamed without touching the remote's volume scale.
//!
//! Buffers are interleaved 16-bit little-endian samples. A trailing odd byte
//! (half a sample) is left untouched.

use platform::audio_types::VolumePercent;

/// Scale every 16-bit LE sample in `pcm` by `gain`.
///
/// | `gain` | Effect |
/// |--------|--------|
/// | 100% | no-op (the buffer is not touched) |
/// | 50% | −6 dB |
/// | 0% | silence |
pub fn apply_gain(pcm: &mut [u8], gain: VolumePercent) {
    if gain == VolumePercent::FULL {
        return;
    }
    for sample in pcm.chunks_exact_mut(2) {
        let value = i16::from_le_bytes([
            sample.first().copied().unwrap_or(0),
            sample.get(1).copied().unwrap_or(0),
        ]);
        sample.copy_from_slice(&gain.apply(value).to_le_bytes());
    }
}
