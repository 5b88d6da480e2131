//! Audio domain newtypes for compile-time safety.
//!
//! These zero-cost abstractions prevent common errors:
//! - `VolumePercent`: clamps 0–100, used for the software gain stage
//! - `AbsoluteVolume`: AVRCP absolute volume, clamps 0–127
//!
//! The fixed PCM format delivered to the A2DP transport is described by the
//! constants at the bottom of this module.

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

// ── VolumePercent ────────────────────────────────────────────────────────────

/// Volume as a percentage, clamped to 0–100.
///
/// Wraps a `u8` with the invariant `0 <= value <= 100`.
/// Construct with [`VolumePercent::new`] (clamping) or
/// [`VolumePercent::try_new`] (fallible, strict).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct VolumePercent(u8);

impl VolumePercent {
    /// Unity gain.
    pub const FULL: Self = Self(100);

    /// Create a `VolumePercent`, clamping values above 100 to 100.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        if value > 100 {
            Self(100)
        } else {
            Self(value)
        }
    }

    /// Create a `VolumePercent`, returning an error if `value > 100`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `value > 100`.
    pub fn try_new(value: u8) -> Result<Self, OutOfRangeError> {
        if value > 100 {
            Err(OutOfRangeError {
                value: u32::from(value),
                min: 0,
                max: 100,
            })
        } else {
            Ok(Self(value))
        }
    }

    /// Return the inner volume value (0–100).
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Scale one signed 16-bit sample by this gain.
    ///
    /// 100% returns the sample unchanged; 0% returns silence.
    #[must_use]
    pub fn apply(self, sample: i16) -> i16 {
        // |sample| * 100 fits in i32; the quotient is bounded by |sample|.
        let scaled = i32::from(sample)
            .saturating_mul(i32::from(self.0))
            .checked_div(100)
            .unwrap_or(0);
        #[allow(clippy::cast_possible_truncation)]
        {
            scaled.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
        }
    }
}

// ── AbsoluteVolume ───────────────────────────────────────────────────────────

/// AVRCP absolute volume, clamped to 0–127.
///
/// This is the value pushed to the connected sink and reported back by the
/// remote. 0 is muted, 127 is the loudest setting the sink offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct AbsoluteVolume(u8);

impl AbsoluteVolume {
    /// Largest absolute volume value.
    pub const MAX: Self = Self(127);
    /// Muted.
    pub const MIN: Self = Self(0);

    /// Create an `AbsoluteVolume`, clamping values above 127 to 127.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        if value > 127 {
            Self(127)
        } else {
            Self(value)
        }
    }

    /// Create an `AbsoluteVolume`, returning an error if `value > 127`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `value > 127`.
    pub fn try_new(value: u8) -> Result<Self, OutOfRangeError> {
        if value > 127 {
            Err(OutOfRangeError {
                value: u32::from(value),
                min: 0,
                max: 127,
            })
        } else {
            Ok(Self(value))
        }
    }

    /// Return the raw value (0–127).
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Raise by `step`, saturating at 127.
    #[must_use]
    pub fn step_up(self, step: u8) -> Self {
        Self::new(self.0.saturating_add(step))
    }

    /// Lower by `step`, saturating at 0.
    #[must_use]
    pub fn step_down(self, step: u8) -> Self {
        Self(self.0.saturating_sub(step))
    }

    /// Convert to a percentage of full scale (rounded down).
    #[must_use]
    pub fn to_percent(self) -> VolumePercent {
        // 127 * 100 = 12700 fits in u16; divisor is a non-zero constant.
        let pct = u16::from(self.0)
            .saturating_mul(100)
            .checked_div(127)
            .unwrap_or(0);
        #[allow(clippy::cast_possible_truncation)]
        VolumePercent::new(pct as u8)
    }
}

// ── PCM output format ────────────────────────────────────────────────────────

/// Sample rate of the PCM stream handed to the transport.
pub const PCM_SAMPLE_RATE_HZ: u32 = 44_100;

/// Interleaved channels in the PCM stream (left, right).
pub const PCM_CHANNELS: u32 = 2;

/// Bytes per sample per channel (signed 16-bit little-endian).
pub const PCM_BYTES_PER_SAMPLE: u32 = 2;

/// Bytes of PCM per second of audio at the output format (44100 × 2 × 2).
pub const PCM_BYTES_PER_SECOND: u32 = 176_400;

/// Bytes in one interleaved stereo frame.
pub const PCM_FRAME_BYTES: usize = 4;
