//! Player configuration and constants
//!
//! Every tunable the catalog, pipeline, and controller read lives here so host
//! tools and firmware share one set of defaults. Values are plain data; build a
//! configuration from [`PlayerConfig::DEFAULT`] and the `with_*` builders.

use crate::audio_types::{AbsoluteVolume, VolumePercent};

/// Longest full track path the catalog stores or reconstructs during a scan.
pub const MAX_PATH_LEN: usize = 256;

/// Longest display name kept for a track.
pub const MAX_NAME_LEN: usize = 128;

/// Longest text kept for one ID3 field (title, artist, album).
pub const MAX_TAG_LEN: usize = 64;

/// Number of state-change observers a controller accepts.
pub const MAX_OBSERVERS: usize = 4;

/// Depth of the remote-command queue between the transport and control tasks.
pub const EVENT_QUEUE_DEPTH: usize = 8;

/// Runtime configuration for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlayerConfig {
    /// Directory scanned recursively for tracks.
    pub music_root: &'static str,
    /// Directory holding the catalog segment files.
    pub index_dir: &'static str,
    /// Paths stored per segment file (at least 1).
    pub segment_capacity: u32,
    /// Bitrate assumed for duration estimates when the decoder reports none.
    pub fallback_bitrate_kbps: u32,
    /// Absolute volume pushed to the sink on first connection.
    pub initial_volume: AbsoluteVolume,
    /// Change applied by one VOLUME_UP / VOLUME_DOWN key press.
    pub volume_step: u8,
    /// Software gain applied to decoded PCM before delivery.
    pub software_gain: VolumePercent,
    /// Start playback automatically when a sink connects.
    pub autoplay_on_connect: bool,
}

impl PlayerConfig {
    /// Default configuration: scan the whole card, index under `/.playlist`.
    pub const DEFAULT: Self = Self {
        music_root: "/",
        index_dir: "/.playlist",
        segment_capacity: 10,
        fallback_bitrate_kbps: 128,
        initial_volume: AbsoluteVolume::new(64),
        volume_step: 10,
        software_gain: VolumePercent::FULL,
        autoplay_on_connect: true,
    };

    /// Set the scan root.
    #[must_use]
    pub const fn with_music_root(mut self, root: &'static str) -> Self {
        self.music_root = root;
        self
    }

    /// Set the index directory.
    #[must_use]
    pub const fn with_index_dir(mut self, dir: &'static str) -> Self {
        self.index_dir = dir;
        self
    }

    /// Set the paths stored per segment. Zero is raised to one.
    #[must_use]
    pub const fn with_segment_capacity(mut self, capacity: u32) -> Self {
        self.segment_capacity = if capacity == 0 { 1 } else { capacity };
        self
    }

    /// Set the fallback bitrate for duration estimates.
    #[must_use]
    pub const fn with_fallback_bitrate_kbps(mut self, kbps: u32) -> Self {
        self.fallback_bitrate_kbps = kbps;
        self
    }

    /// Set the initial sink volume.
    #[must_use]
    pub const fn with_initial_volume(mut self, volume: AbsoluteVolume) -> Self {
        self.initial_volume = volume;
        self
    }

    /// Set the volume key step.
    #[must_use]
    pub const fn with_volume_step(mut self, step: u8) -> Self {
        self.volume_step = step;
        self
    }

    /// Set the software gain.
    #[must_use]
    pub const fn with_software_gain(mut self, gain: VolumePercent) -> Self {
        self.software_gain = gain;
        self
    }

    /// Enable or disable autoplay on connect.
    #[must_use]
    pub const fn with_autoplay_on_connect(mut self, enabled: bool) -> Self {
        self.autoplay_on_connect = enabled;
        self
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
