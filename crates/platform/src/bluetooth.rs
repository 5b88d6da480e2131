//! Bluetooth A2DP source abstraction
//!
//! The radio stack itself lives outside this workspace. What the player needs
//! from it is small: push an absolute volume to the connected sink and ask
//! whether a sink is connected. Link events and the PCM pull travel the other
//! way, through the transport bridge in the `bluetooth` crate.

use crate::audio_types::AbsoluteVolume;

/// Link state reported by the A2DP stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    /// No sink connected
    Disconnected,
    /// Link setup in progress
    Connecting,
    /// Sink connected and ready for audio
    Connected,
    /// Link teardown in progress
    Disconnecting,
}

impl ConnectionState {
    /// `true` only for [`ConnectionState::Connected`].
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// A2DP source handle used by the control side.
pub trait A2dpSink {
    /// Push an absolute volume (AVRCP, 0–127) to the connected sink.
    fn set_volume(&mut self, volume: AbsoluteVolume);

    /// Check if a sink is connected
    fn is_connected(&self) -> bool;
}
