//! AVRCP remote-control keys and AV/C PASS THROUGH frame decoding.
//!
//! The sink reports button presses as AV/C PASS THROUGH commands
//! (opcode `0x7C`). The operation byte carries the key in its low seven bits
//! and the state flag in the top bit (`0` = pressed, `1` = released).
//!
//! Frame layout as delivered by the A2DP stack:
//!
//! ```text
//! [ctype, subunit, opcode=0x7C, state|operation_id, operand_len, ...]
//! ```

use playback::Command;

/// AV/C opcode of a PASS THROUGH command.
pub const PASS_THROUGH_OPCODE: u8 = 0x7C;


// ─────────────────────────────────────────────────────────────────────────────
// Public types
// ─────────────────────────────────────────────────────────────────────────────

/// Remote keys the player reacts to (AV/C panel subunit operation IDs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RemoteKey {
    /// VOLUME_UP (0x41).
    VolumeUp = 0x41,
    /// VOLUME_DOWN (0x42).
    VolumeDown = 0x42,
    /// PLAY (0x44).
    Play = 0x44,
    /// STOP (0x45).
    Stop = 0x45,
    /// PAUSE (0x46).
    Pause = 0x46,
    /// FORWARD (0x4B), next track.
    Forward = 0x4B,
    /// BACKWARD (0x4C), previous track.
    Backward = 0x4C,
}

impl RemoteKey {
    /// Decode an operation ID (state flag already stripped).
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x41 => Some(Self::VolumeUp),
            0x42 => Some(Self::VolumeDown),
            0x44 => Some(Self::Play),
            0x45 => Some(Self::Stop),
            0x46 => Some(Self::Pause),
            0x4B => Some(Self::Forward),
            0x4C => Some(Self::Backward),
            _ => None,
        }
    }

    /// The operation ID.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// The playback command for this key. Volume keys have none.
    #[must_use]
    pub const fn command(self) -> Option<Command> {
        match self {
            Self::Play => Some(Command::Play),
            Self::Pause => Some(Command::Pause),
            Self::Stop => Some(Command::Stop),
            Self::Forward => Some(Command::NextTrack),
            Self::Backward => Some(Command::PrevTrack),
            Self::VolumeUp | Self::VolumeDown => None,
        }
    }
}

/// A decoded PASS THROUGH command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PassThrough {
    /// The key.
    pub key: RemoteKey,
    /// `true` on key release, `false` on press.
    pub released: bool,
}

/// Errors that can occur when decoding a PASS THROUGH frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AvrcError {
    /// Fewer than the four header bytes.
    #[error("AV/C frame too short")]
    FrameTooShort,
    /// The opcode is not PASS THROUGH.
    #[error("not a PASS THROUGH frame (opcode {0:#04x})")]
    NotPassThrough(u8),
    /// The operation ID is not a key the player handles.
    #[error("unhandled key {0:#04x}")]
    UnknownKey(u8),
}

impl PassThrough {
    /// Decode a raw AV/C frame.
    ///
    /// # Errors
    ///
    /// [`AvrcError::FrameTooShort`] below four bytes, [`AvrcError::NotPassThrough`]
    /// for other opcodes, [`AvrcError::UnknownKey`] for keys without a mapping.
    #[allow(clippy::indexing_slicing)] // Safety: len >= 4 checked above
    pub fn parse(bytes: &[u8]) -> Result<Self, AvrcError> {
        if bytes.len() < 4 {
            return Err(AvrcError::FrameTooShort);
        }
        if bytes[2] != PASS_THROUGH_OPCODE {
            return Err(AvrcError::NotPassThrough(bytes[2]));
        }
        let operation = bytes[3];
        let code = operation & 0x7F;
        let key = RemoteKey::from_code(code).ok_or(AvrcError::UnknownKey(code))?;
        Ok(Self {
            key,
            released: operation & 0x80 != 0,
        })
    }
}
