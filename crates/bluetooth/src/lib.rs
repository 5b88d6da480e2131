//! Bluetooth transport bridge — A2DP pull, link events, AVRCP remote keys.
//!
//! The radio stack is outside this workspace; it calls into
//! [`TransportBridge`] and receives volume through [`platform::A2dpSink`].
//!
//! This crate is `no_std` by default; it only uses `core` + `embassy-sync`.

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod avrc;
pub mod bridge;
pub mod state;

pub use avrc::{AvrcError, PassThrough, RemoteKey};
pub use bridge::{BridgeEvent, BridgeTask, TransportBridge};
pub use state::{ConnectionTracker, LinkChange};
