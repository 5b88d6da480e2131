//! Platform abstractions for the SD-card A2DP player
//!
//! This crate provides the trait seams between the player logic and the
//! hardware it runs on, enabling development and testing without a radio or
//! a card slot.
//!
//! # Architecture Layers
//!
//! ```text
//! Host tools (xtask)  /  firmware integration
//!         ↓
//! Feature Layers (library, playback, bluetooth)
//!         ↓
//! Platform (this crate - traits, newtypes, configuration)
//!         ↓
//! SD/FAT driver + A2DP stack
//! ```
//!
//! # Seams
//!
//! - [`Storage`] - File system access (blocking, `embedded-io` streams)
//! - [`A2dpSink`] - Volume push and link query on the A2DP source
//! - [`PlayerConfig`] - Tunables shared by every layer
//!
//! # Features
//!
//! - `std`: Enable [`storage_local::LocalFileStorage`] and the [`mocks`]
//! - `defmt`: Enable `defmt::Format` derives
//!
//! # Example
//!
//! ```no_run
//! use platform::{Storage, StorageFault};
//!
//! fn probe<S: Storage>(storage: &mut S) -> Result<bool, StorageFault> {
//!     storage.exists("/.playlist").map_err(|e| StorageFault::of(&e))
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // VOLUME_UP and friends are key names, not code
#![allow(clippy::must_use_candidate)] // accessors — callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod audio_types;
pub mod bluetooth;
pub mod config;
pub mod mocks;
pub mod storage;
#[cfg(any(test, feature = "std"))]
pub mod storage_local;

pub use audio_types::{AbsoluteVolume, OutOfRangeError, VolumePercent};
pub use bluetooth::{A2dpSink, ConnectionState};
pub use config::PlayerConfig;
pub use storage::{read_full, write_full, Dir, DirEntry, File, Storage, StorageFault};
