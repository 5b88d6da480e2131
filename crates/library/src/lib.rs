//! Music catalog — card scan, segmented track index, tag parsing.
//!
//! # Modules
//!
//! - [`catalog`] — `CatalogIndex`, the ordinal → path mapping on the card
//! - [`segment`] — segment file naming and the line-record reader
//! - [`scanner`] — directory walk and extension filtering
//! - [`track`] — display-name derivation and `TrackMetadata`
//! - [`metadata`] — ID3v2 tag reader

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod catalog;
pub mod metadata;
pub mod scanner;
pub mod segment;
pub mod track;

// Top-level re-exports for convenience
pub use catalog::{CatalogError, CatalogIndex};
pub use metadata::{read_track_metadata, MetadataError};
pub use scanner::{Scanner, WalkError};
pub use track::{display_name, TrackMetadata, TrackName, TrackPath};
