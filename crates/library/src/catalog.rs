//! CatalogIndex — persistent ordinal → path mapping on the card.
//!
//! The catalog never holds more than one path in RAM. A scan streams every
//! qualifying path into fixed-capacity segment files (see [`crate::segment`]);
//! a lookup opens exactly one segment and skips at most `K - 1` lines.
//!
//! # Access patterns
//!
//! | Method | Cost | Notes |
//! |--------|------|-------|
//! | `scan()` | full tree walk + one write per track | Rebuilds from scratch |
//! | `load()` | one `exists` per segment + one segment read | Falls back to `scan()` |
//! | `get_path(i)` | 1 open + ≤ K line skips | Single track |
//! | `get_names(start, n)` | 1 open per segment crossed | UI window |

use embedded_io::Write as _;
use heapless::Vec;
use platform::config::PlayerConfig;
use platform::storage::{write_full, Dir, Storage, StorageFault};

use crate::metadata::read_track_metadata;
use crate::scanner::{Scanner, WalkError};
use crate::segment::{segment_path, LineReader};
use crate::track::{display_name, name_from_path, TrackMetadata, TrackName, TrackPath};

/// Error from building or loading the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CatalogError {
    /// The music root could not be opened as a directory.
    #[error("music root is not a readable directory")]
    RootNotDirectory,
    /// A record could not be written because the volume is full.
    #[error("storage full while writing the index")]
    StorageFull,
    /// Any other storage failure.
    #[error("storage I/O error")]
    Io,
}

impl From<StorageFault> for CatalogError {
    fn from(fault: StorageFault) -> Self {
        match fault {
            StorageFault::Full => Self::StorageFull,
            StorageFault::NotFound | StorageFault::Io => Self::Io,
        }
    }
}

fn fault<E: embedded_io::Error>(err: E) -> CatalogError {
    CatalogError::from(StorageFault::of(&err))
}

/// Streams records into consecutive segment files.
struct SegmentWriter<F> {
    file: Option<F>,
    next_segment: u32,
    in_segment: u32,
    capacity: u32,
}

impl<F: embedded_io::Write> SegmentWriter<F> {
    fn append<S>(&mut self, storage: &mut S, index_dir: &str, path: &str) -> Result<(), CatalogError>
    where
        S: Storage<File = F>,
    {
        if self.file.is_none() || self.in_segment >= self.capacity {
            self.close()?;
            let seg_path = segment_path(index_dir, self.next_segment).ok_or(CatalogError::Io)?;
            self.file = Some(storage.create_file(seg_path.as_str()).map_err(fault)?);
            self.next_segment = self.next_segment.saturating_add(1);
            self.in_segment = 0;
        }
        let file = self.file.as_mut().ok_or(CatalogError::Io)?;
        write_full(file, path.as_bytes())?;
        write_full(file, b"\n")?;
        self.in_segment = self.in_segment.saturating_add(1);
        Ok(())
    }

    fn close(&mut self) -> Result<(), CatalogError> {
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(fault)?;
        }
        Ok(())
    }
}

/// Segmented on-card catalog of playable tracks.
///
/// Parameterised over any [`platform::Storage`] implementation. Ordinals are
/// dense and follow scan (directory listing) order, not alphabetical order.
pub struct CatalogIndex<S: Storage> {
    storage: S,
    music_root: &'static str,
    index_dir: &'static str,
    segment_capacity: u32,
    track_count: u32,
}

impl<S: Storage> CatalogIndex<S> {
    /// Create an empty catalog over `storage`. Call [`load`](Self::load) or
    /// [`scan`](Self::scan) before querying.
    pub fn new(storage: S, config: &PlayerConfig) -> Self {
        Self {
            storage,
            music_root: config.music_root,
            index_dir: config.index_dir,
            segment_capacity: config.segment_capacity.max(1),
            track_count: 0,
        }
    }

    /// Number of tracks in the catalog (0 before a successful scan/load).
    pub fn track_count(&self) -> u32 {
        self.track_count
    }

    /// `true` if `ordinal` names a track.
    pub fn is_valid(&self, ordinal: u32) -> bool {
        ordinal < self.track_count
    }

    /// Paths stored per segment file.
    pub fn segment_capacity(&self) -> u32 {
        self.segment_capacity
    }

    /// Mutable access to the backing storage.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Rebuild the index from a full walk of the music root.
    ///
    /// Deletes every prior artifact first. On failure the partial index is
    /// removed and `track_count()` is 0.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::RootNotDirectory`] if the root cannot be listed
    /// - [`CatalogError::StorageFull`] if a record cannot be written
    /// - [`CatalogError::Io`] for any other storage failure
    pub fn scan(&mut self) -> Result<u32, CatalogError> {
        self.track_count = 0;
        match self.build() {
            Ok(count) => {
                self.track_count = count;
                tracing::info!("catalog scan finished: {} tracks", count);
                Ok(count)
            }
            Err(err) => {
                tracing::warn!("catalog scan failed: {}", err);
                if self.remove_artifacts().is_err() {
                    tracing::warn!("could not remove partial index in {}", self.index_dir);
                }
                Err(err)
            }
        }
    }

    fn build(&mut self) -> Result<u32, CatalogError> {
        self.storage.create_dir(self.index_dir).map_err(fault)?;
        self.remove_artifacts()?;

        let index_dir = self.index_dir;
        let mut writer: SegmentWriter<S::File> = SegmentWriter {
            file: None,
            next_segment: 0,
            in_segment: 0,
            capacity: self.segment_capacity,
        };
        let mut record = |storage: &mut S, path: &str| writer.append(storage, index_dir, path);
        let walked = Scanner::walk(&mut self.storage, self.music_root, index_dir, &mut record);
        let count = match walked {
            Ok(count) => count,
            Err(WalkError::RootNotDirectory) => return Err(CatalogError::RootNotDirectory),
            Err(WalkError::Listing) => return Err(CatalogError::Io),
            Err(WalkError::Visitor(err)) => return Err(err),
        };
        writer.close()?;
        Ok(count)
    }

    /// Delete every file in the index directory.
    fn remove_artifacts(&mut self) -> Result<(), CatalogError> {
        let mut dir = match self.storage.open_dir(self.index_dir) {
            Ok(dir) => dir,
            Err(e) if StorageFault::of(&e) == StorageFault::NotFound => return Ok(()),
            Err(e) => return Err(fault(e)),
        };
        while let Some(entry) = dir.next_entry().map_err(fault)? {
            if entry.is_dir {
                continue;
            }
            let mut path = TrackPath::new();
            if path.push_str(self.index_dir.trim_end_matches('/')).is_err()
                || path.push('/').is_err()
                || path.push_str(entry.name.as_str()).is_err()
            {
                return Err(CatalogError::Io);
            }
            self.storage.remove(path.as_str()).map_err(fault)?;
        }
        Ok(())
    }

    /// Load a prior build, or scan if there is none.
    ///
    /// Counts records from segment boundaries: every segment but the last is
    /// full, so only the last one is read.
    ///
    /// # Errors
    ///
    /// Returns the [`scan`](Self::scan) error when no build exists, or
    /// [`CatalogError::Io`] if an existing build cannot be read.
    pub fn load(&mut self) -> Result<u32, CatalogError> {
        self.track_count = 0;
        let first = segment_path(self.index_dir, 0).ok_or(CatalogError::Io)?;
        if !self.storage.exists(first.as_str()).map_err(fault)? {
            tracing::info!("no catalog index found, scanning {}", self.music_root);
            return self.scan();
        }

        let count = self.count_records()?;
        self.track_count = count;
        tracing::info!("catalog loaded: {} tracks", count);
        Ok(count)
    }

    fn count_records(&mut self) -> Result<u32, CatalogError> {
        let mut segments = 0u32;
        loop {
            let path = segment_path(self.index_dir, segments).ok_or(CatalogError::Io)?;
            if !self.storage.exists(path.as_str()).map_err(fault)? {
                break;
            }
            segments = segments.saturating_add(1);
        }
        let Some(last) = segments.checked_sub(1) else {
            return Ok(0);
        };
        let path = segment_path(self.index_dir, last).ok_or(CatalogError::Io)?;
        let mut file = self.storage.open_file(path.as_str()).map_err(fault)?;
        let tail = LineReader::new(&mut file).count_lines().map_err(fault)?;
        Ok(last.saturating_mul(self.segment_capacity).saturating_add(tail))
    }

    /// Visit the paths of ordinals `[start, end)`, opening each segment once.
    ///
    /// Stops early (with a warning) on any read failure.
    fn for_each_path(&mut self, start: u32, end: u32, mut f: impl FnMut(u32, &str)) {
        let k = self.segment_capacity;
        let mut ordinal = start;
        while ordinal < end {
            let segment = ordinal.checked_div(k).unwrap_or(0);
            let skip = ordinal.checked_rem(k).unwrap_or(0);
            let Some(path) = segment_path(self.index_dir, segment) else {
                return;
            };
            let mut file = match self.storage.open_file(path.as_str()) {
                Ok(file) => file,
                Err(_) => {
                    tracing::warn!("catalog segment {} unreadable", segment);
                    return;
                }
            };
            let mut reader = LineReader::new(&mut file);
            for _ in 0..skip {
                if !matches!(reader.skip_line(), Ok(true)) {
                    tracing::warn!("catalog segment {} shorter than expected", segment);
                    return;
                }
            }
            let segment_end = segment.saturating_add(1).saturating_mul(k).min(end);
            let mut line = TrackPath::new();
            while ordinal < segment_end {
                if !matches!(reader.read_line(&mut line), Ok(true)) {
                    tracing::warn!("catalog record {} missing", ordinal);
                    return;
                }
                f(ordinal, line.as_str());
                ordinal = ordinal.saturating_add(1);
            }
        }
    }

    /// Full path of `ordinal`, or `None` if it is out of range or unreadable.
    pub fn get_path(&mut self, ordinal: u32) -> Option<TrackPath> {
        if !self.is_valid(ordinal) {
            return None;
        }
        let mut found = None;
        self.for_each_path(ordinal, ordinal.saturating_add(1), |_, path| {
            let mut owned = TrackPath::new();
            // Cannot fail: path came from a TrackPath.
            let _ = owned.push_str(path);
            found = Some(owned);
        });
        found
    }

    /// Display name of `ordinal`: its basename without extension.
    pub fn get_name(&mut self, ordinal: u32) -> Option<TrackName> {
        self.get_path(ordinal).map(|path| name_from_path(path.as_str()))
    }

    /// Display names of up to `count` tracks starting at `start`.
    ///
    /// Only in-range ordinals are returned, capped at `N`. Each segment the
    /// range touches is opened once.
    pub fn get_names<const N: usize>(&mut self, start: u32, count: u32) -> Vec<TrackName, N> {
        let mut names = Vec::new();
        let cap = u32::try_from(N).unwrap_or(u32::MAX);
        let end = start
            .saturating_add(count.min(cap))
            .min(self.track_count);
        self.for_each_path(start, end, |_, path| {
            let _ = names.push(name_from_path(path));
        });
        names
    }

    /// Read the tag of the track at `path`.
    ///
    /// Never fails: an unreadable file yields metadata holding only the
    /// display name as title.
    pub fn metadata_for(&mut self, path: &str) -> TrackMetadata {
        let mut meta = match self.storage.open_file(path) {
            Ok(mut file) => read_track_metadata(&mut file).unwrap_or_else(|err| {
                tracing::warn!("tag read failed for {}: {}", path, err);
                TrackMetadata::default()
            }),
            Err(_) => {
                tracing::warn!("cannot open {} for tag read", path);
                TrackMetadata::default()
            }
        };
        meta.fill_missing_title(display_name(path));
        meta
    }
}
