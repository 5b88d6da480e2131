//! Storage abstraction for the removable block device.
//!
//! The traits are blocking, in the style of `embedded-sdmmc`: the card is read
//! from the control task and from the non-real-time refill path of the audio
//! pipeline, neither of which can `.await` inside the transport pull callback.
//!
//! Files are plain [`embedded_io`] streams so decoders and record readers can be
//! written against `Read`/`Write`/`Seek` without knowing the backing medium.
//! Errors are classified through [`embedded_io::Error::kind`]:
//!
//! | `ErrorKind` | Meaning here |
//! |-------------|--------------|
//! | `NotFound` | path does not resolve |
//! | `OutOfMemory` / `WriteZero` | volume is full |
//! | anything else | generic I/O failure |

use embedded_io::{ErrorKind, Read, Seek, Write};
use heapless::String;

/// Longest entry name (single path component) a directory listing yields.
///
/// FAT long file names are capped at 255 UTF-16 units; names that do not fit
/// are reported truncated and will fail to resolve, which the scanner treats
/// like any other unreadable entry.
pub const MAX_ENTRY_NAME_LEN: usize = 255;

/// Storage trait for file system access
pub trait Storage {
    /// Error type shared by the volume and every handle it opens.
    type Error: embedded_io::Error;
    /// File handle type
    type File: File<Error = Self::Error>;
    /// Directory handle type
    type Dir: Dir<Error = Self::Error>;

    /// Open an existing file for reading.
    fn open_file(&mut self, path: &str) -> Result<Self::File, Self::Error>;

    /// Create `path` for writing, truncating it if it already exists.
    fn create_file(&mut self, path: &str) -> Result<Self::File, Self::Error>;

    /// Open a directory for enumeration.
    fn open_dir(&mut self, path: &str) -> Result<Self::Dir, Self::Error>;

    /// Check if path exists
    fn exists(&mut self, path: &str) -> Result<bool, Self::Error>;

    /// Delete a file.
    fn remove(&mut self, path: &str) -> Result<(), Self::Error>;

    /// Create a directory. Succeeds if it already exists.
    fn create_dir(&mut self, path: &str) -> Result<(), Self::Error>;
}

/// An open file: a seekable byte stream with a known length.
pub trait File: Read + Write + Seek {
    /// File size in bytes at the time it was opened (grows with writes).
    fn size(&self) -> u64;
}

/// One entry yielded while enumerating a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name without any directory prefix.
    pub name: String<MAX_ENTRY_NAME_LEN>,
    /// `true` for sub-directories.
    pub is_dir: bool,
}

/// Directory enumeration handle (the `openNextFile` loop).
///
/// Implementations must tolerate [`Storage::remove`] of entries already
/// yielded while the handle is still open.
pub trait Dir {
    /// Error type
    type Error: embedded_io::Error;

    /// Return the next entry, or `None` once the listing is exhausted.
    fn next_entry(&mut self) -> Result<Option<DirEntry>, Self::Error>;
}

/// Coarse classification of a storage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageFault {
    /// The path does not resolve.
    NotFound,
    /// No space left on the volume.
    Full,
    /// Any other failure.
    Io,
}

impl StorageFault {
    /// Classify an error from any [`Storage`] implementation.
    pub fn of<E: embedded_io::Error>(err: &E) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::OutOfMemory | ErrorKind::WriteZero => Self::Full,
            _ => Self::Io,
        }
    }
}

/// Read until `buf` is full or the file ends.
///
/// Returns the number of bytes read, which is short only at end of file.
pub fn read_full<F: Read>(file: &mut F, buf: &mut [u8]) -> Result<usize, F::Error> {
    let mut pos = 0;
    while pos < buf.len() {
        // SAFETY: pos < buf.len() so buf[pos..] is a valid non-empty slice.
        #[allow(clippy::indexing_slicing)]
        let n = file.read(&mut buf[pos..])?;
        if n == 0 {
            break;
        }
        pos = pos.saturating_add(n);
    }
    Ok(pos)
}

/// Write all of `buf`, reporting a full volume instead of looping forever.
///
/// A backend that accepts zero bytes is reported as [`StorageFault::Full`];
/// real I/O errors are classified with [`StorageFault::of`].
pub fn write_full<F: Write>(file: &mut F, buf: &[u8]) -> Result<(), StorageFault> {
    let mut pos = 0;
    while pos < buf.len() {
        // SAFETY: pos < buf.len() so buf[pos..] is a valid non-empty slice.
        #[allow(clippy::indexing_slicing)]
        let n = file.write(&buf[pos..]).map_err(|e| StorageFault::of(&e))?;
        if n == 0 {
            return Err(StorageFault::Full);
        }
        pos = pos.saturating_add(n);
    }
    Ok(())
}
