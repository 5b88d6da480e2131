//! Local filesystem Storage implementation for host tools and tests.
//!
//! `LocalFileStorage` implements [`Storage`] using `std::fs`.
//! All paths are resolved relative to the `root` provided at construction, so
//! a card image unpacked to `./sdcard` is addressed exactly like the mounted
//! volume: `/Music/a.mp3` → `./sdcard/Music/a.mp3`.

use std::fs;
use std::io::{Read as _, Seek as _, SeekFrom, Write as _};
use std::path::PathBuf;
use std::vec::Vec;

use embedded_io::{ErrorKind, ErrorType};
use heapless::String;

use crate::storage::{Dir, DirEntry, File, Storage};

/// Error type for local filesystem operations.
#[derive(Debug)]
pub struct LocalStorageError(pub std::io::Error);

impl core::fmt::Display for LocalStorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "local storage error: {}", self.0)
    }
}

impl std::error::Error for LocalStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for LocalStorageError {
    fn kind(&self) -> ErrorKind {
        self.0.kind().into()
    }
}

/// An open file on the local filesystem.
pub struct LocalFile {
    inner: fs::File,
    size: u64,
}

impl ErrorType for LocalFile {
    type Error = LocalStorageError;
}

impl embedded_io::Read for LocalFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.inner.read(buf).map_err(LocalStorageError)
    }
}

impl embedded_io::Write for LocalFile {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let n = self.inner.write(buf).map_err(LocalStorageError)?;
        let pos = self.inner.stream_position().map_err(LocalStorageError)?;
        self.size = self.size.max(pos);
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush().map_err(LocalStorageError)
    }
}

impl embedded_io::Seek for LocalFile {
    fn seek(&mut self, pos: embedded_io::SeekFrom) -> Result<u64, Self::Error> {
        self.inner.seek(SeekFrom::from(pos)).map_err(LocalStorageError)
    }
}

impl File for LocalFile {
    fn size(&self) -> u64 {
        self.size
    }
}

/// A directory listing snapshot.
///
/// Entries are sorted by name when the directory is opened so host scans are
/// reproducible (`read_dir` order is filesystem-dependent).
pub struct LocalDir {
    entries: std::vec::IntoIter<DirEntry>,
}

impl Dir for LocalDir {
    type Error = LocalStorageError;

    fn next_entry(&mut self) -> Result<Option<DirEntry>, Self::Error> {
        Ok(self.entries.next())
    }
}

/// A [`Storage`] implementation backed by `std::fs`.
///
/// # Example
/// ```no_run
/// use platform::storage_local::LocalFileStorage;
/// use platform::Storage;
/// let mut storage = LocalFileStorage::new("/home/user/sdcard");
/// let file = storage.open_file("/Music/track.mp3").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    /// Create a new storage rooted at `root`.
    #[must_use]
    pub fn new(root: &str) -> Self {
        Self { root: PathBuf::from(root) }
    }

    /// Create from the `MUSIC_PATH` environment variable.
    ///
    /// Returns `None` if `MUSIC_PATH` is not set or is not valid UTF-8.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        std::env::var("MUSIC_PATH").ok().map(|p| Self::new(&p))
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Storage for LocalFileStorage {
    type Error = LocalStorageError;
    type File = LocalFile;
    type Dir = LocalDir;

    fn open_file(&mut self, path: &str) -> Result<Self::File, Self::Error> {
        let full = self.resolve(path);
        let file = fs::File::open(&full).map_err(LocalStorageError)?;
        let meta = file.metadata().map_err(LocalStorageError)?;
        if meta.is_dir() {
            return Err(LocalStorageError(std::io::Error::from(
                std::io::ErrorKind::NotFound,
            )));
        }
        Ok(LocalFile { inner: file, size: meta.len() })
    }

    fn create_file(&mut self, path: &str) -> Result<Self::File, Self::Error> {
        let full = self.resolve(path);
        let file = fs::File::create(&full).map_err(LocalStorageError)?;
        Ok(LocalFile { inner: file, size: 0 })
    }

    fn open_dir(&mut self, path: &str) -> Result<Self::Dir, Self::Error> {
        let full = self.resolve(path);
        let mut entries = Vec::new();
        for entry in fs::read_dir(&full).map_err(LocalStorageError)? {
            let entry = entry.map_err(LocalStorageError)?;
            let is_dir = entry.file_type().map_err(LocalStorageError)?.is_dir();
            let os_name = entry.file_name();
            let Some(name) = os_name.to_str() else {
                // Non-UTF-8 names cannot be addressed through &str paths.
                continue;
            };
            let mut stored = String::new();
            if stored.push_str(name).is_err() {
                continue;
            }
            entries.push(DirEntry { name: stored, is_dir });
        }
        entries.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        Ok(LocalDir { entries: entries.into_iter() })
    }

    fn exists(&mut self, path: &str) -> Result<bool, Self::Error> {
        Ok(self.resolve(path).exists())
    }

    fn remove(&mut self, path: &str) -> Result<(), Self::Error> {
        fs::remove_file(self.resolve(path)).map_err(LocalStorageError)
    }

    fn create_dir(&mut self, path: &str) -> Result<(), Self::Error> {
        fs::create_dir_all(self.resolve(path)).map_err(LocalStorageError)
    }
}
