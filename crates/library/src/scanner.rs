//! Scanner — walks a directory tree and emits supported audio file paths.
//!
//! The walk is depth-first and recursive, bounded by the real directory depth.
//! One path buffer is threaded through every level: each level appends its
//! entry name, visits it, then truncates back to the length it was handed.

use heapless::String;
use platform::config::MAX_PATH_LEN;
use platform::storage::{Dir, Storage};

use crate::track::extension;

/// Why a walk stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkError<E> {
    /// The root could not be opened as a directory.
    RootNotDirectory,
    /// Reading a directory listing failed.
    Listing,
    /// The visitor rejected a path.
    Visitor(E),
}

/// Stateless helper for file-system traversal and extension filtering.
pub struct Scanner;

impl Scanner {
    /// Returns `true` when `ext` is a supported audio file extension.
    ///
    /// The comparison is **case-insensitive** and does not allocate.
    ///
    /// Supported extensions: `mp3`.
    pub fn is_supported_extension(ext: &str) -> bool {
        ext.eq_ignore_ascii_case("mp3")
    }

    /// Returns `true` when the last component of `path` has a supported extension.
    pub fn is_supported_path(path: &str) -> bool {
        extension(path).is_some_and(Self::is_supported_extension)
    }

    /// Walk `root` depth-first, calling `visit` with the full path of every
    /// supported file in listing order.
    ///
    /// `visit` is handed the storage back so it can write records while the
    /// walk is in progress.
    ///
    /// Directories are recursed into regardless of name, except `skip_dir`
    /// (the index directory). Entries whose full path would not fit in
    /// [`MAX_PATH_LEN`] bytes are skipped. A sub-directory that cannot be
    /// opened is skipped; only a failure to open `root` is fatal.
    ///
    /// Returns the number of paths handed to `visit`.
    pub fn walk<S, F, E>(
        storage: &mut S,
        root: &str,
        skip_dir: &str,
        visit: &mut F,
    ) -> Result<u32, WalkError<E>>
    where
        S: Storage,
        F: FnMut(&mut S, &str) -> Result<(), E>,
    {
        let mut path = String::<MAX_PATH_LEN>::new();
        let normalized = root.trim_end_matches('/');
        if path.push_str(normalized).is_err() {
            return Err(WalkError::RootNotDirectory);
        }
        let dir = storage
            .open_dir(if normalized.is_empty() { "/" } else { normalized })
            .map_err(|_| WalkError::RootNotDirectory)?;
        let mut found = 0u32;
        walk_dir(storage, dir, &mut path, skip_dir.trim_end_matches('/'), visit, &mut found)?;
        Ok(found)
    }
}

fn walk_dir<S, F, E>(
    storage: &mut S,
    mut dir: S::Dir,
    path: &mut String<MAX_PATH_LEN>,
    skip_dir: &str,
    visit: &mut F,
    found: &mut u32,
) -> Result<(), WalkError<E>>
where
    S: Storage,
    F: FnMut(&mut S, &str) -> Result<(), E>,
{
    let base_len = path.len();
    while let Some(entry) = dir.next_entry().map_err(|_| WalkError::Listing)? {
        if entry.name.as_str() == "." || entry.name.as_str() == ".." {
            continue;
        }
        if path.push('/').is_err() || path.push_str(entry.name.as_str()).is_err() {
            tracing::warn!(
                "skipping entry, path exceeds {} bytes: {}/{}",
                MAX_PATH_LEN,
                path.get(..base_len).unwrap_or(""),
                entry.name.as_str()
            );
            path.truncate(base_len);
            continue;
        }

        if entry.is_dir {
            if path.as_str() != skip_dir {
                match storage.open_dir(path.as_str()) {
                    Ok(sub) => walk_dir(storage, sub, path, skip_dir, visit, found)?,
                    Err(_) => tracing::warn!("cannot open directory {}", path.as_str()),
                }
            }
        } else if Scanner::is_supported_path(entry.name.as_str()) {
            visit(storage, path.as_str()).map_err(WalkError::Visitor)?;
            *found = found.saturating_add(1);
        }
        path.truncate(base_len);
    }
    Ok(())
}
