//! Track — path-derived names and tag metadata for a catalog entry.
//!
//! The catalog stores only full paths. Everything shown to the user is derived
//! from a path on demand or read from the file's tag when it is opened.

use heapless::String;
use platform::config::{MAX_NAME_LEN, MAX_PATH_LEN, MAX_TAG_LEN};

/// Full path of a track on the volume.
pub type TrackPath = String<MAX_PATH_LEN>;

/// Display name of a track (basename, extension stripped).
pub type TrackName = String<MAX_NAME_LEN>;

/// One tag text field.
pub type TagText = String<MAX_TAG_LEN>;

/// Strip the directory prefix and the last extension from `path`.
///
/// `"/Music/c/d.mp3"` → `"d"`, `"/noext"` → `"noext"`, `"/.hidden"` → `".hidden"`.
pub fn display_name(path: &str) -> &str {
    let base = path.rsplit('/').next().unwrap_or(path);
    match base.rfind('.') {
        Some(0) | None => base,
        Some(dot) => base.get(..dot).unwrap_or(base),
    }
}

/// Extension of the last path component, without the dot.
pub fn extension(path: &str) -> Option<&str> {
    let base = path.rsplit('/').next().unwrap_or(path);
    match base.rfind('.') {
        Some(0) | None => None,
        Some(dot) => base.get(dot.saturating_add(1)..),
    }
}

/// Copy as much of `src` as fits into `dst`, cutting at a char boundary.
pub fn push_truncated<const N: usize>(dst: &mut String<N>, src: &str) {
    let room = N.saturating_sub(dst.len());
    let mut end = src.len().min(room);
    while end > 0 && !src.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    if let Some(head) = src.get(..end) {
        // Cannot fail: head.len() <= remaining capacity.
        let _ = dst.push_str(head);
    }
}

/// Display name of `path` as an owned, capacity-bounded string.
pub fn name_from_path(path: &str) -> TrackName {
    let mut name = TrackName::new();
    push_truncated(&mut name, display_name(path));
    name
}

/// Tag fields of the currently open track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    /// Title (`TIT2`), or the display name when the file has none.
    pub title: TagText,
    /// Artist (`TPE1`), empty when unknown.
    pub artist: TagText,
    /// Album (`TALB`), empty when unknown.
    pub album: TagText,
}

impl TrackMetadata {
    /// Use `name` as the title if the tag did not provide one.
    pub fn fill_missing_title(&mut self, name: &str) {
        if self.title.is_empty() {
            push_truncated(&mut self.title, name);
        }
    }

    /// `true` when no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.artist.is_empty() && self.album.is_empty()
    }
}
