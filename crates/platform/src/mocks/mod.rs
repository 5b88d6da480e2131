//! Mock implementations for testing
//!
//! This module provides in-memory implementations of the platform traits
//! for use in unit and integration tests.
//!
//! [`MemStorage`] lists directory entries in insertion order, the way a FAT
//! volume lists them in creation order, so scan order is predictable from the
//! order a test adds files. A byte quota can be set to simulate a full card.

#![cfg(any(test, feature = "std"))]

use std::cell::RefCell;
use std::rc::Rc;
use std::string::String as StdString;
use std::vec::Vec;

use embedded_io::{ErrorKind, ErrorType, SeekFrom};
use heapless::String;

use crate::audio_types::AbsoluteVolume;
use crate::bluetooth::A2dpSink;
use crate::storage::{Dir, DirEntry, File, Storage};

type Bytes = Rc<RefCell<Vec<u8>>>;

enum NodeKind {
    Dir,
    File(Bytes),
}

struct Node {
    path: StdString,
    kind: NodeKind,
}

#[derive(Default)]
struct Volume {
    nodes: Vec<Node>,
    quota: Option<usize>,
    opens: usize,
}

impl Volume {
    fn find(&self, path: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.path == path)
    }

    fn is_dir(&self, path: &str) -> bool {
        path == "/" || matches!(self.find(path), Some(Node { kind: NodeKind::Dir, .. }))
    }

    fn used_bytes(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| match &n.kind {
                NodeKind::File(data) => data.borrow().len(),
                NodeKind::Dir => 0,
            })
            .fold(0usize, usize::saturating_add)
    }

    fn ensure_dir(&mut self, path: &str) {
        if path == "/" || self.find(path).is_some() {
            return;
        }
        if let Some(parent) = parent_of(path) {
            self.ensure_dir(parent);
        }
        self.nodes.push(Node {
            path: path.into(),
            kind: NodeKind::Dir,
        });
    }
}

/// Normalise a path to a leading `/` and no trailing `/` (except the root).
fn normalize(path: &str) -> StdString {
    let trimmed = path.trim_matches('/');
    let mut out = StdString::from("/");
    out.push_str(trimmed);
    out
}

fn parent_of(path: &str) -> Option<&str> {
    let idx = path.rfind('/')?;
    if idx == 0 {
        if path.len() > 1 {
            Some("/")
        } else {
            None
        }
    } else {
        path.get(..idx)
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// In-memory volume shared between clones.
///
/// Cloning yields another handle to the same files, so a test can keep one
/// handle for inspection while the catalog or pipeline owns another.
#[derive(Clone, Default)]
pub struct MemStorage {
    volume: Rc<RefCell<Volume>>,
}

impl MemStorage {
    /// Create an empty volume containing only `/`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file, creating parent directories as needed.
    pub fn add_file(&self, path: &str, contents: &[u8]) {
        let path = normalize(path);
        let mut vol = self.volume.borrow_mut();
        if let Some(parent) = parent_of(&path) {
            vol.ensure_dir(parent);
        }
        if let Some(Node { kind: NodeKind::File(data), .. }) = vol.find(&path) {
            *data.borrow_mut() = contents.to_vec();
            return;
        }
        vol.nodes.push(Node {
            path,
            kind: NodeKind::File(Rc::new(RefCell::new(contents.to_vec()))),
        });
    }

    /// Add an empty directory, creating parents as needed.
    pub fn add_dir(&self, path: &str) {
        self.volume.borrow_mut().ensure_dir(&normalize(path));
    }

    /// Limit the total bytes held by all files. Writes beyond it fail.
    pub fn set_quota(&self, bytes: Option<usize>) {
        self.volume.borrow_mut().quota = bytes;
    }

    /// Number of [`Storage::open_file`] calls since creation or the last reset.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.volume.borrow().opens
    }

    /// Zero the open counter.
    pub fn reset_open_count(&self) {
        self.volume.borrow_mut().opens = 0;
    }

    /// Contents of a file, if it exists.
    #[must_use]
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        match self.volume.borrow().find(&normalize(path)) {
            Some(Node { kind: NodeKind::File(data), .. }) => Some(data.borrow().clone()),
            _ => None,
        }
    }

    /// Full paths of every file directly inside `dir`, in listing order.
    #[must_use]
    pub fn files_in(&self, dir: &str) -> Vec<StdString> {
        let dir = normalize(dir);
        self.volume
            .borrow()
            .nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::File(_)))
            .filter(|n| parent_of(&n.path) == Some(dir.as_str()))
            .map(|n| n.path.clone())
            .collect()
    }
}

/// Open handle to a [`MemStorage`] file.
pub struct MemFile {
    data: Bytes,
    pos: usize,
    volume: Rc<RefCell<Volume>>,
}

impl ErrorType for MemFile {
    type Error = ErrorKind;
}

impl embedded_io::Read for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let data = self.data.borrow();
        let available = data.get(self.pos..).unwrap_or(&[]);
        let n = available.len().min(buf.len());
        if let (Some(dst), Some(src)) = (buf.get_mut(..n), available.get(..n)) {
            dst.copy_from_slice(src);
        }
        self.pos = self.pos.saturating_add(n);
        Ok(n)
    }
}

impl embedded_io::Write for MemFile {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        let allowed = match self.volume.borrow().quota {
            Some(quota) => {
                let used = self.volume.borrow().used_bytes();
                quota.saturating_sub(used).min(buf.len())
            }
            None => buf.len(),
        };
        if allowed == 0 {
            return Err(ErrorKind::OutOfMemory);
        }
        let mut data = self.data.borrow_mut();
        let end = self.pos.saturating_add(allowed);
        if data.len() < end {
            data.resize(end, 0);
        }
        if let (Some(dst), Some(src)) = (data.get_mut(self.pos..end), buf.get(..allowed)) {
            dst.copy_from_slice(src);
        }
        self.pos = end;
        Ok(allowed)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_io::Seek for MemFile {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        let len = self.data.borrow().len() as u64;
        let target = match pos {
            SeekFrom::Start(off) => Some(off),
            SeekFrom::End(off) => len.checked_add_signed(off),
            SeekFrom::Current(off) => (self.pos as u64).checked_add_signed(off),
        };
        let target = target.ok_or(ErrorKind::InvalidInput)?;
        self.pos = usize::try_from(target).map_err(|_| ErrorKind::InvalidInput)?;
        Ok(target)
    }
}

impl File for MemFile {
    fn size(&self) -> u64 {
        self.data.borrow().len() as u64
    }
}

/// Directory listing snapshot taken when the directory was opened.
pub struct MemDir {
    entries: std::vec::IntoIter<DirEntry>,
}

impl Dir for MemDir {
    type Error = ErrorKind;

    fn next_entry(&mut self) -> Result<Option<DirEntry>, Self::Error> {
        Ok(self.entries.next())
    }
}

impl Storage for MemStorage {
    type Error = ErrorKind;
    type File = MemFile;
    type Dir = MemDir;

    fn open_file(&mut self, path: &str) -> Result<Self::File, Self::Error> {
        let mut vol = self.volume.borrow_mut();
        vol.opens = vol.opens.saturating_add(1);
        match vol.find(&normalize(path)) {
            Some(Node { kind: NodeKind::File(data), .. }) => Ok(MemFile {
                data: Rc::clone(data),
                pos: 0,
                volume: Rc::clone(&self.volume),
            }),
            _ => Err(ErrorKind::NotFound),
        }
    }

    fn create_file(&mut self, path: &str) -> Result<Self::File, Self::Error> {
        let path = normalize(path);
        let mut vol = self.volume.borrow_mut();
        let parent = parent_of(&path).ok_or(ErrorKind::InvalidInput)?;
        if !vol.is_dir(parent) {
            return Err(ErrorKind::NotFound);
        }
        let data = match vol.find(&path) {
            Some(Node { kind: NodeKind::File(data), .. }) => {
                data.borrow_mut().clear();
                Rc::clone(data)
            }
            Some(Node { kind: NodeKind::Dir, .. }) => return Err(ErrorKind::InvalidInput),
            None => {
                let data: Bytes = Rc::new(RefCell::new(Vec::new()));
                vol.nodes.push(Node {
                    path,
                    kind: NodeKind::File(Rc::clone(&data)),
                });
                data
            }
        };
        Ok(MemFile {
            data,
            pos: 0,
            volume: Rc::clone(&self.volume),
        })
    }

    fn open_dir(&mut self, path: &str) -> Result<Self::Dir, Self::Error> {
        let path = normalize(path);
        let vol = self.volume.borrow();
        if !vol.is_dir(&path) {
            return Err(ErrorKind::NotFound);
        }
        let mut entries = Vec::new();
        for node in vol.nodes.iter().filter(|n| parent_of(&n.path) == Some(path.as_str())) {
            let mut name = String::new();
            if name.push_str(name_of(&node.path)).is_err() {
                continue;
            }
            entries.push(DirEntry {
                name,
                is_dir: matches!(node.kind, NodeKind::Dir),
            });
        }
        Ok(MemDir {
            entries: entries.into_iter(),
        })
    }

    fn exists(&mut self, path: &str) -> Result<bool, Self::Error> {
        let path = normalize(path);
        let vol = self.volume.borrow();
        Ok(path == "/" || vol.find(&path).is_some())
    }

    fn remove(&mut self, path: &str) -> Result<(), Self::Error> {
        let path = normalize(path);
        let mut vol = self.volume.borrow_mut();
        let idx = vol
            .nodes
            .iter()
            .position(|n| n.path == path && matches!(n.kind, NodeKind::File(_)))
            .ok_or(ErrorKind::NotFound)?;
        vol.nodes.remove(idx);
        Ok(())
    }

    fn create_dir(&mut self, path: &str) -> Result<(), Self::Error> {
        let path = normalize(path);
        let mut vol = self.volume.borrow_mut();
        if matches!(vol.find(&path), Some(Node { kind: NodeKind::File(_), .. })) {
            return Err(ErrorKind::AlreadyExists);
        }
        vol.ensure_dir(&path);
        Ok(())
    }
}

/// A2DP sink that records every volume pushed to it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Volumes received, oldest first.
    pub volumes: Vec<AbsoluteVolume>,
    /// Value returned by [`A2dpSink::is_connected`].
    pub connected: bool,
}

impl RecordingSink {
    /// Create a sink that reports itself connected.
    #[must_use]
    pub fn connected() -> Self {
        Self {
            volumes: Vec::new(),
            connected: true,
        }
    }

    /// Most recent volume pushed, if any.
    #[must_use]
    pub fn last_volume(&self) -> Option<AbsoluteVolume> {
        self.volumes.last().copied()
    }
}

impl A2dpSink for RecordingSink {
    fn set_volume(&mut self, volume: AbsoluteVolume) {
        self.volumes.push(volume);
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
