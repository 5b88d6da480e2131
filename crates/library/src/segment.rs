//! Segment files — the on-card layout of the catalog index.
//!
//! The index directory holds `00000.lst`, `00001.lst`, … Segment `k` stores
//! records `[k·K, (k+1)·K)`, one full path per `\n`-terminated line. Reading
//! record `i` opens segment `i / K` and skips `i % K` lines.

use core::fmt::Write as _;

use embedded_io::Read;
use heapless::Vec;
use platform::config::MAX_PATH_LEN;

use crate::track::TrackPath;

/// File name suffix of segment files.
pub const SEGMENT_EXT: &str = ".lst";

const READ_CHUNK: usize = 64;

/// Build the path of segment `k` inside `index_dir`.
///
/// Returns `None` if the result would not fit in a [`TrackPath`].
pub fn segment_path(index_dir: &str, k: u32) -> Option<TrackPath> {
    let mut path = TrackPath::new();
    write!(path, "{}/{:05}{}", index_dir.trim_end_matches('/'), k, SEGMENT_EXT).ok()?;
    Some(path)
}

/// Buffered line reader over a segment file.
///
/// Holds a small fixed chunk so skipping a handful of records costs a few
/// reads, not one per byte.
pub struct LineReader<'f, F: Read> {
    file: &'f mut F,
    buf: [u8; READ_CHUNK],
    start: usize,
    end: usize,
    eof: bool,
}

impl<'f, F: Read> LineReader<'f, F> {
    /// Wrap `file`, reading from its current position.
    pub fn new(file: &'f mut F) -> Self {
        Self {
            file,
            buf: [0; READ_CHUNK],
            start: 0,
            end: 0,
            eof: false,
        }
    }

    fn fill(&mut self) -> Result<bool, F::Error> {
        if self.start < self.end {
            return Ok(true);
        }
        if self.eof {
            return Ok(false);
        }
        let n = self.file.read(&mut self.buf)?;
        self.start = 0;
        self.end = n;
        if n == 0 {
            self.eof = true;
        }
        Ok(n > 0)
    }

    /// Feed the bytes of the next line to `sink`, consuming the terminator.
    ///
    /// Returns `false` if the file ended before any byte of a new line.
    fn next_line_with(&mut self, mut sink: impl FnMut(&[u8])) -> Result<bool, F::Error> {
        let mut any = false;
        while self.fill()? {
            any = true;
            let avail = self.buf.get(self.start..self.end).unwrap_or(&[]);
            match avail.iter().position(|&b| b == b'\n') {
                Some(nl) => {
                    sink(avail.get(..nl).unwrap_or(&[]));
                    self.start = self.start.saturating_add(nl).saturating_add(1);
                    return Ok(true);
                }
                None => {
                    sink(avail);
                    self.start = self.end;
                }
            }
        }
        Ok(any)
    }

    /// Skip one line. Returns `false` at end of file.
    pub fn skip_line(&mut self) -> Result<bool, F::Error> {
        self.next_line_with(|_| {})
    }

    /// Read the next line into `out`, without its `\n` or `\r\n` terminator.
    ///
    /// Bytes beyond [`MAX_PATH_LEN`] are dropped; an invalid UTF-8 tail is cut
    /// at the last valid character. Returns `false` at end of file.
    pub fn read_line(&mut self, out: &mut TrackPath) -> Result<bool, F::Error> {
        let mut bytes: Vec<u8, MAX_PATH_LEN> = Vec::new();
        let more = self.next_line_with(|chunk| {
            let room = MAX_PATH_LEN.saturating_sub(bytes.len());
            let _ = bytes.extend_from_slice(chunk.get(..room).unwrap_or(chunk));
        })?;
        if !more {
            return Ok(false);
        }
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        out.clear();
        let text = match core::str::from_utf8(&bytes) {
            Ok(s) => s,
            Err(e) => core::str::from_utf8(bytes.get(..e.valid_up_to()).unwrap_or(&[]))
                .unwrap_or(""),
        };
        // Cannot fail: text.len() <= MAX_PATH_LEN.
        let _ = out.push_str(text);
        Ok(true)
    }

    /// Count the remaining lines. A final line without `\n` still counts.
    pub fn count_lines(&mut self) -> Result<u32, F::Error> {
        let mut count = 0u32;
        while self.skip_line()? {
            count = count.saturating_add(1);
        }
        Ok(count)
    }
}
