//! Metadata — ID3v2 tag parsing for MP3 files.
//!
//! The tag is read frame-by-frame straight from the file. Only the three text
//! frames the player displays are decoded; every other frame (cover art,
//! comments, padding) is skipped with a relative seek, so a large embedded
//! picture costs one seek instead of a read.
//!
//! | Field  | v2.3 / v2.4 | v2.2 |
//! |--------|-------------|------|
//! | title  | `TIT2`      | `TT2` |
//! | artist | `TPE1`      | `TP1` |
//! | album  | `TALB`      | `TAL` |

use embedded_io::{Read, Seek, SeekFrom};
use platform::storage::read_full;

use crate::track::{TagText, TrackMetadata};

/// Bytes of a text frame payload that are decoded. Longer values are cut.
const TEXT_PAYLOAD_MAX: usize = 160;

/// Tag read failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MetadataError {
    /// Reading or seeking the file failed.
    #[error("I/O error while reading tag")]
    Io,
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Artist,
    Album,
}

fn field_for(id: &[u8]) -> Option<Field> {
    match id {
        b"TIT2" | b"TT2" => Some(Field::Title),
        b"TPE1" | b"TP1" => Some(Field::Artist),
        b"TALB" | b"TAL" => Some(Field::Album),
        _ => None,
    }
}

/// Decode a 28-bit synchsafe integer (7 bits per byte).
pub fn synchsafe(bytes: [u8; 4]) -> u32 {
    // 4 × 7 bits = 28 bits, the shifts cannot overflow a u32.
    #[allow(clippy::arithmetic_side_effects)]
    let value = bytes
        .iter()
        .fold(0u32, |acc, b| (acc << 7) | u32::from(b & 0x7F));
    value
}

/// Parse the ID3v2 tag at the start of `file`.
///
/// Returns empty metadata when the file has no ID3v2 tag or the tag uses a
/// layout this reader does not handle (unsynchronised v2.2/v2.3, unknown
/// major version). A frame header that runs past the tag ends the parse but
/// keeps what was already decoded.
///
/// # Errors
///
/// Returns [`MetadataError::Io`] if the file cannot be read or seeked.
pub fn read_track_metadata<F: Read + Seek>(file: &mut F) -> Result<TrackMetadata, MetadataError> {
    let mut meta = TrackMetadata::default();
    file.seek(SeekFrom::Start(0)).map_err(|_| MetadataError::Io)?;

    let mut header = [0u8; 10];
    if read_full(file, &mut header).map_err(|_| MetadataError::Io)? < header.len() {
        return Ok(meta);
    }
    let [i, d, three, major, _rev, flags, s0, s1, s2, s3] = header;
    if [i, d, three] != *b"ID3" || !(2..=4).contains(&major) {
        return Ok(meta);
    }
    if flags & 0x80 != 0 && major < 4 {
        tracing::debug!("unsynchronised ID3v2.{} tag, skipping", major);
        return Ok(meta);
    }

    let tag_end = u64::from(synchsafe([s0, s1, s2, s3])).saturating_add(10);
    let mut pos: u64 = 10;

    if flags & 0x40 != 0 && major >= 3 {
        let mut ext = [0u8; 4];
        if read_full(file, &mut ext).map_err(|_| MetadataError::Io)? < ext.len() {
            return Ok(meta);
        }
        // v2.3 size excludes its own 4 bytes; v2.4 is synchsafe and includes them.
        let skip = if major == 3 {
            u64::from(u32::from_be_bytes(ext))
        } else {
            u64::from(synchsafe(ext)).saturating_sub(4)
        };
        pos = pos.saturating_add(4).saturating_add(skip);
        file.seek(SeekFrom::Start(pos)).map_err(|_| MetadataError::Io)?;
    }

    let (id_len, header_len) = if major == 2 { (3usize, 6u64) } else { (4, 10) };
    let mut found = 0u8;

    while pos.saturating_add(header_len) <= tag_end && found < 3 {
        let mut fh = [0u8; 10];
        // SAFETY: header_len is 6 or 10, both <= fh.len().
        #[allow(clippy::indexing_slicing, clippy::cast_possible_truncation)]
        let fh = &mut fh[..header_len as usize];
        if read_full(file, fh).map_err(|_| MetadataError::Io)? < fh.len() {
            break;
        }
        let fh: &[u8] = fh;
        let id = fh.get(..id_len).unwrap_or(&[]);
        if id.first().copied().unwrap_or(0) == 0 {
            // Padding.
            break;
        }
        let (size, frame_flags) = match (major, fh) {
            (2, [_, _, _, a, b, c]) => (u32::from_be_bytes([0, *a, *b, *c]), 0u16),
            (3, [_, _, _, _, a, b, c, e, f0, f1]) => {
                (u32::from_be_bytes([*a, *b, *c, *e]), u16::from_be_bytes([*f0, *f1]))
            }
            (_, [_, _, _, _, a, b, c, e, f0, f1]) => {
                (synchsafe([*a, *b, *c, *e]), u16::from_be_bytes([*f0, *f1]))
            }
            _ => break,
        };
        pos = pos.saturating_add(header_len);
        let frame_end = pos.saturating_add(u64::from(size));
        if frame_end > tag_end {
            break;
        }

        // v2.3: compression 0x0080, encryption 0x0040.
        // v2.4: compression 0x0008, encryption 0x0004, unsync 0x0002.
        let encoded = match major {
            3 => frame_flags & 0x00C0 != 0,
            4 => frame_flags & 0x000E != 0,
            _ => false,
        };

        if let (Some(field), false) = (field_for(id), encoded) {
            let mut payload = [0u8; TEXT_PAYLOAD_MAX];
            #[allow(clippy::cast_possible_truncation)]
            let want = (size as usize).min(payload.len());
            // SAFETY: want <= payload.len().
            #[allow(clippy::indexing_slicing)]
            let got = read_full(file, &mut payload[..want]).map_err(|_| MetadataError::Io)?;
            let target = match field {
                Field::Title => &mut meta.title,
                Field::Artist => &mut meta.artist,
                Field::Album => &mut meta.album,
            };
            if target.is_empty() {
                decode_text(payload.get(..got).unwrap_or(&[]), target);
                if !target.is_empty() {
                    found = found.saturating_add(1);
                }
            }
        }
        file.seek(SeekFrom::Start(frame_end)).map_err(|_| MetadataError::Io)?;
        pos = frame_end;
    }

    Ok(meta)
}

/// Decode an ID3 text frame payload (encoding byte + text) into `out`.
///
/// Stops at the first NUL terminator; characters that do not fit are dropped.
fn decode_text(payload: &[u8], out: &mut TagText) {
    let Some((&encoding, text)) = payload.split_first() else {
        return;
    };
    match encoding {
        0 => {
            for &b in text.iter().take_while(|&&b| b != 0) {
                if out.push(char::from(b)).is_err() {
                    break;
                }
            }
        }
        1 => match text {
            [0xFF, 0xFE, rest @ ..] => push_utf16(rest, false, out),
            [0xFE, 0xFF, rest @ ..] => push_utf16(rest, true, out),
            _ => push_utf16(text, false, out),
        },
        2 => push_utf16(text, true, out),
        3 => {
            let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
            let bytes = text.get(..end).unwrap_or(&[]);
            let valid = match core::str::from_utf8(bytes) {
                Ok(s) => s,
                Err(e) => core::str::from_utf8(bytes.get(..e.valid_up_to()).unwrap_or(&[]))
                    .unwrap_or(""),
            };
            crate::track::push_truncated(out, valid);
        }
        _ => {}
    }
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
}

fn push_utf16(bytes: &[u8], big_endian: bool, out: &mut TagText) {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| match pair {
            [a, b] if big_endian => u16::from_be_bytes([*a, *b]),
            [a, b] => u16::from_le_bytes([*a, *b]),
            _ => 0,
        })
        .take_while(|&u| u != 0);
    for ch in char::decode_utf16(units) {
        let ch = ch.unwrap_or(char::REPLACEMENT_CHARACTER);
        if out.push(ch).is_err() {
            break;
        }
    }
}
