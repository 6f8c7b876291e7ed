//! Resumption watermark: the id of the last post forwarded.
//!
//! On disk the id is a zig-zag LEB128 signed varint padded with zeros to
//! [`MAX_VARINT_LEN`] bytes, which is also what Go's `binary.PutVarint`
//! writes, so existing `.last` files keep working.

use crate::feeds::PostId;
use anyhow::{Context, Result};
use std::path::Path;

pub const MAX_VARINT_LEN: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    last_id: Option<PostId>,
}

impl Cursor {
    pub fn new(last_id: PostId) -> Self {
        Self {
            last_id: Some(last_id),
        }
    }

    pub fn last_id(&self) -> Option<PostId> {
        self.last_id
    }

    /// Whether `id` was already forwarded.
    pub fn covers(&self, id: PostId) -> bool {
        self.last_id.is_some_and(|last| id <= last)
    }

    /// Move the watermark forward. Never moves backwards.
    pub fn advance(&mut self, id: PostId) {
        if !self.covers(id) {
            self.last_id = Some(id);
        }
    }
}

/// Read the cursor at `path`. A missing or unreadable file means no prior
/// cursor; this never fails.
pub fn load(path: &Path) -> Cursor {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No cursor file, starting from the latest posts");
            return Cursor::default();
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read cursor file, ignoring it");
            return Cursor::default();
        }
    };

    match decode_varint(&bytes) {
        Some(id) if id > 0 => Cursor::new(id),
        // older tools write 0 when nothing was relayed yet
        Some(_) => Cursor::default(),
        None => {
            tracing::warn!(path = %path.display(), "Cursor file is corrupt, ignoring it");
            Cursor::default()
        }
    }
}

/// Write `cursor` to `path`. An empty cursor leaves the file untouched.
pub fn store(path: &Path, cursor: Cursor) -> Result<()> {
    let Some(id) = cursor.last_id else {
        return Ok(());
    };

    std::fs::write(path, encode_varint(id))
        .with_context(|| format!("Failed to write cursor file {}", path.display()))
}

fn encode_varint(value: i64) -> [u8; MAX_VARINT_LEN] {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut zigzag = ((value << 1) ^ (value >> 63)) as u64;
    let mut i = 0;
    while zigzag >= 0x80 {
        buf[i] = (zigzag as u8) | 0x80;
        zigzag >>= 7;
        i += 1;
    }
    buf[i] = zigzag as u8;
    buf
}

/// Decode the leading varint, ignoring trailing padding. `None` when the
/// data ends mid-varint or overflows 64 bits.
fn decode_varint(bytes: &[u8]) -> Option<i64> {
    let mut zigzag: u64 = 0;
    for (i, &byte) in bytes.iter().enumerate().take(MAX_VARINT_LEN) {
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            return None;
        }
        zigzag |= u64::from(byte & 0x7f) << (7 * i);
        if byte < 0x80 {
            return Some(((zigzag >> 1) as i64) ^ -((zigzag & 1) as i64));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relaybird.last");

        store(&path, Cursor::new(123456789)).unwrap();
        assert_eq!(load(&path), Cursor::new(123456789));
    }

    #[test]
    fn test_round_trip_extremes() {
        for value in [0, 1, -1, 63, -64, 64, i64::MAX, i64::MIN, 1049471215466029056] {
            assert_eq!(decode_varint(&encode_varint(value)), Some(value), "{}", value);
        }
    }

    #[test]
    fn test_matches_go_putvarint() {
        // binary.PutVarint(buf, 300) => [0xd8, 0x04]
        assert_eq!(&encode_varint(300)[..2], &[0xd8, 0x04]);
        assert_eq!(&encode_varint(-1)[..1], &[0x01]);
        assert_eq!(decode_varint(&[0xd8, 0x04, 0, 0, 0, 0, 0, 0, 0, 0]), Some(300));
    }

    #[test]
    fn test_missing_file_is_no_cursor() {
        let dir = tempdir().unwrap();
        assert_eq!(load(&dir.path().join("absent")), Cursor::default());
    }

    #[test]
    fn test_truncated_file_is_no_cursor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relaybird.last");

        let full = encode_varint(123456789);
        std::fs::write(&path, &full[..2]).unwrap();
        assert_eq!(load(&path), Cursor::default());

        std::fs::write(&path, b"").unwrap();
        assert_eq!(load(&path), Cursor::default());
    }

    #[test]
    fn test_zero_file_is_no_cursor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relaybird.last");
        std::fs::write(&path, [0u8; MAX_VARINT_LEN]).unwrap();
        assert_eq!(load(&path), Cursor::default());
    }

    #[test]
    fn test_overflowing_varint_rejected() {
        assert_eq!(decode_varint(&[0xff; 10]), None);
    }

    #[test]
    fn test_store_empty_cursor_is_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relaybird.last");
        store(&path, Cursor::default()).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_advance_never_moves_back() {
        let mut cursor = Cursor::default();
        assert!(!cursor.covers(0));
        cursor.advance(10);
        cursor.advance(5);
        assert_eq!(cursor.last_id(), Some(10));
        assert!(cursor.covers(10));
        assert!(!cursor.covers(11));
    }
}
