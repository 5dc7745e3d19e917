//! Little-endian field I/O over raw record payloads.
//!
//! Fixed-width reads go through `zerocopy` so the bounds check is the only
//! branch on the hot path. Text helpers cover the two storage forms the
//! format uses: UTF-16LE ("wide") and windows-1252 code-page bytes
//! ("narrow").
use crate::error::{Error, Result};
use encoding_rs::WINDOWS_1252;
use zerocopy::{FromBytes, I16, I32, LE, U16, U32};

/// Read a little-endian u16 from a byte slice at the given offset.
#[inline]
pub fn read_u16_le(data: &[u8], offset: usize) -> Result<u16> {
    if offset + 2 > data.len() {
        return Err(Error::TruncatedRecord {
            offset,
            needed: 2,
            remaining: data.len().saturating_sub(offset),
        });
    }
    U16::<LE>::read_from_bytes(&data[offset..offset + 2])
        .map(|v| v.get())
        .map_err(|_| Error::CorruptStream("failed to read u16".into()))
}

/// Read a little-endian i16 from a byte slice at the given offset.
#[inline]
pub fn read_i16_le(data: &[u8], offset: usize) -> Result<i16> {
    if offset + 2 > data.len() {
        return Err(Error::TruncatedRecord {
            offset,
            needed: 2,
            remaining: data.len().saturating_sub(offset),
        });
    }
    I16::<LE>::read_from_bytes(&data[offset..offset + 2])
        .map(|v| v.get())
        .map_err(|_| Error::CorruptStream("failed to read i16".into()))
}

/// Read a little-endian u32 from a byte slice at the given offset.
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    if offset + 4 > data.len() {
        return Err(Error::TruncatedRecord {
            offset,
            needed: 4,
            remaining: data.len().saturating_sub(offset),
        });
    }
    U32::<LE>::read_from_bytes(&data[offset..offset + 4])
        .map(|v| v.get())
        .map_err(|_| Error::CorruptStream("failed to read u32".into()))
}

/// Read a little-endian i32 from a byte slice at the given offset.
#[inline]
pub fn read_i32_le(data: &[u8], offset: usize) -> Result<i32> {
    if offset + 4 > data.len() {
        return Err(Error::TruncatedRecord {
            offset,
            needed: 4,
            remaining: data.len().saturating_sub(offset),
        });
    }
    I32::<LE>::read_from_bytes(&data[offset..offset + 4])
        .map(|v| v.get())
        .map_err(|_| Error::CorruptStream("failed to read i32".into()))
}

/// Write a little-endian u32 into a mutable payload at the given offset.
///
/// Used to patch offset fields in place without re-parsing the whole atom.
#[inline]
pub fn write_u32_le(data: &mut [u8], offset: usize, value: u32) -> Result<()> {
    if offset + 4 > data.len() {
        return Err(Error::TruncatedRecord {
            offset,
            needed: 4,
            remaining: data.len().saturating_sub(offset),
        });
    }
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Decode a UTF-16LE character block of exactly `data.len() / 2` code units.
///
/// Unlike a C-string scan this does not stop at NUL: record payload length
/// is authoritative, and embedded NULs round-trip.
pub fn utf16le_to_string(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Encode a string as UTF-16LE bytes.
pub fn string_to_utf16le(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Decode a windows-1252 character block. Every byte is one character;
/// record payload length is authoritative.
pub fn narrow_to_string(data: &[u8]) -> String {
    let (text, _, _) = WINDOWS_1252.decode(data);
    text.into_owned()
}

/// Encode a string as windows-1252 bytes, or `None` if any character has no
/// single-byte representation (the caller must fall back to wide storage).
pub fn string_to_narrow(text: &str) -> Option<Vec<u8>> {
    let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
    if had_errors {
        None
    } else {
        Some(bytes.into_owned())
    }
}

/// Number of UTF-16 code units `text` occupies. Character counts in style
/// tables and hyperlink ranges are expressed in these units.
#[inline]
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}
