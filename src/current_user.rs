//! The `Current User` stream: a single atom naming the last editor and the
//! stream offset of the live user edit.
//!
//! The container layer hands this stream over separately from the main
//! document stream. After a save the edit offset must point at the
//! re-serialized stream's final UserEditAtom, so the atom is writable too.
use crate::error::{Error, Result};
use zerocopy::FromBytes;
use zerocopy_derive::{FromBytes as DeriveFromBytes, Immutable as DeriveImmutable, IntoBytes as DeriveIntoBytes, KnownLayout};

/// Magic token identifying a current-user header.
const HEADER_TOKEN: u32 = 0xF3D1_C4DF;

/// Minimum stream size: size field plus header plus release words.
const MIN_SIZE: usize = 24;

/// Fixed header, bytes 4..20 of the stream.
#[derive(Debug, Clone, Copy, DeriveFromBytes, DeriveIntoBytes, DeriveImmutable, KnownLayout)]
#[repr(C)]
struct CurrentUserHeader {
    header_token: zerocopy::U32<zerocopy::LE>,
    current_edit_offset: zerocopy::U32<zerocopy::LE>,
    username_len: zerocopy::U16<zerocopy::LE>,
    release_version: zerocopy::U16<zerocopy::LE>,
    ansi_username_len: zerocopy::U16<zerocopy::LE>,
    _padding: zerocopy::U16<zerocopy::LE>,
}

/// The parsed `Current User` stream.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    current_edit_offset: u32,
    release_version: u16,
    username: String,
}

impl CurrentUser {
    /// Parse the stream.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_SIZE {
            return Err(Error::CorruptStream("current-user stream too short".into()));
        }

        let header = CurrentUserHeader::read_from_bytes(&data[4..20]).map_err(|_| {
            Error::MalformedAtom {
                atom: "CurrentUser",
                reason: "header does not fit".into(),
            }
        })?;
        if header.header_token.get() != HEADER_TOKEN {
            return Err(Error::MalformedAtom {
                atom: "CurrentUser",
                reason: format!("bad header token 0x{:08X}", header.header_token.get()),
            });
        }

        let username_len = header.username_len.get() as usize;
        let username_start = 20;
        let username_end = username_start + username_len * 2;
        let username = if username_len > 0 && username_end <= data.len() {
            crate::binary::utf16le_to_string(&data[username_start..username_end])
        } else {
            String::new()
        };

        Ok(Self {
            current_edit_offset: header.current_edit_offset.get(),
            release_version: header.release_version.get(),
            username,
        })
    }

    /// Build a fresh atom pointing at the given edit offset.
    pub fn new(current_edit_offset: u32, username: impl Into<String>) -> Self {
        Self {
            current_edit_offset,
            release_version: 3,
            username: username.into(),
        }
    }

    /// Stream offset of the live UserEditAtom in the document stream.
    #[inline]
    pub fn current_edit_offset(&self) -> u32 {
        self.current_edit_offset
    }

    /// Point the atom at a new live edit, after a save moved it.
    pub fn set_current_edit_offset(&mut self, offset: u32) {
        self.current_edit_offset = offset;
    }

    #[inline]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[inline]
    pub fn release_version(&self) -> u16 {
        self.release_version
    }

    /// Serialize the stream.
    pub fn encode(&self) -> Vec<u8> {
        let username_utf16 = crate::binary::string_to_utf16le(&self.username);
        let username_len = (username_utf16.len() / 2) as u16;

        let mut out = Vec::with_capacity(MIN_SIZE + username_utf16.len());
        // size of the fixed part, before the name strings
        out.extend_from_slice(&20u32.to_le_bytes());
        out.extend_from_slice(&HEADER_TOKEN.to_le_bytes());
        out.extend_from_slice(&self.current_edit_offset.to_le_bytes());
        out.extend_from_slice(&username_len.to_le_bytes());
        out.extend_from_slice(&self.release_version.to_le_bytes());
        out.extend_from_slice(&username_len.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&username_utf16);
        out
    }
}
