//! Typed views over fixed-layout atom payloads.
//!
//! Each view is a `zerocopy` struct read from the front of an atom's bytes;
//! writing a view back patches the payload in place. Variable-length atoms
//! (text, style tables, persist blocks) have their own modules and do not
//! appear here.
use crate::error::{Error, Result};
use crate::record::store::{RecordId, RecordStore};
use zerocopy::{FromBytes, Immutable, IntoBytes, I16, I32, LE, U16, U32};
use zerocopy_derive::{FromBytes as DeriveFromBytes, Immutable as DeriveImmutable, IntoBytes as DeriveIntoBytes, KnownLayout};

/// Read a fixed-layout view from the front of an atom's payload.
pub fn read_atom<T: FromBytes>(
    store: &RecordStore,
    id: RecordId,
    name: &'static str,
) -> Result<T> {
    let data = store.atom_data(id)?;
    T::read_from_prefix(data)
        .map(|(value, _)| value)
        .map_err(|_| Error::MalformedAtom {
            atom: name,
            reason: format!("payload too short ({} bytes)", data.len()),
        })
}

/// Write a fixed-layout view back over the front of an atom's payload.
pub fn write_atom<T: IntoBytes + Immutable>(
    store: &mut RecordStore,
    id: RecordId,
    value: &T,
    name: &'static str,
) -> Result<()> {
    let bytes = value.as_bytes();
    let data = store.atom_data_mut(id)?;
    if data.len() < bytes.len() {
        return Err(Error::MalformedAtom {
            atom: name,
            reason: format!(
                "payload too short to patch ({} < {} bytes)",
                data.len(),
                bytes.len()
            ),
        });
    }
    data[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}

/// DocumentAtom payload (40 bytes).
#[derive(Debug, Clone, Copy, DeriveFromBytes, DeriveIntoBytes, DeriveImmutable, KnownLayout)]
#[repr(C)]
pub struct DocumentAtom {
    /// Slide width/height in master units
    pub slide_size_w: I32<LE>,
    pub slide_size_h: I32<LE>,
    /// Notes page width/height
    pub notes_size_w: I32<LE>,
    pub notes_size_h: I32<LE>,
    /// Server zoom ratio
    pub server_zoom_num: I32<LE>,
    pub server_zoom_den: I32<LE>,
    /// Persist id of the notes master (0 if none)
    pub notes_master_persist: U32<LE>,
    /// Persist id of the handout master (0 if none)
    pub handout_master_persist: U32<LE>,
    /// First user-facing slide number
    pub first_slide_num: U16<LE>,
    /// Slide size preset
    pub slide_size_type: I16<LE>,
    pub save_with_fonts: u8,
    pub omit_title_place: u8,
    pub right_to_left: u8,
    pub show_comments: u8,
}

impl DocumentAtom {
    pub const SIZE: usize = 40;
}

/// SlideAtom payload (24 bytes).
#[derive(Debug, Clone, Copy, DeriveFromBytes, DeriveIntoBytes, DeriveImmutable, KnownLayout)]
#[repr(C)]
pub struct SlideAtom {
    /// Slide layout geometry code
    pub geometry: I32<LE>,
    /// Placeholder type per layout slot
    pub placeholder_ids: [u8; 8],
    /// Sheet identifier of this slide's master (0 = none recorded)
    pub master_id: I32<LE>,
    /// Sheet identifier of this slide's notes page (0 = no notes)
    pub notes_id: I32<LE>,
    /// Follow-master / hidden flag word
    pub flags: U16<LE>,
    pub unused: U16<LE>,
}

impl SlideAtom {
    pub const SIZE: usize = 24;
}

/// NotesAtom payload (8 bytes).
#[derive(Debug, Clone, Copy, DeriveFromBytes, DeriveIntoBytes, DeriveImmutable, KnownLayout)]
#[repr(C)]
pub struct NotesAtom {
    /// Sheet identifier of the slide these notes belong to
    pub slide_id: I32<LE>,
    pub flags: U16<LE>,
    pub unused: U16<LE>,
}

impl NotesAtom {
    pub const SIZE: usize = 8;
}

/// SlidePersistAtom payload (20 bytes) — one entry of a SlideListWithText.
#[derive(Debug, Clone, Copy, DeriveFromBytes, DeriveIntoBytes, DeriveImmutable, KnownLayout)]
#[repr(C)]
pub struct SlidePersistAtom {
    /// Persist id resolved through the persistence directory
    pub persist_id: U32<LE>,
    /// Bit 2 set when the sheet holds shapes other than placeholders
    pub flags: U32<LE>,
    /// Number of placeholder texts that follow in the enclosing list
    pub num_placeholder_texts: I32<LE>,
    /// Sheet identifier (distinct from both persist id and slide number)
    pub slide_identifier: I32<LE>,
    pub reserved: U32<LE>,
}

impl SlidePersistAtom {
    pub const SIZE: usize = 20;
}

/// UserEditAtom payload (28 bytes).
#[derive(Debug, Clone, Copy, DeriveFromBytes, DeriveIntoBytes, DeriveImmutable, KnownLayout)]
#[repr(C)]
pub struct UserEditAtom {
    pub last_viewed_slide_id: U32<LE>,
    pub ppt_version: U32<LE>,
    /// Stream offset of the previous UserEditAtom (0 for the first edit)
    pub offset_last_edit: U32<LE>,
    /// Stream offset of this edit's persist pointer block
    pub offset_persist_directory: U32<LE>,
    /// Persist id of the Document record
    pub doc_persist_ref: U32<LE>,
    /// Highest persist id written so far
    pub max_persist_written: U32<LE>,
    pub last_view_type: U16<LE>,
    pub unused: U16<LE>,
}

impl UserEditAtom {
    pub const SIZE: usize = 28;
}

/// TextHeaderAtom payload (4 bytes).
#[derive(Debug, Clone, Copy, DeriveFromBytes, DeriveIntoBytes, DeriveImmutable, KnownLayout)]
#[repr(C)]
pub struct TextHeaderAtom {
    /// Text placeholder kind (title, body, notes, other…)
    pub text_type: U32<LE>,
}

impl TextHeaderAtom {
    pub const SIZE: usize = 4;
}

/// OutlineTextRefAtom payload (4 bytes).
#[derive(Debug, Clone, Copy, DeriveFromBytes, DeriveIntoBytes, DeriveImmutable, KnownLayout)]
#[repr(C)]
pub struct OutlineTextRefAtom {
    /// Index into the referenced sheet's paragraph-list collection
    pub index: I32<LE>,
}

impl OutlineTextRefAtom {
    pub const SIZE: usize = 4;
}

/// InteractiveInfoAtom payload (16 bytes).
#[derive(Debug, Clone, Copy, DeriveFromBytes, DeriveIntoBytes, DeriveImmutable, KnownLayout)]
#[repr(C)]
pub struct InteractiveInfoAtom {
    /// Sound reference (0 if none)
    pub sound_ref: U32<LE>,
    /// Id of the ExHyperlink object this action refers to (0 if none)
    pub hyperlink_ref: U32<LE>,
    /// Action type (4 = hyperlink)
    pub action: u8,
    /// OLE verb (0 if not OLE)
    pub ole_verb: u8,
    /// Jump action
    pub jump: u8,
    pub flags: u8,
    /// Hyperlink kind (8 = URL)
    pub hyperlink_type: u8,
    pub reserved: [u8; 3],
}

impl InteractiveInfoAtom {
    pub const SIZE: usize = 16;

    /// Hyperlink action code.
    pub const ACTION_HYPERLINK: u8 = 0x04;

    /// Build the atom for a URL hyperlink on a text range.
    pub fn url_link(hyperlink_id: u32) -> Self {
        Self {
            sound_ref: U32::new(0),
            hyperlink_ref: U32::new(hyperlink_id),
            action: Self::ACTION_HYPERLINK,
            ole_verb: 0,
            jump: 0,
            flags: 0x04,
            hyperlink_type: 0x08,
            reserved: [0; 3],
        }
    }
}

/// TxInteractiveInfoAtom payload (8 bytes) — the text-range marker.
#[derive(Debug, Clone, Copy, DeriveFromBytes, DeriveIntoBytes, DeriveImmutable, KnownLayout)]
#[repr(C)]
pub struct TxInteractiveInfoAtom {
    /// First covered character index
    pub start: U32<LE>,
    /// One past the last covered character index
    pub end: U32<LE>,
}

impl TxInteractiveInfoAtom {
    pub const SIZE: usize = 8;
}

/// ExHyperlinkAtom payload (4 bytes).
#[derive(Debug, Clone, Copy, DeriveFromBytes, DeriveIntoBytes, DeriveImmutable, KnownLayout)]
#[repr(C)]
pub struct ExHyperlinkAtom {
    /// Hyperlink object id (1-based)
    pub id: U32<LE>,
}

impl ExHyperlinkAtom {
    pub const SIZE: usize = 4;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::store::RecordNode;

    #[test]
    fn test_read_write_round_trip() {
        let mut store = RecordStore::new();
        let id = store.alloc(RecordNode::atom(4085, 0, 0, vec![0u8; UserEditAtom::SIZE]));

        let mut atom: UserEditAtom = read_atom(&store, id, "UserEditAtom").unwrap();
        assert_eq!(atom.offset_persist_directory.get(), 0);

        atom.offset_persist_directory = U32::new(0x1234);
        atom.doc_persist_ref = U32::new(1);
        write_atom(&mut store, id, &atom, "UserEditAtom").unwrap();

        let back: UserEditAtom = read_atom(&store, id, "UserEditAtom").unwrap();
        assert_eq!(back.offset_persist_directory.get(), 0x1234);
        assert_eq!(back.doc_persist_ref.get(), 1);
    }

    #[test]
    fn test_short_payload_rejected() {
        let mut store = RecordStore::new();
        let id = store.alloc(RecordNode::atom(1007, 0, 0, vec![0u8; 4]));
        let result: Result<SlideAtom> = read_atom(&store, id, "SlideAtom");
        assert!(matches!(result, Err(Error::MalformedAtom { .. })));
    }

    #[test]
    fn test_slide_persist_atom_layout() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&5u32.to_le_bytes());
        payload.extend_from_slice(&4u32.to_le_bytes());
        payload.extend_from_slice(&2i32.to_le_bytes());
        payload.extend_from_slice(&256i32.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());

        let mut store = RecordStore::new();
        let id = store.alloc(RecordNode::atom(1011, 0, 0, payload));
        let atom: SlidePersistAtom = read_atom(&store, id, "SlidePersistAtom").unwrap();
        assert_eq!(atom.persist_id.get(), 5);
        assert_eq!(atom.num_placeholder_texts.get(), 2);
        assert_eq!(atom.slide_identifier.get(), 256);
    }
}
