//! Drawing-layer (MS-ODRAW) structure walking.
//!
//! Drawing records share the document layer's 8-byte framing and live in
//! the 0xF000 type range, so they land in the same arena when a PPDrawing
//! container is decoded. This module knows just enough of the layer to find
//! a sheet's shape tree; geometry and fill property surfaces are out of
//! scope beyond record lookup.
pub mod shape;

pub use shape::{Shape, ShapeKind, ShapeTextSource};

use crate::error::{Error, Result};
use crate::record::store::{RecordId, RecordStore};
use crate::record::types::escher;
use bitflags::bitflags;
use zerocopy::{U32, LE};
use zerocopy_derive::{FromBytes as DeriveFromBytes, Immutable as DeriveImmutable, IntoBytes as DeriveIntoBytes, KnownLayout};

bitflags! {
    /// Shape flag word of the Sp atom.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShapeFlags: u32 {
        const GROUP = 0x0001;
        const CHILD = 0x0002;
        const PATRIARCH = 0x0004;
        const DELETED = 0x0008;
        const OLE_SHAPE = 0x0010;
        const HAVE_MASTER = 0x0020;
        const FLIP_H = 0x0040;
        const FLIP_V = 0x0080;
        const CONNECTOR = 0x0100;
        const HAVE_ANCHOR = 0x0200;
        const BACKGROUND = 0x0400;
        const HAVE_SPT = 0x0800;
    }
}

/// Sp atom payload (8 bytes): shape id and flags. The shape's geometry
/// preset rides in the record's instance field, not the payload.
#[derive(Debug, Clone, Copy, DeriveFromBytes, DeriveIntoBytes, DeriveImmutable, KnownLayout)]
#[repr(C)]
pub struct ShapeAtom {
    pub shape_id: U32<LE>,
    pub flags: U32<LE>,
}

impl ShapeAtom {
    pub const SIZE: usize = 8;
}

/// Locate the drawing container inside a sheet's PPDrawing record.
/// Its absence is structural corruption, not a recoverable gap.
pub fn drawing_container(store: &RecordStore, ppdrawing: RecordId) -> Result<RecordId> {
    store
        .find_child_raw(ppdrawing, escher::DG_CONTAINER)
        .ok_or_else(|| Error::CorruptStream("sheet drawing is missing its drawing container".into()))
}

/// Locate the shape-group container holding the sheet's shape tree.
pub fn shape_group(store: &RecordStore, drawing: RecordId) -> Result<RecordId> {
    store
        .find_child_raw(drawing, escher::SPGR_CONTAINER)
        .ok_or_else(|| {
            Error::CorruptStream("drawing container is missing its shape group".into())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::decode::testutil::frame;
    use crate::record::decode::{decode_stream, DecodeOptions};

    #[test]
    fn test_missing_drawing_container_is_fatal() {
        let ppdrawing = frame(0x0F, 0, 1036, &[]);
        let mut store = RecordStore::new();
        let roots = decode_stream(&mut store, &ppdrawing, &DecodeOptions::default()).unwrap();
        assert!(drawing_container(&store, roots[0]).is_err());
    }

    #[test]
    fn test_drawing_and_group_located() {
        let spgr = frame(0x0F, 0, escher::SPGR_CONTAINER, &[]);
        let dg = frame(0x0F, 0, escher::DG_CONTAINER, &spgr);
        let ppdrawing = frame(0x0F, 0, 1036, &dg);
        let mut store = RecordStore::new();
        let roots = decode_stream(&mut store, &ppdrawing, &DecodeOptions::default()).unwrap();
        let drawing = drawing_container(&store, roots[0]).unwrap();
        assert!(shape_group(&store, drawing).is_ok());
    }
}
