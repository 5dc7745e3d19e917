//! Record serializer — the exact inverse of [`crate::record::decode`].
//!
//! Container lengths are never trusted from decode time: they are recomputed
//! from the current child list on every encode, so a container whose
//! children were edited serializes consistently while untouched subtrees
//! reproduce their original bytes.
use crate::error::Result;
use crate::record::decode::HEADER_SIZE;
use crate::record::store::{RecordId, RecordPayload, RecordStore};

/// Serialized size of one record, header included.
pub fn encoded_len(store: &RecordStore, id: RecordId) -> usize {
    HEADER_SIZE + payload_len(store, id)
}

fn payload_len(store: &RecordStore, id: RecordId) -> usize {
    match &store.node(id).payload {
        RecordPayload::Atom(data) => data.len(),
        RecordPayload::Container(children) => children
            .iter()
            .map(|&child| encoded_len(store, child))
            .sum(),
    }
}

/// Serialize one record (and its subtree) onto `out`.
pub fn encode_record(store: &RecordStore, id: RecordId, out: &mut Vec<u8>) -> Result<()> {
    let node = store.node(id);
    let version_instance = (node.version as u16 & 0x000F) | (node.instance << 4);
    out.extend_from_slice(&version_instance.to_le_bytes());
    out.extend_from_slice(&node.raw_type.to_le_bytes());
    out.extend_from_slice(&(payload_len(store, id) as u32).to_le_bytes());
    match &node.payload {
        RecordPayload::Atom(data) => out.extend_from_slice(data),
        RecordPayload::Container(children) => {
            for &child in children.iter() {
                encode_record(store, child, out)?;
            }
        }
    }
    Ok(())
}

/// Serialize a sequence of top-level records in order.
pub fn encode_stream(store: &RecordStore, roots: &[RecordId], out: &mut Vec<u8>) -> Result<()> {
    for &root in roots {
        encode_record(store, root, out)?;
    }
    Ok(())
}
