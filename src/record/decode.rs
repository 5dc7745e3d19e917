//! Record stream decoder.
//!
//! Each record is framed as a 2-byte version/instance field (low 4 bits
//! version, high 12 bits instance), a 2-byte little-endian type code and a
//! 4-byte little-endian payload length. Registered container types decode
//! their payload recursively until it is exhausted; everything else is kept
//! as an opaque atom. Decoding is pure: no state outside the arena.
use crate::binary::{read_u16_le, read_u32_le};
use crate::error::{Error, Result};
use crate::record::store::{RecordId, RecordNode, RecordStore};
use crate::record::types::is_container;

/// Size of the fixed record header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Default ceiling for a single record's claimed payload length.
pub const DEFAULT_MAX_RECORD_LEN: u32 = 64 * 1024 * 1024;

/// Decode-time configuration, threaded explicitly through the call chain.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Maximum accepted payload length for one record. A claimed length
    /// above this fails before any allocation is attempted, guarding
    /// against corrupt or adversarial length fields.
    pub max_record_len: u32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_record_len: DEFAULT_MAX_RECORD_LEN,
        }
    }
}

/// Decode a whole stream into top-level records, in stream order.
pub fn decode_stream(
    store: &mut RecordStore,
    data: &[u8],
    options: &DecodeOptions,
) -> Result<Vec<RecordId>> {
    let mut roots = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let (id, consumed) = decode_record(store, data, offset, data.len(), options)?;
        roots.push(id);
        offset += consumed;
    }
    Ok(roots)
}

/// Decode one record starting at `offset`; `end` bounds the enclosing
/// container (or the stream). Returns the new node and the bytes consumed.
pub fn decode_record(
    store: &mut RecordStore,
    data: &[u8],
    offset: usize,
    end: usize,
    options: &DecodeOptions,
) -> Result<(RecordId, usize)> {
    if offset + HEADER_SIZE > end {
        return Err(Error::TruncatedRecord {
            offset,
            needed: HEADER_SIZE,
            remaining: end.saturating_sub(offset),
        });
    }

    let version_instance = read_u16_le(data, offset)?;
    let version = (version_instance & 0x000F) as u8;
    let instance = (version_instance >> 4) & 0x0FFF;
    let raw_type = read_u16_le(data, offset + 2)?;
    let length = read_u32_le(data, offset + 4)?;

    if length > options.max_record_len {
        return Err(Error::RecordTooLong {
            offset,
            claimed: length,
            limit: options.max_record_len,
        });
    }

    let payload_start = offset + HEADER_SIZE;
    let payload_end = payload_start + length as usize;
    if payload_end > end {
        return Err(Error::TruncatedRecord {
            offset,
            needed: HEADER_SIZE + length as usize,
            remaining: end.saturating_sub(offset),
        });
    }

    let id = if is_container(raw_type, version) {
        let mut node = RecordNode::container(raw_type, version, instance);
        node.source_offset = Some(offset as u32);
        let id = store.alloc(node);

        let mut child_offset = payload_start;
        while child_offset < payload_end {
            let (child, consumed) =
                decode_record(store, data, child_offset, payload_end, options)?;
            store.push_child(id, child)?;
            child_offset += consumed;
        }
        id
    } else {
        let mut node = RecordNode::atom(
            raw_type,
            version,
            instance,
            data[payload_start..payload_end].to_vec(),
        );
        node.source_offset = Some(offset as u32);
        store.alloc(node)
    };

    Ok((id, HEADER_SIZE + length as usize))
}

/// Test fixture helpers shared by the record, persist, text and model tests.
#[cfg(test)]
pub(crate) mod testutil {
    use super::HEADER_SIZE;

    /// Frame a record by hand: version/instance, type, length, payload.
    pub(crate) fn frame(version: u8, instance: u16, raw_type: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
        let version_instance = (version as u16 & 0x000F) | (instance << 4);
        out.extend_from_slice(&version_instance.to_le_bytes());
        out.extend_from_slice(&raw_type.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::frame;
    use super::*;
    use crate::record::types::RecordType;

    #[test]
    fn test_decode_atom() {
        let data = frame(0, 3, 4008, b"Hello");
        let mut store = RecordStore::new();
        let roots = decode_stream(&mut store, &data, &DecodeOptions::default()).unwrap();
        assert_eq!(roots.len(), 1);
        let node = store.node(roots[0]);
        assert_eq!(node.record_type, RecordType::TextBytesAtom);
        assert_eq!(node.version, 0);
        assert_eq!(node.instance, 3);
        assert_eq!(node.source_offset, Some(0));
        assert_eq!(store.atom_data(roots[0]).unwrap(), b"Hello");
    }

    #[test]
    fn test_decode_nested_container() {
        let atom = frame(0, 0, 1011, &[0u8; 20]);
        let inner = frame(0x0F, 0, 4080, &atom);
        let outer = frame(0x0F, 0, 1000, &inner);
        let mut store = RecordStore::new();
        let roots = decode_stream(&mut store, &outer, &DecodeOptions::default()).unwrap();
        let document = roots[0];
        assert_eq!(store.node(document).record_type, RecordType::Document);
        let slwt = store.children(document)[0];
        assert_eq!(store.node(slwt).record_type, RecordType::SlideListWithText);
        let persist = store.children(slwt)[0];
        assert_eq!(store.node(persist).record_type, RecordType::SlidePersistAtom);
        assert_eq!(store.node(persist).parent, Some(slwt));
        // offsets are absolute within the stream
        assert_eq!(store.node(slwt).source_offset, Some(8));
        assert_eq!(store.node(persist).source_offset, Some(16));
    }

    #[test]
    fn test_truncated_payload_is_fatal() {
        let mut data = frame(0, 0, 4008, b"Hello");
        data.truncate(10);
        let mut store = RecordStore::new();
        let err = decode_stream(&mut store, &data, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::TruncatedRecord { .. }));
    }

    #[test]
    fn test_child_overrunning_container_is_fatal() {
        // container claims 8 bytes of payload but the child claims 12
        let child = frame(0, 0, 4008, &[0u8; 12]);
        let mut container = frame(0x0F, 0, 1000, &[]);
        container[4..8].copy_from_slice(&8u32.to_le_bytes());
        container.extend_from_slice(&child[..8]);
        let mut store = RecordStore::new();
        let err = decode_stream(&mut store, &container, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::TruncatedRecord { .. }));
    }

    #[test]
    fn test_length_over_ceiling_rejected_without_reading() {
        // claims 16 MiB with a 1 KiB ceiling; must fail on the claim alone
        let mut data = frame(0, 0, 4008, &[]);
        data[4..8].copy_from_slice(&(16u32 * 1024 * 1024).to_le_bytes());
        let options = DecodeOptions {
            max_record_len: 1024,
        };
        let mut store = RecordStore::new();
        let err = decode_stream(&mut store, &data, &options).unwrap_err();
        assert!(matches!(
            err,
            Error::RecordTooLong { claimed, limit: 1024, .. } if claimed == 16 * 1024 * 1024
        ));
    }
}
