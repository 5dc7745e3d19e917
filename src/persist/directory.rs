//! Persistence resolution: replaying persist pointer blocks into the map of
//! current record versions.
//!
//! Blocks are applied strictly in stream order. Each block first evicts
//! every id it knows about from the running map, then inserts its own
//! (id → offset) entries, so a later block legitimately drops an id by
//! knowing it without re-supplying an offset, and the last write wins for
//! contested ids.
use crate::error::{Error, Result};
use crate::persist::block::PersistBlock;
use crate::record::store::{RecordId, RecordStore};
use crate::record::types::RecordType;
use std::collections::HashMap;
use tracing::{debug, warn};

/// The resolved persistence directory of one document.
#[derive(Debug, Default)]
pub struct PersistDirectory {
    /// Live (id → stream offset) map after replaying all blocks
    offsets: HashMap<u32, u32>,
    /// Surviving ids in ascending order; index = dense slot
    ids: Vec<u32>,
    /// id → slot lookup
    slot_by_id: HashMap<u32, usize>,
    /// Most recent core record per slot, filled by [`Self::resolve_records`]
    current: Vec<Option<RecordId>>,
}

impl PersistDirectory {
    /// Replay blocks in stream order into a fresh directory.
    pub fn replay<'a>(blocks: impl IntoIterator<Item = &'a PersistBlock>) -> Self {
        let mut offsets: HashMap<u32, u32> = HashMap::new();
        for block in blocks {
            for id in block.known_ids() {
                offsets.remove(&id);
            }
            for (id, offset) in block.entries() {
                offsets.insert(id, offset);
            }
        }

        let mut ids: Vec<u32> = offsets.keys().copied().collect();
        ids.sort_unstable();
        let slot_by_id = ids
            .iter()
            .enumerate()
            .map(|(slot, &id)| (id, slot))
            .collect();
        let current = vec![None; ids.len()];

        Self {
            offsets,
            ids,
            slot_by_id,
            current,
        }
    }

    /// Collect the persist blocks among `roots` (in stream order) and replay
    /// them.
    pub fn from_stream(store: &RecordStore, roots: &[RecordId]) -> Result<Self> {
        let mut blocks = Vec::new();
        for &root in roots {
            let node = store.node(root);
            if matches!(
                node.record_type,
                RecordType::PersistPtrFullBlock | RecordType::PersistPtrIncrementalBlock
            ) {
                blocks.push(PersistBlock::parse(store.atom_data(root)?)?);
            }
        }
        debug!(blocks = blocks.len(), "replaying persist pointer blocks");
        Ok(Self::replay(blocks.iter()))
    }

    /// Match top-level records against the resolved offsets, tagging each
    /// matched record with its persist id and filling the dense slot table.
    ///
    /// Records whose recorded stream offset matches no live entry are left
    /// untagged (they are superseded snapshots). Ids whose offset matches no
    /// record are logged and left unresolved.
    pub fn resolve_records(&mut self, store: &mut RecordStore, roots: &[RecordId]) {
        let by_offset: HashMap<u32, u32> = self
            .offsets
            .iter()
            .map(|(&id, &offset)| (offset, id))
            .collect();

        for &root in roots {
            let Some(offset) = store.node(root).source_offset else {
                continue;
            };
            if let Some(&id) = by_offset.get(&offset) {
                store.node_mut(root).persist_id = Some(id);
                let slot = self.slot_by_id[&id];
                self.current[slot] = Some(root);
            }
        }

        for (slot, &id) in self.ids.iter().enumerate() {
            if self.current[slot].is_none() {
                warn!(
                    persist_id = id,
                    offset = self.offsets[&id],
                    "no record found at the offset recorded for this persist id"
                );
            }
        }
    }

    /// Stream offset currently recorded for an id.
    #[inline]
    pub fn offset_of(&self, id: u32) -> Option<u32> {
        self.offsets.get(&id).copied()
    }

    /// Dense slot assigned to an id.
    #[inline]
    pub fn slot_of(&self, id: u32) -> Option<usize> {
        self.slot_by_id.get(&id).copied()
    }

    /// The current record version for an id, if one resolved.
    pub fn record_for(&self, id: u32) -> Option<RecordId> {
        self.slot_of(id).and_then(|slot| self.current[slot])
    }

    /// Surviving persist ids in ascending (slot) order.
    #[inline]
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Most recent core records, one slot per surviving id.
    #[inline]
    pub fn most_recent_core_records(&self) -> &[Option<RecordId>] {
        &self.current
    }

    /// The latest resolved record of a required type, e.g. the Document.
    pub fn required_record(
        &self,
        store: &RecordStore,
        record_type: RecordType,
        name: &'static str,
    ) -> Result<RecordId> {
        self.current
            .iter()
            .rev()
            .flatten()
            .copied()
            .find(|&id| store.node(id).record_type == record_type)
            .ok_or(Error::MissingRecord(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::decode::testutil::frame;
    use crate::record::decode::{decode_stream, DecodeOptions};

    #[test]
    fn test_later_block_supersedes_earlier() {
        let first = PersistBlock::from_entries(vec![(1, 100), (2, 200)]);
        let second = PersistBlock::from_entries(vec![(1, 150)]);
        let directory = PersistDirectory::replay([&first, &second]);
        assert_eq!(directory.offset_of(1), Some(150));
        assert_eq!(directory.offset_of(2), Some(200));
    }

    #[test]
    fn test_known_id_without_offset_is_evicted() {
        // a block that knows {5, 7} but only re-supplies 5 drops 7 entirely
        let first = PersistBlock::from_entries(vec![(5, 500), (7, 700)]);
        let mut second = PersistBlock::from_entries(vec![(5, 550)]);
        second.add_known_id(7);
        let directory = PersistDirectory::replay([&first, &second]);
        assert_eq!(directory.offset_of(5), Some(550));
        assert_eq!(directory.offset_of(7), None);
        assert_eq!(directory.ids(), &[5]);
    }

    #[test]
    fn test_evicted_id_can_be_reintroduced() {
        let first = PersistBlock::from_entries(vec![(7, 700)]);
        let mut second = PersistBlock::from_entries(vec![]);
        second.add_known_id(7);
        let third = PersistBlock::from_entries(vec![(7, 770)]);
        let directory = PersistDirectory::replay([&first, &second, &third]);
        assert_eq!(directory.offset_of(7), Some(770));
    }

    #[test]
    fn test_replay_is_order_dependent() {
        let a = PersistBlock::from_entries(vec![(1, 100)]);
        let b = PersistBlock::from_entries(vec![(1, 999)]);
        let forward = PersistDirectory::replay([&a, &b]);
        let reversed = PersistDirectory::replay([&b, &a]);
        assert_eq!(forward.offset_of(1), Some(999));
        assert_eq!(reversed.offset_of(1), Some(100));
    }

    #[test]
    fn test_slots_are_dense_and_sorted() {
        let block = PersistBlock::from_entries(vec![(9, 90), (2, 20), (4, 40)]);
        let directory = PersistDirectory::replay([&block]);
        assert_eq!(directory.ids(), &[2, 4, 9]);
        assert_eq!(directory.slot_of(2), Some(0));
        assert_eq!(directory.slot_of(4), Some(1));
        assert_eq!(directory.slot_of(9), Some(2));
        assert_eq!(directory.slot_of(3), None);
    }

    #[test]
    fn test_resolve_tags_records_by_offset() {
        // stream: Slide container (offset 0, 8 bytes) then a persist block
        // mapping id 1 to offset 0
        let slide = frame(0x0F, 0, 1006, &[]);
        let mut block_payload = Vec::new();
        block_payload.extend_from_slice(&((1u32 << 20) | 1).to_le_bytes());
        block_payload.extend_from_slice(&0u32.to_le_bytes());
        let block = frame(0, 0, 6002, &block_payload);

        let mut data = slide.clone();
        data.extend_from_slice(&block);

        let mut store = RecordStore::new();
        let roots = decode_stream(&mut store, &data, &DecodeOptions::default()).unwrap();
        let mut directory = PersistDirectory::from_stream(&store, &roots).unwrap();
        directory.resolve_records(&mut store, &roots);

        let resolved = directory.record_for(1).unwrap();
        assert_eq!(resolved, roots[0]);
        assert_eq!(store.node(resolved).persist_id, Some(1));
        assert_eq!(directory.most_recent_core_records().len(), 1);
    }

    #[test]
    fn test_required_record_missing_is_fatal() {
        let blocks: Vec<PersistBlock> = Vec::new();
        let directory = PersistDirectory::replay(&blocks);
        let store = RecordStore::new();
        let err = directory
            .required_record(&store, RecordType::Document, "Document")
            .unwrap_err();
        assert!(matches!(err, Error::MissingRecord("Document")));
    }
}
