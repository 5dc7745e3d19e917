//! Persist pointer block parsing and re-serialization.
//!
//! A block's payload is a repeating sequence of groups: a 32-bit info word
//! (low 20 bits = base persist id, high 12 bits = entry count) followed by
//! `count` little-endian u32 stream offsets, one per consecutive id starting
//! at the base. Group structure is preserved across a parse/encode cycle so
//! untouched blocks reproduce their original bytes.
use crate::error::{Error, Result};

/// One contiguous run of persist ids and their offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistGroup {
    /// First persist id of the run
    pub base_id: u32,
    /// One offset per id, in id order
    pub offsets: Vec<u32>,
}

/// One persist pointer block, in-memory form.
///
/// Besides its (id → offset) entries, a block knows a set of ids. Normally
/// that set is exactly the entry ids, but a block can know an id without
/// supplying a fresh offset for it — replaying such a block evicts the id
/// from the live map entirely.
#[derive(Debug, Clone, Default)]
pub struct PersistBlock {
    groups: Vec<PersistGroup>,
    /// Ids known to this block beyond those its groups carry
    extra_known_ids: Vec<u32>,
}

impl PersistBlock {
    /// Parse a block payload.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut groups = Vec::new();
        let mut chunks = data.chunks_exact(4);

        while let Some(info_bytes) = chunks.next() {
            let info = u32::from_le_bytes(info_bytes.try_into().unwrap());
            let base_id = info & 0x000F_FFFF;
            let entry_count = (info >> 20) & 0x0FFF;

            let mut offsets = Vec::with_capacity(entry_count as usize);
            for _ in 0..entry_count {
                let offset_bytes = chunks.next().ok_or_else(|| {
                    Error::MalformedAtom {
                        atom: "PersistPtrBlock",
                        reason: format!(
                            "group at id {base_id} declares {entry_count} offsets, payload ends early"
                        ),
                    }
                })?;
                offsets.push(u32::from_le_bytes(offset_bytes.try_into().unwrap()));
            }
            groups.push(PersistGroup { base_id, offsets });
        }

        Ok(Self {
            groups,
            extra_known_ids: Vec::new(),
        })
    }

    /// Build a block from explicit (id, offset) pairs, forming contiguous
    /// groups the way the on-disk format does.
    pub fn from_entries(mut entries: Vec<(u32, u32)>) -> Self {
        entries.sort_unstable_by_key(|&(id, _)| id);
        let mut groups: Vec<PersistGroup> = Vec::new();
        for (id, offset) in entries {
            match groups.last_mut() {
                Some(group) if group.base_id + group.offsets.len() as u32 == id => {
                    group.offsets.push(offset);
                }
                _ => groups.push(PersistGroup {
                    base_id: id,
                    offsets: vec![offset],
                }),
            }
        }
        Self {
            groups,
            extra_known_ids: Vec::new(),
        }
    }

    /// Declare an id this block knows about without supplying an offset.
    pub fn add_known_id(&mut self, id: u32) {
        self.extra_known_ids.push(id);
    }

    /// All (id, offset) entries in group order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.groups.iter().flat_map(|group| {
            group
                .offsets
                .iter()
                .enumerate()
                .map(move |(i, &offset)| (group.base_id + i as u32, offset))
        })
    }

    /// Every id this block knows about: its entry ids plus any declared
    /// without an offset.
    pub fn known_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.entries().map(|(id, _)| id).collect();
        ids.extend_from_slice(&self.extra_known_ids);
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Patch the offset of an existing entry. Returns false if the block
    /// carries no entry for the id.
    pub fn set_offset(&mut self, id: u32, offset: u32) -> bool {
        for group in &mut self.groups {
            let end = group.base_id + group.offsets.len() as u32;
            if id >= group.base_id && id < end {
                group.offsets[(id - group.base_id) as usize] = offset;
                return true;
            }
        }
        false
    }

    /// Number of entries across all groups.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.offsets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.extra_known_ids.is_empty()
    }

    /// Re-serialize the payload, preserving the parsed group structure.
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * 4 + self.groups.len() * 4);
        for group in &self.groups {
            let info =
                ((group.offsets.len() as u32 & 0x0FFF) << 20) | (group.base_id & 0x000F_FFFF);
            out.extend_from_slice(&info.to_le_bytes());
            for &offset in &group.offsets {
                out.extend_from_slice(&offset.to_le_bytes());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(groups: &[(u32, &[u32])]) -> Vec<u8> {
        let mut data = Vec::new();
        for &(base, offsets) in groups {
            let info = ((offsets.len() as u32) << 20) | base;
            data.extend_from_slice(&info.to_le_bytes());
            for &o in offsets {
                data.extend_from_slice(&o.to_le_bytes());
            }
        }
        data
    }

    #[test]
    fn test_parse_single_group() {
        let block = PersistBlock::parse(&payload(&[(0, &[1000, 2000])])).unwrap();
        let entries: Vec<_> = block.entries().collect();
        assert_eq!(entries, vec![(0, 1000), (1, 2000)]);
        assert_eq!(block.known_ids(), vec![0, 1]);
    }

    #[test]
    fn test_parse_multiple_groups() {
        let block = PersistBlock::parse(&payload(&[(0, &[1000, 2000]), (10, &[3000])])).unwrap();
        assert_eq!(block.len(), 3);
        let entries: Vec<_> = block.entries().collect();
        assert_eq!(entries, vec![(0, 1000), (1, 2000), (10, 3000)]);
    }

    #[test]
    fn test_truncated_group_rejected() {
        let mut data = payload(&[(0, &[1000, 2000])]);
        data.truncate(8);
        assert!(PersistBlock::parse(&data).is_err());
    }

    #[test]
    fn test_payload_round_trip() {
        let data = payload(&[(3, &[500]), (7, &[900, 901, 902])]);
        let block = PersistBlock::parse(&data).unwrap();
        assert_eq!(block.encode_payload(), data);
    }

    #[test]
    fn test_from_entries_forms_contiguous_groups() {
        let block = PersistBlock::from_entries(vec![(2, 20), (1, 10), (5, 50)]);
        let entries: Vec<_> = block.entries().collect();
        assert_eq!(entries, vec![(1, 10), (2, 20), (5, 50)]);
        // 1..=2 contiguous, 5 alone: two groups
        let reparsed = PersistBlock::parse(&block.encode_payload()).unwrap();
        assert_eq!(reparsed.entries().collect::<Vec<_>>(), entries);
    }

    #[test]
    fn test_set_offset_patches_in_place() {
        let data = payload(&[(4, &[100, 200])]);
        let mut block = PersistBlock::parse(&data).unwrap();
        assert!(block.set_offset(5, 999));
        assert!(!block.set_offset(9, 1));
        assert_eq!(
            block.entries().collect::<Vec<_>>(),
            vec![(4, 100), (5, 999)]
        );
        // structure (group count, sizes) unchanged
        assert_eq!(block.encode_payload().len(), data.len());
    }

    #[test]
    fn test_known_id_without_offset() {
        let mut block = PersistBlock::from_entries(vec![(5, 100)]);
        block.add_known_id(7);
        assert_eq!(block.known_ids(), vec![5, 7]);
        assert_eq!(block.entries().collect::<Vec<_>>(), vec![(5, 100)]);
    }
}
