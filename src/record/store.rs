//! Arena storage for decoded record trees.
//!
//! All records of one document live in a single owned arena. Children hold
//! `RecordId` handles and every node knows its parent handle, so the text
//! rebuild pipeline can splice atoms in and out of a container without
//! live back-pointers or ownership cycles.
use crate::error::{Error, Result};
use crate::record::types::RecordType;

/// Handle to a record inside a [`RecordStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(pub(crate) u32);

impl RecordId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Payload of a record: opaque atom bytes or an ordered child list.
#[derive(Debug, Clone)]
pub enum RecordPayload {
    /// Raw atom bytes, mutated in place by typed views
    Atom(Vec<u8>),
    /// Ordered children; serialized length is recomputed at encode time
    Container(Vec<RecordId>),
}

/// One typed binary node.
#[derive(Debug, Clone)]
pub struct RecordNode {
    /// Decoded record type (Unknown keeps the raw code meaningful)
    pub record_type: RecordType,
    /// On-disk 16-bit type code
    pub raw_type: u16,
    /// Low 4 bits of the version/instance field
    pub version: u8,
    /// High 12 bits of the version/instance field
    pub instance: u16,
    /// Atom bytes or child handles
    pub payload: RecordPayload,
    /// Owning container, if any
    pub parent: Option<RecordId>,
    /// Absolute stream offset this record was decoded from
    pub source_offset: Option<u32>,
    /// Persist id assigned by the resolver, if this record is a current
    /// version of a persisted object
    pub persist_id: Option<u32>,
}

impl RecordNode {
    /// Create an atom node with the given header fields and payload.
    pub fn atom(raw_type: u16, version: u8, instance: u16, data: Vec<u8>) -> Self {
        Self {
            record_type: RecordType::from(raw_type),
            raw_type,
            version,
            instance,
            payload: RecordPayload::Atom(data),
            parent: None,
            source_offset: None,
            persist_id: None,
        }
    }

    /// Create an empty container node.
    pub fn container(raw_type: u16, version: u8, instance: u16) -> Self {
        Self {
            record_type: RecordType::from(raw_type),
            raw_type,
            version,
            instance,
            payload: RecordPayload::Container(Vec::new()),
            parent: None,
            source_offset: None,
            persist_id: None,
        }
    }

    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self.payload, RecordPayload::Container(_))
    }
}

/// Arena owning every record of one document.
#[derive(Debug, Default)]
pub struct RecordStore {
    nodes: Vec<RecordNode>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in the arena.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a node, returning its handle. The node is not attached to any
    /// parent; use the child-list operations for that.
    pub fn alloc(&mut self, node: RecordNode) -> RecordId {
        let id = RecordId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    #[inline]
    pub fn node(&self, id: RecordId) -> &RecordNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: RecordId) -> &mut RecordNode {
        &mut self.nodes[id.index()]
    }

    /// Child handles of a container, or an empty slice for atoms.
    pub fn children(&self, id: RecordId) -> &[RecordId] {
        match &self.node(id).payload {
            RecordPayload::Container(children) => children,
            RecordPayload::Atom(_) => &[],
        }
    }

    /// Atom payload bytes.
    pub fn atom_data(&self, id: RecordId) -> Result<&[u8]> {
        match &self.node(id).payload {
            RecordPayload::Atom(data) => Ok(data),
            RecordPayload::Container(_) => Err(Error::CorruptStream(format!(
                "record {:?} is a container, expected an atom",
                self.node(id).record_type
            ))),
        }
    }

    /// Mutable atom payload bytes, for in-place field patching.
    pub fn atom_data_mut(&mut self, id: RecordId) -> Result<&mut Vec<u8>> {
        let record_type = self.node(id).record_type;
        match &mut self.node_mut(id).payload {
            RecordPayload::Atom(data) => Ok(data),
            RecordPayload::Container(_) => Err(Error::CorruptStream(format!(
                "record {record_type:?} is a container, expected an atom"
            ))),
        }
    }

    /// First child with the given type.
    pub fn find_child(&self, id: RecordId, record_type: RecordType) -> Option<RecordId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.node(c).record_type == record_type)
    }

    /// All children with the given type, in order.
    pub fn find_children(&self, id: RecordId, record_type: RecordType) -> Vec<RecordId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.node(c).record_type == record_type)
            .collect()
    }

    /// First child with the given raw type code (for drawing-layer types).
    pub fn find_child_raw(&self, id: RecordId, raw_type: u16) -> Option<RecordId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.node(c).raw_type == raw_type)
    }

    /// Position of `child` within `parent`'s child list.
    pub fn child_position(&self, parent: RecordId, child: RecordId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    /// First descendant with the given type, depth-first.
    pub fn find_descendant(&self, id: RecordId, record_type: RecordType) -> Option<RecordId> {
        for &child in self.children(id) {
            if self.node(child).record_type == record_type {
                return Some(child);
            }
            if let Some(found) = self.find_descendant(child, record_type) {
                return Some(found);
            }
        }
        None
    }

    fn container_children_mut(&mut self, parent: RecordId) -> Result<&mut Vec<RecordId>> {
        let record_type = self.node(parent).record_type;
        match &mut self.node_mut(parent).payload {
            RecordPayload::Container(children) => Ok(children),
            RecordPayload::Atom(_) => Err(Error::CorruptStream(format!(
                "record {record_type:?} is an atom, expected a container"
            ))),
        }
    }

    /// Append a child to a container.
    pub fn push_child(&mut self, parent: RecordId, child: RecordId) -> Result<()> {
        self.container_children_mut(parent)?.push(child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Insert a child at `position` in a container's child list.
    pub fn insert_child_at(
        &mut self,
        parent: RecordId,
        position: usize,
        child: RecordId,
    ) -> Result<()> {
        let children = self.container_children_mut(parent)?;
        let position = position.min(children.len());
        children.insert(position, child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Replace the child at `position`, returning the evicted handle.
    /// The evicted node stays in the arena but is detached.
    pub fn replace_child_at(
        &mut self,
        parent: RecordId,
        position: usize,
        child: RecordId,
    ) -> Result<RecordId> {
        let children = self.container_children_mut(parent)?;
        if position >= children.len() {
            return Err(Error::CorruptStream(format!(
                "child position {position} out of bounds"
            )));
        }
        let old = std::mem::replace(&mut children[position], child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(old).parent = None;
        Ok(old)
    }

    /// Remove the child at `position`, returning the detached handle.
    pub fn remove_child_at(&mut self, parent: RecordId, position: usize) -> Result<RecordId> {
        let children = self.container_children_mut(parent)?;
        if position >= children.len() {
            return Err(Error::CorruptStream(format!(
                "child position {position} out of bounds"
            )));
        }
        let old = children.remove(position);
        self.node_mut(old).parent = None;
        Ok(old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_lookup() {
        let mut store = RecordStore::new();
        let atom = store.alloc(RecordNode::atom(4008, 0, 0, vec![1, 2, 3]));
        assert_eq!(store.node(atom).record_type, RecordType::TextBytesAtom);
        assert_eq!(store.atom_data(atom).unwrap(), &[1, 2, 3]);
        assert!(store.children(atom).is_empty());
    }

    #[test]
    fn test_child_list_edits() {
        let mut store = RecordStore::new();
        let parent = store.alloc(RecordNode::container(1000, 0x0F, 0));
        let a = store.alloc(RecordNode::atom(1001, 1, 0, vec![]));
        let b = store.alloc(RecordNode::atom(1002, 0, 0, vec![]));
        store.push_child(parent, a).unwrap();
        store.push_child(parent, b).unwrap();
        assert_eq!(store.child_position(parent, b), Some(1));

        let c = store.alloc(RecordNode::atom(4008, 0, 0, vec![0x41]));
        let evicted = store.replace_child_at(parent, 0, c).unwrap();
        assert_eq!(evicted, a);
        assert_eq!(store.node(a).parent, None);
        assert_eq!(store.node(c).parent, Some(parent));
        assert_eq!(store.children(parent), &[c, b]);

        store.remove_child_at(parent, 1).unwrap();
        assert_eq!(store.children(parent), &[c]);
    }

    #[test]
    fn test_atom_container_mismatch() {
        let mut store = RecordStore::new();
        let atom = store.alloc(RecordNode::atom(4008, 0, 0, vec![]));
        let container = store.alloc(RecordNode::container(1000, 0x0F, 0));
        assert!(store.atom_data(container).is_err());
        assert!(store.push_child(atom, container).is_err());
    }

    #[test]
    fn test_find_descendant() {
        let mut store = RecordStore::new();
        let root = store.alloc(RecordNode::container(1000, 0x0F, 0));
        let mid = store.alloc(RecordNode::container(4080, 0x0F, 0));
        let leaf = store.alloc(RecordNode::atom(1011, 0, 0, vec![]));
        store.push_child(root, mid).unwrap();
        store.push_child(mid, leaf).unwrap();
        assert_eq!(
            store.find_descendant(root, RecordType::SlidePersistAtom),
            Some(leaf)
        );
        assert_eq!(store.find_descendant(root, RecordType::NotesAtom), None);
    }
}
