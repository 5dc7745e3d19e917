//! The in-memory presentation: owner of the record arena, the persistence
//! directory, and every derived sheet.
//!
//! Loading replays the full pipeline: decode → persistence resolution →
//! sheet/shape construction → text reconstruction → hyperlink linking.
//! Saving runs the inverse bottom-up: dirty text containers flush back into
//! their records, then the whole stream re-serializes with persist-block and
//! user-edit offsets patched to the records' new positions. A document
//! loaded and written untouched reproduces its stream byte for byte.
use crate::current_user::CurrentUser;
use crate::error::Result;
use crate::hyperlink::{collect_links, Hyperlink};
use crate::model::builder::build_model;
use crate::model::sheet::Sheet;
use crate::persist::{PersistBlock, PersistDirectory};
use crate::record::atoms::{read_atom, write_atom, UserEditAtom};
use crate::record::decode::{decode_stream, DecodeOptions};
use crate::record::encode::{encode_stream, encoded_len};
use crate::record::store::{RecordId, RecordNode, RecordStore};
use crate::record::types::RecordType;
use crate::text::encode::flush_text_block;
use crate::text::paragraph::LoadPhase;
use bytes::Bytes;
use std::collections::HashMap;
use tracing::debug;

/// Name of the main document stream in the compound file.
pub const DOCUMENT_STREAM: &str = "PowerPoint Document";

/// Name of the current-user stream in the compound file.
pub const CURRENT_USER_STREAM: &str = "Current User";

/// The container-file collaborator: named streams of bytes. The compound
/// file format itself lives outside this crate.
pub trait StreamStore {
    /// Read a named stream in full.
    fn read_stream(&mut self, name: &str) -> Result<Vec<u8>>;
    /// Replace a named stream in full.
    fn write_stream(&mut self, name: &str, data: &[u8]) -> Result<()>;
}

/// One loaded presentation document.
#[derive(Debug)]
pub struct SlideShow {
    store: RecordStore,
    roots: Vec<RecordId>,
    directory: PersistDirectory,
    document: RecordId,
    slides: Vec<Sheet>,
    notes: Vec<Sheet>,
    masters: Vec<Sheet>,
    links: Vec<Hyperlink>,
    phase: LoadPhase,
    /// The stream this document was loaded from
    source: Bytes,
    /// New offset of the live UserEditAtom after the last write
    last_edit_offset: Option<u32>,
}

impl SlideShow {
    /// Load a presentation from its document stream bytes.
    pub fn load(data: impl Into<Bytes>) -> Result<Self> {
        Self::load_with(data, DecodeOptions::default())
    }

    /// Load with explicit decode options (record length ceiling).
    pub fn load_with(data: impl Into<Bytes>, options: DecodeOptions) -> Result<Self> {
        let source: Bytes = data.into();
        let mut store = RecordStore::new();
        let roots = decode_stream(&mut store, &source, &options)?;

        let mut directory = PersistDirectory::from_stream(&store, &roots)?;
        directory.resolve_records(&mut store, &roots);
        let document = directory.required_record(&store, RecordType::Document, "Document")?;

        let links = collect_links(&store, document)?;
        let built = build_model(&store, &directory, document, &links)?;
        debug!(records = store.len(), "presentation loaded");

        Ok(Self {
            store,
            roots,
            directory,
            document,
            slides: built.slides,
            notes: built.notes,
            masters: built.masters,
            links,
            phase: LoadPhase::Loaded,
            source,
            last_edit_offset: None,
        })
    }

    /// Open a presentation through the container collaborator, reading the
    /// document stream and, when present, the current-user stream.
    pub fn open<S: StreamStore>(container: &mut S) -> Result<(Self, Option<CurrentUser>)> {
        let document = container.read_stream(DOCUMENT_STREAM)?;
        let show = Self::load(document)?;
        let current_user = container
            .read_stream(CURRENT_USER_STREAM)
            .ok()
            .and_then(|bytes| CurrentUser::parse(&bytes).ok());
        Ok((show, current_user))
    }

    /// Current load phase. Pass this into text mutation entry points.
    #[inline]
    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    #[inline]
    pub fn slides(&self) -> &[Sheet] {
        &self.slides
    }

    #[inline]
    pub fn slides_mut(&mut self) -> &mut [Sheet] {
        &mut self.slides
    }

    #[inline]
    pub fn notes(&self) -> &[Sheet] {
        &self.notes
    }

    #[inline]
    pub fn masters(&self) -> &[Sheet] {
        &self.masters
    }

    /// The notes page belonging to a slide, if any.
    pub fn notes_for<'a>(&'a self, slide: &Sheet) -> Option<&'a Sheet> {
        slide.notes_index.and_then(|index| self.notes.get(index))
    }

    /// The master governing a slide, resolved by linear search through the
    /// built master list on each call.
    pub fn master_for<'a>(&'a self, slide: &Sheet) -> Option<&'a Sheet> {
        if slide.master_id == 0 {
            return None;
        }
        self.masters.iter().find(|m| m.sheet_id == slide.master_id)
    }

    /// Document-level hyperlink objects.
    #[inline]
    pub fn hyperlinks(&self) -> &[Hyperlink] {
        &self.links
    }

    /// The resolved Document record.
    #[inline]
    pub fn document_record(&self) -> RecordId {
        self.document
    }

    /// The persistence directory's current-version records, one slot per
    /// surviving persist id.
    #[inline]
    pub fn most_recent_core_records(&self) -> &[Option<RecordId>] {
        self.directory.most_recent_core_records()
    }

    #[inline]
    pub fn directory(&self) -> &PersistDirectory {
        &self.directory
    }

    /// The record arena of this document.
    #[inline]
    pub fn record_store(&self) -> &RecordStore {
        &self.store
    }

    /// The stream bytes this document was loaded from.
    #[inline]
    pub fn source_bytes(&self) -> &Bytes {
        &self.source
    }

    /// Stream offset of the live UserEditAtom as of the last [`Self::write`].
    #[inline]
    pub fn last_edit_offset(&self) -> Option<u32> {
        self.last_edit_offset
    }

    /// Create a document-level hyperlink object and return its id. The id
    /// can then be attached to text ranges via
    /// [`crate::text::TextBlock::apply_hyperlink`].
    pub fn add_hyperlink(&mut self, title: &str, url: &str) -> Result<u32> {
        let id = self.links.iter().map(|l| l.id).max().unwrap_or(0) + 1;

        let obj_list = match self.store.find_child(self.document, RecordType::ExObjList) {
            Some(list) => list,
            None => {
                let list = self
                    .store
                    .alloc(RecordNode::container(RecordType::ExObjList.as_u16(), 0x0F, 0));
                let seed = self.store.alloc(RecordNode::atom(
                    RecordType::ExObjListAtom.as_u16(),
                    0,
                    0,
                    id.to_le_bytes().to_vec(),
                ));
                self.store.push_child(list, seed)?;
                self.store.push_child(self.document, list)?;
                list
            }
        };
        // keep the object seed at the highest id handed out
        if let Some(seed) = self.store.find_child(obj_list, RecordType::ExObjListAtom) {
            let data = self.store.atom_data_mut(seed)?;
            if data.len() >= 4 {
                data[..4].copy_from_slice(&id.to_le_bytes());
            }
        }

        let link = self
            .store
            .alloc(RecordNode::container(RecordType::ExHyperlink.as_u16(), 0x0F, 0));
        let atom = self.store.alloc(RecordNode::atom(
            RecordType::ExHyperlinkAtom.as_u16(),
            0,
            0,
            id.to_le_bytes().to_vec(),
        ));
        let title_record = self.store.alloc(RecordNode::atom(
            RecordType::CString.as_u16(),
            0,
            0,
            crate::binary::string_to_utf16le(title),
        ));
        let url_record = self.store.alloc(RecordNode::atom(
            RecordType::CString.as_u16(),
            0,
            1,
            crate::binary::string_to_utf16le(url),
        ));
        self.store.push_child(link, atom)?;
        self.store.push_child(link, title_record)?;
        self.store.push_child(link, url_record)?;
        self.store.push_child(obj_list, link)?;

        self.links.push(Hyperlink {
            id,
            title: title.into(),
            url: url.into(),
            record: link,
        });
        Ok(id)
    }

    /// Serialize the document stream: flush every dirty text container,
    /// re-derive record offsets, patch the persistence machinery, and
    /// re-encode. Untouched documents come back byte-identical.
    pub fn write(&mut self) -> Result<Vec<u8>> {
        // flush dirty text containers bottom-up
        for sheet in self
            .slides
            .iter_mut()
            .chain(self.notes.iter_mut())
            .chain(self.masters.iter_mut())
        {
            for block in sheet.text_blocks.iter_mut() {
                flush_text_block(&mut self.store, block)?;
            }
        }

        // new offsets from post-flush sizes
        let mut new_offsets = Vec::with_capacity(self.roots.len());
        let mut cursor = 0u32;
        for &root in &self.roots {
            new_offsets.push(cursor);
            cursor += encoded_len(&self.store, root) as u32;
        }

        let remap: HashMap<u32, u32> = self
            .roots
            .iter()
            .zip(&new_offsets)
            .filter_map(|(&root, &new)| {
                self.store.node(root).source_offset.map(|old| (old, new))
            })
            .collect();

        // patch position-dependent records before serializing
        let mut last_edit_offset = None;
        for (index, &root) in self.roots.iter().enumerate() {
            match self.store.node(root).record_type {
                RecordType::PersistPtrFullBlock | RecordType::PersistPtrIncrementalBlock => {
                    let mut block = PersistBlock::parse(self.store.atom_data(root)?)?;
                    let mut changed = false;
                    for (id, offset) in block.entries().collect::<Vec<_>>() {
                        if let Some(&new) = remap.get(&offset) {
                            if new != offset {
                                block.set_offset(id, new);
                                changed = true;
                            }
                        }
                    }
                    if changed {
                        *self.store.atom_data_mut(root)? = block.encode_payload();
                    }
                }
                RecordType::UserEditAtom => {
                    let mut atom: UserEditAtom = read_atom(&self.store, root, "UserEditAtom")?;
                    let mut changed = false;
                    let last_edit = atom.offset_last_edit.get();
                    // zero is the first-edit sentinel, never a pointer
                    if last_edit != 0 {
                        if let Some(&new) = remap.get(&last_edit) {
                            if new != last_edit {
                                atom.offset_last_edit.set(new);
                                changed = true;
                            }
                        }
                    }
                    let persist_dir = atom.offset_persist_directory.get();
                    if let Some(&new) = remap.get(&persist_dir) {
                        if new != persist_dir {
                            atom.offset_persist_directory.set(new);
                            changed = true;
                        }
                    }
                    if changed {
                        write_atom(&mut self.store, root, &atom, "UserEditAtom")?;
                    }
                    last_edit_offset = Some(new_offsets[index]);
                }
                _ => {}
            }
        }
        self.last_edit_offset = last_edit_offset;

        // record the new positions for any subsequent write
        for (&root, &offset) in self.roots.iter().zip(&new_offsets) {
            self.store.node_mut(root).source_offset = Some(offset);
        }

        let mut out = Vec::with_capacity(cursor as usize);
        encode_stream(&self.store, &self.roots, &mut out)?;
        Ok(out)
    }

    /// Write back through the container collaborator, keeping the
    /// current-user stream's edit offset in step with the new stream.
    pub fn save_to<S: StreamStore>(
        &mut self,
        container: &mut S,
        current_user: Option<&mut CurrentUser>,
    ) -> Result<()> {
        let bytes = self.write()?;
        container.write_stream(DOCUMENT_STREAM, &bytes)?;
        if let Some(user) = current_user {
            if let Some(offset) = self.last_edit_offset {
                user.set_current_edit_offset(offset);
            }
            container.write_stream(CURRENT_USER_STREAM, &user.encode())?;
        }
        Ok(())
    }
}
