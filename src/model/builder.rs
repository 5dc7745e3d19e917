//! Sheet/shape model construction from the resolved Document record.
//!
//! The Document's SlideListWithText groups (role in the instance field:
//! 0 slides, 1 masters, 2 notes) enumerate persisted sheets in order; each
//! entry resolves to its current record through the persistence directory
//! and pairs with the drawing-layer shapes found in the sheet's PPDrawing.
use crate::drawing::shape::{shapes_from_drawing, ShapeTextSource};
use crate::drawing::{drawing_container, Shape};
use crate::error::Result;
use crate::hyperlink::{apply_text_links, scan_actions, Hyperlink};
use crate::persist::PersistDirectory;
use crate::record::atoms::{read_atom, DocumentAtom, NotesAtom, OutlineTextRefAtom, SlideAtom, SlidePersistAtom};
use crate::record::store::{RecordId, RecordStore};
use crate::record::types::RecordType;
use crate::text::decode::{container_ranges, decode_text_block};
use crate::text::paragraph::TextBlock;
use crate::model::sheet::{Sheet, SheetKind, SlideAtomsSet};
use tracing::{debug, warn};

/// SlideListWithText role instances.
const SLWT_SLIDES: u16 = 0;
const SLWT_MASTERS: u16 = 1;
const SLWT_NOTES: u16 = 2;

/// One (persist atom, text records) entry of a SlideListWithText group.
struct ListEntry {
    slwt: RecordId,
    persist_atom: RecordId,
    persist_id: u32,
    slide_identifier: i32,
    text_records: Vec<RecordId>,
}

/// All sheets of one document, grouped by role.
pub(crate) struct BuiltSheets {
    pub slides: Vec<Sheet>,
    pub notes: Vec<Sheet>,
    pub masters: Vec<Sheet>,
}

/// Walk the Document's list groups and construct every sheet.
pub(crate) fn build_model(
    store: &RecordStore,
    directory: &PersistDirectory,
    document: RecordId,
    links: &[Hyperlink],
) -> Result<BuiltSheets> {
    let first_slide_num = store
        .find_child(document, RecordType::DocumentAtom)
        .and_then(|atom| read_atom::<DocumentAtom>(store, atom, "DocumentAtom").ok())
        .map(|atom| atom.first_slide_num.get() as usize)
        .filter(|&n| n > 0)
        .unwrap_or(1);

    let notes = build_role(
        store,
        directory,
        document,
        links,
        SLWT_NOTES,
        SheetKind::Notes,
    )?;
    let masters = build_role(
        store,
        directory,
        document,
        links,
        SLWT_MASTERS,
        SheetKind::SlideMaster,
    )?;
    let mut slides = build_role(
        store,
        directory,
        document,
        links,
        SLWT_SLIDES,
        SheetKind::Slide,
    )?;

    // page numbers and notes references are slide-level concerns
    for (position, slide) in slides.iter_mut().enumerate() {
        slide.slide_number = Some(first_slide_num + position);
        if slide.notes_link_id != 0 {
            slide.notes_index = notes
                .iter()
                .position(|n| n.sheet_id == slide.notes_link_id);
            if slide.notes_index.is_none() {
                warn!(
                    notes_id = slide.notes_link_id,
                    slide = position,
                    "slide references a notes page that did not resolve"
                );
            }
        }
    }

    debug!(
        slides = slides.len(),
        notes = notes.len(),
        masters = masters.len(),
        "built sheet model"
    );
    Ok(BuiltSheets {
        slides,
        notes,
        masters,
    })
}

/// Collect the (persist atom, text records) entries of every list group
/// with the given role instance, in stream order.
fn list_entries(store: &RecordStore, document: RecordId, instance: u16) -> Result<Vec<ListEntry>> {
    let mut entries: Vec<ListEntry> = Vec::new();
    for &slwt in store
        .find_children(document, RecordType::SlideListWithText)
        .iter()
        .filter(|&&s| store.node(s).instance == instance)
    {
        for &child in store.children(slwt) {
            if store.node(child).record_type == RecordType::SlidePersistAtom {
                let atom = read_atom::<SlidePersistAtom>(store, child, "SlidePersistAtom")?;
                entries.push(ListEntry {
                    slwt,
                    persist_atom: child,
                    persist_id: atom.persist_id.get(),
                    slide_identifier: atom.slide_identifier.get(),
                    text_records: Vec::new(),
                });
            } else if let Some(entry) = entries.last_mut() {
                if entry.slwt == slwt {
                    entry.text_records.push(child);
                }
            }
        }
    }
    Ok(entries)
}

fn build_role(
    store: &RecordStore,
    directory: &PersistDirectory,
    document: RecordId,
    links: &[Hyperlink],
    instance: u16,
    kind: SheetKind,
) -> Result<Vec<Sheet>> {
    let mut sheets = Vec::new();
    for entry in list_entries(store, document, instance)? {
        let Some(record) = directory.record_for(entry.persist_id) else {
            warn!(
                persist_id = entry.persist_id,
                sheet_id = entry.slide_identifier,
                "persisted sheet entry did not resolve to a record, skipping"
            );
            continue;
        };

        // a slide-typed record among the masters is a title master
        let kind = match (kind, store.node(record).record_type) {
            (SheetKind::Slide, RecordType::Slide) => SheetKind::Slide,
            (SheetKind::Notes, RecordType::Notes) => SheetKind::Notes,
            (SheetKind::SlideMaster, RecordType::MainMaster) => SheetKind::SlideMaster,
            (SheetKind::SlideMaster, RecordType::Slide) => SheetKind::TitleMaster,
            (expected, found) => {
                warn!(
                    persist_id = entry.persist_id,
                    ?expected,
                    ?found,
                    "persisted sheet resolved to a record of the wrong type, skipping"
                );
                continue;
            }
        };

        sheets.push(build_sheet(store, links, entry, kind, record)?);
    }
    Ok(sheets)
}

fn build_sheet(
    store: &RecordStore,
    links: &[Hyperlink],
    entry: ListEntry,
    kind: SheetKind,
    record: RecordId,
) -> Result<Sheet> {
    // persisted text lives in the list group, not the sheet record
    let mut text_blocks = Vec::new();
    for (start, end) in container_ranges(store, &entry.text_records) {
        let siblings = &entry.text_records[start..end];
        let mut block = decode_text_block(store, entry.slwt, siblings)?;
        apply_text_links(store, &mut block, siblings, links)?;
        text_blocks.push(block);
    }
    let persisted_blocks = text_blocks.len();

    let (master_id, notes_link_id) = match kind {
        SheetKind::Slide | SheetKind::TitleMaster => {
            match store.find_child(record, RecordType::SlideAtom) {
                Some(atom) => {
                    let slide_atom = read_atom::<SlideAtom>(store, atom, "SlideAtom")?;
                    (slide_atom.master_id.get(), slide_atom.notes_id.get())
                }
                None => (0, 0),
            }
        }
        SheetKind::Notes => match store.find_child(record, RecordType::NotesAtom) {
            Some(atom) => {
                let notes_atom = read_atom::<NotesAtom>(store, atom, "NotesAtom")?;
                (0, notes_atom.slide_id.get())
            }
            None => (0, 0),
        },
        SheetKind::SlideMaster => (0, 0),
    };

    let mut shapes = build_shapes(store, links, record, &mut text_blocks, persisted_blocks)?;
    // simple shapes may carry a shape-level hyperlink in their client data
    for shape in &mut shapes {
        if shape.is_group() {
            continue;
        }
        if let Some(client_data) = shape.client_data {
            let children = store.children(client_data).to_vec();
            if let Some(action) = scan_actions(store, &children, links)?.first() {
                shape.hyperlink = Some(links[action.link_index].id);
            }
        }
    }

    Ok(Sheet {
        kind,
        persist_id: entry.persist_id,
        sheet_id: entry.slide_identifier,
        slide_number: None,
        record,
        atoms_set: Some(SlideAtomsSet {
            persist_atom: entry.persist_atom,
            text_records: entry.text_records,
        }),
        text_blocks,
        shapes,
        notes_index: None,
        master_id,
        notes_link_id,
        color_scheme: store.find_child(record, RecordType::ColorSchemeAtom),
    })
}

/// Build the sheet's shape list and resolve each shape's text: either its
/// own client textbox (decoded fresh) or an outline reference into the
/// sheet's persisted paragraph lists.
fn build_shapes(
    store: &RecordStore,
    links: &[Hyperlink],
    record: RecordId,
    text_blocks: &mut Vec<TextBlock>,
    persisted_blocks: usize,
) -> Result<Vec<Shape>> {
    let Some(ppdrawing) = store.find_child(record, RecordType::PPDrawing) else {
        // structural corruption: every sheet carries its drawing
        return Err(crate::error::Error::CorruptStream(
            "sheet record has no drawing".into(),
        ));
    };
    let drawing = drawing_container(store, ppdrawing)?;
    let mut shapes = shapes_from_drawing(store, drawing)?;

    for shape in &mut shapes {
        let Some(textbox) = shape.client_textbox else {
            continue;
        };
        if let Some(ref_atom) = store.find_child(textbox, RecordType::OutlineTextRefAtom) {
            let index = read_atom::<OutlineTextRefAtom>(store, ref_atom, "OutlineTextRefAtom")?
                .index
                .get();
            if index >= 0 && (index as usize) < persisted_blocks {
                shape.text = Some(ShapeTextSource::Outline(index as usize));
            } else {
                warn!(index, "outline text reference out of range");
            }
            continue;
        }

        let children = store.children(textbox).to_vec();
        let mut first = None;
        for (start, end) in container_ranges(store, &children) {
            let siblings = &children[start..end];
            let mut block = decode_text_block(store, textbox, siblings)?;
            apply_text_links(store, &mut block, siblings, links)?;
            first.get_or_insert(text_blocks.len());
            text_blocks.push(block);
        }
        if let Some(index) = first {
            shape.text = Some(ShapeTextSource::Own(index));
        }
    }

    Ok(shapes)
}
