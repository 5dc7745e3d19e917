//! Encode direction of the text pipeline: paragraph model → rebuilt records.
//!
//! Runs only for containers marked dirty. The text atom is rebuilt from the
//! flattened paragraphs (narrow storage when every character fits the code
//! page, wide otherwise) and swapped into the parent at the old atom's
//! position. Style entries collapse identical consecutive fingerprints into
//! run-length entries. Interactive-info marker pairs are stripped and
//! re-emitted from the runs' hyperlink assignments, adjacent same-link runs
//! merging into a single pair.
use crate::binary::{string_to_narrow, string_to_utf16le, utf16_len};
use crate::error::{Error, Result};
use crate::record::atoms::{InteractiveInfoAtom, TxInteractiveInfoAtom};
use crate::record::encode::encode_record;
use crate::record::store::{RecordId, RecordNode, RecordStore};
use crate::record::types::RecordType;
use crate::text::paragraph::TextBlock;
use crate::text::style::{encode_indent_atom, encode_style_atom, IndentRun, StyleRun};
use zerocopy::IntoBytes;

/// Flush one dirty text container back into its records. Clean containers
/// are left byte-for-byte untouched.
pub fn flush_text_block(store: &mut RecordStore, block: &mut TextBlock) -> Result<()> {
    if !block.is_dirty() {
        return Ok(());
    }

    let parent = block.parent;

    // every paragraph carries at least one run and ends with the separator
    for (index, paragraph) in block
        .paragraphs_mut(crate::text::paragraph::LoadPhase::Init)
        .iter_mut()
        .enumerate()
    {
        if paragraph.runs.is_empty() {
            return Err(Error::InvariantViolation(format!(
                "paragraph {index} has no runs"
            )));
        }
        paragraph.ensure_separator();
    }

    let flattened = block.raw_text();
    let total_units = utf16_len(&flattened);

    // rebuild the text atom, narrow if the whole text is code-page clean
    let (text_raw_type, text_payload) = match string_to_narrow(&flattened) {
        Some(bytes) => (RecordType::TextBytesAtom.as_u16(), bytes),
        None => (
            RecordType::TextCharsAtom.as_u16(),
            string_to_utf16le(&flattened),
        ),
    };
    let new_text_atom = alloc_like(store, block.text_atom, text_raw_type, text_payload);
    block.text_atom = Some(swap_into_parent(
        store,
        parent,
        block.header,
        block.text_atom,
        new_text_atom,
        0,
    )?);

    // collapse styles into run-length entries
    let (paragraph_spans, character_spans, indent_spans) = collect_spans(block);
    let paragraph_sum: u64 = paragraph_spans.iter().map(|s| s.covered as u64).sum();
    let character_sum: u64 = character_spans.iter().map(|s| s.covered as u64).sum();
    if paragraph_sum != total_units as u64 || character_sum != total_units as u64 {
        return Err(Error::InvariantViolation(format!(
            "style spans cover {paragraph_sum}/{character_sum} of {total_units} characters"
        )));
    }

    let style_payload = encode_style_atom(&paragraph_spans, &character_spans);
    let new_style_atom = alloc_like(
        store,
        block.style_atom,
        RecordType::StyleTextPropAtom.as_u16(),
        style_payload,
    );
    block.style_atom = Some(swap_into_parent(
        store,
        parent,
        block.header,
        block.style_atom,
        new_style_atom,
        1,
    )?);

    // the indent table is rebuilt only where the container carried one
    if let Some(old_indent) = block.indent_atom {
        let payload = encode_indent_atom(&indent_spans);
        let new_indent = alloc_like(store, Some(old_indent), RecordType::MasterTextPropAtom.as_u16(), payload);
        block.indent_atom = Some(swap_into_parent(
            store,
            parent,
            block.header,
            Some(old_indent),
            new_indent,
            2,
        )?);
    }

    rebuild_link_markers(store, block)?;

    // dry-run serialization probe of the rebuilt container
    let mut scratch = Vec::new();
    encode_record(store, parent, &mut scratch)?;

    block.clear_dirty();
    Ok(())
}

/// Allocate a fresh atom node, inheriting version/instance from the record
/// it replaces when there is one.
fn alloc_like(
    store: &mut RecordStore,
    old: Option<RecordId>,
    raw_type: u16,
    payload: Vec<u8>,
) -> RecordId {
    let (version, instance) = match old {
        Some(id) => {
            let node = store.node(id);
            (node.version, node.instance)
        }
        None => (0, 0),
    };
    store.alloc(RecordNode::atom(raw_type, version, instance, payload))
}

/// Swap `new` into the parent at `old`'s position, or insert it
/// `fallback_after` slots past the header if the container had no such atom.
fn swap_into_parent(
    store: &mut RecordStore,
    parent: RecordId,
    header: RecordId,
    old: Option<RecordId>,
    new: RecordId,
    fallback_after: usize,
) -> Result<RecordId> {
    match old.and_then(|o| store.child_position(parent, o)) {
        Some(position) => {
            store.replace_child_at(parent, position, new)?;
        }
        None => {
            let header_position = store.child_position(parent, header).ok_or_else(|| {
                Error::InvariantViolation("text header detached from its container".into())
            })?;
            store.insert_child_at(parent, header_position + 1 + fallback_after, new)?;
        }
    }
    Ok(new)
}

/// Walk paragraphs and runs once, emitting a new run-length entry whenever
/// the style fingerprint changes from the previous one.
fn collect_spans(block: &TextBlock) -> (Vec<StyleRun>, Vec<StyleRun>, Vec<IndentRun>) {
    let mut paragraph_spans: Vec<StyleRun> = Vec::new();
    let mut character_spans: Vec<StyleRun> = Vec::new();
    let mut indent_spans: Vec<IndentRun> = Vec::new();

    for paragraph in block.paragraphs() {
        let covered = paragraph.raw_len() as u32;
        let mut style = paragraph.style.clone();
        style.indent_level = paragraph.indent_level;
        match paragraph_spans.last_mut() {
            Some(last) if last.style == style => last.covered += covered,
            _ => paragraph_spans.push(StyleRun { covered, style }),
        }
        match indent_spans.last_mut() {
            Some(last) if last.indent_level == paragraph.indent_level => last.covered += covered,
            _ => indent_spans.push(IndentRun {
                covered,
                indent_level: paragraph.indent_level,
            }),
        }

        for run in &paragraph.runs {
            let covered = run.len() as u32;
            if covered == 0 {
                continue;
            }
            match character_spans.last_mut() {
                Some(last) if last.style == run.style => last.covered += covered,
                _ => character_spans.push(StyleRun {
                    covered,
                    style: run.style.clone(),
                }),
            }
        }
    }

    (paragraph_spans, character_spans, indent_spans)
}

/// Strip this container's interactive-info marker pairs and re-emit them
/// from the runs, merging adjacent runs that share a hyperlink object into
/// one coverage span.
fn rebuild_link_markers(store: &mut RecordStore, block: &mut TextBlock) -> Result<()> {
    let parent = block.parent;
    let header_position = store.child_position(parent, block.header).ok_or_else(|| {
        Error::InvariantViolation("text header detached from its container".into())
    })?;

    // bounds of this container's sibling run
    let range_end = store.children(parent)[header_position + 1..]
        .iter()
        .position(|&c| {
            matches!(
                store.node(c).record_type,
                RecordType::TextHeaderAtom | RecordType::SlidePersistAtom
            )
        })
        .map(|p| header_position + 1 + p)
        .unwrap_or_else(|| store.children(parent).len());

    for position in (header_position + 1..range_end).rev() {
        let child = store.children(parent)[position];
        if matches!(
            store.node(child).record_type,
            RecordType::InteractiveInfo | RecordType::TxInteractiveInfoAtom
        ) {
            store.remove_child_at(parent, position)?;
        }
    }

    // merge adjacent same-link runs into coverage spans
    let mut spans: Vec<(u32, u32, u32)> = Vec::new();
    let mut position = 0u32;
    for paragraph in block.paragraphs() {
        for run in &paragraph.runs {
            let end = position + run.len() as u32;
            if let Some(link_id) = run.hyperlink {
                match spans.last_mut() {
                    Some((id, _, span_end)) if *id == link_id && *span_end == position => {
                        *span_end = end;
                    }
                    _ => spans.push((link_id, position, end)),
                }
            }
            position = end;
        }
    }

    let mut insert_at = store.children(parent)[header_position + 1..]
        .iter()
        .position(|&c| {
            matches!(
                store.node(c).record_type,
                RecordType::TextHeaderAtom | RecordType::SlidePersistAtom
            )
        })
        .map(|p| header_position + 1 + p)
        .unwrap_or_else(|| store.children(parent).len());

    for (link_id, start, end) in spans {
        let info_atom = store.alloc(RecordNode::atom(
            RecordType::InteractiveInfoAtom.as_u16(),
            0,
            0,
            InteractiveInfoAtom::url_link(link_id).as_bytes().to_vec(),
        ));
        let info = store.alloc(RecordNode::container(
            RecordType::InteractiveInfo.as_u16(),
            0x0F,
            0,
        ));
        store.push_child(info, info_atom)?;

        let marker_atom = TxInteractiveInfoAtom {
            start: zerocopy::U32::new(start),
            end: zerocopy::U32::new(end),
        };
        let marker = store.alloc(RecordNode::atom(
            RecordType::TxInteractiveInfoAtom.as_u16(),
            0,
            0,
            marker_atom.as_bytes().to_vec(),
        ));

        store.insert_child_at(parent, insert_at, info)?;
        store.insert_child_at(parent, insert_at + 1, marker)?;
        insert_at += 2;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::atoms::read_atom;
    use crate::record::decode::testutil::frame;
    use crate::record::decode::{decode_stream, DecodeOptions};
    use crate::record::encode::encode_stream;
    use crate::text::decode::decode_text_blocks;
    use crate::text::paragraph::LoadPhase;
    use crate::text::style::StyleCollection;

    fn style_entry(covered: u32, indent: u16, alignment: Option<i32>) -> StyleRun {
        let mut style = StyleCollection::paragraph();
        style.indent_level = indent;
        if let Some(value) = alignment {
            style.set("alignment", value);
        }
        StyleRun { covered, style }
    }

    fn char_entry(covered: u32, flags: Option<i32>) -> StyleRun {
        let mut style = StyleCollection::character();
        if let Some(value) = flags {
            style.set("char.flags", value);
        }
        StyleRun { covered, style }
    }

    fn build_stream(records: &[Vec<u8>]) -> Vec<u8> {
        let mut payload = Vec::new();
        for record in records {
            payload.extend_from_slice(record);
        }
        frame(0x0F, 0, 4080, &payload)
    }

    fn load(data: &[u8]) -> (RecordStore, Vec<RecordId>) {
        let mut store = RecordStore::new();
        let roots = decode_stream(&mut store, data, &DecodeOptions::default()).unwrap();
        (store, roots)
    }

    fn serialize(store: &RecordStore, roots: &[RecordId]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_stream(store, roots, &mut out).unwrap();
        out
    }

    #[test]
    fn test_clean_block_is_not_touched() {
        let data = build_stream(&[
            frame(0, 0, 3999, &0u32.to_le_bytes()),
            frame(0, 0, 4008, b"Hello"),
        ]);
        let (mut store, roots) = load(&data);
        let mut blocks = decode_text_blocks(&store, roots[0]).unwrap();
        flush_text_block(&mut store, &mut blocks[0]).unwrap();
        assert_eq!(serialize(&store, &roots), data);
    }

    #[test]
    fn test_dirty_scenario_a_round_trip() {
        // decode, touch nothing but force a flush; the rebuilt style table
        // must match the original entry for entry
        let style_payload = encode_style_atom(
            &[
                style_entry(6, 0, Some(1)),
                style_entry(6, 1, Some(2)),
                style_entry(1, 2, None),
            ],
            &[char_entry(6, Some(1)), char_entry(7, None)],
        );
        let data = build_stream(&[
            frame(0, 0, 3999, &0u32.to_le_bytes()),
            frame(0, 0, 4008, b"Hello\rWorld\r\r"),
            frame(0, 0, 4001, &style_payload),
        ]);
        let (mut store, roots) = load(&data);
        let mut blocks = decode_text_blocks(&store, roots[0]).unwrap();
        blocks[0].mark_dirty();
        flush_text_block(&mut store, &mut blocks[0]).unwrap();
        assert_eq!(serialize(&store, &roots), data);
        assert!(!blocks[0].is_dirty());
    }

    #[test]
    fn test_edit_switches_to_wide_storage() {
        let data = build_stream(&[
            frame(0, 0, 3999, &0u32.to_le_bytes()),
            frame(0, 0, 4008, b"Hello"),
        ]);
        let (mut store, roots) = load(&data);
        let mut blocks = decode_text_blocks(&store, roots[0]).unwrap();
        blocks[0].set_text(LoadPhase::Loaded, "日本語");
        flush_text_block(&mut store, &mut blocks[0]).unwrap();

        let text_atom = blocks[0].text_atom.unwrap();
        assert_eq!(
            store.node(text_atom).record_type,
            RecordType::TextCharsAtom
        );
        assert_eq!(
            crate::binary::utf16le_to_string(store.atom_data(text_atom).unwrap()),
            "日本語\r"
        );
        // the swap kept the atom at the old text atom's position
        assert_eq!(store.child_position(roots[0], text_atom), Some(1));
    }

    #[test]
    fn test_flush_inserts_missing_atoms_after_header() {
        let data = build_stream(&[frame(0, 0, 3999, &0u32.to_le_bytes())]);
        let (mut store, roots) = load(&data);
        let mut blocks = decode_text_blocks(&store, roots[0]).unwrap();
        blocks[0].set_text(LoadPhase::Loaded, "fresh");
        flush_text_block(&mut store, &mut blocks[0]).unwrap();

        let children = store.children(roots[0]);
        assert_eq!(store.node(children[0]).record_type, RecordType::TextHeaderAtom);
        assert_eq!(store.node(children[1]).record_type, RecordType::TextBytesAtom);
        assert_eq!(
            store.node(children[2]).record_type,
            RecordType::StyleTextPropAtom
        );
        assert_eq!(store.atom_data(children[1]).unwrap(), b"fresh\r");
    }

    #[test]
    fn test_identical_styles_collapse_into_one_entry() {
        let data = build_stream(&[
            frame(0, 0, 3999, &0u32.to_le_bytes()),
            frame(0, 0, 4008, b"One\rTwo\r"),
        ]);
        let (mut store, roots) = load(&data);
        let mut blocks = decode_text_blocks(&store, roots[0]).unwrap();
        blocks[0].mark_dirty();
        flush_text_block(&mut store, &mut blocks[0]).unwrap();

        let style_atom = blocks[0].style_atom.unwrap();
        let (paragraph_spans, character_spans) = crate::text::style::parse_style_atom(
            store.atom_data(style_atom).unwrap(),
            8,
        )
        .unwrap();
        assert_eq!(paragraph_spans.len(), 1);
        assert_eq!(paragraph_spans[0].covered, 8);
        assert_eq!(character_spans.len(), 1);
        assert_eq!(character_spans[0].covered, 8);
    }

    #[test]
    fn test_hyperlink_spanning_runs_collapses_to_one_marker_pair() {
        let data = build_stream(&[
            frame(0, 0, 3999, &0u32.to_le_bytes()),
            frame(0, 0, 4008, b"click here now"),
        ]);
        let (mut store, roots) = load(&data);
        let mut blocks = decode_text_blocks(&store, roots[0]).unwrap();
        // two adjacent runs covered by the same link object
        blocks[0].apply_hyperlink(LoadPhase::Init, 3, 0, 5);
        blocks[0].apply_hyperlink(LoadPhase::Init, 3, 5, 10);
        assert!(blocks[0].paragraphs()[0].runs.len() >= 2);
        blocks[0].mark_dirty();
        flush_text_block(&mut store, &mut blocks[0]).unwrap();

        let children: Vec<_> = store.children(roots[0]).to_vec();
        let infos: Vec<_> = children
            .iter()
            .filter(|&&c| store.node(c).record_type == RecordType::InteractiveInfo)
            .collect();
        let markers: Vec<_> = children
            .iter()
            .filter(|&&c| store.node(c).record_type == RecordType::TxInteractiveInfoAtom)
            .collect();
        assert_eq!(infos.len(), 1);
        assert_eq!(markers.len(), 1);

        let marker: TxInteractiveInfoAtom =
            read_atom(&store, *markers[0], "TxInteractiveInfoAtom").unwrap();
        assert_eq!(marker.start.get(), 0);
        assert_eq!(marker.end.get(), 10);
    }

    #[test]
    fn test_paragraph_without_runs_is_invariant_violation() {
        let data = build_stream(&[
            frame(0, 0, 3999, &0u32.to_le_bytes()),
            frame(0, 0, 4008, b"x"),
        ]);
        let (mut store, roots) = load(&data);
        let mut blocks = decode_text_blocks(&store, roots[0]).unwrap();
        blocks[0].paragraphs_mut(LoadPhase::Loaded)[0].runs.clear();
        let err = flush_text_block(&mut store, &mut blocks[0]).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }
}
