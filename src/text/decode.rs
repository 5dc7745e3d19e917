//! Decode direction of the text pipeline: sibling records → paragraph model.
//!
//! A text container starts at a TextHeaderAtom and runs until the next
//! header or a SlidePersistAtom boundary. Within that range live the text
//! atom (narrow or wide), the style table, the optional ruler and indent
//! atoms, and any interactive-info marker pairs (handled by the linker, not
//! here).
use crate::binary::{narrow_to_string, utf16le_to_string};
use crate::error::Result;
use crate::record::atoms::{read_atom, TextHeaderAtom};
use crate::record::store::{RecordId, RecordStore};
use crate::record::types::RecordType;
use crate::text::paragraph::{split_paragraphs, TextBlock, TextParagraph, TextRun};
use crate::text::style::{parse_indent_atom, parse_style_atom, IndentRun, StyleRun};
use tracing::warn;

/// A record type that terminates the current text container's sibling run.
fn is_boundary(record_type: RecordType) -> bool {
    matches!(
        record_type,
        RecordType::TextHeaderAtom | RecordType::SlidePersistAtom
    )
}

/// Decode every text container among `parent`'s children, in order.
pub fn decode_text_blocks(store: &RecordStore, parent: RecordId) -> Result<Vec<TextBlock>> {
    let children: Vec<RecordId> = store.children(parent).to_vec();
    decode_text_blocks_in(store, parent, &children)
}

/// Decode the text containers found in `siblings`, a contiguous slice of
/// `parent`'s children (a SlideListWithText entry's text-record subset).
pub fn decode_text_blocks_in(
    store: &RecordStore,
    parent: RecordId,
    siblings: &[RecordId],
) -> Result<Vec<TextBlock>> {
    container_ranges(store, siblings)
        .into_iter()
        .map(|(start, end)| decode_text_block(store, parent, &siblings[start..end]))
        .collect()
}

/// Sibling index ranges of each text container in `siblings`: from its
/// TextHeaderAtom up to the next header or boundary record.
pub fn container_ranges(store: &RecordStore, siblings: &[RecordId]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut index = 0;
    while index < siblings.len() {
        if store.node(siblings[index]).record_type != RecordType::TextHeaderAtom {
            index += 1;
            continue;
        }
        let start = index;
        let mut end = index + 1;
        while end < siblings.len() && !is_boundary(store.node(siblings[end]).record_type) {
            end += 1;
        }
        ranges.push((start, end));
        index = end;
    }
    ranges
}

/// Decode one text container from its sibling range (`siblings[0]` is the
/// TextHeaderAtom).
pub fn decode_text_block(
    store: &RecordStore,
    parent: RecordId,
    siblings: &[RecordId],
) -> Result<TextBlock> {
    let header = siblings[0];
    let text_type = read_atom::<TextHeaderAtom>(store, header, "TextHeaderAtom")?
        .text_type
        .get();
    let mut block = TextBlock::new(header, parent, text_type);

    let mut raw_text = String::new();
    let mut ruler = None;
    for &sibling in &siblings[1..] {
        match store.node(sibling).record_type {
            RecordType::TextCharsAtom if block.text_atom.is_none() => {
                raw_text = utf16le_to_string(store.atom_data(sibling)?);
                block.text_atom = Some(sibling);
            }
            RecordType::TextBytesAtom if block.text_atom.is_none() => {
                raw_text = narrow_to_string(store.atom_data(sibling)?);
                block.text_atom = Some(sibling);
            }
            RecordType::StyleTextPropAtom if block.style_atom.is_none() => {
                block.style_atom = Some(sibling);
            }
            RecordType::MasterTextPropAtom if block.indent_atom.is_none() => {
                block.indent_atom = Some(sibling);
            }
            RecordType::TextRulerAtom if ruler.is_none() => {
                ruler = Some(sibling);
            }
            _ => {}
        }
    }

    let text_len = raw_text.encode_utf16().count();
    let mut paragraphs: Vec<TextParagraph> = split_paragraphs(&raw_text)
        .into_iter()
        .map(|piece| TextParagraph::from_run(TextRun::new(piece)))
        .collect();

    if let Some(style_atom) = block.style_atom {
        let (paragraph_runs, character_runs) =
            parse_style_atom(store.atom_data(style_atom)?, text_len)?;
        distribute_paragraph_styles(&mut paragraphs, &paragraph_runs);
        distribute_character_styles(&mut paragraphs, &character_runs);
    }

    if let Some(indent_atom) = block.indent_atom {
        let indent_runs = parse_indent_atom(store.atom_data(indent_atom)?)?;
        distribute_indents(&mut paragraphs, &indent_runs);
    }

    // the ruler governs every paragraph of the container
    if let Some(ruler) = ruler {
        for paragraph in &mut paragraphs {
            paragraph.ruler = Some(ruler);
        }
    }

    block.set_paragraphs(paragraphs);
    Ok(block)
}

/// Distribute paragraph-level spans over paragraphs: each paragraph takes
/// the current span's style (a clone — collections are value types); a span
/// advances once its covered count is exhausted, so one span may style
/// several consecutive paragraphs.
fn distribute_paragraph_styles(paragraphs: &mut [TextParagraph], spans: &[StyleRun]) {
    let mut iter = spans.iter();
    let mut current = iter.next();
    let mut remaining = current.map(|s| s.covered as usize).unwrap_or(0);
    for paragraph in paragraphs.iter_mut() {
        let Some(span) = current else {
            warn!("style table ran out of paragraph spans; keeping defaults");
            break;
        };
        paragraph.style = span.style.clone();
        paragraph.indent_level = span.style.indent_level;

        let need = paragraph.raw_len();
        if remaining > need {
            remaining -= need;
        } else {
            current = iter.next();
            remaining = current.map(|s| s.covered as usize).unwrap_or(0);
        }
    }
}

/// Distribute character-level spans over runs, splitting a run in two
/// whenever a span boundary falls inside it.
fn distribute_character_styles(paragraphs: &mut [TextParagraph], spans: &[StyleRun]) {
    let mut iter = spans.iter();
    let mut current = iter.next();
    let mut remaining = current.map(|s| s.covered as usize).unwrap_or(0);

    for paragraph in paragraphs.iter_mut() {
        let runs = std::mem::take(&mut paragraph.runs);
        let mut styled = Vec::with_capacity(runs.len());
        for mut run in runs {
            if run.is_empty() {
                if let Some(span) = current {
                    run.style = span.style.clone();
                }
                styled.push(run);
                continue;
            }
            loop {
                // refresh exhausted spans before consuming
                while remaining == 0 && current.is_some() {
                    current = iter.next();
                    remaining = current.map(|s| s.covered as usize).unwrap_or(0);
                }
                let Some(span) = current else {
                    warn!("style table ran out of character spans; keeping defaults");
                    styled.push(run);
                    break;
                };
                let run_len = run.len();
                if remaining >= run_len {
                    run.style = span.style.clone();
                    remaining -= run_len;
                    styled.push(run);
                    break;
                }
                // span ends mid-run: split and continue with the tail
                let tail = run.split_off(remaining);
                run.style = span.style.clone();
                remaining = 0;
                styled.push(run);
                run = tail;
            }
        }
        paragraph.runs = styled;
    }
}

/// Distribute explicit indent-level spans over paragraphs.
fn distribute_indents(paragraphs: &mut [TextParagraph], spans: &[IndentRun]) {
    let mut iter = spans.iter();
    let mut current = iter.next();
    let mut remaining = current.map(|s| s.covered as usize).unwrap_or(0);
    for paragraph in paragraphs.iter_mut() {
        let Some(span) = current else {
            break;
        };
        paragraph.indent_level = span.indent_level;
        let need = paragraph.raw_len();
        if remaining > need {
            remaining -= need;
        } else {
            current = iter.next();
            remaining = current.map(|s| s.covered as usize).unwrap_or(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::string_to_utf16le;
    use crate::record::decode::testutil::frame;
    use crate::record::decode::{decode_stream, DecodeOptions};
    use crate::text::style::{encode_indent_atom, encode_style_atom, StyleCollection};

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

    /// Build a SlideListWithText holding one text container.
    fn build_container(records: &[Vec<u8>]) -> (RecordStore, RecordId) {
        let mut payload = Vec::new();
        for record in records {
            payload.extend_from_slice(record);
        }
        let slwt = frame(0x0F, 0, 4080, &payload);
        let mut store = RecordStore::new();
        let roots = decode_stream(&mut store, &slwt, &DecodeOptions::default()).unwrap();
        (store, roots[0])
    }

    #[test]
    fn test_three_paragraph_block_with_style_table() {
        // "Hello\rWorld\r\r" decoded against spans covering 6, 6 and 1
        let header = frame(0, 0, 3999, &0u32.to_le_bytes());
        let text = frame(0, 0, 4008, b"Hello\rWorld\r\r");
        let style_payload = encode_style_atom(
            &[
                style_entry(6, 0, Some(1)),
                style_entry(6, 1, Some(2)),
                style_entry(1, 2, None),
            ],
            &[char_entry(13, Some(1))],
        );
        let style = frame(0, 0, 4001, &style_payload);

        let (store, parent) = build_container(&[header, text, style]);
        let blocks = decode_text_blocks(&store, parent).unwrap();
        assert_eq!(blocks.len(), 1);

        let paragraphs = blocks[0].paragraphs();
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[0].raw_text(), "Hello\r");
        assert_eq!(paragraphs[1].raw_text(), "World\r");
        assert_eq!(paragraphs[2].text(), "");
        assert_eq!(paragraphs[0].style.get("alignment"), Some(1));
        assert_eq!(paragraphs[1].style.get("alignment"), Some(2));
        assert_eq!(paragraphs[1].indent_level, 1);
        assert_eq!(paragraphs[2].indent_level, 2);
        assert!(paragraphs[0].runs[0].style.is_bold());
    }

    #[test]
    fn test_character_span_splits_run() {
        let header = frame(0, 0, 3999, &0u32.to_le_bytes());
        let text = frame(0, 0, 4008, b"BoldPlain");
        let style_payload = encode_style_atom(
            &[style_entry(10, 0, None)],
            &[char_entry(4, Some(1)), char_entry(6, None)],
        );
        let style = frame(0, 0, 4001, &style_payload);

        let (store, parent) = build_container(&[header, text, style]);
        let blocks = decode_text_blocks(&store, parent).unwrap();
        let runs = &blocks[0].paragraphs()[0].runs;
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text(), "Bold");
        assert!(runs[0].style.is_bold());
        assert_eq!(runs[1].text(), "Plain");
        assert!(!runs[1].style.is_bold());
    }

    #[test]
    fn test_wide_text_atom() {
        let header = frame(0, 0, 3999, &0u32.to_le_bytes());
        let text = frame(0, 0, 4000, &string_to_utf16le("日本\r語"));
        let (store, parent) = build_container(&[header, text]);
        let blocks = decode_text_blocks(&store, parent).unwrap();
        let paragraphs = blocks[0].paragraphs();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].text(), "日本");
        assert_eq!(paragraphs[1].text(), "語");
    }

    #[test]
    fn test_indent_table_distribution() {
        let header = frame(0, 0, 3999, &0u32.to_le_bytes());
        let text = frame(0, 0, 4008, b"One\rTwo\rThree");
        let indent_payload = encode_indent_atom(&[
            crate::text::style::IndentRun {
                covered: 8,
                indent_level: 1,
            },
            crate::text::style::IndentRun {
                covered: 6,
                indent_level: 3,
            },
        ]);
        let indents = frame(0, 0, 4002, &indent_payload);

        let (store, parent) = build_container(&[header, text, indents]);
        let blocks = decode_text_blocks(&store, parent).unwrap();
        let paragraphs = blocks[0].paragraphs();
        // first span covers "One\r" + "Two\r" (8 units), second covers "Three"
        assert_eq!(paragraphs[0].indent_level, 1);
        assert_eq!(paragraphs[1].indent_level, 1);
        assert_eq!(paragraphs[2].indent_level, 3);
    }

    #[test]
    fn test_ruler_attached_to_every_paragraph() {
        let header = frame(0, 0, 3999, &0u32.to_le_bytes());
        let text = frame(0, 0, 4008, b"A\rB");
        let ruler = frame(0, 0, 4006, &[0u8; 4]);
        let (store, parent) = build_container(&[header, text, ruler]);
        let blocks = decode_text_blocks(&store, parent).unwrap();
        let paragraphs = blocks[0].paragraphs();
        assert!(paragraphs[0].ruler.is_some());
        assert_eq!(paragraphs[0].ruler, paragraphs[1].ruler);
    }

    #[test]
    fn test_multiple_containers_split_at_headers() {
        let header_a = frame(0, 0, 3999, &0u32.to_le_bytes());
        let text_a = frame(0, 0, 4008, b"first");
        let header_b = frame(0, 0, 3999, &1u32.to_le_bytes());
        let text_b = frame(0, 0, 4008, b"second");
        let (store, parent) = build_container(&[header_a, text_a, header_b, text_b]);
        let blocks = decode_text_blocks(&store, parent).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].raw_text(), "first");
        assert_eq!(blocks[1].raw_text(), "second");
        assert_eq!(blocks[1].text_type, 1);
    }

    #[test]
    fn test_header_without_text_yields_one_empty_paragraph() {
        let header = frame(0, 0, 3999, &0u32.to_le_bytes());
        let (store, parent) = build_container(&[header]);
        let blocks = decode_text_blocks(&store, parent).unwrap();
        assert_eq!(blocks[0].paragraphs().len(), 1);
        assert!(blocks[0].paragraphs()[0].runs[0].is_empty());
    }
}
