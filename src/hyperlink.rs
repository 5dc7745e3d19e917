//! Document hyperlink objects and the interactive-info linker.
//!
//! Hyperlink objects live document-level in the ExObjList; what attaches
//! them to shapes and text is a pair of marker records in the flat record
//! sequence: an InteractiveInfo container carrying the object id, optionally
//! followed — immediately — by a TxInteractiveInfoAtom giving the covered
//! character range. The linker is a single forward scan with one-record
//! lookahead; reordering it mis-pairs markers with the wrong text.
use crate::binary::utf16le_to_string;
use crate::error::Result;
use crate::record::atoms::{read_atom, ExHyperlinkAtom, InteractiveInfoAtom, TxInteractiveInfoAtom};
use crate::record::store::{RecordId, RecordStore};
use crate::record::types::RecordType;
use crate::text::paragraph::{LoadPhase, TextBlock};
use tracing::warn;

/// One document-level hyperlink object (an ExHyperlink container).
#[derive(Debug, Clone)]
pub struct Hyperlink {
    /// Object id referenced by interactive-info records
    pub id: u32,
    /// Display title
    pub title: String,
    /// Link target
    pub url: String,
    /// The ExHyperlink container record
    pub record: RecordId,
}

/// Collect the document's hyperlink objects from its ExObjList.
pub fn collect_links(store: &RecordStore, document: RecordId) -> Result<Vec<Hyperlink>> {
    let Some(obj_list) = store.find_child(document, RecordType::ExObjList) else {
        return Ok(Vec::new());
    };

    let mut links = Vec::new();
    for &child in store.children(obj_list) {
        if store.node(child).record_type != RecordType::ExHyperlink {
            continue;
        }
        let Some(atom) = store.find_child(child, RecordType::ExHyperlinkAtom) else {
            warn!("hyperlink object without an id atom, skipping");
            continue;
        };
        let id = read_atom::<ExHyperlinkAtom>(store, atom, "ExHyperlinkAtom")?
            .id
            .get();

        // first string is the title, second the target; a lone string is both
        let strings = store.find_children(child, RecordType::CString);
        let title = match strings.first() {
            Some(&s) => utf16le_to_string(store.atom_data(s)?),
            None => String::new(),
        };
        let url = match strings.get(1) {
            Some(&s) => utf16le_to_string(store.atom_data(s)?),
            None => title.clone(),
        };

        links.push(Hyperlink {
            id,
            title,
            url,
            record: child,
        });
    }
    Ok(links)
}

/// An interactive-info record paired with its resolved hyperlink object and,
/// for text actions, the covered character range.
#[derive(Debug, Clone, Copy)]
pub struct LinkedAction {
    /// Index into the document hyperlink list
    pub link_index: usize,
    /// The InteractiveInfo container
    pub info: RecordId,
    /// Covered character range, when a text-range marker followed
    pub range: Option<(u32, u32)>,
}

/// Scan a sibling list for interactive-info records and pair each with the
/// text-range marker immediately following it, if any.
///
/// A marker is consumed only when it directly follows a resolved
/// interactive-info record; anything else leaves the cursor advancing one
/// record at a time.
pub fn scan_actions(
    store: &RecordStore,
    siblings: &[RecordId],
    links: &[Hyperlink],
) -> Result<Vec<LinkedAction>> {
    let mut actions = Vec::new();
    let mut index = 0;
    while index < siblings.len() {
        let record = siblings[index];
        if store.node(record).record_type != RecordType::InteractiveInfo {
            index += 1;
            continue;
        }

        let Some(atom) = store.find_child(record, RecordType::InteractiveInfoAtom) else {
            index += 1;
            continue;
        };
        let info = read_atom::<InteractiveInfoAtom>(store, atom, "InteractiveInfoAtom")?;
        let hyperlink_ref = info.hyperlink_ref.get();

        let Some(link_index) = links.iter().position(|l| l.id == hyperlink_ref) else {
            // dangling ids are tolerated; real-world files carry them
            warn!(hyperlink_ref, "interactive info references an unknown hyperlink object");
            index += 1;
            continue;
        };

        let next = siblings.get(index + 1).copied();
        let range = match next {
            Some(marker)
                if store.node(marker).record_type == RecordType::TxInteractiveInfoAtom =>
            {
                let marker_atom =
                    read_atom::<TxInteractiveInfoAtom>(store, marker, "TxInteractiveInfoAtom")?;
                index += 1;
                Some((marker_atom.start.get(), marker_atom.end.get()))
            }
            _ => None,
        };

        actions.push(LinkedAction {
            link_index,
            info: record,
            range,
        });
        index += 1;
    }
    Ok(actions)
}

/// Attach the text-range actions found in a text container's sibling run to
/// the runs of its paragraph model.
pub fn apply_text_links(
    store: &RecordStore,
    block: &mut TextBlock,
    siblings: &[RecordId],
    links: &[Hyperlink],
) -> Result<()> {
    for action in scan_actions(store, siblings, links)? {
        if let Some((start, end)) = action.range {
            block.apply_hyperlink(LoadPhase::Init, links[action.link_index].id, start, end);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::decode::testutil::frame;
    use crate::record::decode::{decode_stream, DecodeOptions};
    use crate::text::decode::decode_text_blocks;

    fn cstring(instance: u16, text: &str) -> Vec<u8> {
        frame(0, instance, 4026, &crate::binary::string_to_utf16le(text))
    }

    fn ex_hyperlink(id: u32, title: &str, url: &str) -> Vec<u8> {
        let mut payload = frame(0, 0, 4051, &id.to_le_bytes());
        payload.extend_from_slice(&cstring(0, title));
        payload.extend_from_slice(&cstring(1, url));
        frame(0x0F, 0, 4055, &payload)
    }

    fn document_with_links(links: &[Vec<u8>]) -> Vec<u8> {
        let mut obj_list_payload = frame(0, 0, 1034, &1u32.to_le_bytes());
        for link in links {
            obj_list_payload.extend_from_slice(link);
        }
        let obj_list = frame(0x0F, 0, 1033, &obj_list_payload);
        frame(0x0F, 0, 1000, &obj_list)
    }

    fn interactive_info(hyperlink_ref: u32) -> Vec<u8> {
        let atom = InteractiveInfoAtom::url_link(hyperlink_ref);
        let atom_record = frame(0, 0, 4083, zerocopy::IntoBytes::as_bytes(&atom));
        frame(0x0F, 0, 4082, &atom_record)
    }

    fn range_marker(start: u32, end: u32) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&start.to_le_bytes());
        payload.extend_from_slice(&end.to_le_bytes());
        frame(0, 0, 4063, &payload)
    }

    fn decode(data: &[u8]) -> (RecordStore, Vec<RecordId>) {
        let mut store = RecordStore::new();
        let roots = decode_stream(&mut store, data, &DecodeOptions::default()).unwrap();
        (store, roots)
    }

    #[test]
    fn test_collect_links() {
        let data = document_with_links(&[
            ex_hyperlink(1, "Example", "https://example.com"),
            ex_hyperlink(2, "Docs", "https://docs.example.com"),
        ]);
        let (store, roots) = decode(&data);
        let links = collect_links(&store, roots[0]).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].id, 1);
        assert_eq!(links[0].title, "Example");
        assert_eq!(links[0].url, "https://example.com");
        assert_eq!(links[1].id, 2);
    }

    #[test]
    fn test_scan_pairs_marker_with_preceding_info() {
        let mut payload = interactive_info(1);
        payload.extend_from_slice(&range_marker(0, 5));
        payload.extend_from_slice(&interactive_info(2));
        let slwt = frame(0x0F, 0, 4080, &payload);
        let (store, roots) = decode(&slwt);

        let links = vec![
            Hyperlink {
                id: 1,
                title: String::new(),
                url: String::new(),
                record: roots[0],
            },
            Hyperlink {
                id: 2,
                title: String::new(),
                url: String::new(),
                record: roots[0],
            },
        ];
        let siblings = store.children(roots[0]).to_vec();
        let actions = scan_actions(&store, &siblings, &links).unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].link_index, 0);
        assert_eq!(actions[0].range, Some((0, 5)));
        // second action has no marker following it
        assert_eq!(actions[1].link_index, 1);
        assert_eq!(actions[1].range, None);
    }

    #[test]
    fn test_dangling_id_skipped_without_consuming_marker() {
        // info referencing id 9 resolves to nothing; the following marker
        // must not be eaten on its behalf
        let mut payload = interactive_info(9);
        payload.extend_from_slice(&range_marker(0, 5));
        let slwt = frame(0x0F, 0, 4080, &payload);
        let (store, roots) = decode(&slwt);
        let siblings = store.children(roots[0]).to_vec();
        let actions = scan_actions(&store, &siblings, &[]).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_text_links_land_on_runs() {
        let mut payload = frame(0, 0, 3999, &0u32.to_le_bytes());
        payload.extend_from_slice(&frame(0, 0, 4008, b"click here please"));
        payload.extend_from_slice(&interactive_info(4));
        payload.extend_from_slice(&range_marker(6, 10));
        let slwt = frame(0x0F, 0, 4080, &payload);
        let (store, roots) = decode(&slwt);

        let links = vec![Hyperlink {
            id: 4,
            title: "here".into(),
            url: "https://example.com".into(),
            record: roots[0],
        }];
        let mut blocks = decode_text_blocks(&store, roots[0]).unwrap();
        let siblings = store.children(roots[0]).to_vec();
        apply_text_links(&store, &mut blocks[0], &siblings, &links).unwrap();

        let runs = &blocks[0].paragraphs()[0].runs;
        assert_eq!(runs[1].text(), "here");
        assert_eq!(runs[1].hyperlink, Some(4));
        assert!(!blocks[0].is_dirty());
    }
}
