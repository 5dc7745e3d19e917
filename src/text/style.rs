//! Run-length style tables (the StyleTextPropAtom payload) and the
//! indent-level table (MasterTextPropAtom payload).
//!
//! A style table is two back-to-back sequences of entries: paragraph-level
//! first, then character-level. Each entry is a covered-character count, an
//! indent level (paragraph entries only), a property bitmask, and one value
//! per set bit in table order. The split between the two sequences is not
//! self-describing: it falls where the paragraph counts have covered the
//! container's text length plus the trailing terminator.
use crate::error::{Error, Result};
use bitflags::bitflags;
use smallvec::SmallVec;

/// Whether a collection styles paragraphs or characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleKind {
    Paragraph,
    Character,
}

/// One property of a style collection: name, wire size, mask bit, value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextProp {
    pub name: &'static str,
    pub size: u8,
    pub mask: u32,
    pub value: i32,
}

/// Paragraph property definitions, in wire order.
pub const PARAGRAPH_PROPS: &[(&str, u8, u32)] = &[
    ("alignment", 2, 0x0008),
    ("linespacing", 2, 0x1000),
    ("spacebefore", 2, 0x2000),
    ("spaceafter", 2, 0x4000),
    ("text.offset", 2, 0x0100),
    ("bullet.offset", 2, 0x0400),
    ("defaultTabSize", 2, 0x8000),
    ("textDirection", 2, 0x200000),
];

/// Character property definitions, in wire order.
pub const CHARACTER_PROPS: &[(&str, u8, u32)] = &[
    ("char.flags", 2, 0x0001),
    ("font.index", 2, 0x10000),
    ("asian.font.index", 2, 0x200000),
    ("ansi.font.index", 2, 0x400000),
    ("symbol.font.index", 2, 0x800000),
    ("font.size", 2, 0x20000),
    ("font.color", 4, 0x40000),
    ("superscript", 2, 0x80000),
];

bitflags! {
    /// Packed boolean character properties carried by the `char.flags` word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CharFlags: u16 {
        const BOLD = 0x0001;
        const ITALIC = 0x0002;
        const UNDERLINE = 0x0004;
        const SHADOW = 0x0010;
        const EMBOSSED = 0x0100;
    }
}

/// A value-type collection of style properties.
///
/// Collections are cloned before mutation wherever one styling is shared by
/// several paragraphs or runs; two collections compare equal exactly when
/// they would serialize identically, which is the fingerprint the encoder
/// collapses on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleCollection {
    kind: StyleKind,
    /// Indent level, paragraph collections only (stored in the wire entry)
    pub indent_level: u16,
    props: SmallVec<[TextProp; 4]>,
}

impl StyleCollection {
    pub fn paragraph() -> Self {
        Self {
            kind: StyleKind::Paragraph,
            indent_level: 0,
            props: SmallVec::new(),
        }
    }

    pub fn character() -> Self {
        Self {
            kind: StyleKind::Character,
            indent_level: 0,
            props: SmallVec::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> StyleKind {
        self.kind
    }

    fn table(&self) -> &'static [(&'static str, u8, u32)] {
        match self.kind {
            StyleKind::Paragraph => PARAGRAPH_PROPS,
            StyleKind::Character => CHARACTER_PROPS,
        }
    }

    /// Value of a property, if set.
    pub fn get(&self, name: &str) -> Option<i32> {
        self.props.iter().find(|p| p.name == name).map(|p| p.value)
    }

    /// Set a property value, adding it from the definition table if absent.
    pub fn set(&mut self, name: &str, value: i32) {
        if let Some(prop) = self.props.iter_mut().find(|p| p.name == name) {
            prop.value = value;
            return;
        }
        if let Some(&(name, size, mask)) = self.table().iter().find(|&&(n, _, _)| n == name) {
            self.props.push(TextProp {
                name,
                size,
                mask,
                value,
            });
        }
    }

    /// Combined bitmask of all set properties.
    pub fn mask(&self) -> u32 {
        self.props.iter().fold(0, |m, p| m | p.mask)
    }

    /// Character flag helpers (character collections).
    pub fn char_flags(&self) -> CharFlags {
        CharFlags::from_bits_truncate(self.get("char.flags").unwrap_or(0) as u16)
    }

    pub fn set_char_flag(&mut self, flag: CharFlags, on: bool) {
        let mut flags = self.char_flags();
        flags.set(flag, on);
        self.set("char.flags", flags.bits() as i32);
    }

    pub fn is_bold(&self) -> bool {
        self.char_flags().contains(CharFlags::BOLD)
    }

    pub fn is_italic(&self) -> bool {
        self.char_flags().contains(CharFlags::ITALIC)
    }

    pub fn is_underlined(&self) -> bool {
        self.char_flags().contains(CharFlags::UNDERLINE)
    }
}

/// One run-length entry: a style and the number of characters it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRun {
    pub covered: u32,
    pub style: StyleCollection,
}

fn parse_props(
    data: &[u8],
    offset: &mut usize,
    mask: u32,
    collection: &mut StyleCollection,
) -> Result<()> {
    let table = collection.table();
    for &(name, size, prop_mask) in table {
        if mask & prop_mask == 0 {
            continue;
        }
        let size = size as usize;
        if *offset + size > data.len() {
            return Err(Error::MalformedAtom {
                atom: "StyleTextPropAtom",
                reason: format!("property {name} extends past the payload"),
            });
        }
        let value = match size {
            2 => i16::from_le_bytes([data[*offset], data[*offset + 1]]) as i32,
            _ => i32::from_le_bytes([
                data[*offset],
                data[*offset + 1],
                data[*offset + 2],
                data[*offset + 3],
            ]),
        };
        collection.props.push(TextProp {
            name,
            size: size as u8,
            mask: prop_mask,
            value,
        });
        *offset += size;
    }
    Ok(())
}

/// Parse a style table. `text_len` is the raw character-block length in
/// UTF-16 units. Each sequence ends once its covered counts reach that
/// length — the final entry may overshoot by one for the trailing
/// terminator, which belongs to the same entry and consumes no extra bytes.
pub fn parse_style_atom(data: &[u8], text_len: usize) -> Result<(Vec<StyleRun>, Vec<StyleRun>)> {
    let target = (text_len as u64).max(1);
    let mut offset = 0;

    let mut paragraph_runs = Vec::new();
    let mut covered_total = 0u64;
    while covered_total < target && offset + 10 <= data.len() {
        let covered = u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]);
        offset += 4;
        let indent_level = u16::from_le_bytes([data[offset], data[offset + 1]]);
        offset += 2;
        let mask = u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]);
        offset += 4;

        let mut style = StyleCollection::paragraph();
        style.indent_level = indent_level;
        parse_props(data, &mut offset, mask, &mut style)?;
        covered_total += covered as u64;
        paragraph_runs.push(StyleRun { covered, style });
    }

    let mut character_runs = Vec::new();
    covered_total = 0;
    while covered_total < target && offset + 8 <= data.len() {
        let covered = u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]);
        offset += 4;
        let mask = u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]);
        offset += 4;

        let mut style = StyleCollection::character();
        parse_props(data, &mut offset, mask, &mut style)?;
        covered_total += covered as u64;
        character_runs.push(StyleRun { covered, style });
    }

    Ok((paragraph_runs, character_runs))
}

/// Serialize a style table: paragraph entries then character entries.
pub fn encode_style_atom(paragraph_runs: &[StyleRun], character_runs: &[StyleRun]) -> Vec<u8> {
    let mut out = Vec::new();
    for run in paragraph_runs {
        out.extend_from_slice(&run.covered.to_le_bytes());
        out.extend_from_slice(&run.style.indent_level.to_le_bytes());
        encode_entry_body(&run.style, &mut out);
    }
    for run in character_runs {
        out.extend_from_slice(&run.covered.to_le_bytes());
        encode_entry_body(&run.style, &mut out);
    }
    out
}

fn encode_entry_body(style: &StyleCollection, out: &mut Vec<u8>) {
    out.extend_from_slice(&style.mask().to_le_bytes());
    // values must follow table order regardless of set() call order
    for &(name, size, _) in style.table() {
        let Some(value) = style.get(name) else {
            continue;
        };
        match size {
            2 => out.extend_from_slice(&(value as i16).to_le_bytes()),
            _ => out.extend_from_slice(&value.to_le_bytes()),
        }
    }
}

/// One indent-table entry: covered count and indent level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndentRun {
    pub covered: u32,
    pub indent_level: u16,
}

/// Parse a MasterTextPropAtom payload.
pub fn parse_indent_atom(data: &[u8]) -> Result<Vec<IndentRun>> {
    if data.len() % 6 != 0 {
        return Err(Error::MalformedAtom {
            atom: "MasterTextPropAtom",
            reason: format!("payload length {} is not a multiple of 6", data.len()),
        });
    }
    Ok(data
        .chunks_exact(6)
        .map(|chunk| IndentRun {
            covered: u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
            indent_level: u16::from_le_bytes([chunk[4], chunk[5]]),
        })
        .collect())
}

/// Serialize a MasterTextPropAtom payload.
pub fn encode_indent_atom(runs: &[IndentRun]) -> Vec<u8> {
    let mut out = Vec::with_capacity(runs.len() * 6);
    for run in runs {
        out.extend_from_slice(&run.covered.to_le_bytes());
        out.extend_from_slice(&run.indent_level.to_le_bytes());
    }
    out
}
