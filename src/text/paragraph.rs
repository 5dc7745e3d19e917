//! The editable paragraph/run model over one text container.
//!
//! A text container groups a header atom, a text atom (narrow or wide), and
//! the style records that cover it. Decoded containers become a
//! [`TextBlock`]: ordered paragraphs of ordered runs, each with value-type
//! style collections. Mutations mark the block dirty; nothing touches the
//! underlying records until the block is flushed at save time.
use crate::binary::utf16_len;
use crate::record::store::RecordId;
use crate::text::style::StyleCollection;

/// Paragraph separator used inside raw text blocks.
pub const SEPARATOR: char = '\r';

/// Load phase, threaded explicitly through every mutation entry point.
///
/// Edits made while the model is being constructed from records must not
/// mark containers dirty; only post-load edits are tracked for write-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Initial construction from decoded records
    Init,
    /// Document fully loaded; edits are user edits
    Loaded,
}

/// A run of identically-styled text within a paragraph.
#[derive(Debug, Clone)]
pub struct TextRun {
    text: String,
    /// Character-level style (value type, clone before sharing)
    pub style: StyleCollection,
    /// Id of the document-level hyperlink object covering this run
    pub hyperlink: Option<u32>,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: StyleCollection::character(),
            hyperlink: None,
        }
    }

    pub fn with_style(text: impl Into<String>, style: StyleCollection) -> Self {
        Self {
            text: text.into(),
            style,
            hyperlink: None,
        }
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in UTF-16 units, the unit style tables and link ranges count.
    #[inline]
    pub fn len(&self) -> usize {
        utf16_len(&self.text)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub(crate) fn set_text_raw(&mut self, text: String) {
        self.text = text;
    }

    pub(crate) fn push_str_raw(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Split this run after `at` UTF-16 units, returning the tail run with a
    /// cloned style and the same hyperlink.
    pub(crate) fn split_off(&mut self, at: usize) -> TextRun {
        let byte_at = byte_index_for_utf16(&self.text, at);
        let tail = self.text.split_off(byte_at);
        TextRun {
            text: tail,
            style: self.style.clone(),
            hyperlink: self.hyperlink,
        }
    }
}

/// Byte index corresponding to `units` UTF-16 units from the start, clamped
/// to a character boundary.
pub(crate) fn byte_index_for_utf16(text: &str, units: usize) -> usize {
    if units == 0 {
        return 0;
    }
    let mut counted = 0;
    for (byte_index, ch) in text.char_indices() {
        if counted >= units {
            return byte_index;
        }
        counted += ch.len_utf16();
    }
    text.len()
}

/// A paragraph: ordered runs plus paragraph-level styling.
#[derive(Debug, Clone)]
pub struct TextParagraph {
    pub runs: Vec<TextRun>,
    /// Paragraph-level style (value type, clone before sharing)
    pub style: StyleCollection,
    /// Indent level from the indent table (also mirrored in the style entry)
    pub indent_level: u16,
    /// Ruler atom governing this paragraph's tab stops, if any
    pub ruler: Option<RecordId>,
}

impl TextParagraph {
    pub fn new() -> Self {
        Self {
            runs: vec![TextRun::new("")],
            style: StyleCollection::paragraph(),
            indent_level: 0,
            ruler: None,
        }
    }

    pub fn from_run(run: TextRun) -> Self {
        Self {
            runs: vec![run],
            style: StyleCollection::paragraph(),
            indent_level: 0,
            ruler: None,
        }
    }

    /// Concatenated run text, separator included if present.
    pub fn raw_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Length in UTF-16 units, separator included.
    pub fn raw_len(&self) -> usize {
        self.runs.iter().map(|r| r.len()).sum()
    }

    /// Paragraph text without the trailing separator.
    pub fn text(&self) -> String {
        let mut text = self.raw_text();
        if text.ends_with(SEPARATOR) {
            text.pop();
        }
        text
    }

    pub fn ends_with_separator(&self) -> bool {
        self.runs
            .last()
            .is_some_and(|run| run.text.ends_with(SEPARATOR))
    }

    /// Append the separator to the last run if missing.
    pub(crate) fn ensure_separator(&mut self) {
        if !self.ends_with_separator() {
            if let Some(last) = self.runs.last_mut() {
                last.text.push(SEPARATOR);
            } else {
                self.runs.push(TextRun::new(SEPARATOR.to_string()));
            }
        }
    }
}

impl Default for TextParagraph {
    fn default() -> Self {
        Self::new()
    }
}

/// One text container bound to its records: the editable paragraph list
/// plus handles to the atoms it was decoded from.
#[derive(Debug, Clone)]
pub struct TextBlock {
    /// TextHeaderAtom of this container
    pub(crate) header: RecordId,
    /// Container owning the header and its sibling records
    pub(crate) parent: RecordId,
    pub(crate) text_atom: Option<RecordId>,
    pub(crate) style_atom: Option<RecordId>,
    pub(crate) indent_atom: Option<RecordId>,
    /// Placeholder kind from the header atom (title, body, notes…)
    pub text_type: u32,
    paragraphs: Vec<TextParagraph>,
    dirty: bool,
}

impl TextBlock {
    pub(crate) fn new(header: RecordId, parent: RecordId, text_type: u32) -> Self {
        Self {
            header,
            parent,
            text_atom: None,
            style_atom: None,
            indent_atom: None,
            text_type,
            paragraphs: Vec::new(),
            dirty: false,
        }
    }

    #[inline]
    pub fn header_record(&self) -> RecordId {
        self.header
    }

    #[inline]
    pub fn paragraphs(&self) -> &[TextParagraph] {
        &self.paragraphs
    }

    /// Mutable paragraph access. Under `LoadPhase::Loaded` the block is
    /// conservatively marked dirty.
    pub fn paragraphs_mut(&mut self, phase: LoadPhase) -> &mut Vec<TextParagraph> {
        if phase == LoadPhase::Loaded {
            self.dirty = true;
        }
        &mut self.paragraphs
    }

    pub(crate) fn set_paragraphs(&mut self, paragraphs: Vec<TextParagraph>) {
        self.paragraphs = paragraphs;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Flattened raw text of all paragraphs.
    pub fn raw_text(&self) -> String {
        self.paragraphs.iter().map(|p| p.raw_text()).collect()
    }

    /// Flattened length in UTF-16 units.
    pub fn raw_len(&self) -> usize {
        self.paragraphs.iter().map(|p| p.raw_len()).sum()
    }

    /// Replace the whole container text. Paragraph boundaries come from
    /// separators in `text`; existing first-paragraph/first-run styling is
    /// cloned onto every new paragraph and run.
    pub fn set_text(&mut self, phase: LoadPhase, text: &str) {
        let paragraph_style = self
            .paragraphs
            .first()
            .map(|p| p.style.clone())
            .unwrap_or_else(StyleCollection::paragraph);
        let run_style = self
            .paragraphs
            .first()
            .and_then(|p| p.runs.first())
            .map(|r| r.style.clone())
            .unwrap_or_else(StyleCollection::character);

        let mut paragraphs: Vec<TextParagraph> = split_paragraphs(text)
            .into_iter()
            .map(|piece| {
                let mut paragraph =
                    TextParagraph::from_run(TextRun::with_style(piece, run_style.clone()));
                paragraph.style = paragraph_style.clone();
                paragraph
            })
            .collect();
        if paragraphs.is_empty() {
            paragraphs.push(TextParagraph::new());
        }
        self.paragraphs = paragraphs;
        if phase == LoadPhase::Loaded {
            self.dirty = true;
        }
    }

    /// Append text to the last paragraph. An existing single empty run is
    /// reused rather than a new run being allocated next to it.
    pub fn append_text(&mut self, phase: LoadPhase, text: &str) {
        if self.paragraphs.is_empty() {
            self.paragraphs.push(TextParagraph::new());
        }
        let Some(paragraph) = self.paragraphs.last_mut() else {
            return;
        };
        let run_count = paragraph.runs.len();
        match paragraph.runs.last_mut() {
            Some(last) if run_count == 1 && last.is_empty() => {
                last.push_str_raw(text);
            }
            Some(last) => {
                let style = last.style.clone();
                paragraph.runs.push(TextRun::with_style(text, style));
            }
            None => paragraph.runs.push(TextRun::new(text)),
        }
        if phase == LoadPhase::Loaded {
            self.dirty = true;
        }
    }

    /// Attach a hyperlink to the character range `start..end` (UTF-16 units
    /// over the flattened text), splitting runs at the range boundaries so
    /// link edges always coincide with run edges.
    pub fn apply_hyperlink(&mut self, phase: LoadPhase, link_id: u32, start: u32, end: u32) {
        let (start, end) = (start as usize, end as usize);
        let mut position = 0;
        for paragraph in &mut self.paragraphs {
            let mut run_index = 0;
            while run_index < paragraph.runs.len() {
                let run_len = paragraph.runs[run_index].len();
                let run_start = position;
                let run_end = position + run_len;

                if run_end <= start || run_start >= end || run_len == 0 {
                    position = run_end;
                    run_index += 1;
                    continue;
                }

                // split off the uncovered head
                if run_start < start {
                    let tail = paragraph.runs[run_index].split_off(start - run_start);
                    paragraph.runs.insert(run_index + 1, tail);
                    position = start;
                    run_index += 1;
                    continue;
                }

                // split off the uncovered tail
                if run_end > end {
                    let tail = paragraph.runs[run_index].split_off(end - run_start);
                    paragraph.runs.insert(run_index + 1, tail);
                    paragraph.runs[run_index + 1].hyperlink = None;
                }

                paragraph.runs[run_index].hyperlink = Some(link_id);
                position = run_start + paragraph.runs[run_index].len();
                run_index += 1;
            }
        }
        if phase == LoadPhase::Loaded {
            self.dirty = true;
        }
    }
}

/// Split raw text into per-paragraph pieces, each keeping its trailing
/// separator. Empty text yields one empty piece.
pub(crate) fn split_paragraphs(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    text.split_inclusive(SEPARATOR).map(str::to_owned).collect()
}
