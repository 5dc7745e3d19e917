//! Logical sheets: slides, notes pages, and masters.
//!
//! Sheet variants are a tagged enum rather than a type hierarchy; what a
//! sheet can do is decided by matching on its kind, which keeps every
//! dispatch exhaustive at compile time.
use crate::drawing::Shape;
use crate::record::store::RecordId;
use crate::text::paragraph::TextBlock;

/// What kind of page a sheet is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    /// A presentation slide
    Slide,
    /// A notes page
    Notes,
    /// The main slide master
    SlideMaster,
    /// A title master (a slide-typed record listed among the masters)
    TitleMaster,
}

/// The text-only record subset paired with one persisted sheet: its persist
/// atom plus the sibling records up to the next entry.
#[derive(Debug, Clone)]
pub struct SlideAtomsSet {
    /// The SlidePersistAtom record
    pub persist_atom: RecordId,
    /// Sibling records carrying this sheet's persisted text
    pub text_records: Vec<RecordId>,
}

/// One logical page of the presentation.
#[derive(Debug)]
pub struct Sheet {
    pub kind: SheetKind,
    /// Persistence id this sheet resolved through
    pub persist_id: u32,
    /// Sheet identifier from the persist atom (what cross-references use)
    pub sheet_id: i32,
    /// User-facing page number; slides only
    pub slide_number: Option<usize>,
    /// The resolved sheet container record
    pub record: RecordId,
    /// This sheet's entry in its SlideListWithText, if it had one
    pub atoms_set: Option<SlideAtomsSet>,
    /// Paragraph lists of every text container on this page. Entries from
    /// the persisted list come first; shape-owned text follows.
    pub text_blocks: Vec<TextBlock>,
    /// Shape tree of the sheet's drawing
    pub shapes: Vec<Shape>,
    /// Index into the show's notes list; slides only
    pub notes_index: Option<usize>,
    /// Sheet identifier of this sheet's master (0 = none recorded)
    pub master_id: i32,
    /// Sheet identifier notes pages link back to their slide with
    pub notes_link_id: i32,
    /// Color scheme override record, if the sheet carries one
    pub color_scheme: Option<RecordId>,
}

impl Sheet {
    /// All text on the sheet, containers separated by newlines.
    pub fn text(&self) -> String {
        self.text_blocks
            .iter()
            .map(|block| {
                block
                    .paragraphs()
                    .iter()
                    .map(|p| p.text())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[inline]
    pub fn text_blocks(&self) -> &[TextBlock] {
        &self.text_blocks
    }

    #[inline]
    pub fn text_blocks_mut(&mut self) -> &mut [TextBlock] {
        &mut self.text_blocks
    }

    #[inline]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Whether any of this sheet's text containers needs a flush.
    pub fn has_dirty_text(&self) -> bool {
        self.text_blocks.iter().any(|block| block.is_dirty())
    }
}
