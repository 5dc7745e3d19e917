//! Document model: sheets, the builder that derives them from resolved
//! records, and the [`SlideShow`] owner type.
pub(crate) mod builder;
pub mod sheet;
pub mod show;

pub use sheet::{Sheet, SheetKind, SlideAtomsSet};
pub use show::{SlideShow, StreamStore, CURRENT_USER_STREAM, DOCUMENT_STREAM};
