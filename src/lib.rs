//! Longan - a lossless codec for the legacy PowerPoint (.ppt) binary
//! presentation stream.
//!
//! The legacy format stores a presentation as a sequence of variable-length,
//! type-tagged, nested binary records inside an OLE2 compound file. This
//! crate decodes that record stream into a typed tree, resolves the
//! persistence indirection that decides which record version of each sheet
//! is current, and exposes a structured model — slides, notes, masters,
//! shapes, text paragraphs and runs, hyperlinks — that can be edited and
//! written back losslessly: untouched data reproduces its original bytes.
//!
//! The compound-file container itself is a collaborator, not part of this
//! crate: callers hand over the `PowerPoint Document` stream bytes (directly
//! or through the [`StreamStore`] trait) and receive replacement bytes back.
//!
//! # Example
//!
//! ```no_run
//! use longan::SlideShow;
//!
//! # fn main() -> longan::Result<()> {
//! let stream = std::fs::read("presentation-document.bin")?;
//! let mut show = SlideShow::load(stream)?;
//!
//! for slide in show.slides() {
//!     println!("slide {:?}: {}", slide.slide_number, slide.text());
//! }
//!
//! // edit a text container and write the stream back
//! let phase = show.phase();
//! show.slides_mut()[0].text_blocks_mut()[0].set_text(phase, "New title");
//! let bytes = show.write()?;
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```
pub mod binary;
pub mod current_user;
pub mod drawing;
pub mod error;
pub mod hyperlink;
pub mod model;
pub mod persist;
pub mod record;
pub mod text;

pub use current_user::CurrentUser;
pub use error::{Error, Result};
pub use hyperlink::Hyperlink;
pub use model::{Sheet, SheetKind, SlideShow, StreamStore, CURRENT_USER_STREAM, DOCUMENT_STREAM};
pub use persist::{PersistBlock, PersistDirectory};
pub use record::{DecodeOptions, RecordId, RecordStore, RecordType};
pub use text::{LoadPhase, StyleCollection, TextBlock, TextParagraph, TextRun};
