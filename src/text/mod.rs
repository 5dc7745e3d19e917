//! Text pipeline: paragraph/run model, run-length style tables, and the
//! decode/flush pair that maps text containers to and from their records.
pub mod decode;
pub mod encode;
pub mod paragraph;
pub mod style;

pub use decode::{decode_text_block, decode_text_blocks, decode_text_blocks_in};
pub use encode::flush_text_block;
pub use paragraph::{LoadPhase, TextBlock, TextParagraph, TextRun, SEPARATOR};
pub use style::{CharFlags, IndentRun, StyleCollection, StyleKind, StyleRun, TextProp};
