//! Record layer: typed binary nodes, the document arena, and the
//! decode/encode pair that maps between raw stream bytes and record trees.
pub mod atoms;
pub mod decode;
pub mod encode;
pub mod store;
pub mod types;

pub use decode::{decode_stream, DecodeOptions, DEFAULT_MAX_RECORD_LEN, HEADER_SIZE};
pub use encode::{encode_record, encode_stream, encoded_len};
pub use store::{RecordId, RecordNode, RecordPayload, RecordStore};
pub use types::{is_container, RecordType};
