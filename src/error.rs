//! Crate-wide error types.
//!
//! Fatal conditions (truncated or oversized records, missing mandatory
//! structure, encode-pipeline invariant violations) surface as `Error`.
//! Recoverable gaps — an unresolvable sheet entry, a dangling hyperlink id,
//! a missing master — are logged and skipped, never raised.
use thiserror::Error;

/// Main error type for longan operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error from the container collaborator.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A named container stream the caller asked for does not exist.
    #[error("stream not found: {0}")]
    StreamNotFound(String),

    /// A record header or payload extends past the end of the stream.
    #[error("truncated record at offset {offset}: need {needed} bytes, {remaining} remain")]
    TruncatedRecord {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// A record claims a payload larger than the configured ceiling.
    /// Raised before any allocation is attempted.
    #[error("record at offset {offset} claims {claimed} bytes, over the {limit} byte ceiling")]
    RecordTooLong {
        offset: usize,
        claimed: u32,
        limit: u32,
    },

    /// A mandatory structural record is absent after persistence resolution.
    #[error("required {0} record missing from stream")]
    MissingRecord(&'static str),

    /// Structural corruption that cannot be recovered from.
    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    /// An atom payload is too short or malformed for its declared type.
    #[error("malformed {atom} atom: {reason}")]
    MalformedAtom {
        atom: &'static str,
        reason: String,
    },

    /// A bug in the encode pipeline, e.g. style spans that do not sum to the
    /// expected character count. Raised rather than writing corrupt output.
    #[error("encode invariant violated: {0}")]
    InvariantViolation(String),
}

/// Result type for longan operations.
pub type Result<T> = std::result::Result<T, Error>;
