use thiserror::Error;

use crate::object::ObjectId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type returned by every fallible operation in the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("xref error: {0}")]
    Xref(#[from] XrefError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("expected {expected} but found {found}")]
    TypeMismatch { expected: &'static str, found: &'static str },

    #[error("dictionary has no entry {0:?}")]
    DictKeyNotFound(Vec<u8>),

    #[error("reference cycle detected resolving object {0:?}")]
    ReferenceCycle(ObjectId),

    #[error("overwrite of existing file declined by caller")]
    OverwriteDeclined,
}

/// Structural failures surfaced while discovering the document's xref chain.
#[derive(Debug, Error)]
pub enum XrefError {
    #[error("could not locate %PDF- header")]
    MissingHeader,

    #[error("could not locate %%EOF marker")]
    MissingEof,

    #[error("could not locate startxref keyword, or its offset is invalid")]
    Start,

    #[error("Prev offset in trailer is out of range")]
    PrevStart,

    #[error("XRefStm offset in trailer is out of range")]
    StreamStart,

    #[error("xref table size entry is inconsistent with parsed entries")]
    InvalidXref,

    #[error("W array in cross-reference stream must have exactly 3 entries")]
    InvalidWidths,
}

/// Failures raised by the object parser. Most malformed input degrades to
/// `Object::Null` instead of raising one of these; only the envelope
/// mismatches below are treated as fatal per spec.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("stream was not terminated by 'endstream'")]
    UnterminatedStream,

    #[error("object envelope mismatch: expected '{expected} {generation} obj' at offset {offset}")]
    ObjectEnvelopeMismatch {
        expected: u32,
        generation: u16,
        offset: usize,
    },

    #[error("expected keyword '{expected}' but found something else")]
    ExpectedKeyword { expected: &'static str },

    #[error("stream dictionary is missing a numeric /Length entry")]
    MissingStreamLength,
}

/// Corruption detected while decoding a stream through a filter chain.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("corrupt stream data for filter {filter}: {reason}")]
    CorruptStream { filter: &'static str, reason: &'static str },

    #[error("invalid LZW code {code} (dictionary size {dict_size})")]
    InvalidLzwCode { code: u16, dict_size: u16 },
}
