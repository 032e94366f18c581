//! Object-level PDF reading, mutation, and rewriting.
//!
//! This crate works one layer below a page-layout or content-stream API: it
//! gives you the tokenizer, the object parser, a lazily-resolving
//! cross-reference table, and the stream filter pipeline, wired together by
//! [`Document`]. Building a viewer or a content-stream interpreter on top is
//! out of scope here — see the crate's `README.md` for what sits above this
//! layer in a full toolchain.

pub mod byte_view;
pub mod dictionary;
pub mod document;
pub mod error;
pub mod filter;
pub mod object;
pub mod parser;
pub mod reader;
pub mod tokenizer;
pub mod xref;

pub use byte_view::ByteView;
pub use dictionary::Dictionary;
pub use document::{Confirm, Document, NeverConfirm, StdinConfirm, Trailer};
pub use error::{Error, FilterError, ParseError, Result, XrefError};
pub use object::{Object, ObjectId, Stream, StringFormat};
