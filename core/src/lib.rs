//! Streaming construction of a term-based inverted index and corpus
//! statistics from the sorted output of a map/reduce shuffle.
//!
//! Map side: [`tokenizer`] and [`aggregate::presence`] turn document text into
//! tab-separated tuples. Reduce side: [`aggregate::frequency`] and
//! [`aggregate::stats`] fold key-sorted tuples into rows persisted through an
//! [`store::IndexStore`].

pub mod aggregate;
pub mod connector;
pub mod error;
pub mod identity;
pub mod record;
pub mod store;
pub mod tokenizer;

pub use error::{Error, RecordError, Result};

/// Normalized (lower-cased) word.
pub type Term = String;
/// Logical document identifier, derived from the input file name.
pub type DocId = String;
