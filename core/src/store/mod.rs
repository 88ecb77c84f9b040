//! Persisted rows and the storage seam the aggregators write through.

pub mod cql;
pub mod local;

pub use cql::CqlStore;
pub use local::LocalStore;

use crate::{DocId, Result, Term};
use serde::{Deserialize, Serialize};

pub const INVERTED_INDEX: &str = "inverted_index";
pub const DOC_LENGTH: &str = "doc_length";
pub const STATISTICS: &str = "statistics";

/// `term` appears `freq` times in `doc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndexRow {
    pub term: Term,
    pub doc: DocId,
    pub freq: u64,
}

/// Total token count of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLength {
    pub doc: DocId,
    pub length: u64,
}

/// Per-term summary consumed by query-time scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRow {
    pub term: Term,
    pub document_frequency: u64,
    pub total_documents: u64,
    pub average_document_length: f64,
}

/// Write-side view of the column store.
///
/// Each call is one independent, non-transactional row write. Callers decide
/// whether a failed write is fatal.
#[allow(async_fn_in_trait)]
pub trait IndexStore {
    async fn put_posting(&self, row: &InvertedIndexRow) -> Result<()>;

    async fn put_doc_length(&self, row: &DocumentLength) -> Result<()>;

    /// Every persisted document length, in no particular order.
    async fn doc_lengths(&self) -> Result<Vec<DocumentLength>>;

    async fn put_statistics(&self, row: &StatisticsRow) -> Result<()>;

    /// Make previous writes durable. Backends that write through need not override.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
