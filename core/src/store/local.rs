//! Embedded store backed by `sled`, one tree per logical table.
//!
//! Values are `bincode`-encoded. Keys of the inverted index are
//! `term<TAB>doc`; the tab never occurs inside a field since it is the
//! pipeline's field separator.

use super::{DocumentLength, IndexStore, InvertedIndexRow, StatisticsRow, DOC_LENGTH, INVERTED_INDEX, STATISTICS};
use crate::{Error, Result};
use std::path::Path;

#[derive(Clone)]
pub struct LocalStore {
    db: sled::Db,
    postings: sled::Tree,
    lengths: sled::Tree,
    stats: sled::Tree,
}

impl LocalStore {
    /// Open or create a store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "opened local store");
        Self::with_db(db)
    }

    /// Store that lives only as long as the process.
    pub fn temporary() -> Result<Self> {
        Self::with_db(sled::Config::new().temporary(true).open()?)
    }

    // Opening a tree creates it if absent.
    fn with_db(db: sled::Db) -> Result<Self> {
        Ok(Self {
            postings: db.open_tree(INVERTED_INDEX)?,
            lengths: db.open_tree(DOC_LENGTH)?,
            stats: db.open_tree(STATISTICS)?,
            db,
        })
    }

    pub fn posting(&self, term: &str, doc: &str) -> Result<Option<u64>> {
        decode(self.postings.get(posting_key(term, doc))?)
    }

    /// Number of distinct (term, doc) rows.
    pub fn posting_count(&self) -> usize {
        self.postings.len()
    }

    pub fn doc_length(&self, doc: &str) -> Result<Option<u64>> {
        decode(self.lengths.get(doc)?)
    }

    pub fn statistics(&self, term: &str) -> Result<Option<StatisticsRow>> {
        decode(self.stats.get(term)?)
    }

    pub fn all_statistics(&self) -> Result<Vec<StatisticsRow>> {
        self.stats
            .iter()
            .values()
            .map(|v| -> Result<StatisticsRow> { Ok(bincode::deserialize(&v?)?) })
            .collect()
    }
}

fn posting_key(term: &str, doc: &str) -> String {
    format!("{term}\t{doc}")
}

fn decode<T: serde::de::DeserializeOwned>(value: Option<sled::IVec>) -> Result<Option<T>> {
    value.map(|v| bincode::deserialize(&v)).transpose().map_err(Error::from)
}

fn write_failed(table: &'static str) -> impl FnOnce(Error) -> Error {
    move |e| Error::Persistence { table, reason: e.to_string() }
}

fn insert<T: serde::Serialize>(tree: &sled::Tree, key: &str, value: &T) -> Result<()> {
    tree.insert(key, bincode::serialize(value)?)?;
    Ok(())
}

impl IndexStore for LocalStore {
    async fn put_posting(&self, row: &InvertedIndexRow) -> Result<()> {
        insert(&self.postings, &posting_key(&row.term, &row.doc), &row.freq)
            .map_err(write_failed(INVERTED_INDEX))
    }

    async fn put_doc_length(&self, row: &DocumentLength) -> Result<()> {
        insert(&self.lengths, &row.doc, &row.length).map_err(write_failed(DOC_LENGTH))
    }

    async fn doc_lengths(&self) -> Result<Vec<DocumentLength>> {
        let mut rows = Vec::with_capacity(self.lengths.len());
        for entry in self.lengths.iter() {
            let (key, value) = entry?;
            rows.push(DocumentLength {
                doc: String::from_utf8_lossy(&key).into_owned(),
                length: bincode::deserialize(&value)?,
            });
        }
        Ok(rows)
    }

    async fn put_statistics(&self, row: &StatisticsRow) -> Result<()> {
        insert(&self.stats, &row.term, row).map_err(write_failed(STATISTICS))
    }

    async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}
