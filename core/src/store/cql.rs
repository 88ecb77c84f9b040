//! Cassandra/Scylla backend over the `scylla` driver.
//!
//! Column types are `int` for counts and `float` for the average, so the
//! tables stay compatible with keyspaces already provisioned by earlier runs
//! of the pipeline. Counts above `i32::MAX` cannot be stored and fail the row.

use super::{DocumentLength, IndexStore, InvertedIndexRow, StatisticsRow, DOC_LENGTH, INVERTED_INDEX, STATISTICS};
use crate::connector::{self, tcp_probe, Connected, Dialer, Route, StoreConfig};
use crate::{Error, Result};
use futures::StreamExt;
use scylla::prepared_statement::PreparedStatement;
use scylla::{Session, SessionBuilder};
use std::time::Duration;

const CREATE_INVERTED_INDEX: &str = "CREATE TABLE IF NOT EXISTS inverted_index (
    term text,
    doc_id text,
    freq int,
    PRIMARY KEY (term, doc_id)
)";

const CREATE_DOC_LENGTH: &str = "CREATE TABLE IF NOT EXISTS doc_length (
    doc_id text PRIMARY KEY,
    length int
)";

const CREATE_STATISTICS: &str = "CREATE TABLE IF NOT EXISTS statistics (
    term text PRIMARY KEY,
    df int,
    n int,
    avg_doc_length float
)";

const INSERT_POSTING: &str = "INSERT INTO inverted_index (term, doc_id, freq) VALUES (?, ?, ?)";
const INSERT_DOC_LENGTH: &str = "INSERT INTO doc_length (doc_id, length) VALUES (?, ?)";
const INSERT_STATISTICS: &str = "INSERT INTO statistics (term, df, n, avg_doc_length) VALUES (?, ?, ?, ?)";
const SELECT_DOC_LENGTHS: &str = "SELECT doc_id, length FROM doc_length";

/// Production [`Dialer`]: TCP probe, then a driver session.
pub struct CqlDialer;

impl Dialer for CqlDialer {
    type Session = Session;

    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> bool {
        tcp_probe(host, port, timeout).await
    }

    async fn dial(&self, host: &str, port: u16, timeout: Duration) -> std::result::Result<Session, String> {
        SessionBuilder::new()
            .known_node(format!("{host}:{port}"))
            .connection_timeout(timeout)
            .build()
            .await
            .map_err(|e| e.to_string())
    }
}

pub struct CqlStore {
    session: Session,
    host: String,
    insert_posting: PreparedStatement,
    insert_doc_length: PreparedStatement,
    insert_statistics: PreparedStatement,
}

impl CqlStore {
    /// Connect under the connector policy, then provision keyspace and tables.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let Connected { session, host, route } = connector::connect(&CqlDialer, config).await?;
        if route != Route::Preferred {
            tracing::warn!(configured = %config.host, %host, ?route, "column store reached through fallback host");
        }
        provision(&session, config).await?;
        Ok(Self {
            insert_posting: prepare(&session, INSERT_POSTING).await?,
            insert_doc_length: prepare(&session, INSERT_DOC_LENGTH).await?,
            insert_statistics: prepare(&session, INSERT_STATISTICS).await?,
            session,
            host,
        })
    }

    /// Host that served the session.
    pub fn host(&self) -> &str {
        &self.host
    }
}

async fn provision(session: &Session, config: &StoreConfig) -> Result<()> {
    let keyspace = &config.keyspace;
    let create_keyspace = format!(
        "CREATE KEYSPACE IF NOT EXISTS {keyspace} \
         WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        config.replication_factor
    );
    run_ddl(session, &create_keyspace).await?;
    session
        .use_keyspace(keyspace.as_str(), false)
        .await
        .map_err(|e| Error::Store(format!("use keyspace {keyspace}: {e}")))?;
    for ddl in [CREATE_INVERTED_INDEX, CREATE_DOC_LENGTH, CREATE_STATISTICS] {
        run_ddl(session, ddl).await?;
    }
    tracing::info!(%keyspace, "store schema ready");
    Ok(())
}

async fn run_ddl(session: &Session, statement: &str) -> Result<()> {
    session
        .query_unpaged(statement, ())
        .await
        .map(|_| ())
        .map_err(|e| Error::Store(format!("schema statement failed: {e}")))
}

async fn prepare(session: &Session, statement: &str) -> Result<PreparedStatement> {
    session
        .prepare(statement)
        .await
        .map_err(|e| Error::Store(format!("prepare {statement:?}: {e}")))
}

fn int(table: &'static str, value: u64) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::Persistence { table, reason: format!("{value} overflows int") })
}

/// Length of a `doc_length` row, or `None` for a NULL or negative value.
fn stored_length(doc: &str, length: Option<i32>) -> Option<u64> {
    let valid = length.and_then(|l| u64::try_from(l).ok());
    if valid.is_none() {
        tracing::warn!(doc, ?length, "ignoring doc_length row without a valid length");
    }
    valid
}

impl CqlStore {
    async fn write<V: scylla::serialize::row::SerializeRow>(
        &self,
        table: &'static str,
        statement: &PreparedStatement,
        values: V,
    ) -> Result<()> {
        self.session
            .execute_unpaged(statement, values)
            .await
            .map(|_| ())
            .map_err(|e| Error::Persistence { table, reason: e.to_string() })
    }
}

impl IndexStore for CqlStore {
    async fn put_posting(&self, row: &InvertedIndexRow) -> Result<()> {
        let freq = int(INVERTED_INDEX, row.freq)?;
        self.write(INVERTED_INDEX, &self.insert_posting, (row.term.as_str(), row.doc.as_str(), freq))
            .await
    }

    async fn put_doc_length(&self, row: &DocumentLength) -> Result<()> {
        let length = int(DOC_LENGTH, row.length)?;
        self.write(DOC_LENGTH, &self.insert_doc_length, (row.doc.as_str(), length)).await
    }

    async fn doc_lengths(&self) -> Result<Vec<DocumentLength>> {
        let mut pages = self
            .session
            .query_iter(SELECT_DOC_LENGTHS, ())
            .await
            .map_err(|e| Error::Store(format!("read {DOC_LENGTH}: {e}")))?
            .into_typed::<(String, Option<i32>)>();
        let mut rows = Vec::new();
        while let Some(row) = pages.next().await {
            let (doc, length) = row.map_err(|e| Error::Store(format!("read {DOC_LENGTH}: {e}")))?;
            if let Some(length) = stored_length(&doc, length) {
                rows.push(DocumentLength { doc, length });
            }
        }
        Ok(rows)
    }

    async fn put_statistics(&self, row: &StatisticsRow) -> Result<()> {
        let df = int(STATISTICS, row.document_frequency)?;
        let n = int(STATISTICS, row.total_documents)?;
        let avg = row.average_document_length as f32;
        self.write(STATISTICS, &self.insert_statistics, (row.term.as_str(), df, n, avg)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_must_fit_an_int_column() {
        assert_eq!(int(INVERTED_INDEX, 7).unwrap(), 7);
        assert_eq!(int(DOC_LENGTH, i32::MAX as u64).unwrap(), i32::MAX);
        let err = int(DOC_LENGTH, i32::MAX as u64 + 1).unwrap_err();
        assert!(matches!(err, Error::Persistence { table: DOC_LENGTH, .. }));
    }

    #[test]
    fn null_or_negative_lengths_are_not_documents() {
        assert_eq!(stored_length("doc1", Some(12)), Some(12));
        assert_eq!(stored_length("doc1", Some(0)), Some(0));
        assert_eq!(stored_length("doc1", None), None);
        assert_eq!(stored_length("doc1", Some(-3)), None);
    }
}
