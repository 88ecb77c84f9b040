//! Reduce-side document frequencies and corpus summary.

use super::{IngestReport, LineSink};
use crate::record::TermPresence;
use crate::store::{DocumentLength, IndexStore, StatisticsRow};
use crate::{DocId, RecordError, Result, Term};
use std::collections::{BTreeMap, BTreeSet};

/// Corpus-wide figures derived from the persisted document lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorpusSummary {
    pub total_documents: u64,
    pub average_document_length: f64,
}

impl CorpusSummary {
    /// Average over `lengths`; an empty corpus averages to 0.
    pub fn from_lengths(lengths: &[DocumentLength]) -> Self {
        let total_documents = lengths.len() as u64;
        let total_length: u128 = lengths.iter().map(|l| u128::from(l.length)).sum();
        let average_document_length = if total_documents == 0 {
            0.0
        } else {
            total_length as f64 / total_documents as f64
        };
        Self { total_documents, average_document_length }
    }
}

pub struct CorpusStatsAggregator<'a, S> {
    store: &'a S,
    term_documents: BTreeMap<Term, BTreeSet<DocId>>,
    documents: BTreeSet<DocId>,
    report: IngestReport,
}

impl<'a, S: IndexStore> CorpusStatsAggregator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            term_documents: BTreeMap::new(),
            documents: BTreeSet::new(),
            report: IngestReport::default(),
        }
    }

    /// Distinct terms accumulated so far.
    pub fn terms(&self) -> usize {
        self.term_documents.len()
    }

    pub fn push(&mut self, rec: TermPresence) {
        self.report.records += 1;
        self.documents.insert(rec.doc.clone());
        self.term_documents.entry(rec.term).or_default().insert(rec.doc);
    }

    /// Read back document lengths, then persist one statistics row per term.
    ///
    /// Failing to read the lengths is fatal; a failed row write is logged and
    /// the remaining terms are still written.
    pub async fn finish(mut self) -> Result<(CorpusSummary, IngestReport)> {
        tracing::info!("calculating document statistics");
        let lengths = self.store.doc_lengths().await?;
        let summary = CorpusSummary::from_lengths(&lengths);
        tracing::info!(
            documents = summary.total_documents,
            average_length = format_args!("{:.2}", summary.average_document_length),
            "processed document lengths"
        );

        let known: BTreeSet<&str> = lengths.iter().map(|l| l.doc.as_str()).collect();
        let missing = self.documents.iter().filter(|d| !known.contains(d.as_str())).count();
        if missing > 0 {
            tracing::warn!(
                missing,
                seen = self.documents.len(),
                "documents in the presence stream have no persisted length"
            );
        }

        tracing::info!(terms = self.term_documents.len(), "saving term statistics");
        for (term, docs) in std::mem::take(&mut self.term_documents) {
            let row = StatisticsRow {
                term,
                document_frequency: docs.len() as u64,
                total_documents: summary.total_documents,
                average_document_length: summary.average_document_length,
            };
            match self.store.put_statistics(&row).await {
                Ok(()) => self.report.rows_written += 1,
                Err(e) => {
                    self.report.write_failures += 1;
                    tracing::error!(term = %row.term, "failed to save statistics: {e}");
                }
            }
        }
        self.store.flush().await?;
        self.report.log("statistics");
        Ok((summary, self.report))
    }
}

impl<S: IndexStore> LineSink for CorpusStatsAggregator<'_, S> {
    async fn accept_line(&mut self, line: &str) {
        self.report.lines += 1;
        match TermPresence::parse(line) {
            Ok(rec) => self.push(rec),
            Err(e) => self.report.skip(line, &e),
        }
    }

    fn reject_line(&mut self, err: RecordError) {
        self.report.lines += 1;
        self.report.skip("", &err);
    }
}
