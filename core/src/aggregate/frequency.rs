//! Reduce-side fold of `(term, doc, count)` records into inverted index rows.
//!
//! In [`Grouping::Sorted`] mode the input must arrive sorted by `(term, doc)`:
//! only the current group is retained, and it is flushed as soon as a
//! different key shows up. If the upstream sort is violated, the same key can
//! come back later and be flushed a second time, overwriting the first row
//! with a partial count. Regressions are counted and reported but never
//! repaired. [`Grouping::Buffered`] trades memory proportional to the number
//! of distinct keys for independence from input order.

use super::{IngestReport, LineSink};
use crate::record::TermOccurrence;
use crate::store::{DocumentLength, IndexStore, InvertedIndexRow};
use crate::{DocId, RecordError, Result, Term};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Grouping {
    /// Constant memory, requires key-sorted input.
    #[default]
    Sorted,
    /// Every key held until end of input.
    Buffered,
}

/// The group being accumulated.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RunningGroup {
    term: Term,
    doc: DocId,
    count: u64,
}

impl RunningGroup {
    fn start(rec: TermOccurrence) -> Self {
        Self { term: rec.term, doc: rec.doc, count: rec.count }
    }

    fn matches(&self, rec: &TermOccurrence) -> bool {
        self.term == rec.term && self.doc == rec.doc
    }

    fn sorts_after(&self, rec: &TermOccurrence) -> bool {
        (self.term.as_str(), self.doc.as_str()) > (rec.term.as_str(), rec.doc.as_str())
    }
}

enum State {
    Sorted(Option<RunningGroup>),
    Buffered(BTreeMap<(Term, DocId), u64>),
}

pub struct TermFrequencyAggregator<'a, S> {
    store: &'a S,
    state: State,
    doc_lengths: BTreeMap<DocId, u64>,
    report: IngestReport,
}

impl<'a, S: IndexStore> TermFrequencyAggregator<'a, S> {
    pub fn new(store: &'a S, grouping: Grouping) -> Self {
        let state = match grouping {
            Grouping::Sorted => State::Sorted(None),
            Grouping::Buffered => State::Buffered(BTreeMap::new()),
        };
        Self { store, state, doc_lengths: BTreeMap::new(), report: IngestReport::default() }
    }

    /// Fold one record into the current group, flushing the previous group
    /// on a key change.
    pub async fn push(&mut self, rec: TermOccurrence) {
        self.report.records += 1;
        let finished = match &mut self.state {
            State::Buffered(groups) => {
                let count = groups.entry((rec.term, rec.doc)).or_default();
                *count = count.saturating_add(rec.count);
                None
            }
            State::Sorted(current) => {
                if let Some(group) = current.as_mut() {
                    if group.matches(&rec) {
                        group.count = group.count.saturating_add(rec.count);
                        return;
                    }
                    if group.sorts_after(&rec) {
                        if self.report.out_of_order == 0 {
                            tracing::warn!(
                                term = %rec.term,
                                doc = %rec.doc,
                                after_term = %group.term,
                                after_doc = %group.doc,
                                "input is not sorted by (term, doc); rows for repeated keys will be split"
                            );
                        }
                        self.report.out_of_order += 1;
                    }
                }
                current.replace(RunningGroup::start(rec))
            }
        };
        if let Some(group) = finished {
            self.flush(group).await;
        }
    }

    async fn flush(&mut self, group: RunningGroup) {
        let row = InvertedIndexRow { term: group.term, doc: group.doc, freq: group.count };
        match self.store.put_posting(&row).await {
            Ok(()) => {
                self.report.rows_written += 1;
                let length = self.doc_lengths.entry(row.doc).or_default();
                *length = length.saturating_add(row.freq);
            }
            Err(e) => {
                self.report.write_failures += 1;
                tracing::error!(term = %row.term, doc = %row.doc, freq = row.freq, "failed to save term: {e}");
            }
        }
    }

    /// Flush the last group, persist one length per document and return the
    /// run's counters.
    pub async fn finish(mut self) -> Result<IngestReport> {
        match std::mem::replace(&mut self.state, State::Sorted(None)) {
            State::Sorted(current) => {
                if let Some(group) = current {
                    self.flush(group).await;
                }
            }
            State::Buffered(groups) => {
                for ((term, doc), count) in groups {
                    self.flush(RunningGroup { term, doc, count }).await;
                }
            }
        }

        tracing::info!(documents = self.doc_lengths.len(), "saving document lengths");
        for (doc, length) in std::mem::take(&mut self.doc_lengths) {
            let row = DocumentLength { doc, length };
            match self.store.put_doc_length(&row).await {
                Ok(()) => self.report.rows_written += 1,
                Err(e) => {
                    self.report.write_failures += 1;
                    tracing::error!(doc = %row.doc, length = row.length, "failed to save doc length: {e}");
                }
            }
        }
        self.store.flush().await?;
        self.report.log("index build");
        Ok(self.report)
    }
}

impl<S: IndexStore> LineSink for TermFrequencyAggregator<'_, S> {
    async fn accept_line(&mut self, line: &str) {
        self.report.lines += 1;
        match TermOccurrence::parse(line) {
            Ok(rec) => self.push(rec).await,
            Err(e) => self.report.skip(line, &e),
        }
    }

    fn reject_line(&mut self, err: RecordError) {
        self.report.lines += 1;
        self.report.skip("", &err);
    }
}
