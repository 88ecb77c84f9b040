//! Map-side deduplication of `(term, doc)` pairs.
//!
//! Unlike the reduce-side stages this one is not a streaming fold: it keeps
//! every word already emitted for the current document, so memory grows with
//! the document's vocabulary. The set is reset only when the document
//! identity changes. When the pipeline does not report an identity every shard
//! shares the `unknown_doc` sentinel, and distinct documents are merged.

use crate::record::TermPresence;
use crate::tokenizer::unique_terms;
use crate::{DocId, Term};
use std::collections::HashSet;

pub struct DocumentPresenceAggregator {
    doc: DocId,
    seen: HashSet<Term>,
}

impl DocumentPresenceAggregator {
    pub fn new(doc: DocId) -> Self {
        Self { doc, seen: HashSet::new() }
    }

    /// Number of distinct words emitted for the current document.
    pub fn vocabulary(&self) -> usize {
        self.seen.len()
    }

    /// Switch to another document, forgetting the words seen so far.
    pub fn set_document(&mut self, doc: DocId) {
        if doc != self.doc {
            tracing::debug!(from = %self.doc, to = %doc, vocabulary = self.seen.len(), "document changed");
            self.doc = doc;
            self.seen.clear();
        }
    }

    /// Presence records for the words of `line` not yet emitted for this
    /// document, in sorted term order.
    pub fn process_line(&mut self, line: &str) -> Vec<TermPresence> {
        unique_terms(line)
            .into_iter()
            .filter(|term| self.seen.insert(term.clone()))
            .map(|term| TermPresence { term, doc: self.doc.clone() })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(records: Vec<TermPresence>) -> Vec<String> {
        records.into_iter().map(|r| r.term).collect()
    }

    #[test]
    fn emits_each_word_once_per_document() {
        let mut agg = DocumentPresenceAggregator::new("doc1".into());
        assert_eq!(terms(agg.process_line("The cat saw the cat")), vec!["cat", "saw", "the"]);
        assert_eq!(terms(agg.process_line("the dog")), vec!["dog"]);
        assert!(agg.process_line("Dog CAT").is_empty());
        assert_eq!(agg.vocabulary(), 4);
    }

    #[test]
    fn records_carry_document_identity() {
        let mut agg = DocumentPresenceAggregator::new("doc1".into());
        let out = agg.process_line("cat");
        assert_eq!(out, vec![TermPresence { term: "cat".into(), doc: "doc1".into() }]);
        assert_eq!(out[0].to_string(), "cat\tdoc1");
    }

    #[test]
    fn document_change_resets_seen_words() {
        let mut agg = DocumentPresenceAggregator::new("doc1".into());
        agg.process_line("cat");
        agg.set_document("doc1".into());
        assert!(agg.process_line("cat").is_empty());
        agg.set_document("doc2".into());
        assert_eq!(agg.process_line("cat"), vec![TermPresence { term: "cat".into(), doc: "doc2".into() }]);
    }
}
