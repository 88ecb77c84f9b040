//! Tab-separated tuples exchanged between pipeline stages.
//!
//! Frequency shape: `term<TAB>doc<TAB>count`. Presence shape: `term<TAB>doc`.
//! Callers trim lines and drop blank ones before parsing.

use crate::{DocId, RecordError, Term};
use std::fmt;

/// One record of the frequency stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermOccurrence {
    pub term: Term,
    pub doc: DocId,
    pub count: u64,
}

/// One record of the presence stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermPresence {
    pub term: Term,
    pub doc: DocId,
}

impl TermOccurrence {
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let fields: Vec<&str> = line.split('\t').collect();
        let [term, doc, count] = fields.as_slice() else {
            return Err(RecordError::FieldCount { expected: 3, found: fields.len() });
        };
        let (term, doc) = key_fields(term, doc)?;
        let count = count
            .trim()
            .parse::<u64>()
            .map_err(|_| RecordError::InvalidCount(count.to_string()))?;
        if count == 0 {
            return Err(RecordError::ZeroCount);
        }
        Ok(Self { term, doc, count })
    }
}

impl TermPresence {
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let fields: Vec<&str> = line.split('\t').collect();
        let [term, doc] = fields.as_slice() else {
            return Err(RecordError::FieldCount { expected: 2, found: fields.len() });
        };
        let (term, doc) = key_fields(term, doc)?;
        Ok(Self { term, doc })
    }
}

fn key_fields(term: &str, doc: &str) -> Result<(Term, DocId), RecordError> {
    let (term, doc) = (term.trim(), doc.trim());
    if term.is_empty() {
        return Err(RecordError::EmptyField("term"));
    }
    if doc.is_empty() {
        return Err(RecordError::EmptyField("document"));
    }
    Ok((term.to_string(), doc.to_string()))
}

impl fmt::Display for TermOccurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.term, self.doc, self.count)
    }
}

impl fmt::Display for TermPresence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.term, self.doc)
    }
}
