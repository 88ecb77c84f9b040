use invidx_core::aggregate::{consume, Grouping, TermFrequencyAggregator};
use invidx_core::record::TermOccurrence;
use invidx_core::store::{DocumentLength, IndexStore, InvertedIndexRow, LocalStore, StatisticsRow};
use invidx_core::{Error, Result};
use std::collections::BTreeMap;

async fn run(store: &LocalStore, input: &str, grouping: Grouping) -> invidx_core::aggregate::IngestReport {
    let mut agg = TermFrequencyAggregator::new(store, grouping);
    consume(input.as_bytes(), &mut agg).await.unwrap();
    agg.finish().await.unwrap()
}

#[tokio::test]
async fn consecutive_records_fold_into_one_row() {
    let store = LocalStore::temporary().unwrap();
    let report = run(&store, "the\tdocA\t2\nthe\tdocA\t3\ncat\tdocA\t1\n", Grouping::Sorted).await;

    assert_eq!(store.posting("the", "docA").unwrap(), Some(5));
    assert_eq!(store.posting("cat", "docA").unwrap(), Some(1));
    assert_eq!(store.posting_count(), 2);
    assert_eq!(store.doc_length("docA").unwrap(), Some(6));
    assert_eq!(report.records, 3);
    assert_eq!(report.rows_written, 3);
}

#[tokio::test]
async fn documents_get_separate_rows_and_lengths() {
    let store = LocalStore::temporary().unwrap();
    run(&store, "the\tdocA\t1\nthe\tdocB\t4\n", Grouping::Sorted).await;

    assert_eq!(store.posting("the", "docA").unwrap(), Some(1));
    assert_eq!(store.posting("the", "docB").unwrap(), Some(4));
    assert_eq!(store.doc_length("docA").unwrap(), Some(1));
    assert_eq!(store.doc_length("docB").unwrap(), Some(4));
}

#[tokio::test]
async fn malformed_line_does_not_disturb_running_group() {
    let store = LocalStore::temporary().unwrap();
    let input = "the\tdocA\t2\nfoo\tbar\tbaz\tqux\nthe\tdocA\tlots\n\n   \nthe\tdocA\t3\n";
    let report = run(&store, input, Grouping::Sorted).await;

    assert_eq!(store.posting("the", "docA").unwrap(), Some(5));
    assert_eq!(store.posting_count(), 1);
    assert_eq!(report.lines, 4);
    assert_eq!(report.records, 2);
    assert_eq!(report.skipped.get("field_count"), Some(&1));
    assert_eq!(report.skipped.get("invalid_count"), Some(&1));
}

#[tokio::test]
async fn surrounding_whitespace_is_trimmed() {
    let store = LocalStore::temporary().unwrap();
    run(&store, "  cat\tdoc1\t2  \r\n", Grouping::Sorted).await;
    assert_eq!(store.posting("cat", "doc1").unwrap(), Some(2));
}

#[tokio::test]
async fn invalid_utf8_is_skipped() {
    let store = LocalStore::temporary().unwrap();
    let mut input = b"cat\tdoc1\t1\n".to_vec();
    input.extend_from_slice(b"\xff\xfe\tdoc1\t1\n");
    input.extend_from_slice(b"cat\tdoc1\t1\n");

    let mut agg = TermFrequencyAggregator::new(&store, Grouping::Sorted);
    consume(input.as_slice(), &mut agg).await.unwrap();
    let report = agg.finish().await.unwrap();

    assert_eq!(store.posting("cat", "doc1").unwrap(), Some(2));
    assert_eq!(report.skipped.get("encoding"), Some(&1));
}

#[tokio::test]
async fn empty_input_persists_nothing() {
    let store = LocalStore::temporary().unwrap();
    let report = run(&store, "", Grouping::Sorted).await;
    assert_eq!(store.posting_count(), 0);
    assert!(store.doc_lengths().await.unwrap().is_empty());
    assert_eq!(report.rows_written, 0);
}

/// Correctness of sorted grouping depends on key-sorted delivery: a key that
/// comes back after another key is flushed twice and the second, partial row
/// replaces the first.
#[tokio::test]
async fn unsorted_input_splits_groups_in_sorted_mode() {
    let store = LocalStore::temporary().unwrap();
    let report = run(&store, "the\tdocA\t2\ncat\tdocA\t1\nthe\tdocA\t3\n", Grouping::Sorted).await;

    assert_eq!(report.out_of_order, 1);
    assert_eq!(store.posting("the", "docA").unwrap(), Some(3));
    // The length still counts every flushed group.
    assert_eq!(store.doc_length("docA").unwrap(), Some(6));
}

#[tokio::test]
async fn buffered_mode_tolerates_unsorted_input() {
    let store = LocalStore::temporary().unwrap();
    let report = run(&store, "the\tdocA\t2\ncat\tdocA\t1\nthe\tdocA\t3\n", Grouping::Buffered).await;

    assert_eq!(report.out_of_order, 0);
    assert_eq!(store.posting("the", "docA").unwrap(), Some(5));
    assert_eq!(store.posting("cat", "docA").unwrap(), Some(1));
    assert_eq!(store.doc_length("docA").unwrap(), Some(6));
}

#[tokio::test]
async fn sums_hold_for_a_larger_sorted_stream() {
    // Deterministic stream: term i in doc j repeated (i + j) % 3 + 1 times.
    let mut expected: BTreeMap<(String, String), u64> = BTreeMap::new();
    let mut lines = Vec::new();
    for i in 0..20 {
        for j in 0..5 {
            let (term, doc) = (format!("t{i:02}"), format!("d{j}"));
            for k in 0..((i + j) % 3 + 1) {
                let count = (k + 1) as u64;
                lines.push(TermOccurrence { term: term.clone(), doc: doc.clone(), count }.to_string());
                *expected.entry((term.clone(), doc.clone())).or_default() += count;
            }
        }
    }
    let store = LocalStore::temporary().unwrap();
    run(&store, &lines.join("\n"), Grouping::Sorted).await;

    let mut lengths: BTreeMap<&str, u64> = BTreeMap::new();
    for ((term, doc), freq) in &expected {
        assert_eq!(store.posting(term, doc).unwrap(), Some(*freq), "{term}/{doc}");
        *lengths.entry(doc.as_str()).or_default() += freq;
    }
    assert_eq!(store.posting_count(), expected.len());
    for (doc, length) in lengths {
        assert_eq!(store.doc_length(doc).unwrap(), Some(length), "{doc}");
    }
}

/// Store that rejects postings for one term.
struct RejectTerm {
    inner: LocalStore,
    term: &'static str,
}

impl IndexStore for RejectTerm {
    async fn put_posting(&self, row: &InvertedIndexRow) -> Result<()> {
        if row.term == self.term {
            return Err(Error::Persistence { table: "inverted_index", reason: "injected".into() });
        }
        self.inner.put_posting(row).await
    }

    async fn put_doc_length(&self, row: &DocumentLength) -> Result<()> {
        self.inner.put_doc_length(row).await
    }

    async fn doc_lengths(&self) -> Result<Vec<DocumentLength>> {
        self.inner.doc_lengths().await
    }

    async fn put_statistics(&self, row: &StatisticsRow) -> Result<()> {
        self.inner.put_statistics(row).await
    }
}

#[tokio::test]
async fn failed_write_loses_only_that_row() {
    let inner = LocalStore::temporary().unwrap();
    let store = RejectTerm { inner: inner.clone(), term: "bad" };
    let mut agg = TermFrequencyAggregator::new(&store, Grouping::Sorted);
    consume("bad\tdoc1\t7\ngood\tdoc1\t2\nzoo\tdoc1\t1\n".as_bytes(), &mut agg).await.unwrap();
    let report = agg.finish().await.unwrap();

    assert_eq!(report.write_failures, 1);
    assert_eq!(inner.posting("bad", "doc1").unwrap(), None);
    assert_eq!(inner.posting("good", "doc1").unwrap(), Some(2));
    assert_eq!(inner.posting("zoo", "doc1").unwrap(), Some(1));
    assert_eq!(inner.doc_length("doc1").unwrap(), Some(3));
}

#[tokio::test]
async fn document_length_saturates_instead_of_overflowing() {
    let store = LocalStore::temporary().unwrap();
    let report = run(&store, "a\td\t18446744073709551615\nb\td\t1\n", Grouping::Sorted).await;

    assert_eq!(report.write_failures, 0);
    assert_eq!(store.posting("a", "d").unwrap(), Some(u64::MAX));
    assert_eq!(store.posting("b", "d").unwrap(), Some(1));
    assert_eq!(store.doc_length("d").unwrap(), Some(u64::MAX));
}
