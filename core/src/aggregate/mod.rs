//! Aggregation stages and the line loop that feeds the reduce-side ones.

pub mod frequency;
pub mod presence;
pub mod stats;

pub use frequency::{Grouping, TermFrequencyAggregator};
pub use presence::DocumentPresenceAggregator;
pub use stats::{CorpusStatsAggregator, CorpusSummary};

use crate::{RecordError, Result};
use std::collections::BTreeMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Counters kept by a reduce-side run and logged when it completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub lines: u64,
    pub records: u64,
    /// Rejected lines, by [`RecordError::kind`].
    pub skipped: BTreeMap<&'static str, u64>,
    /// Keys that arrived below the current key in sort order.
    pub out_of_order: u64,
    pub rows_written: u64,
    pub write_failures: u64,
}

impl IngestReport {
    pub fn skipped_total(&self) -> u64 {
        self.skipped.values().sum()
    }

    pub(crate) fn skip(&mut self, line: &str, err: &RecordError) {
        *self.skipped.entry(err.kind()).or_default() += 1;
        tracing::warn!(line = self.lines, input = %line.escape_debug(), "skipping record: {err}");
    }

    pub(crate) fn log(&self, stage: &str) {
        tracing::info!(
            stage,
            lines = self.lines,
            records = self.records,
            skipped = self.skipped_total(),
            skipped_by_reason = ?self.skipped,
            out_of_order = self.out_of_order,
            rows_written = self.rows_written,
            write_failures = self.write_failures,
            "{stage} completed"
        );
    }
}

/// A reduce-side stage that consumes one trimmed, non-blank line at a time.
#[allow(async_fn_in_trait)]
pub trait LineSink {
    async fn accept_line(&mut self, line: &str);

    /// Called for a line that could not be decoded as text.
    fn reject_line(&mut self, err: RecordError);
}

/// Feed every line of `reader` to `sink`, in order.
///
/// Lines are trimmed and blank lines skipped. Only a read error ends the loop
/// early; per-line problems are the sink's to record.
pub async fn consume<R, S>(mut reader: R, sink: &mut S) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    S: LineSink,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        match std::str::from_utf8(&buf) {
            Ok(text) => {
                let line = text.trim();
                if !line.is_empty() {
                    sink.accept_line(line).await;
                }
            }
            Err(_) => sink.reject_line(RecordError::Encoding),
        }
    }
}
