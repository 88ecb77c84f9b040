use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use invidx_core::aggregate::DocumentPresenceAggregator;
use invidx_core::record::TermOccurrence;
use invidx_core::tokenizer::tokenize;
use invidx_core::{identity, DocId};
use tracing_subscriber::{fmt, EnvFilter};

use std::io::{self, BufRead, BufWriter, Write};

#[derive(Parser)]
#[command(name = "invidx-mapper")]
#[command(about = "Map document text on stdin to tab-separated term tuples", long_about = None)]
struct Cli {
    /// Document id; resolved from the pipeline's input file variables when omitted
    #[arg(long, global = true)]
    doc_id: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit `term<TAB>doc<TAB>1` for every word occurrence
    Occurrences,
    /// Emit `term<TAB>doc` once per distinct word of the document
    Presence,
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();
    let doc = cli.doc_id.unwrap_or_else(identity::from_env);

    let stdin = io::stdin().lock();
    let mut out = BufWriter::new(io::stdout().lock());
    let emitted = match cli.command {
        Commands::Occurrences => {
            tracing::info!(%doc, "processing document");
            map_occurrences(stdin, &mut out, doc)
        }
        Commands::Presence => {
            tracing::info!(%doc, "collecting statistics for document");
            map_presence(stdin, &mut out, doc)
        }
    }
    .context("mapping stdin")?;
    out.flush()?;
    tracing::info!(emitted, "map completed");
    Ok(())
}

/// Iterate trimmed, non-blank lines; undecodable bytes become U+FFFD.
fn for_each_line<R, F>(input: R, mut f: F) -> io::Result<()>
where
    R: BufRead,
    F: FnMut(&str) -> io::Result<()>,
{
    for chunk in input.split(b'\n') {
        let chunk = chunk?;
        let text = String::from_utf8_lossy(&chunk);
        let line = text.trim();
        if !line.is_empty() {
            f(line)?;
        }
    }
    Ok(())
}

fn map_occurrences<R: BufRead, W: Write>(input: R, out: &mut W, doc: DocId) -> io::Result<u64> {
    let mut emitted = 0u64;
    for_each_line(input, |line| {
        for term in tokenize(line) {
            writeln!(out, "{}", TermOccurrence { term, doc: doc.clone(), count: 1 })?;
            emitted += 1;
        }
        Ok(())
    })?;
    Ok(emitted)
}

fn map_presence<R: BufRead, W: Write>(input: R, out: &mut W, doc: DocId) -> io::Result<u64> {
    let mut agg = DocumentPresenceAggregator::new(doc);
    let mut emitted = 0u64;
    for_each_line(input, |line| {
        for rec in agg.process_line(line) {
            writeln!(out, "{rec}")?;
            emitted += 1;
        }
        Ok(())
    })?;
    Ok(emitted)
}
