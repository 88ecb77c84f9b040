use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use invidx_core::aggregate::{consume, CorpusStatsAggregator, Grouping, TermFrequencyAggregator};
use invidx_core::connector::{self, StoreConfig};
use invidx_core::store::{CqlStore, IndexStore, LocalStore};
use tokio::io::BufReader;
use tracing_subscriber::{fmt, EnvFilter};

use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "invidx-indexer")]
#[command(about = "Reduce sorted term tuples from stdin into an inverted index and corpus statistics", long_about = None)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Column store host; `localhost` is tried when it cannot be reached
    #[arg(long, env = "CASSANDRA_HOST", default_value = connector::DEFAULT_HOST)]
    host: String,
    /// Column store native protocol port
    #[arg(long, default_value_t = connector::DEFAULT_PORT)]
    port: u16,
    /// Timeout of the reachability probe, in seconds
    #[arg(long, default_value_t = 5)]
    probe_timeout_secs: u64,
    /// Timeout of a full client connection, in seconds
    #[arg(long, default_value_t = 30)]
    connect_timeout_secs: u64,
    /// Keyspace, created if absent
    #[arg(long, default_value = connector::DEFAULT_KEYSPACE)]
    keyspace: String,
    /// Replication factor used when creating the keyspace
    #[arg(long, default_value_t = 1)]
    replication_factor: u32,
    /// Write to an embedded store at this path instead of the column store
    #[arg(long)]
    local: Option<PathBuf>,
}

impl StoreArgs {
    fn config(&self) -> StoreConfig {
        StoreConfig {
            host: self.host.clone(),
            port: self.port,
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            keyspace: self.keyspace.clone(),
            replication_factor: self.replication_factor,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fold `term<TAB>doc<TAB>count` lines, sorted by (term, doc), into
    /// inverted index rows and document lengths
    Index {
        /// Buffer every (term, doc) group so input order does not matter
        #[arg(long, default_value_t = false)]
        unsorted: bool,
    },
    /// Fold `term<TAB>doc` lines into per-term document frequencies, using
    /// the document lengths written by `index`
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let result = run(cli).await;
    if let Err(e) = &result {
        tracing::error!("fatal error: {e:#}");
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.store.local {
        Some(path) => {
            let store = LocalStore::open(path).context("opening local store")?;
            execute(&store, cli.command).await
        }
        None => {
            let store = CqlStore::open(&cli.store.config()).await.context("connecting to the column store")?;
            tracing::info!(host = store.host(), "using column store");
            execute(&store, cli.command).await
        }
    }
}

async fn execute<S: IndexStore>(store: &S, command: Commands) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    match command {
        Commands::Index { unsorted } => {
            let grouping = if unsorted { Grouping::Buffered } else { Grouping::Sorted };
            tracing::info!(?grouping, "processing input data");
            let mut agg = TermFrequencyAggregator::new(store, grouping);
            consume(stdin, &mut agg).await.context("reading stdin")?;
            agg.finish().await?;
            tracing::info!("index building completed successfully");
        }
        Commands::Stats => {
            tracing::info!("processing term-document pairs");
            let mut agg = CorpusStatsAggregator::new(store);
            consume(stdin, &mut agg).await.context("reading stdin")?;
            let (summary, _) = agg.finish().await?;
            tracing::info!(
                total_documents = summary.total_documents,
                average_document_length = summary.average_document_length,
                "statistics processing completed successfully"
            );
        }
    }
    Ok(())
}
