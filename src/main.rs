//! Startup search service.
//!
//! Answers free-text questions from two precomputed datasets: meeting notes
//! about startups and records of domain interest. Queries are routed by
//! keyword, embedded, and matched against the dataset's vector index.
//!
//! # Environment Variables
//! - `DATA_DIR` - Directory with meeting/domain index and metadata files (default: data)
//! - `HTTP_PORT` - Search API port (default: 8501)
//! - `METRICS_PORT` - Prometheus metrics port (default: 9090)
//! - `BIND_ADDRESS` - Listen address, or "auto" for dual-stack (default: auto)
//! - `MOCK_EMBEDDER` - Use hash embedder for testing (default: false)
//! - `MODEL_CACHE_DIR` - fastembed model cache (default: .fastembed_cache)
//! - `DEFAULT_TOP_K` - Results per query when none is given (default: 5)
//! - `RUST_LOG` - Log level (default: info)

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use startup_search::config::Config;
use startup_search::http::{self, AppState};
use startup_search::metrics;
use startup_search::present;
use startup_search::search::{self, MetadataStore, SearchEngine, VectorIndex};

#[derive(Parser)]
#[command(name = "startup-search")]
#[command(author, version, about = "Semantic search over startup meetings and domain interests", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the search API (default)
    Serve,

    /// Run a single search and print the results
    Query {
        /// Free-text question
        text: String,

        /// Number of results (1-10)
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
    },

    /// Embed a metadata file and write its vector index
    BuildIndex {
        /// JSON object mapping ordinals to records
        #[arg(long)]
        metadata: PathBuf,

        /// Where to write the index
        #[arg(long)]
        output: PathBuf,

        /// Texts embedded per model call
        #[arg(long, default_value_t = 32)]
        batch_size: usize,
    },

    /// Check the health endpoint of a running service
    Healthcheck {
        /// Base URL; defaults to localhost on HTTP_PORT
        #[arg(long)]
        url: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Logs go to stderr so `query` output stays clean on stdout
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Run healthcheck mode: query the health endpoint and exit 0 or 1.
/// Tries both IPv6 and IPv4 localhost unless a URL is given.
async fn run_healthcheck(url: Option<String>, port: u16) -> Result<(), Box<dyn Error>> {
    let urls = match url {
        Some(url) => vec![url],
        None => vec![
            format!("http://[::1]:{}", port),
            format!("http://127.0.0.1:{}", port),
        ],
    };

    for url in &urls {
        match tokio::time::timeout(Duration::from_secs(2), http::probe_health(url)).await {
            Ok(Ok(health)) => {
                eprintln!(
                    "healthcheck: service is healthy via {} ({} meeting, {} domain records)",
                    url, health.meeting_records, health.domain_records
                );
                std::process::exit(0);
            }
            Ok(Err(e)) => eprintln!("healthcheck: {} failed: {}", url, e),
            Err(_) => eprintln!("healthcheck: timeout connecting to {}", url),
        }
    }

    std::process::exit(1);
}

/// Build the embedder and load both datasets off the async runtime.
async fn load_engine(config: Config) -> Result<Arc<SearchEngine>, Box<dyn Error>> {
    let engine = tokio::task::spawn_blocking(move || {
        let embedder = search::embedder_from_config(&config)?;
        SearchEngine::load(&config, embedder)
    })
    .await?
    .map_err(|e| {
        error!(
            error = %e,
            "FATAL: Failed to load search datasets. Run build-index first or set DATA_DIR."
        );
        e
    })?;

    Ok(Arc::new(engine))
}

async fn run_server(config: Config) -> Result<(), Box<dyn Error>> {
    info!(
        http_port = config.http_port,
        metrics_port = config.metrics_port,
        mock_embedder = config.mock_embedder,
        meeting_index = %config.meeting_index_path.display(),
        domain_index = %config.domain_index_path.display(),
        "Configuration loaded"
    );

    let metrics_handle = metrics::init_metrics()?;
    let engine = load_engine(config.clone()).await?;
    let state = AppState::new(engine, config.default_top_k);

    // Start metrics server in background
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_port, metrics_handle).await {
            error!(error = %e, "Metrics server failed");
        }
    });

    let listener = http::bind_listener(&config.bind_address, config.http_port).await?;
    http::serve(listener, state).await?;

    Ok(())
}

async fn run_query(config: Config, text: String, top_k: Option<usize>) -> Result<(), Box<dyn Error>> {
    // No search is triggered for an empty query
    if text.trim().is_empty() {
        return Ok(());
    }

    let k = search::validate_top_k(top_k.unwrap_or(config.default_top_k))?;
    let engine = load_engine(config).await?;
    let outcome = tokio::task::spawn_blocking(move || engine.search_routed(&text, k)).await??;

    print!("{}", present::render_markdown(&outcome));
    Ok(())
}

fn build_index(
    config: &Config,
    metadata_path: &Path,
    output: &Path,
    batch_size: usize,
) -> anyhow::Result<()> {
    let metadata = MetadataStore::load(metadata_path)
        .with_context(|| format!("reading {}", metadata_path.display()))?;
    let embedder = search::embedder_from_config(config).context("initializing embedder")?;

    let index = VectorIndex::build(embedder.as_ref(), &metadata, batch_size)
        .with_context(|| format!("embedding {} records", metadata.len()))?;
    index
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;

    info!(
        metadata = %metadata_path.display(),
        output = %output.display(),
        records = index.len(),
        embedder = index.embedder(),
        "Index built"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Check if running in healthcheck mode via argv0
    let program_name = std::env::args()
        .next()
        .and_then(|path| Path::new(&path).file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_default();

    let cli = if program_name == "healthcheck" {
        Cli {
            verbose: false,
            command: Some(Commands::Healthcheck { url: None }),
        }
    } else {
        Cli::parse()
    };

    init_tracing(cli.verbose);

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await,
        Commands::Query { text, top_k } => run_query(config, text, top_k).await,
        Commands::BuildIndex {
            metadata,
            output,
            batch_size,
        } => {
            tokio::task::spawn_blocking(move || build_index(&config, &metadata, &output, batch_size))
                .await??;
            Ok(())
        }
        Commands::Healthcheck { url } => run_healthcheck(url, config.http_port).await,
    }
}
