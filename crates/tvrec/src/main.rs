use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tvrec_common::{logger, AppConfig, TvRecError};
use tvrec_embed::OllamaClient;
use tvrec_vector::{
    load_documents, resolve_store_dir, Recommender, StoreBuilder, StoreManifest, VectorStore,
};

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "tvrec")]
#[command(about = "TvRec - TV series recommendation by embedding similarity", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Ollama API base URL
    #[arg(long, global = true)]
    ollama_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed a JSONL corpus and write a vector store
    Build {
        /// Input JSONL (series_id, title, doc_text per line)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output store directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Embedding model
        #[arg(long)]
        model: Option<String>,

        /// Texts per embedding request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Embedding requests in flight
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Rank stored series against a free-text preference
    Query {
        /// User preference text
        #[arg(long)]
        query: String,

        /// Store directory (embeddings.npy + meta.json)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Embedding model
        #[arg(long)]
        model: Option<String>,

        /// Number of results
        #[arg(long, allow_negative_numbers = true)]
        k: Option<i64>,
    },

    /// Show store shape and manifest
    Info {
        /// Store directory
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

/// Reject non-positive K before any work is done
fn parse_k(k: i64) -> Result<usize, TvRecError> {
    usize::try_from(k)
        .ok()
        .filter(|&k| k > 0)
        .ok_or(TvRecError::InvalidK(k))
}

async fn run_build(
    mut config: AppConfig,
    input: Option<PathBuf>,
    out: Option<PathBuf>,
    model: Option<String>,
    batch_size: Option<usize>,
    concurrency: Option<usize>,
) -> Result<()> {
    if let Some(input) = input {
        config.corpus_path = input;
    }
    if let Some(out) = out {
        config.store_dir = out;
    }
    if let Some(model) = model {
        config.embedding_model = model;
    }
    if let Some(batch_size) = batch_size {
        config.batch_size = batch_size;
    }
    if let Some(concurrency) = concurrency {
        config.embed_concurrency = concurrency;
    }
    config.validate()?;

    let documents = load_documents(&config.corpus_path)?;
    println!("Loaded texts: {}", documents.len());

    let client = OllamaClient::new(&config.ollama_base_url, &config.embedding_model)?;
    if !client.test_connection().await.unwrap_or(false) {
        tracing::warn!("Ollama is not reachable at {}", config.ollama_base_url);
    }
    let (store, report) = StoreBuilder::new(Arc::new(client))
        .batch_size(config.batch_size)
        .concurrency(config.embed_concurrency)
        .show_progress(true)
        .build(documents)
        .await?;

    store
        .save(&config.store_dir)
        .with_context(|| format!("Failed to save store to {}", config.store_dir.display()))?;

    if !report.skipped_ids.is_empty() {
        println!(
            "Skipped {} documents with empty text: {:?}",
            report.skipped_ids.len(),
            report.skipped_ids
        );
    }
    println!("Saved store: {}", config.store_dir.display());
    println!(
        "Embedding shape: ({}, {})",
        store.vectors().nrows(),
        store.vectors().ncols()
    );

    Ok(())
}

async fn run_query(
    mut config: AppConfig,
    query: String,
    store: Option<PathBuf>,
    model: Option<String>,
    k: Option<i64>,
) -> Result<()> {
    if let Some(store) = store {
        config.store_dir = store;
    }
    if let Some(model) = model {
        config.embedding_model = model;
    }
    let k = match k {
        Some(k) => parse_k(k)?,
        None => config.top_k,
    };
    config.validate()?;

    let resolved = resolve_store_dir(&config.store_dir);
    println!(
        "Store dir: {}",
        std::fs::canonicalize(&resolved.dir)
            .unwrap_or_else(|_| resolved.dir.clone())
            .display()
    );

    let store = VectorStore::load_resolved(&resolved)?;
    println!(
        "Embeddings shape: ({}, {}) | Meta: {}",
        store.vectors().nrows(),
        store.vectors().ncols(),
        store.records().len()
    );

    let client = OllamaClient::new(&config.ollama_base_url, &config.embedding_model)?;
    let recommender = Recommender::new(Arc::new(store), Arc::new(client));

    let results = recommender.recommend(&query, k).await?;
    for r in results {
        println!("{}) {} (id={}) score={:.4}", r.rank, r.title, r.id, r.score);
    }

    Ok(())
}

fn run_info(mut config: AppConfig, store: Option<PathBuf>) -> Result<()> {
    if let Some(store) = store {
        config.store_dir = store;
    }

    let resolved = resolve_store_dir(&config.store_dir);
    let store = VectorStore::load_resolved(&resolved)?;
    let store_dir = resolved.dir;

    println!("Store dir: {}", store_dir.display());
    println!("Items: {}", store.len());
    match store.dimension() {
        Some(dim) => println!("Dimension: {}", dim),
        None => println!("Dimension: undefined (empty store)"),
    }

    match StoreManifest::read(&store_dir)? {
        Some(manifest) => {
            println!(
                "Embedding model: {}",
                manifest.embedding_model.as_deref().unwrap_or("unknown")
            );
            println!("Created at: {}", manifest.created_at.to_rfc3339());
        }
        None => println!("Manifest: none"),
    }

    Ok(())
}

/// Exit status: 2 for a rejected query, 1 for every other failure
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<TvRecError>() {
        Some(e) if e.is_query_error() => 2,
        _ => 1,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    load_dotenv_from_project_root();

    let mut config = AppConfig::from_env()?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(url) = cli.ollama_url {
        config.ollama_base_url = url;
    }

    match &config.log_dir {
        Some(dir) => logger::setup_logging(dir, &config.log_level)?,
        None => logger::setup_console_logging(&config.log_level)?,
    }

    match cli.command {
        Commands::Build {
            input,
            out,
            model,
            batch_size,
            concurrency,
        } => run_build(config, input, out, model, batch_size, concurrency).await,
        Commands::Query {
            query,
            store,
            model,
            k,
        } => run_query(config, query, store, model, k).await,
        Commands::Info { store } => run_info(config, store),
    }
}
