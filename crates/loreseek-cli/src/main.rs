//! Loreseek CLI - index a document file and query it from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Hybrid search over an NDJSON corpus
//! lsk --docs corpus.ndjson "rust async runtime"
//!
//! # Lexical-only search with heuristic re-ranking, JSON output
//! lsk --docs corpus.ndjson --method lexical --rerank heuristic --json "query"
//!
//! # Index statistics
//! lsk --docs corpus.ndjson --stats
//! ```
//!
//! The corpus file holds one JSON document per line:
//! `{"id": "...", "content": "...", "metadata": {...}}`.

mod output;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use loreseek_core::search::vector::InMemoryVectorProvider;
use loreseek_core::{Document, KnowledgeEngine, RerankMethod, SearchMethod, SearchQuery};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Embedding dimension for the bundled hashed embedder.
const EMBEDDING_DIM: usize = 256;

/// Loreseek search CLI.
///
/// Loads a document corpus into an in-memory index and answers
/// lexical, vector, or hybrid queries against it.
#[derive(Parser)]
#[command(name = "lsk", version, about)]
struct Cli {
    /// Search query
    query: Option<String>,

    /// NDJSON corpus file, one document per line
    #[arg(short, long)]
    docs: PathBuf,

    /// Maximum number of results to return
    #[arg(short = 'n', long, default_value = "10")]
    limit: usize,

    /// Retrieval method
    #[arg(long, value_enum, default_value = "hybrid")]
    method: MethodArg,

    /// Re-ranking strategy
    #[arg(long, value_enum, default_value = "none")]
    rerank: RerankArg,

    /// Output the full response as JSON
    #[arg(long)]
    json: bool,

    /// Print index statistics instead of searching
    #[arg(long)]
    stats: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Lexical,
    Vector,
    Hybrid,
}

impl From<MethodArg> for SearchMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Lexical => SearchMethod::Lexical,
            MethodArg::Vector => SearchMethod::Vector,
            MethodArg::Hybrid => SearchMethod::Hybrid,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RerankArg {
    None,
    Heuristic,
    Weighted,
}

impl From<RerankArg> for RerankMethod {
    fn from(arg: RerankArg) -> Self {
        match arg {
            RerankArg::None => RerankMethod::None,
            RerankArg::Heuristic => RerankMethod::Heuristic,
            RerankArg::Weighted => RerankMethod::WeightedSimilarity,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let documents = load_documents(&cli.docs)?;
    let engine = KnowledgeEngine::new(InMemoryVectorProvider::with_hashed_embedder(EMBEDDING_DIM));
    engine.add_documents(documents).await;

    if cli.stats {
        let stats = engine.stats().await;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("{}", output::format_stats(&stats));
        }
        return Ok(());
    }

    let Some(query_text) = cli.query else {
        anyhow::bail!("no search query provided (use --stats for index statistics)");
    };

    let query = SearchQuery::new(query_text)
        .with_method(cli.method.into())
        .with_limit(cli.limit)
        .with_rerank(cli.rerank.into());

    let response = engine.search(query).await.context("search failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", output::format_response(&response));
    }

    Ok(())
}

/// Reads an NDJSON corpus file, skipping blank lines.
fn load_documents(path: &PathBuf) -> Result<Vec<Document>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus file {}", path.display()))?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid document on line {}", number + 1))
        })
        .collect()
}
