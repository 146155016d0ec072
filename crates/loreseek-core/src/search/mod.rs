//! Hybrid search combining a lexical index and a vector backend.
//!
//! This module implements the retrieval pipeline:
//! - **Lexical search** (exact term matching via a hand-rolled BM25 index)
//! - **Vector search** (semantic similarity via an external backend, behind
//!   the [`VectorSearchProvider`] trait)
//! - **Hybrid merge** (deduplicating the two candidate sets by document id)
//! - **Re-ranking** (a heuristic cross-encoder stand-in and a
//!   weighted-similarity combiner)
//!
//! # Architecture
//!
//! - `types`: Core types (Document, SearchQuery, SearchResult, SearchResponse)
//! - `tokenizer`: Lowercasing alphanumeric tokenizer shared by the lexical path
//! - `lexical`: BM25 inverted index with incremental add/delete
//! - `vector`: Vector backend trait and the bundled in-memory provider
//! - `merge`: Candidate-set merge for hybrid queries
//! - `rerank`: Both re-ranking strategies
//! - `engine`: [`KnowledgeEngine`] orchestrating dispatch, degradation and timing
//!
//! # Usage
//!
//! ```ignore
//! use loreseek_core::search::{Document, KnowledgeEngine, SearchQuery};
//! use loreseek_core::search::vector::InMemoryVectorProvider;
//!
//! let provider = InMemoryVectorProvider::with_hashed_embedder(64);
//! let engine = KnowledgeEngine::new(provider);
//!
//! engine
//!     .add_documents(vec![Document::new("a", "rust systems programming")])
//!     .await;
//!
//! let response = engine.search(SearchQuery::new("rust")).await?;
//! ```
//!
//! # Score semantics
//!
//! Lexical and vector scores live on different scales (unbounded BM25 vs a
//! [0, 1] similarity), so the merge step never combines them numerically.
//! Only the weighted re-ranker produces a single blended score, and scores
//! are comparable only within one response.

pub mod types;

pub mod engine;
pub mod lexical;
pub mod merge;
pub mod rerank;
pub mod tokenizer;
pub mod vector;

pub use engine::KnowledgeEngine;
pub use lexical::LexicalIndex;
pub use rerank::{HeuristicReranker, WeightedReranker};
pub use types::{
    Document, EngineStats, IndexStats, Metadata, RerankMethod, SearchMethod, SearchQuery,
    SearchResponse, SearchResult, SearchSource,
};
pub use vector::{InMemoryVectorProvider, VectorSearchProvider};
