//! Search orchestrator.
//!
//! [`KnowledgeEngine`] owns the lexical index, holds the vector backend
//! behind its trait boundary, and drives a request through dispatch,
//! optional re-ranking, and truncation. Its availability policy: a query
//! always produces a well-formed [`SearchResponse`], and backend downtime
//! degrades a source to zero candidates instead of failing the request.
//!
//! # Request flow
//!
//! ```text
//! SearchQuery -> dispatch (lexical | vector | hybrid) -> [rerank] -> truncate -> SearchResponse
//! ```
//!
//! In hybrid mode the two sources are independent read paths and run
//! concurrently, joined before the merge. Mutations take the index write
//! lock, so they serialize against each other and against searches.

use std::time::Instant;

use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::config::{CANDIDATE_MULTIPLIER, EngineConfig};
use crate::error::{SearchError, VectorProviderError};
use crate::search::lexical::LexicalIndex;
use crate::search::merge::merge_hybrid_results;
use crate::search::rerank::{HeuristicReranker, WeightedReranker};
use crate::search::types::{
    Document, EngineStats, Metadata, RerankMethod, SearchMethod, SearchQuery, SearchResponse,
    SearchResult,
};
use crate::search::vector::VectorSearchProvider;

/// Hybrid retrieval engine combining the BM25 index with a vector backend.
///
/// Construction is plain typed injection: the caller hands over the vector
/// provider and optionally a configuration; there is no global registry or
/// runtime lookup. All methods take `&self`; interior mutability on the
/// lexical index keeps one engine shareable across request handlers.
pub struct KnowledgeEngine<V: VectorSearchProvider> {
    lexical: RwLock<LexicalIndex>,
    vector: V,
    heuristic: HeuristicReranker,
    weighted: WeightedReranker,
    config: EngineConfig,
}

impl<V: VectorSearchProvider> KnowledgeEngine<V> {
    /// Creates an engine with the default configuration.
    pub fn new(vector: V) -> Self {
        Self::with_config(vector, EngineConfig::default())
    }

    /// Creates an engine with an explicit configuration.
    pub fn with_config(vector: V, config: EngineConfig) -> Self {
        Self {
            lexical: RwLock::new(LexicalIndex::with_params(config.k1, config.b)),
            vector,
            heuristic: HeuristicReranker::new(),
            weighted: WeightedReranker::new(config.vector_weight, config.bm25_weight),
            config,
        }
    }

    /// Indexes a batch of documents in both the lexical index and the
    /// vector backend.
    ///
    /// A vector-side failure is logged and absorbed so the lexical side
    /// still indexes; the next hybrid query then degrades gracefully
    /// instead of losing the documents entirely.
    #[instrument(skip_all, fields(count = documents.len()))]
    pub async fn add_documents(&self, documents: Vec<Document>) {
        if documents.is_empty() {
            warn!("no documents provided for indexing");
            return;
        }

        if let Err(error) = self.vector.add_documents(&documents).await {
            warn!(%error, "vector backend rejected documents, lexical index continues");
        }

        let count = documents.len();
        self.lexical.write().await.add_documents(documents);
        info!(count, "indexed documents");
    }

    /// Deletes a document from both indexes.
    ///
    /// Returns `true` when either side knew the id. An unknown id is a
    /// normal outcome, not an error.
    #[instrument(skip(self))]
    pub async fn delete_document(&self, id: &str) -> bool {
        let vector_deleted = match self.vector.delete_document(id).await {
            Ok(deleted) => deleted,
            Err(error) => {
                warn!(%error, "vector backend delete failed");
                false
            }
        };
        let lexical_deleted = self.lexical.write().await.delete_document(id);

        let deleted = vector_deleted || lexical_deleted;
        if deleted {
            info!(%id, "deleted document");
        } else {
            debug!(%id, "delete requested for unknown document");
        }
        deleted
    }

    /// Runs a search request through dispatch, re-ranking, and truncation.
    ///
    /// Always returns a well-formed response for valid queries: a failing
    /// vector backend degrades to zero candidates from that source, and a
    /// query with no usable terms produces an empty result set. The only
    /// error is a contract violation in the query itself (`limit == 0`).
    #[instrument(skip_all, fields(method = %query.method, limit = query.limit))]
    pub async fn search(&self, query: SearchQuery) -> Result<SearchResponse, SearchError> {
        let started = Instant::now();

        if query.limit == 0 {
            return Err(SearchError::InvalidQuery(
                "result limit must be greater than 0".to_string(),
            ));
        }

        // Each source fetches extra headroom so re-ranking has candidates
        // beyond the final cut.
        let candidate_limit = query.limit * CANDIDATE_MULTIPLIER;
        let mut degradation: Option<String> = None;

        let candidates = match query.method {
            SearchMethod::Lexical => {
                self.lexical
                    .read()
                    .await
                    .search(&query.query, candidate_limit, query.filters.as_ref())
            }
            SearchMethod::Vector => {
                match self
                    .vector_search(&query.query, candidate_limit, query.filters.as_ref())
                    .await
                {
                    Ok(results) => results,
                    Err(error) => {
                        // Vector was the only requested source, so the
                        // degradation is surfaced in response metadata.
                        warn!(%error, "vector search failed, returning empty result set");
                        degradation = Some(error.to_string());
                        Vec::new()
                    }
                }
            }
            SearchMethod::Hybrid => {
                let (lexical_results, vector_results) = tokio::join!(
                    async {
                        self.lexical.read().await.search(
                            &query.query,
                            candidate_limit,
                            query.filters.as_ref(),
                        )
                    },
                    self.vector_search(&query.query, candidate_limit, query.filters.as_ref()),
                );

                let vector_results = match vector_results {
                    Ok(results) => results,
                    Err(error) => {
                        // The lexical source still answered, so the query
                        // degrades instead of failing.
                        warn!(%error, "vector search failed, continuing with lexical results");
                        Vec::new()
                    }
                };

                debug!(
                    lexical = lexical_results.len(),
                    vector = vector_results.len(),
                    "hybrid sources answered"
                );
                merge_hybrid_results(vector_results, lexical_results)
            }
        };

        let mut reranking_applied = false;
        let mut results = if candidates.is_empty() {
            candidates
        } else {
            match query.rerank {
                RerankMethod::None => candidates,
                RerankMethod::Heuristic => {
                    reranking_applied = true;
                    self.heuristic
                        .rerank(&query.query, candidates, Some(query.limit))
                }
                RerankMethod::WeightedSimilarity => {
                    reranking_applied = true;
                    self.weighted
                        .rerank(&query.query, candidates, Some(query.limit))
                }
            }
        };
        results.truncate(query.limit);

        let mut metadata = Metadata::new();
        metadata.insert(
            "filters_applied".to_string(),
            json!(query.filters.is_some()),
        );
        metadata.insert(
            "reranking_method".to_string(),
            if reranking_applied {
                json!(query.rerank.as_str())
            } else {
                serde_json::Value::Null
            },
        );
        if let Some(error) = degradation {
            metadata.insert("error".to_string(), json!(error));
        }

        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(
            found = results.len(),
            elapsed_ms = processing_time_ms,
            "search completed"
        );

        Ok(SearchResponse {
            total_found: results.len(),
            query: query.query,
            results,
            search_method: query.method,
            reranking_applied,
            processing_time_ms,
            metadata,
        })
    }

    /// Engine statistics for observability endpoints. Read-only.
    pub async fn stats(&self) -> EngineStats {
        EngineStats {
            index: self.lexical.read().await.stats(),
            vector_available: self.vector.is_available(),
            vector_weight: self.weighted.vector_weight(),
            bm25_weight: self.weighted.bm25_weight(),
        }
    }

    /// Lists indexed documents containing each given term. Debug helper
    /// backed by the lexical index.
    pub async fn documents_for_terms(
        &self,
        terms: &[&str],
    ) -> std::collections::HashMap<String, Vec<String>> {
        self.lexical.read().await.documents_for_terms(terms)
    }

    /// Vector search with the configured per-query timeout. A timeout is
    /// reported as backend unavailability so callers degrade uniformly.
    async fn vector_search(
        &self,
        query: &str,
        limit: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>, VectorProviderError> {
        match self.config.vector_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.vector.search(query, limit, filters))
                .await
                .map_err(|_| {
                    VectorProviderError::Unavailable(format!(
                        "search timed out after {}ms",
                        timeout.as_millis()
                    ))
                })?,
            None => self.vector.search(query, limit, filters).await,
        }
    }
}
