//! Core types for the retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque key-value metadata attached to documents and results.
///
/// Values are arbitrary JSON so callers can attach whatever their ingestion
/// pipeline produces. Filters match against these entries by exact equality.
pub type Metadata = HashMap<String, serde_json::Value>;

/// A document submitted for indexing.
///
/// The lexical index and the vector backend each keep their own copy; there
/// is no shared ownership between the two. A document lives until it is
/// explicitly deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier. Re-adding an existing id replaces the old content.
    pub id: String,
    /// Searchable text content.
    pub content: String,
    /// Optional opaque metadata, used for exact-match filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Optional pre-computed embedding. When absent, vector backends derive
    /// one from the content themselves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    /// Creates a document with no metadata or embedding.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: None,
            embedding: None,
        }
    }

    /// Attaches metadata to the document.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Attaches a pre-computed embedding to the document.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Which retrieval path a query should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    /// BM25 lexical search only.
    Lexical,
    /// Vector-similarity search only.
    Vector,
    /// Both paths, merged into one candidate set.
    Hybrid,
}

impl SearchMethod {
    /// Stable lowercase name, used in logs and response metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Lexical => "lexical",
            SearchMethod::Vector => "vector",
            SearchMethod::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which source produced a single result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSource {
    /// Produced by the BM25 lexical index.
    Lexical,
    /// Produced by the vector backend.
    Vector,
}

/// Re-ranking strategy applied after retrieval.
///
/// The strategy set is closed by design; each variant maps to one concrete
/// re-scorer rather than an open plugin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankMethod {
    /// Return candidates in their retrieval order.
    None,
    /// Heuristic cross-encoder stand-in (term overlap + length penalty).
    Heuristic,
    /// Weighted combination of vector and BM25 scores.
    WeightedSimilarity,
}

impl RerankMethod {
    /// Stable lowercase name, used in logs and response metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            RerankMethod::None => "none",
            RerankMethod::Heuristic => "heuristic",
            RerankMethod::WeightedSimilarity => "weighted_similarity",
        }
    }
}

/// A single retrieved document with its relevance score.
///
/// Constructed per query and never persisted. The score's meaning depends on
/// the source and any re-ranking applied, so scores from different responses
/// are not comparable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Identifier of the matched document.
    pub document_id: String,
    /// Content of the matched document.
    pub content: String,
    /// Relevance score, higher is better.
    pub score: f32,
    /// Metadata carried from the document, plus any side-channel entries
    /// attached by the merge and re-ranking steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Which source produced this result.
    pub source: SearchSource,
}

impl SearchResult {
    /// Inserts a metadata entry, creating the map when absent.
    pub(crate) fn insert_metadata(&mut self, key: &str, value: serde_json::Value) {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.to_string(), value);
    }
}

/// A search request as received from the query boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-form query text.
    pub query: String,
    /// Retrieval path to run.
    pub method: SearchMethod,
    /// Maximum number of results to return. Must be positive.
    pub limit: usize,
    /// Re-ranking strategy to apply to the candidate set.
    pub rerank: RerankMethod,
    /// Optional exact-match metadata constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Metadata>,
}

impl SearchQuery {
    /// Creates a hybrid query with default limit and no re-ranking.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            method: SearchMethod::Hybrid,
            limit: 10,
            rerank: RerankMethod::None,
            filters: None,
        }
    }

    /// Sets the retrieval method.
    pub fn with_method(mut self, method: SearchMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the re-ranking strategy.
    pub fn with_rerank(mut self, rerank: RerankMethod) -> Self {
        self.rerank = rerank;
        self
    }

    /// Sets exact-match metadata filters.
    pub fn with_filters(mut self, filters: Metadata) -> Self {
        self.filters = Some(filters);
        self
    }
}

/// A complete response as returned through the query boundary.
///
/// Always well-formed: backend failures surface as an empty result list with
/// an explanatory `metadata` entry, never as an exception through this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The original query text.
    pub query: String,
    /// Ranked results, best first.
    pub results: Vec<SearchResult>,
    /// Number of results returned.
    pub total_found: usize,
    /// Retrieval path that was run.
    pub search_method: SearchMethod,
    /// Whether a re-ranking pass reordered the results.
    pub reranking_applied: bool,
    /// Wall-clock processing time for the whole request.
    pub processing_time_ms: f64,
    /// Response-level annotations (filters applied, re-ranking method,
    /// degradation notices).
    pub metadata: Metadata,
}

/// Read-only statistics for the lexical index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of indexed documents.
    pub document_count: usize,
    /// Number of distinct terms in the vocabulary.
    pub term_count: usize,
    /// Average document length in tokens, 0 for an empty corpus.
    pub average_document_length: f32,
    /// Configured BM25 `k1` parameter.
    pub k1: f32,
    /// Configured BM25 `b` parameter.
    pub b: f32,
}

/// Engine-level statistics for observability endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    /// Lexical index statistics.
    pub index: IndexStats,
    /// Whether the vector backend currently reports itself reachable.
    pub vector_available: bool,
    /// Normalized vector weight used by the weighted re-ranker.
    pub vector_weight: f32,
    /// Normalized BM25 weight used by the weighted re-ranker.
    pub bm25_weight: f32,
}

/// Checks a document's metadata against exact-match filters.
///
/// Every filter key must be present with an exactly equal value. A document
/// without metadata matches only an empty filter set.
pub fn matches_filters(metadata: Option<&Metadata>, filters: &Metadata) -> bool {
    if filters.is_empty() {
        return true;
    }
    let Some(metadata) = metadata else {
        return false;
    };
    filters
        .iter()
        .all(|(key, expected)| metadata.get(key) == Some(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(pairs: &[(&str, serde_json::Value)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_matches_filters_exact_equality() {
        let metadata = meta(&[("lang", json!("en")), ("year", json!(2024))]);

        assert!(matches_filters(
            Some(&metadata),
            &meta(&[("lang", json!("en"))])
        ));
        assert!(matches_filters(
            Some(&metadata),
            &meta(&[("lang", json!("en")), ("year", json!(2024))])
        ));
        // Wrong value
        assert!(!matches_filters(
            Some(&metadata),
            &meta(&[("lang", json!("de"))])
        ));
        // Missing key
        assert!(!matches_filters(
            Some(&metadata),
            &meta(&[("author", json!("someone"))])
        ));
    }

    #[test]
    fn test_matches_filters_without_metadata() {
        assert!(matches_filters(None, &Metadata::new()));
        assert!(!matches_filters(None, &meta(&[("lang", json!("en"))])));
    }

    #[test]
    fn test_search_query_builder_defaults() {
        let query = SearchQuery::new("rust");
        assert_eq!(query.method, SearchMethod::Hybrid);
        assert_eq!(query.limit, 10);
        assert_eq!(query.rerank, RerankMethod::None);
        assert!(query.filters.is_none());
    }

    #[test]
    fn test_method_names_are_stable() {
        assert_eq!(SearchMethod::Lexical.as_str(), "lexical");
        assert_eq!(SearchMethod::Hybrid.to_string(), "hybrid");
        assert_eq!(
            RerankMethod::WeightedSimilarity.as_str(),
            "weighted_similarity"
        );
    }
}
