//! Result re-ranking strategies.
//!
//! Two interchangeable second-pass scorers over an already-retrieved
//! candidate set. Both are pure functions of the query text and candidates;
//! neither touches the index. An empty candidate list passes through
//! unchanged.
//!
//! - [`HeuristicReranker`]: a stand-in for a learned cross-encoder. Blends
//!   the original score with query-term overlap and a content-length
//!   penalty.
//! - [`WeightedReranker`]: recombines vector and BM25 scores with
//!   configured weights into a single blended score.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde_json::json;
use tracing::debug;

use crate::config::{DEFAULT_BM25_WEIGHT, DEFAULT_VECTOR_WEIGHT};
use crate::search::merge::BM25_SCORE_KEY;
use crate::search::types::{SearchResult, SearchSource};

/// Metadata key for the component-score breakdown the weighted re-ranker
/// attaches to each result.
pub const HYBRID_SCORES_KEY: &str = "hybrid_scores";

/// Content shorter than this (in characters) is penalized as too short.
const SHORT_CONTENT_CHARS: usize = 100;

/// Content longer than this (in characters) is penalized as too long.
const LONG_CONTENT_CHARS: usize = 2000;

/// Heuristic cross-encoder stand-in.
///
/// Scores each candidate as
/// `0.6 * original + 0.3 * term_overlap + 0.1 * length_penalty` and sorts
/// descending. The original score and both sub-scores are recorded in the
/// result metadata for observability.
#[derive(Debug, Default, Clone)]
pub struct HeuristicReranker;

impl HeuristicReranker {
    const ORIGINAL_WEIGHT: f32 = 0.6;
    const OVERLAP_WEIGHT: f32 = 0.3;
    const LENGTH_WEIGHT: f32 = 0.1;

    /// Creates the re-ranker.
    pub fn new() -> Self {
        Self
    }

    /// Re-ranks candidates, truncating to `limit` when given.
    pub fn rerank(
        &self,
        query: &str,
        results: Vec<SearchResult>,
        limit: Option<usize>,
    ) -> Vec<SearchResult> {
        if results.is_empty() {
            return results;
        }

        // Whitespace word sets, not index tokens: the overlap heuristic
        // approximates what a cross-encoder would see in raw text.
        let query_terms: HashSet<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let candidate_count = results.len();
        let mut reranked: Vec<SearchResult> = results
            .into_iter()
            .map(|mut result| {
                let content_terms: HashSet<String> = result
                    .content
                    .to_lowercase()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();

                let overlap_score = if query_terms.is_empty() {
                    0.0
                } else {
                    let overlap = query_terms.intersection(&content_terms).count();
                    overlap as f32 / query_terms.len() as f32
                };

                let content_length = result.content.chars().count();
                let length_penalty = if content_length < SHORT_CONTENT_CHARS {
                    0.8
                } else if content_length > LONG_CONTENT_CHARS {
                    0.9
                } else {
                    1.0
                };

                let original_score = result.score;
                result.score = Self::ORIGINAL_WEIGHT * original_score
                    + Self::OVERLAP_WEIGHT * overlap_score
                    + Self::LENGTH_WEIGHT * length_penalty;

                result.insert_metadata("reranking_applied", json!(true));
                result.insert_metadata("original_score", json!(original_score));
                result.insert_metadata("overlap_score", json!(overlap_score));
                result.insert_metadata("length_penalty", json!(length_penalty));
                result
            })
            .collect();

        sort_by_score(&mut reranked);
        if let Some(limit) = limit {
            reranked.truncate(limit);
        }

        debug!(
            candidates = candidate_count,
            returned = reranked.len(),
            "applied heuristic re-ranking"
        );
        reranked
    }
}

/// Weighted-similarity re-ranker.
///
/// Partitions candidates into vector-origin and BM25-origin sets keyed by
/// document id; a vector-origin candidate carrying the merge step's
/// [`BM25_SCORE_KEY`] side channel counts as present in both. For the union
/// of ids the combined score is the weighted sum of whatever components
/// exist. Weights are normalized to sum to 1 at construction.
#[derive(Debug, Clone)]
pub struct WeightedReranker {
    vector_weight: f32,
    bm25_weight: f32,
}

impl WeightedReranker {
    /// Creates a re-ranker with the given weights, normalized to sum to 1.
    ///
    /// A non-positive weight sum is kept as-is rather than normalized,
    /// which degenerates to all-zero scores; callers configuring weights
    /// are expected to supply at least one positive component.
    pub fn new(vector_weight: f32, bm25_weight: f32) -> Self {
        let total = vector_weight + bm25_weight;
        if total > 0.0 {
            Self {
                vector_weight: vector_weight / total,
                bm25_weight: bm25_weight / total,
            }
        } else {
            Self {
                vector_weight,
                bm25_weight,
            }
        }
    }

    /// Normalized vector-score weight.
    pub fn vector_weight(&self) -> f32 {
        self.vector_weight
    }

    /// Normalized BM25-score weight.
    pub fn bm25_weight(&self) -> f32 {
        self.bm25_weight
    }

    /// Re-ranks candidates, truncating to `limit` when given.
    pub fn rerank(
        &self,
        _query: &str,
        results: Vec<SearchResult>,
        limit: Option<usize>,
    ) -> Vec<SearchResult> {
        if results.is_empty() {
            return results;
        }
        let candidate_count = results.len();

        let mut vector_hits: HashMap<String, SearchResult> = HashMap::new();
        let mut lexical_hits: HashMap<String, SearchResult> = HashMap::new();
        for result in results {
            match result.source {
                SearchSource::Vector => {
                    vector_hits.insert(result.document_id.clone(), result);
                }
                SearchSource::Lexical => {
                    lexical_hits.insert(result.document_id.clone(), result);
                }
            }
        }

        // BM25 component per id: lexical-origin candidates, plus the side
        // channel attached by the hybrid merge to vector-origin candidates.
        let mut bm25_scores: HashMap<String, f32> = lexical_hits
            .iter()
            .map(|(id, result)| (id.clone(), result.score))
            .collect();
        for (id, result) in &vector_hits {
            if let Some(score) = result
                .metadata
                .as_ref()
                .and_then(|m| m.get(BM25_SCORE_KEY))
                .and_then(|v| v.as_f64())
            {
                bm25_scores.entry(id.clone()).or_insert(score as f32);
            }
        }

        let ids: BTreeSet<String> = vector_hits
            .keys()
            .chain(lexical_hits.keys())
            .cloned()
            .collect();

        let mut reranked: Vec<SearchResult> = Vec::with_capacity(ids.len());
        for id in ids {
            let vector_score = vector_hits.get(&id).map(|r| r.score);
            let bm25_score = bm25_scores.get(&id).copied();

            let weighted = self.vector_weight * vector_score.unwrap_or(0.0)
                + self.bm25_weight * bm25_score.unwrap_or(0.0);

            // Vector result wins as the base record when both sources
            // contributed, mirroring the hybrid merge.
            let Some(mut base) = vector_hits
                .remove(&id)
                .or_else(|| lexical_hits.remove(&id))
            else {
                continue;
            };

            base.score = weighted;
            base.insert_metadata(
                HYBRID_SCORES_KEY,
                json!({
                    "vector": vector_score.unwrap_or(0.0),
                    "bm25": bm25_score.unwrap_or(0.0),
                    "weighted": weighted,
                }),
            );
            reranked.push(base);
        }

        sort_by_score(&mut reranked);
        if let Some(limit) = limit {
            reranked.truncate(limit);
        }

        debug!(
            candidates = candidate_count,
            returned = reranked.len(),
            "applied weighted-similarity re-ranking"
        );
        reranked
    }
}

impl Default for WeightedReranker {
    fn default() -> Self {
        Self::new(DEFAULT_VECTOR_WEIGHT, DEFAULT_BM25_WEIGHT)
    }
}

/// Score-descending sort with document-id tie break, shared by both
/// strategies so repeated runs produce identical orderings.
fn sort_by_score(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });
}
