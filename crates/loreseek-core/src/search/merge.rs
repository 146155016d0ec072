//! Hybrid candidate-set merge.
//!
//! Combines vector and lexical result lists into one list keyed by document
//! id. Lexical (BM25) scores and vector similarities live on different
//! scales, so the merge never mixes them numerically: a document found by
//! both sources keeps the vector record and carries its BM25 score in a
//! metadata side channel for re-ranking to consume.

use std::collections::HashMap;

use tracing::debug;

use crate::search::types::SearchResult;

/// Metadata key under which the merge attaches the lexical score of a
/// document that both sources returned.
pub const BM25_SCORE_KEY: &str = "bm25_score";

/// Merges vector and lexical candidates into one provisional ranking.
///
/// - A document id present in only one list is carried through unchanged.
/// - A document id present in both keeps the vector result as the base
///   record (content and metadata from the vector source) and gains the
///   lexical score under [`BM25_SCORE_KEY`].
///
/// The output is sorted by each result's own score, descending, ties broken
/// by document id. This ordering is provisional: it exists to hand
/// re-ranking a stable list, not to compare scores across the two scales.
pub fn merge_hybrid_results(
    vector_results: Vec<SearchResult>,
    lexical_results: Vec<SearchResult>,
) -> Vec<SearchResult> {
    let vector_count = vector_results.len();
    let lexical_count = lexical_results.len();

    let mut combined: HashMap<String, SearchResult> = HashMap::new();
    for result in vector_results {
        combined.insert(result.document_id.clone(), result);
    }

    for result in lexical_results {
        match combined.get_mut(&result.document_id) {
            Some(existing) => {
                existing.insert_metadata(BM25_SCORE_KEY, serde_json::json!(result.score));
            }
            None => {
                combined.insert(result.document_id.clone(), result);
            }
        }
    }

    let mut merged: Vec<SearchResult> = combined.into_values().collect();
    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });

    debug!(
        vector = vector_count,
        lexical = lexical_count,
        merged = merged.len(),
        "merged hybrid candidates"
    );
    merged
}
