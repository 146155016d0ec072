//! Vector search backend boundary.
//!
//! The engine consumes vector similarity search through the
//! [`VectorSearchProvider`] trait and treats the backend as a black box: it
//! returns scored candidates, already sorted, with similarities in `[0, 1]`.
//! A backend that cannot be reached reports an error which the engine
//! absorbs as "zero candidates from this source".
//!
//! [`InMemoryVectorProvider`] is the bundled implementation: a cosine
//! similarity scan over stored embeddings. It keeps the engine, CLI, and
//! tests runnable without a network backend and doubles as the reference
//! for the provider contract.

use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::VectorProviderError;
use crate::search::tokenizer::tokenize;
use crate::search::types::{matches_filters, Document, Metadata, SearchResult, SearchSource};

/// Derives an embedding from raw text.
///
/// Injected into [`InMemoryVectorProvider`] so callers choose how query
/// text and embedding-less documents are vectorized.
pub type EmbedFn = Arc<dyn Fn(&str) -> Vec<f32> + Send + Sync>;

/// Interface to an external vector-similarity backend.
///
/// Implementations maintain their own copy of submitted documents; the
/// engine never shares index state with them. All scores returned by
/// [`search`](VectorSearchProvider::search) are similarities in `[0, 1]`,
/// higher is more similar, sorted descending.
#[async_trait]
pub trait VectorSearchProvider: Send + Sync {
    /// Submits documents to the backend. Existing ids are replaced.
    async fn add_documents(&self, documents: &[Document]) -> Result<(), VectorProviderError>;

    /// Runs a similarity search for the query text.
    ///
    /// `filters` carries the same exact-match metadata semantics as the
    /// lexical index. An unreachable backend returns
    /// [`VectorProviderError::Unavailable`] rather than panicking; callers
    /// degrade to zero candidates.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>, VectorProviderError>;

    /// Removes a document. Returns `false` when the id is unknown.
    async fn delete_document(&self, id: &str) -> Result<bool, VectorProviderError>;

    /// Health flag for observability. `false` means searches will degrade.
    fn is_available(&self) -> bool;
}

/// In-memory cosine-similarity provider.
///
/// Documents submitted without an embedding are vectorized with the
/// injected [`EmbedFn`], mirroring backends that embed server-side. The
/// availability flag can be toggled to simulate an outage.
pub struct InMemoryVectorProvider {
    documents: RwLock<HashMap<String, (Document, Vec<f32>)>>,
    embedder: EmbedFn,
    available: AtomicBool,
}

impl InMemoryVectorProvider {
    /// Creates a provider with a caller-supplied embedder.
    pub fn new(embedder: EmbedFn) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            embedder,
            available: AtomicBool::new(true),
        }
    }

    /// Creates a provider backed by the deterministic hashed embedder.
    pub fn with_hashed_embedder(dimension: usize) -> Self {
        Self::new(hashed_embedder(dimension))
    }

    /// Toggles the simulated backend availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), VectorProviderError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(VectorProviderError::Unavailable(
                "backend marked unavailable".to_string(),
            ))
        }
    }
}

#[async_trait]
impl VectorSearchProvider for InMemoryVectorProvider {
    async fn add_documents(&self, documents: &[Document]) -> Result<(), VectorProviderError> {
        self.ensure_available()?;

        let mut store = self.documents.write().await;
        for doc in documents {
            let embedding = doc
                .embedding
                .clone()
                .unwrap_or_else(|| (self.embedder)(&doc.content));
            store.insert(doc.id.clone(), (doc.clone(), embedding));
        }
        debug!(count = documents.len(), total = store.len(), "stored embeddings");
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>, VectorProviderError> {
        self.ensure_available()?;

        let query_embedding = (self.embedder)(query);
        let store = self.documents.read().await;

        let mut results: Vec<SearchResult> = store
            .values()
            .filter(|(doc, _)| match filters {
                Some(filters) => matches_filters(doc.metadata.as_ref(), filters),
                None => true,
            })
            .map(|(doc, embedding)| SearchResult {
                document_id: doc.id.clone(),
                content: doc.content.clone(),
                // Cosine similarity clamped into the [0, 1] contract range.
                score: cosine_similarity(&query_embedding, embedding).max(0.0),
                metadata: doc.metadata.clone(),
                source: SearchSource::Vector,
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        results.truncate(limit);
        Ok(results)
    }

    async fn delete_document(&self, id: &str) -> Result<bool, VectorProviderError> {
        self.ensure_available()?;
        Ok(self.documents.write().await.remove(id).is_some())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

/// Cosine similarity between two vectors.
///
/// Returns 0 for mismatched dimensions or zero-magnitude inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Deterministic bag-of-tokens embedder.
///
/// Hashes each token into one of `dimension` buckets and L2-normalizes the
/// resulting histogram. Not a semantic model; it provides stable, reasonably
/// spread vectors for demos and tests without pulling in an inference stack.
pub fn hashed_embedder(dimension: usize) -> EmbedFn {
    Arc::new(move |text: &str| {
        let mut vector = vec![0.0f32; dimension.max(1)];
        for token in tokenize(text) {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            hasher.write(token.as_bytes());
            let bucket = (hasher.finish() % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> InMemoryVectorProvider {
        InMemoryVectorProvider::with_hashed_embedder(64)
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_hashed_embedder_is_deterministic_and_normalized() {
        let embed = hashed_embedder(32);
        let a = embed("rust systems programming");
        let b = embed("rust systems programming");
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_search_scores_sorted_and_in_range() {
        // Fixed query embedding plus explicit document embeddings give an
        // exactly known ordering.
        let provider = InMemoryVectorProvider::new(Arc::new(|_: &str| vec![1.0, 0.0, 0.0]));
        provider
            .add_documents(&[
                Document::new("far", "unrelated").with_embedding(vec![0.0, 1.0, 0.0]),
                Document::new("near", "exact match").with_embedding(vec![1.0, 0.0, 0.0]),
                Document::new("mid", "partial match").with_embedding(vec![0.6, 0.8, 0.0]),
            ])
            .await
            .unwrap();

        let results = provider.search("query", 10, None).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].document_id, "near");
        assert_eq!(results[1].document_id, "mid");
        assert_eq!(results[2].document_id, "far");
        for result in &results {
            assert!((0.0..=1.0).contains(&result.score));
            assert_eq!(result.source, SearchSource::Vector);
        }
    }

    #[tokio::test]
    async fn test_identical_text_scores_highest() {
        let provider = provider();
        provider
            .add_documents(&[
                Document::new("target", "rust memory safety"),
                Document::new("other", "completely different words"),
            ])
            .await
            .unwrap();

        let results = provider.search("rust memory safety", 10, None).await.unwrap();
        assert_eq!(results[0].document_id, "target");
        assert!(results[0].score > 0.9);
    }

    #[tokio::test]
    async fn test_precomputed_embeddings_take_precedence() {
        let provider = provider();
        provider
            .add_documents(&[
                Document::new("match", "irrelevant words").with_embedding(vec![1.0; 64]),
                Document::new("other", "irrelevant words").with_embedding(vec![-1.0; 64]),
            ])
            .await
            .unwrap();

        // Query embedding is a token histogram with non-negative entries,
        // so the all-ones document aligns and the all-negative one clamps
        // to zero.
        let results = provider.search("anything at all", 10, None).await.unwrap();
        assert_eq!(results[0].document_id, "match");
        assert!(results[0].score > 0.0);
        let other = results.iter().find(|r| r.document_id == "other").unwrap();
        assert_eq!(other.score, 0.0);
    }

    #[tokio::test]
    async fn test_filters_apply() {
        let provider = provider();
        provider
            .add_documents(&[
                Document::new("en", "rust guide").with_metadata(
                    [("lang".to_string(), json!("en"))].into_iter().collect(),
                ),
                Document::new("de", "rust guide").with_metadata(
                    [("lang".to_string(), json!("de"))].into_iter().collect(),
                ),
            ])
            .await
            .unwrap();

        let filters: Metadata = [("lang".to_string(), json!("en"))].into_iter().collect();
        let results = provider.search("rust guide", 10, Some(&filters)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, "en");
    }

    #[tokio::test]
    async fn test_delete_document() {
        let provider = provider();
        provider
            .add_documents(&[Document::new("a", "rust guide")])
            .await
            .unwrap();

        assert!(provider.delete_document("a").await.unwrap());
        assert!(!provider.delete_document("a").await.unwrap());
        assert!(provider.search("rust", 10, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_backend_reports_error() {
        let provider = provider();
        provider.set_available(false);
        assert!(!provider.is_available());

        let err = provider.search("rust", 10, None).await.unwrap_err();
        assert!(matches!(err, VectorProviderError::Unavailable(_)));
    }
}
