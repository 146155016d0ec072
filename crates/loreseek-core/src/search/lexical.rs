//! BM25 lexical index.
//!
//! A hand-rolled inverted index with Okapi BM25 scoring. The index owns its
//! documents, per-document token counts, a document-frequency table, and the
//! corpus-wide average document length. Every mutating call leaves the index
//! fully consistent: postings, document frequencies, and statistics are
//! updated together before the call returns, so there is no observable
//! dirty state.
//!
//! # Scoring
//!
//! For a document `d` and the distinct terms `t` of a query:
//!
//! ```text
//! IDF(t)      = ln((N - df(t) + 0.5) / (df(t) + 0.5)), floored at 0
//! score(d, q) = Σ_t IDF(t) * tf(t,d) * (k1 + 1)
//!                     / (tf(t,d) + k1 * (1 - b + b * len(d) / avg_len))
//! ```
//!
//! Repeating a term in the query does not amplify its contribution;
//! standard BM25 iterates distinct query terms, each weighted once by the
//! document-side term frequency.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::config::{DEFAULT_BM25_B, DEFAULT_BM25_K1};
use crate::search::tokenizer::tokenize;
use crate::search::types::{matches_filters, Document, IndexStats, Metadata, SearchResult, SearchSource};

/// In-memory BM25 index with incremental add and delete.
///
/// `k1` and `b` are fixed at construction. Documents are replaced wholesale
/// when re-added under an existing id: the previous postings are removed
/// first, so the document-frequency table never double-counts a document.
///
/// # Thread safety
///
/// This type is **not** thread-safe. The engine wraps it in a single
/// reader-writer lock, which serializes mutations against each other and
/// against concurrent searches.
#[derive(Debug)]
pub struct LexicalIndex {
    k1: f32,
    b: f32,
    /// Stored documents by id.
    documents: HashMap<String, Document>,
    /// Token count per document.
    doc_lengths: HashMap<String, u32>,
    /// Corpus-wide average token count, recomputed after every mutation.
    avg_doc_length: f32,
    /// term -> (doc id -> term frequency). Empty postings maps are removed
    /// immediately; there are no tombstones.
    inverted: HashMap<String, HashMap<String, u32>>,
    /// term -> number of distinct documents containing it. Kept in exact
    /// sync with `inverted`.
    doc_frequencies: HashMap<String, u32>,
}

impl LexicalIndex {
    /// Creates an empty index with the standard BM25 parameters.
    pub fn new() -> Self {
        Self::with_params(DEFAULT_BM25_K1, DEFAULT_BM25_B)
    }

    /// Creates an empty index with explicit `k1` and `b` parameters.
    pub fn with_params(k1: f32, b: f32) -> Self {
        Self {
            k1,
            b,
            documents: HashMap::new(),
            doc_lengths: HashMap::new(),
            avg_doc_length: 0.0,
            inverted: HashMap::new(),
            doc_frequencies: HashMap::new(),
        }
    }

    /// Adds a batch of documents to the index.
    ///
    /// Each document is tokenized and its term frequencies recorded in the
    /// inverted index. An id that is already present is replaced: the old
    /// postings are removed before the new content is indexed. Statistics
    /// are recomputed once after the whole batch.
    pub fn add_documents(&mut self, documents: Vec<Document>) {
        if documents.is_empty() {
            return;
        }
        let batch = documents.len();

        for doc in documents {
            if self.documents.contains_key(&doc.id) {
                debug!(id = %doc.id, "replacing existing document");
                self.remove_postings(&doc.id);
            }

            let mut term_freqs: HashMap<String, u32> = HashMap::new();
            let mut doc_length = 0u32;
            for token in tokenize(&doc.content) {
                doc_length += 1;
                *term_freqs.entry(token).or_insert(0) += 1;
            }

            self.doc_lengths.insert(doc.id.clone(), doc_length);
            for (term, tf) in term_freqs {
                self.inverted
                    .entry(term.clone())
                    .or_default()
                    .insert(doc.id.clone(), tf);
                *self.doc_frequencies.entry(term).or_insert(0) += 1;
            }
            self.documents.insert(doc.id.clone(), doc);
        }

        self.recompute_statistics();
        debug!(
            added = batch,
            total = self.documents.len(),
            "updated lexical index"
        );
    }

    /// Removes a document from the index.
    ///
    /// Returns `false` when the id is unknown. On success the document's
    /// postings are removed from every term it touched, document
    /// frequencies are decremented, drained terms leave the vocabulary,
    /// and statistics are recomputed.
    pub fn delete_document(&mut self, id: &str) -> bool {
        if !self.documents.contains_key(id) {
            return false;
        }

        self.remove_postings(id);
        self.documents.remove(id);
        self.recompute_statistics();
        debug!(%id, total = self.documents.len(), "deleted document");
        true
    }

    /// Runs a BM25 search over the index.
    ///
    /// Documents that match no query term are excluded rather than returned
    /// with a zero score. When `filters` is given, a document must carry
    /// every filter key with an exactly equal metadata value to be scored
    /// at all. Results are ordered by score descending with ties broken by
    /// document id, so repeated queries against an unchanged index return
    /// an identical ordering.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        filters: Option<&Metadata>,
    ) -> Vec<SearchResult> {
        if self.documents.is_empty() {
            return Vec::new();
        }

        // Distinct query terms only: query-side term frequency deliberately
        // does not weight the sum (standard BM25 behavior).
        let query_terms: BTreeSet<String> = tokenize(query).collect();
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scores: HashMap<&str, f32> = HashMap::new();
        for term in &query_terms {
            let Some(postings) = self.inverted.get(term) else {
                continue;
            };
            let idf = self.idf(term);
            if idf <= 0.0 {
                continue;
            }

            for (doc_id, tf) in postings {
                if let Some(filters) = filters {
                    let doc = &self.documents[doc_id];
                    if !matches_filters(doc.metadata.as_ref(), filters) {
                        continue;
                    }
                }

                let doc_length = *self.doc_lengths.get(doc_id).unwrap_or(&0) as f32;
                let tf = *tf as f32;
                let denom = tf
                    + self.k1
                        * (1.0 - self.b + self.b * doc_length / self.avg_doc_length);
                *scores.entry(doc_id.as_str()).or_insert(0.0) +=
                    idf * tf * (self.k1 + 1.0) / denom;
            }
        }

        let mut ranked: Vec<(&str, f32)> = scores
            .into_iter()
            .filter(|&(_, score)| score > 0.0)
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        ranked.truncate(limit);

        ranked
            .into_iter()
            .map(|(doc_id, score)| {
                let doc = &self.documents[doc_id];
                SearchResult {
                    document_id: doc.id.clone(),
                    content: doc.content.clone(),
                    score,
                    metadata: doc.metadata.clone(),
                    source: SearchSource::Lexical,
                }
            })
            .collect()
    }

    /// Returns read-only index statistics.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            document_count: self.documents.len(),
            term_count: self.inverted.len(),
            average_document_length: self.avg_doc_length,
            k1: self.k1,
            b: self.b,
        }
    }

    /// Lists the documents containing each of the given terms.
    ///
    /// Debugging helper for index introspection. Terms are lowercased
    /// before lookup; document ids are returned sorted.
    pub fn documents_for_terms(&self, terms: &[&str]) -> HashMap<String, Vec<String>> {
        terms
            .iter()
            .map(|term| {
                let normalized = term.to_lowercase();
                let mut ids: Vec<String> = self
                    .inverted
                    .get(&normalized)
                    .map(|postings| postings.keys().cloned().collect())
                    .unwrap_or_default();
                ids.sort();
                (term.to_string(), ids)
            })
            .collect()
    }

    /// Returns the number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if no documents have been indexed.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Returns `true` if the given document id is indexed.
    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Removes a document's postings and length entry without touching the
    /// stored document or the statistics. Shared by delete and replace.
    fn remove_postings(&mut self, doc_id: &str) {
        let Some(doc) = self.documents.get(doc_id) else {
            return;
        };
        let terms: BTreeSet<String> = tokenize(&doc.content).collect();

        for term in terms {
            let Some(postings) = self.inverted.get_mut(&term) else {
                continue;
            };
            if postings.remove(doc_id).is_none() {
                continue;
            }
            if postings.is_empty() {
                self.inverted.remove(&term);
            }
            match self.doc_frequencies.get_mut(&term) {
                Some(df) if *df > 1 => *df -= 1,
                _ => {
                    self.doc_frequencies.remove(&term);
                }
            }
        }

        self.doc_lengths.remove(doc_id);
    }

    /// Recomputes the average document length from scratch.
    ///
    /// The average must be exact after every mutation, so it is re-summed
    /// over the full corpus rather than adjusted incrementally.
    fn recompute_statistics(&mut self) {
        if self.documents.is_empty() {
            self.avg_doc_length = 0.0;
            return;
        }
        let total: u64 = self.doc_lengths.values().map(|&len| len as u64).sum();
        self.avg_doc_length = total as f32 / self.documents.len() as f32;
    }

    /// Inverse document frequency, floored at zero.
    fn idf(&self, term: &str) -> f32 {
        let df = match self.doc_frequencies.get(term) {
            Some(&df) if df > 0 => df as f32,
            _ => return 0.0,
        };
        let n = self.documents.len() as f32;
        (((n - df + 0.5) / (df + 0.5)).ln()).max(0.0)
    }
}

impl Default for LexicalIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn corpus() -> LexicalIndex {
        let mut index = LexicalIndex::new();
        index.add_documents(vec![
            Document::new("a", "python programming tutorial"),
            Document::new("b", "machine learning and ai"),
            Document::new("c", "database design patterns"),
        ]);
        index
    }

    #[test]
    fn test_indexed_document_is_findable() {
        let index = corpus();
        let results = index.search("python programming", 10, None);

        assert_eq!(results[0].document_id, "a");
        assert!(results[0].score > 0.0);
        assert!(results.iter().all(|r| r.document_id != "c"));
        assert!(results
            .iter()
            .all(|r| r.source == SearchSource::Lexical));
    }

    #[test]
    fn test_unmatched_query_returns_empty() {
        let index = corpus();
        assert!(index.search("nonexistent xyz", 10, None).is_empty());
    }

    #[test]
    fn test_empty_query_returns_empty() {
        let index = corpus();
        assert!(index.search("", 10, None).is_empty());
        assert!(index.search("! ? .", 10, None).is_empty());
    }

    #[test]
    fn test_search_empty_index() {
        let index = LexicalIndex::new();
        assert!(index.search("anything", 10, None).is_empty());
    }

    #[test]
    fn test_delete_removes_document_and_statistics() {
        let mut index = corpus();

        assert!(index.delete_document("a"));
        assert!(index.search("python programming", 10, None).is_empty());
        assert_eq!(index.len(), 2);
        assert!(!index.contains("a"));
        assert!(index.contains("b"));

        // "python" was unique to document a, so the term left the vocabulary.
        let term_docs = index.documents_for_terms(&["python"]);
        assert!(term_docs["python"].is_empty());

        // Statistics reflect the remaining corpus.
        let stats = index.stats();
        assert_eq!(stats.document_count, 2);
        let expected = (4.0 + 3.0) / 2.0; // "machine learning and ai" + "database design patterns"
        assert!((stats.average_document_length - expected).abs() < 1e-6);
    }

    #[test]
    fn test_delete_unknown_id_returns_false() {
        let mut index = corpus();
        assert!(!index.delete_document("ghost"));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_readd_replaces_instead_of_double_counting() {
        let mut index = corpus();
        let stats_before = index.stats();

        // Re-adding the identical batch must leave postings and statistics
        // untouched, not double document frequencies.
        index.add_documents(vec![
            Document::new("a", "python programming tutorial"),
            Document::new("b", "machine learning and ai"),
            Document::new("c", "database design patterns"),
        ]);

        let stats_after = index.stats();
        assert_eq!(stats_after.document_count, stats_before.document_count);
        assert_eq!(stats_after.term_count, stats_before.term_count);
        assert!(
            (stats_after.average_document_length - stats_before.average_document_length).abs()
                < 1e-6
        );

        // One delete fully removes the document, as if it was added once.
        assert!(index.delete_document("a"));
        assert!(index.search("python", 10, None).is_empty());
        assert!(index.documents_for_terms(&["python"])["python"].is_empty());
    }

    #[test]
    fn test_readd_with_new_content_drops_old_terms() {
        let mut index = corpus();
        index.add_documents(vec![Document::new("a", "rust ownership model")]);

        assert!(index.search("python", 10, None).is_empty());
        let results = index.search("ownership", 10, None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, "a");
        assert_eq!(results[0].content, "rust ownership model");
    }

    #[test]
    fn test_score_monotonic_in_term_frequency() {
        // Same length, increasing tf for the query term. Padding documents
        // keep the term's document frequency below half the corpus so its
        // IDF stays positive.
        let mut index = LexicalIndex::new();
        index.add_documents(vec![
            Document::new("one", "rust filler filler filler"),
            Document::new("two", "rust rust filler filler"),
            Document::new("three", "rust rust rust filler"),
            Document::new("pad1", "unrelated text about gardening"),
            Document::new("pad2", "unrelated text about cooking"),
            Document::new("pad3", "unrelated text about sailing"),
            Document::new("pad4", "unrelated text about painting"),
        ]);

        let results = index.search("rust", 10, None);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].document_id, "three");
        assert_eq!(results[1].document_id, "two");
        assert_eq!(results[2].document_id, "one");
        assert!(results[0].score > results[1].score);
        assert!(results[1].score > results[2].score);
    }

    #[test]
    fn test_idf_floors_at_zero_for_ubiquitous_terms() {
        // A term present in every document has a negative raw IDF and must
        // contribute nothing, which excludes documents matching only it.
        let mut index = LexicalIndex::new();
        index.add_documents(vec![
            Document::new("a", "common alpha"),
            Document::new("b", "common beta"),
            Document::new("c", "common gamma"),
        ]);

        assert!(index.search("common", 10, None).is_empty());
        let results = index.search("common alpha", 10, None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, "a");
    }

    #[test]
    fn test_repeated_query_terms_do_not_amplify() {
        let index = corpus();
        let once = index.search("python", 10, None);
        let thrice = index.search("python python python", 10, None);
        assert_eq!(once.len(), thrice.len());
        assert!((once[0].score - thrice[0].score).abs() < 1e-6);
    }

    #[test]
    fn test_filters_exclude_before_scoring() {
        let mut index = LexicalIndex::new();
        index.add_documents(vec![
            Document::new("en", "rust tutorial").with_metadata(
                [("lang".to_string(), json!("en"))].into_iter().collect(),
            ),
            Document::new("de", "rust tutorial").with_metadata(
                [("lang".to_string(), json!("de"))].into_iter().collect(),
            ),
            Document::new("pad1", "unrelated gardening notes"),
            Document::new("pad2", "unrelated cooking notes"),
            Document::new("pad3", "unrelated sailing notes"),
        ]);

        let filters: Metadata = [("lang".to_string(), json!("en"))].into_iter().collect();
        let results = index.search("rust tutorial", 10, Some(&filters));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, "en");

        // A document without metadata never matches a non-empty filter.
        let filters: Metadata = [("lang".to_string(), json!("fr"))].into_iter().collect();
        assert!(index.search("rust", 10, Some(&filters)).is_empty());
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let mut index = LexicalIndex::new();
        // Identical content yields identical scores; padding keeps the
        // shared terms' IDF positive.
        index.add_documents(vec![
            Document::new("zeta", "shared term"),
            Document::new("alpha", "shared term"),
            Document::new("pad1", "unrelated gardening notes"),
            Document::new("pad2", "unrelated cooking notes"),
            Document::new("pad3", "unrelated sailing notes"),
        ]);

        for _ in 0..5 {
            let results = index.search("shared term", 10, None);
            assert_eq!(results.len(), 2);
            assert_eq!(results[0].document_id, "alpha");
            assert_eq!(results[1].document_id, "zeta");
        }
    }

    #[test]
    fn test_limit_truncates() {
        let mut index = LexicalIndex::new();
        let mut docs: Vec<Document> = (0..4)
            .map(|i| Document::new(format!("doc{i}"), format!("shared unique{i}")))
            .collect();
        docs.extend((0..6).map(|i| Document::new(format!("pad{i}"), format!("padding text {i}{i}"))));
        index.add_documents(docs);

        assert_eq!(index.search("shared", 3, None).len(), 3);
    }

    #[test]
    fn test_stats_on_empty_index() {
        let index = LexicalIndex::new();
        assert!(index.is_empty());
        let stats = index.stats();
        assert_eq!(stats.document_count, 0);
        assert_eq!(stats.term_count, 0);
        assert_eq!(stats.average_document_length, 0.0);
        assert_eq!(stats.k1, DEFAULT_BM25_K1);
        assert_eq!(stats.b, DEFAULT_BM25_B);
    }

    #[test]
    fn test_documents_for_terms_lowercases_lookup() {
        let index = corpus();
        let term_docs = index.documents_for_terms(&["Python", "missing"]);
        assert_eq!(term_docs["Python"], vec!["a".to_string()]);
        assert!(term_docs["missing"].is_empty());
    }
}
