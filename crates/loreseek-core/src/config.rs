//! Engine configuration and production defaults.
//!
//! These values are used throughout the codebase and in benchmarks to keep
//! the production configuration in one place.

use std::time::Duration;

/// BM25 term-frequency saturation parameter (`k1`).
///
/// Standard Okapi BM25 default. Higher values let repeated terms keep
/// contributing to the score for longer before saturating.
pub const DEFAULT_BM25_K1: f32 = 1.2;

/// BM25 length-normalization strength (`b`).
///
/// Standard Okapi BM25 default. `b = 0` disables length normalization,
/// `b = 1` normalizes fully by document length.
pub const DEFAULT_BM25_B: f32 = 0.75;

/// Default weight for vector-similarity scores in weighted re-ranking.
pub const DEFAULT_VECTOR_WEIGHT: f32 = 0.7;

/// Default weight for BM25 scores in weighted re-ranking.
pub const DEFAULT_BM25_WEIGHT: f32 = 0.3;

/// How many candidates each source fetches, as a multiple of the requested
/// result limit. The extra headroom gives re-ranking something to reorder.
pub const CANDIDATE_MULTIPLIER: usize = 2;

/// Minimum token length (in characters) kept by the tokenizer.
///
/// Single-character fragments carry almost no ranking signal and inflate
/// the vocabulary, so they are dropped at tokenization time.
pub const MIN_TOKEN_LEN: usize = 2;

/// Engine-level configuration, injected at construction time.
///
/// All parameters are immutable once the engine is built. The BM25
/// parameters configure the lexical index; the weights configure the
/// weighted-similarity re-ranker; `vector_timeout` bounds how long a single
/// query waits on the vector backend (the lexical path is in-memory and
/// needs no timeout).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// BM25 `k1` parameter.
    pub k1: f32,
    /// BM25 `b` parameter.
    pub b: f32,
    /// Weight applied to vector scores by the weighted re-ranker.
    pub vector_weight: f32,
    /// Weight applied to BM25 scores by the weighted re-ranker.
    pub bm25_weight: f32,
    /// Per-query timeout for the vector backend. `None` disables the bound.
    pub vector_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            k1: DEFAULT_BM25_K1,
            b: DEFAULT_BM25_B,
            vector_weight: DEFAULT_VECTOR_WEIGHT,
            bm25_weight: DEFAULT_BM25_WEIGHT,
            vector_timeout: Some(Duration::from_secs(5)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_standard_bm25_parameters() {
        let config = EngineConfig::default();
        assert_eq!(config.k1, 1.2);
        assert_eq!(config.b, 0.75);
    }

    #[test]
    fn test_default_weights_favor_vector_scores() {
        let config = EngineConfig::default();
        assert!(config.vector_weight > config.bm25_weight);
        assert!((config.vector_weight + config.bm25_weight - 1.0).abs() < f32::EPSILON);
    }
}
