//! Error types for loreseek-core.
//!
//! The engine distinguishes contract violations (hard errors surfaced to the
//! caller) from runtime degradation (absorbed, logged, and reported through
//! response metadata). Only the former appear in these enums' public uses;
//! backend failures are converted to empty candidate sets by the engine.

use thiserror::Error;

/// Errors surfaced through the query boundary.
///
/// Deleting an unknown document is reported as `false` from
/// [`delete_document`](crate::search::KnowledgeEngine::delete_document), not
/// as an error, and a query that tokenizes to nothing produces an empty
/// result set. The only hard failure is a malformed query object.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// The query violates the caller contract (e.g. a zero result limit).
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Errors reported by a vector search backend.
///
/// These never escape a query as a hard failure: the engine treats a failing
/// backend as a source that produced zero candidates.
#[derive(Debug, Clone, Error)]
pub enum VectorProviderError {
    /// Backend cannot be reached or reports itself unhealthy.
    #[error("vector backend unavailable: {0}")]
    Unavailable(String),
    /// Backend reached but the operation failed.
    #[error("vector backend error: {0}")]
    Backend(String),
}
