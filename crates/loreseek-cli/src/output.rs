//! Terminal output formatting for search responses and statistics.

use loreseek_core::{EngineStats, SearchResponse};

/// Maximum characters of content shown per result line.
const SNIPPET_CHARS: usize = 120;

/// Formats a search response for human consumption.
pub fn format_response(response: &SearchResponse) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{} result(s) for {:?} via {} in {:.1}ms",
        response.total_found, response.query, response.search_method, response.processing_time_ms
    ));
    if response.reranking_applied {
        out.push_str(" (re-ranked)");
    }
    out.push('\n');

    if let Some(error) = response.metadata.get("error").and_then(|v| v.as_str()) {
        out.push_str(&format!("warning: {error}\n"));
    }

    for (rank, result) in response.results.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. [{:.4}] {} ({})\n     {}\n",
            rank + 1,
            result.score,
            result.document_id,
            match result.source {
                loreseek_core::SearchSource::Lexical => "lexical",
                loreseek_core::SearchSource::Vector => "vector",
            },
            snippet(&result.content),
        ));
    }

    out.trim_end().to_string()
}

/// Formats engine statistics for human consumption.
pub fn format_stats(stats: &EngineStats) -> String {
    format!(
        "documents: {}\nterms: {}\navg document length: {:.2} tokens\nbm25 parameters: k1={}, b={}\nvector backend: {}\nrerank weights: vector={:.2}, bm25={:.2}",
        stats.index.document_count,
        stats.index.term_count,
        stats.index.average_document_length,
        stats.index.k1,
        stats.index.b,
        if stats.vector_available { "available" } else { "unavailable" },
        stats.vector_weight,
        stats.bm25_weight,
    )
}

/// Truncates content to a single display line.
fn snippet(content: &str) -> String {
    let flattened: String = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= SNIPPET_CHARS {
        flattened
    } else {
        let truncated: String = flattened.chars().take(SNIPPET_CHARS).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_truncation() {
        assert_eq!(snippet("short text"), "short text");

        let long = "word ".repeat(100);
        let shown = snippet(&long);
        assert!(shown.chars().count() <= SNIPPET_CHARS + 1);
        assert!(shown.ends_with('…'));
    }

    #[test]
    fn test_snippet_flattens_whitespace() {
        assert_eq!(snippet("line one\nline\ttwo"), "line one line two");
    }
}
