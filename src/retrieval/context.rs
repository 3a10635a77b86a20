//! Context assembly.
//!
//! Renders the ranked candidate list into the bounded, labeled context
//! string handed to the generator. Truncation is word-boundary safe,
//! deterministic, and always cuts the tail.

use super::types::ScoredCandidate;
use crate::config::ContextConfig;

/// Marker appended when the context exceeded its word budget.
const TRUNCATION_MARKER: &str = "... [truncated]";

/// Page label used when a chunk has no page metadata.
const UNKNOWN_PAGE: &str = "Unknown";

fn page_label(page: Option<u32>) -> String {
    match page {
        Some(page) => page.to_string(),
        None => UNKNOWN_PAGE.to_string(),
    }
}

/// Builds the labeled context string for a ranked candidate list.
///
/// Each candidate becomes a block of the form
/// `[Source {n} - Document: {id}, Page: {page}]` followed by the chunk
/// text; blocks are joined with blank lines. When the joined context
/// exceeds `max_context_words`, it is truncated to that many words and the
/// truncation marker is appended.
pub fn build_context(candidates: &[ScoredCandidate], config: &ContextConfig) -> String {
    let blocks: Vec<String> = candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            format!(
                "[Source {} - Document: {}, Page: {}]\n{}\n",
                i + 1,
                candidate.result.document_id,
                page_label(candidate.result.page),
                candidate.result.text.trim()
            )
        })
        .collect();

    truncate_to_words(blocks.join("\n"), config.max_context_words)
}

/// Builds the grouped context for a document comparison.
///
/// Documents appear in the order requested. A document that contributed no
/// candidates gets an explicit placeholder so the generator knows it was
/// consulted and came up empty.
pub fn build_comparison_context(per_document: &[(String, Vec<ScoredCandidate>)]) -> String {
    let mut parts: Vec<String> = Vec::new();

    for (document_id, candidates) in per_document {
        if candidates.is_empty() {
            parts.push(format!(
                "\n--- Document {} ---\nNo relevant content found.\n",
                document_id
            ));
            continue;
        }

        parts.push(format!("\n--- Document {} ---", document_id));
        for candidate in candidates {
            parts.push(format!(
                "Page {}: {}",
                page_label(candidate.result.page),
                candidate.result.text.trim()
            ));
        }
    }

    parts.join("\n")
}

/// Truncates `text` to at most `max_words` whitespace-separated words,
/// appending the truncation marker when anything was cut.
fn truncate_to_words(text: String, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text;
    }
    let mut truncated = words[..max_words].join(" ");
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::types::{ChunkId, ScoredCandidate, SearchResult};

    fn candidate(document_id: &str, text: &str, page: Option<u32>) -> ScoredCandidate {
        ScoredCandidate {
            result: SearchResult {
                chunk_id: ChunkId::new(document_id, 0),
                document_id: document_id.to_string(),
                text: text.to_string(),
                score: 0.9,
                page,
            },
            quality_score: 0.5,
            combined_score: 0.7,
        }
    }

    #[test]
    fn context_labels_sources_in_order() {
        let config = ContextConfig::default();
        let candidates = vec![
            candidate("report", "First passage.", Some(3)),
            candidate("manual", "Second passage.", None),
        ];

        let context = build_context(&candidates, &config);
        assert!(context.contains("[Source 1 - Document: report, Page: 3]"));
        assert!(context.contains("[Source 2 - Document: manual, Page: Unknown]"));
        assert!(context.contains("First passage."));
        let first = context.find("First passage.").unwrap();
        let second = context.find("Second passage.").unwrap();
        assert!(first < second);
    }

    #[test]
    fn context_truncates_at_word_budget() {
        let config = ContextConfig {
            max_context_words: 20,
        };
        let text = (0..100)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let candidates = vec![candidate("doc", &text, Some(1))];

        let context = build_context(&candidates, &config);
        assert!(context.ends_with("... [truncated]"));
        let body = context.trim_end_matches("... [truncated]");
        assert_eq!(body.split_whitespace().count(), 20);
    }

    #[test]
    fn context_under_budget_is_untouched() {
        let config = ContextConfig::default();
        let candidates = vec![candidate("doc", "Short passage.", Some(1))];
        let context = build_context(&candidates, &config);
        assert!(!context.contains("[truncated]"));
    }

    #[test]
    fn truncation_is_deterministic() {
        let config = ContextConfig {
            max_context_words: 15,
        };
        let text = (0..50)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let candidates = vec![candidate("doc", &text, None)];

        let first = build_context(&candidates, &config);
        let second = build_context(&candidates, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn comparison_context_groups_by_document() {
        let groups = vec![
            (
                "alpha".to_string(),
                vec![candidate("alpha", "Alpha content.", Some(2))],
            ),
            ("beta".to_string(), Vec::new()),
        ];

        let context = build_comparison_context(&groups);
        assert!(context.contains("--- Document alpha ---"));
        assert!(context.contains("Page 2: Alpha content."));
        assert!(context.contains("--- Document beta ---"));
        assert!(context.contains("No relevant content found."));
    }
}
