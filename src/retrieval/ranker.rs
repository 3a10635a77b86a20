//! Filter-score-diversify ranking pipeline.
//!
//! Pure and deterministic: no I/O, no clocks, no randomness. Raw similarity
//! hits go through three stages:
//!
//! 1. a relevance filter dropping low-score and too-short candidates,
//! 2. heuristic quality scoring blended with raw similarity,
//! 3. a greedy diversity filter that removes near-duplicate passages.
//!
//! The output is at most `max_sources` candidates, highest combined score
//! first, pairwise below the configured Jaccard threshold.

use super::types::{ScoredCandidate, SearchResult};
use crate::config::RankerConfig;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Common English stop words excluded from the query keyword set.
///
/// Deliberately small: the goal is to keep "what", "is", "the" out of the
/// overlap signal, not to do real linguistics.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "could", "did",
        "do", "does", "for", "from", "had", "has", "have", "how", "i", "if", "in", "into", "is",
        "it", "its", "me", "my", "no", "not", "of", "on", "or", "our", "should", "so", "than",
        "that", "the", "their", "them", "then", "there", "these", "they", "this", "to", "was",
        "we", "were", "what", "when", "where", "which", "who", "why", "will", "with", "would",
        "you", "your",
    ]
    .into_iter()
    .collect()
});

/// Phrases that signal the query is asking for a quantity.
const QUANTITY_PHRASES: &[&str] = &[
    "how many",
    "how much",
    "percentage",
    "percent",
    "number of",
];

/// Lowercased alphanumeric tokens of `text`, in order.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// The query's keyword set: tokens minus stop words. Falls back to the full
/// token set when every token is a stop word, so the overlap signal never
/// divides by zero on queries like "what is it".
fn query_keywords(query: &str) -> HashSet<String> {
    let tokens = tokenize(query);
    let keywords: HashSet<String> = tokens
        .iter()
        .filter(|token| !STOP_WORDS.contains(token.as_str()))
        .cloned()
        .collect();
    if keywords.is_empty() {
        tokens.into_iter().collect()
    } else {
        keywords
    }
}

/// Heuristic quality score for a chunk against a query, in `[0, 1]`.
///
/// Sums the weighted signals described in the module docs and clamps the
/// result. The individual weights come from [`RankerConfig`].
pub fn quality_score(text: &str, query: &str, config: &RankerConfig) -> f32 {
    let chunk_tokens = tokenize(text);
    let total_words = chunk_tokens.len();
    let chunk_words: HashSet<&str> = chunk_tokens.iter().map(String::as_str).collect();

    let mut score = 0.0f32;

    // Keyword overlap: fraction of the query's keywords present in the chunk.
    let keywords = query_keywords(query);
    if !keywords.is_empty() {
        let overlap = keywords
            .iter()
            .filter(|keyword| chunk_words.contains(keyword.as_str()))
            .count();
        score += overlap as f32 / keywords.len() as f32 * config.keyword_overlap_weight;
    }

    // Length preference: full bonus inside the preferred band, a smaller one
    // in the adjacent bands, a penalty for very short chunks.
    let (band_low, band_high) = config.preferred_band;
    if (band_low..=band_high).contains(&total_words) {
        score += config.preferred_band_bonus;
    } else if (config.short_chunk_words..band_low).contains(&total_words)
        || (band_high + 1..=config.adjacent_band_upper).contains(&total_words)
    {
        score += config.adjacent_band_bonus;
    }
    if total_words < config.short_chunk_words {
        score -= config.short_chunk_penalty;
    }

    // Sentence completeness.
    let trimmed = text.trim_end();
    if trimmed.ends_with('.') || trimmed.ends_with('!') || trimmed.ends_with('?') {
        score += config.completeness_bonus;
    }

    // Lexical density penalizes repetitive/boilerplate text.
    if total_words > 0 {
        let density = chunk_words.len() as f32 / total_words as f32;
        score += density * config.density_weight;
    }

    // Exact-phrase bonus: any query 2-gram appearing verbatim in the chunk.
    let query_tokens = tokenize(query);
    let has_phrase = query_tokens.windows(2).any(|bigram| {
        chunk_tokens
            .windows(2)
            .any(|window| window[0] == bigram[0] && window[1] == bigram[1])
    });
    if has_phrase {
        score += config.phrase_bonus;
    }

    // Numeric-content bonus for quantity-asking queries.
    let query_lower = query.to_lowercase();
    let asks_quantity = QUANTITY_PHRASES
        .iter()
        .any(|phrase| query_lower.contains(phrase));
    if asks_quantity && text.chars().any(|c| c.is_ascii_digit()) {
        score += config.numeric_bonus;
    }

    score.clamp(0.0, 1.0)
}

/// Word-set Jaccard similarity of two texts.
///
/// Two texts with empty token sets count as identical (1.0) so that blank
/// near-duplicates cannot both survive the diversity filter.
pub fn jaccard_similarity(a: &str, b: &str) -> f32 {
    let set_a: HashSet<String> = tokenize(a).into_iter().collect();
    let set_b: HashSet<String> = tokenize(b).into_iter().collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 1.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f32 / union as f32
}

/// Runs the full pipeline: filter, score, sort, diversify.
///
/// Returns at most `max_sources` candidates ordered by descending combined
/// score. The sort is stable, so candidates with equal combined scores keep
/// the order the scoring stage produced (which itself follows the raw hit
/// order).
pub fn rank(
    results: Vec<SearchResult>,
    query: &str,
    max_sources: usize,
    config: &RankerConfig,
) -> Vec<ScoredCandidate> {
    // Stage 1 + 2: relevance filter, then quality and combined scores.
    let mut candidates: Vec<ScoredCandidate> = results
        .into_iter()
        .filter(|result| result.score >= config.min_score)
        .filter(|result| result.text.trim().chars().count() >= config.min_chars)
        .map(|result| {
            let quality = quality_score(&result.text, query, config);
            let combined =
                config.similarity_weight * result.score + config.quality_weight * quality;
            ScoredCandidate {
                result,
                quality_score: quality,
                combined_score: combined,
            }
        })
        .collect();

    // Stage 3: stable descending sort on the combined score.
    candidates.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Stage 4: greedy diversity filter. The top candidate is always kept;
    // each later candidate must stay under the Jaccard threshold against
    // every candidate already kept.
    let mut kept: Vec<ScoredCandidate> = Vec::with_capacity(max_sources.min(candidates.len()));
    for candidate in candidates {
        if kept.len() >= max_sources {
            break;
        }
        let near_duplicate = kept.iter().any(|existing| {
            jaccard_similarity(&existing.result.text, &candidate.result.text)
                > config.jaccard_threshold
        });
        if !near_duplicate {
            kept.push(candidate);
        }
    }
    kept
}
