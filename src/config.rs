//! Engine configuration with documented defaults.
//!
//! Every heuristic constant the pipeline uses (score weights, thresholds,
//! band boundaries, the context budget) lives here rather than being buried
//! at a call site. All structs deserialize with serde so an application layer
//! can load overrides from a config file; the `Default` impls are the
//! production values.

use serde::{Deserialize, Serialize};

/// Tunables for the filter-score-diversify ranking pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankerConfig {
    /// Minimum raw similarity score a candidate must reach to survive
    /// the relevance filter.
    pub min_score: f32,
    /// Minimum trimmed text length in characters; shorter chunks are
    /// dropped before scoring.
    pub min_chars: usize,
    /// Weight of the keyword-overlap signal (fraction of the query's
    /// stop-word-filtered keywords present in the chunk).
    pub keyword_overlap_weight: f32,
    /// Inclusive word-count band that receives the full length bonus.
    pub preferred_band: (usize, usize),
    /// Bonus for chunks inside `preferred_band`.
    pub preferred_band_bonus: f32,
    /// Bonus for chunks in the bands adjacent to `preferred_band`
    /// (between `short_chunk_words` and the band, and between the band
    /// and `adjacent_band_upper`).
    pub adjacent_band_bonus: f32,
    /// Upper word count of the band just above `preferred_band`.
    pub adjacent_band_upper: usize,
    /// Chunks under this many words are penalized.
    pub short_chunk_words: usize,
    /// Penalty subtracted for chunks under `short_chunk_words`.
    pub short_chunk_penalty: f32,
    /// Bonus when the chunk ends in terminal punctuation (`.`, `!`, `?`).
    pub completeness_bonus: f32,
    /// Weight of the lexical-density signal (`unique_words / total_words`).
    pub density_weight: f32,
    /// Bonus when any query 2-gram appears verbatim in the chunk.
    pub phrase_bonus: f32,
    /// Bonus when the query asks for a quantity and the chunk contains
    /// a numeral.
    pub numeric_bonus: f32,
    /// Weight of the raw similarity score in the combined score.
    pub similarity_weight: f32,
    /// Weight of the quality score in the combined score.
    pub quality_weight: f32,
    /// Maximum word-set Jaccard similarity a candidate may have against
    /// any already-kept candidate before it is dropped as a near-duplicate.
    pub jaccard_threshold: f32,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            min_score: 0.3,
            min_chars: 50,
            keyword_overlap_weight: 0.4,
            preferred_band: (100, 300),
            preferred_band_bonus: 0.2,
            adjacent_band_bonus: 0.1,
            adjacent_band_upper: 500,
            short_chunk_words: 50,
            short_chunk_penalty: 0.2,
            completeness_bonus: 0.1,
            density_weight: 0.2,
            phrase_bonus: 0.15,
            numeric_bonus: 0.1,
            similarity_weight: 0.6,
            quality_weight: 0.4,
            jaccard_threshold: 0.8,
        }
    }
}

/// Tunables for context assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Word budget for the assembled context; anything beyond it is
    /// truncated at a word boundary with an explicit marker.
    pub max_context_words: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_words: 4000,
        }
    }
}

/// Weights for the confidence estimate attached to each response.
///
/// The three weights must sum to 1 for the estimate to stay in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    /// Weight of the mean raw similarity score of kept candidates.
    pub similarity_weight: f32,
    /// Weight of the source-count saturation factor
    /// (`min(count / saturation_sources, 1.0)`).
    pub count_weight: f32,
    /// Weight of the mean quality score of kept candidates.
    pub quality_weight: f32,
    /// Source count at which the count factor saturates.
    pub saturation_sources: usize,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            similarity_weight: 0.6,
            count_weight: 0.2,
            quality_weight: 0.2,
            saturation_sources: 3,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default number of sources a query keeps when the request does not
    /// override it.
    pub max_sources: usize,
    /// Raw hits requested from the index per kept source, giving the
    /// ranking and diversity stages room to discard.
    pub oversample_factor: usize,
    /// Token budget passed to the generator for standard answers.
    pub answer_max_tokens: u32,
    /// Token budget passed to the generator for comparison answers.
    pub comparison_max_tokens: u32,
    /// Sampling temperature passed to the generator.
    pub temperature: f32,
    /// Raw hits retrieved per document in comparison mode.
    pub per_document_hits: usize,
    /// Candidates kept per document in comparison mode.
    pub per_document_sources: usize,
    /// Ranking pipeline tunables.
    pub ranker: RankerConfig,
    /// Context assembly tunables.
    pub context: ContextConfig,
    /// Confidence estimate weights.
    pub confidence: ConfidenceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Production defaults.
    pub fn new() -> Self {
        Self {
            max_sources: 5,
            oversample_factor: 3,
            answer_max_tokens: 500,
            comparison_max_tokens: 800,
            temperature: 0.7,
            per_document_hits: 3,
            per_document_sources: 2,
            ranker: RankerConfig::default(),
            context: ContextConfig::default(),
            confidence: ConfidenceConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_weights_sum_to_one() {
        let cfg = ConfidenceConfig::default();
        let total = cfg.similarity_weight + cfg.count_weight + cfg.quality_weight;
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn combined_score_weights_sum_to_one() {
        let cfg = RankerConfig::default();
        let total = cfg.similarity_weight + cfg.quality_weight;
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = EngineConfig::new();
        let json = serde_json::to_string(&cfg).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.max_sources, cfg.max_sources);
        assert_eq!(parsed.ranker.preferred_band, cfg.ranker.preferred_band);
    }
}
