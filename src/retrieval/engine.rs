//! Query orchestration.
//!
//! [`RetrievalEngine`] owns the similarity index and the document ledger and
//! drives the full pipeline for one request at a time: embed the question,
//! oversample the index, rank and diversify, assemble a bounded context,
//! delegate to the generator, and attach a confidence estimate.
//!
//! # Failure semantics
//!
//! Embedding failures are fatal and propagate: without a query vector
//! there is nothing useful to return. Generation failures are caught and
//! converted into a *degraded* response that still carries the computed
//! sources, with zero confidence and the error detail attached. Expected
//! empty outcomes (nothing survived filtering, fewer than two documents for
//! a comparison) are ordinary responses, not errors.
//!
//! # Concurrency
//!
//! `query` and `compare_documents` take `&self`; ingestion, removal,
//! rebuild, and snapshot restore take `&mut self`. An application layer
//! that shares the engine wraps it in a reader/writer lock and gets the
//! single-writer/multiple-reader discipline the data structures expect.

use super::context::{build_comparison_context, build_context};
use super::index::VectorIndex;
use super::prompt::{build_comparison_prompt, build_prompt};
use super::ranker;
use super::types::{
    validate_dimension, ChunkInput, EngineStats, QueryMode, QueryRequest, QueryResponse,
    RetrievalError, ScoredCandidate, SearchResult, SourceAttribution,
};
use crate::capabilities::Capabilities;
use crate::config::{ConfidenceConfig, EngineConfig};
use crate::embedding::Embedder;
use crate::generation::Generator;
use crate::storage::snapshot::{self, LedgerSnapshot, SnapshotManifest};
use crate::storage::{DocumentStore, SnapshotError};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Canned answer when no candidate survives filtering.
const INSUFFICIENT_INFO: &str =
    "I don't have enough relevant information in the uploaded documents to answer this question.";

/// Guidance when a comparison is requested with fewer than two documents.
const COMPARISON_NEEDS_TWO: &str = "I need at least two documents to perform a comparison.";

/// Canned answer when no compared document contributed candidates.
const COMPARISON_NO_CONTENT: &str =
    "I couldn't find relevant information in the provided documents to make a comparison.";

/// Notice returned when the generation capability is disabled.
const GENERATION_DISABLED: &str =
    "Text generation is disabled; the most relevant sources are attached.";

/// Maximum snippet length in a source attribution, in characters.
const SNIPPET_CHARS: usize = 200;

/// Rounds to 3 decimal places.
fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

/// Confidence estimate for a ranked candidate list.
///
/// Weighted blend of the mean raw similarity, a source-count saturation
/// factor, and the mean quality score. Always in `[0, 1]`; exactly 0 for an
/// empty list.
fn confidence(candidates: &[ScoredCandidate], config: &ConfidenceConfig) -> f32 {
    if candidates.is_empty() {
        return 0.0;
    }
    let n = candidates.len() as f32;
    let mean_similarity = candidates.iter().map(|c| c.result.score).sum::<f32>() / n;
    let count_factor = (n / config.saturation_sources.max(1) as f32).min(1.0);
    let mean_quality = candidates.iter().map(|c| c.quality_score).sum::<f32>() / n;

    let blended = config.similarity_weight * mean_similarity
        + config.count_weight * count_factor
        + config.quality_weight * mean_quality;
    round3(blended.clamp(0.0, 1.0))
}

/// Formats the kept candidates as source citations.
fn format_sources(candidates: &[ScoredCandidate]) -> Vec<SourceAttribution> {
    candidates
        .iter()
        .map(|candidate| {
            let text = &candidate.result.text;
            let snippet = if text.chars().count() > SNIPPET_CHARS {
                let mut snippet: String = text.chars().take(SNIPPET_CHARS).collect();
                snippet.push_str("...");
                snippet
            } else {
                text.clone()
            };
            SourceAttribution {
                document_id: candidate.result.document_id.clone(),
                snippet,
                page: candidate.result.page,
                relevance: round3(candidate.result.score),
            }
        })
        .collect()
}

fn empty_response(answer: &str, mode: QueryMode) -> QueryResponse {
    QueryResponse {
        answer: answer.to_string(),
        sources: Vec::new(),
        confidence: 0.0,
        mode,
        context_chunks: 0,
        documents_compared: None,
        error: None,
    }
}

/// The retrieval-and-ranking engine.
///
/// Construction wires in the two collaborators and the capability
/// descriptor once; nothing probes for availability later.
pub struct RetrievalEngine {
    index: VectorIndex,
    store: DocumentStore,
    config: EngineConfig,
    capabilities: Capabilities,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
}

impl RetrievalEngine {
    /// Creates an empty engine. The index dimension is taken from the
    /// embedder and fixed for the lifetime of the instance.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        config: EngineConfig,
        capabilities: Capabilities,
    ) -> Self {
        let dimension = embedder.dimension();
        Self {
            index: VectorIndex::new(dimension),
            store: DocumentStore::new(),
            config,
            capabilities,
            embedder,
            generator,
        }
    }

    /// Creates an engine with the default configuration and full
    /// capabilities.
    pub fn with_defaults(embedder: Arc<dyn Embedder>, generator: Arc<dyn Generator>) -> Self {
        Self::new(
            embedder,
            generator,
            EngineConfig::default(),
            Capabilities::full(),
        )
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ingests a document: ledger insert, embedding, index append.
    ///
    /// Chunks are embedded in one batch before anything is recorded, so an
    /// embedding failure leaves the engine untouched. Re-ingesting an
    /// existing document id is remove-then-add: the old chunks are
    /// tombstoned in the index and replaced in the ledger.
    ///
    /// Returns the number of chunks stored.
    ///
    /// # Errors
    ///
    /// [`RetrievalError::Embedding`] when the collaborator fails, and
    /// [`RetrievalError::DimensionMismatch`] when it returns vectors of the
    /// wrong dimension. Both are fatal for the ingestion.
    #[instrument(skip_all, fields(document_id, chunk_count = chunks.len()))]
    pub async fn add_document(
        &mut self,
        document_id: &str,
        chunks: Vec<ChunkInput>,
        metadata: BTreeMap<String, String>,
    ) -> Result<usize, RetrievalError> {
        // Embed first: a collaborator failure must not leave a half-added
        // document behind.
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_batch(&texts).await?
        };
        if embeddings.len() != texts.len() {
            return Err(RetrievalError::LengthMismatch {
                vectors: embeddings.len(),
                ids: texts.len(),
            });
        }
        for embedding in &embeddings {
            validate_dimension(self.index.dimension(), embedding.len())?;
        }

        if self.store.contains_document(document_id) {
            self.remove_document(document_id);
        }

        let chunk_ids = self.store.add_document(document_id, &chunks, metadata);
        let count = self.index.add(embeddings, chunk_ids)?;
        info!(document_id, count, "ingested document");
        Ok(count)
    }

    /// Removes a document from the ledger and tombstones its index
    /// entries.
    ///
    /// Returns whether the document existed. The vectors stay in the index
    /// until [`rebuild_index`](Self::rebuild_index) compacts it; search
    /// correctness is unaffected because tombstoned positions are skipped.
    #[instrument(skip(self))]
    pub fn remove_document(&mut self, document_id: &str) -> bool {
        match self.store.remove_document(document_id) {
            Some(chunk_ids) => {
                for chunk_id in &chunk_ids {
                    if let Some(position) = self.index.find_position(chunk_id) {
                        self.index.mark_tombstone(position);
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Compacts the index, dropping tombstoned entries.
    pub fn rebuild_index(&mut self) {
        let removed = self.index.tombstone_count();
        self.index = self.index.rebuild();
        info!(removed, size = self.index.size(), "rebuilt index");
    }

    /// Raw nearest-neighbor scan: index hits mapped through the position
    /// table to ledger records, optionally restricted to a document set.
    fn raw_search(
        &self,
        query_vector: &[f32],
        scan_k: usize,
        document_filter: Option<&HashSet<String>>,
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        let hits = self.index.search(query_vector, scan_k)?;
        let mut results = Vec::with_capacity(hits.len());

        for (position, score) in hits {
            let Some(chunk_id) = self.index.chunk_id_at(position) else {
                continue;
            };
            let Some(record) = self.store.get_chunk(chunk_id) else {
                // Index entry with no ledger record: removed but not yet
                // rebuilt, or a stale snapshot. Skipping keeps unknown ids
                // an empty result rather than an error.
                warn!(%chunk_id, "index entry has no ledger record, skipping");
                continue;
            };
            if let Some(filter) = document_filter {
                if !filter.contains(&record.document_id) {
                    continue;
                }
            }
            results.push(SearchResult {
                chunk_id: chunk_id.clone(),
                document_id: record.document_id.clone(),
                text: record.text.clone(),
                score,
                page: record.page,
            });
        }
        Ok(results)
    }

    /// Answers a question against the corpus.
    ///
    /// See the module docs for the failure semantics; the short version is
    /// that this returns `Err` only for embedding failures and invalid
    /// input: everything else, including generation failure and an empty
    /// candidate set, comes back as a structured [`QueryResponse`].
    #[instrument(skip_all, fields(mode = %request.mode, text_len = request.text.len()))]
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, RetrievalError> {
        let question = request.text.trim();
        if question.is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "Query text cannot be empty".to_string(),
            ));
        }
        let max_sources = request.max_sources.unwrap_or(self.config.max_sources);

        let query_vector = self.embedder.embed(question).await?;

        let document_filter: Option<HashSet<String>> = request
            .document_ids
            .as_ref()
            .map(|ids| ids.iter().cloned().collect());
        // Oversample so the ranking and diversity stages have room to
        // discard; widen further when a document filter will thin the hits.
        let mut scan_k = max_sources * self.config.oversample_factor;
        if document_filter.is_some() {
            scan_k *= 2;
        }

        let hits = self.raw_search(&query_vector, scan_k, document_filter.as_ref())?;
        debug!(hits = hits.len(), "raw search complete");

        let ranked = ranker::rank(hits, question, max_sources, &self.config.ranker);
        if ranked.is_empty() {
            return Ok(empty_response(INSUFFICIENT_INFO, request.mode));
        }

        let context = build_context(&ranked, &self.config.context);
        let prompt = build_prompt(question, &context, request.mode);
        let confidence = confidence(&ranked, &self.config.confidence);
        let sources = format_sources(&ranked);

        if !self.capabilities.generation {
            return Ok(QueryResponse {
                answer: GENERATION_DISABLED.to_string(),
                sources,
                confidence,
                mode: request.mode,
                context_chunks: ranked.len(),
                documents_compared: None,
                error: None,
            });
        }

        match self
            .generator
            .generate(
                &prompt,
                self.config.answer_max_tokens,
                self.config.temperature,
            )
            .await
        {
            Ok(answer) => Ok(QueryResponse {
                answer: answer.trim().to_string(),
                sources,
                confidence,
                mode: request.mode,
                context_chunks: ranked.len(),
                documents_compared: None,
                error: None,
            }),
            Err(e) => {
                warn!(error = %e, "generation failed, returning degraded response");
                Ok(QueryResponse {
                    answer: format!(
                        "I encountered an error while processing your question: {}",
                        e
                    ),
                    sources,
                    confidence: 0.0,
                    mode: request.mode,
                    context_chunks: ranked.len(),
                    documents_compared: None,
                    error: Some(e.to_string()),
                })
            }
        }
    }

    /// Compares content across multiple documents.
    ///
    /// Each document is retrieved and ranked independently with a small
    /// per-document budget so a dominant document cannot drown out weaker
    /// ones. Requires at least two ids and at least one document with
    /// candidates; both shortfalls are ordinary responses, not errors.
    #[instrument(skip_all, fields(documents = document_ids.len()))]
    pub async fn compare_documents(
        &self,
        question: &str,
        document_ids: &[String],
    ) -> Result<QueryResponse, RetrievalError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "Query text cannot be empty".to_string(),
            ));
        }
        if document_ids.len() < 2 {
            return Ok(empty_response(COMPARISON_NEEDS_TWO, QueryMode::Comparison));
        }

        let query_vector = self.embedder.embed(question).await?;
        let scan_k = self.config.per_document_hits * self.config.oversample_factor;

        let mut groups: Vec<(String, Vec<ScoredCandidate>)> =
            Vec::with_capacity(document_ids.len());
        let mut all_candidates: Vec<ScoredCandidate> = Vec::new();

        for document_id in document_ids {
            let filter: HashSet<String> = std::iter::once(document_id.clone()).collect();
            let hits = self.raw_search(&query_vector, scan_k, Some(&filter))?;
            let ranked = ranker::rank(
                hits,
                question,
                self.config.per_document_sources,
                &self.config.ranker,
            );
            all_candidates.extend(ranked.iter().cloned());
            groups.push((document_id.clone(), ranked));
        }

        if all_candidates.is_empty() {
            return Ok(empty_response(COMPARISON_NO_CONTENT, QueryMode::Comparison));
        }

        let context = build_comparison_context(&groups);
        let prompt = build_comparison_prompt(question, &context);
        let confidence = confidence(&all_candidates, &self.config.confidence);
        let sources = format_sources(&all_candidates);

        if !self.capabilities.generation {
            return Ok(QueryResponse {
                answer: GENERATION_DISABLED.to_string(),
                sources,
                confidence,
                mode: QueryMode::Comparison,
                context_chunks: all_candidates.len(),
                documents_compared: Some(document_ids.len()),
                error: None,
            });
        }

        match self
            .generator
            .generate(
                &prompt,
                self.config.comparison_max_tokens,
                self.config.temperature,
            )
            .await
        {
            Ok(answer) => Ok(QueryResponse {
                answer: answer.trim().to_string(),
                sources,
                confidence,
                mode: QueryMode::Comparison,
                context_chunks: all_candidates.len(),
                documents_compared: Some(document_ids.len()),
                error: None,
            }),
            Err(e) => {
                warn!(error = %e, "comparison generation failed, returning degraded response");
                Ok(QueryResponse {
                    answer: format!("Error during comparison: {}", e),
                    sources,
                    confidence: 0.0,
                    mode: QueryMode::Comparison,
                    context_chunks: all_candidates.len(),
                    documents_compared: Some(document_ids.len()),
                    error: Some(e.to_string()),
                })
            }
        }
    }

    /// Corpus statistics.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            total_documents: self.store.document_count(),
            total_chunks: self.store.chunk_count(),
            index_size: self.index.size(),
            dimension: self.index.dimension(),
        }
    }

    /// Writes the paired snapshot artifacts for this engine's state.
    pub fn save_snapshot(&self, prefix: &Path) -> Result<(), SnapshotError> {
        let index = self.index.to_snapshot();
        let manifest = SnapshotManifest::new(
            self.index.dimension(),
            self.store.document_count(),
            self.store.chunk_count(),
        );
        let ledger = LedgerSnapshot {
            manifest,
            ledger: self.store.to_state(),
        };
        snapshot::save(prefix, &index, &ledger)
    }

    /// Replaces this engine's state with a previously saved snapshot.
    ///
    /// # Errors
    ///
    /// Propagates snapshot pairing/schema failures, and returns
    /// [`RetrievalError::DimensionMismatch`] when the snapshot's dimension
    /// does not match the wired embedder: proceeding would corrupt every
    /// subsequent search.
    pub fn load_snapshot(&mut self, prefix: &Path) -> Result<(), RetrievalError> {
        let (index_snapshot, ledger_snapshot) = snapshot::load(prefix)?;
        validate_dimension(self.embedder.dimension(), index_snapshot.dimension)?;

        self.index = VectorIndex::from_snapshot(index_snapshot)?;
        self.store = DocumentStore::from_state(ledger_snapshot.ledger);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmbeddingError, GenerationError};
    use crate::retrieval::types::ChunkId;
    use async_trait::async_trait;

    /// Deterministic embedder: each axis counts occurrences of its terms.
    struct KeywordEmbedder {
        axes: Vec<Vec<&'static str>>,
    }

    impl KeywordEmbedder {
        fn topical() -> Self {
            Self {
                axes: vec![
                    vec!["machine", "learning", "artificial", "intelligence"],
                    vec!["cooking", "recipe", "ingredients"],
                    vec!["finance", "market", "investment"],
                ],
            }
        }

        fn embed_text(&self, text: &str) -> Vec<f32> {
            let tokens: Vec<String> = text
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| !t.is_empty())
                .map(str::to_lowercase)
                .collect();
            self.axes
                .iter()
                .map(|axis| {
                    tokens
                        .iter()
                        .filter(|token| axis.contains(&token.as_str()))
                        .count() as f32
                })
                .collect()
        }
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        fn dimension(&self) -> usize {
            self.axes.len()
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(self.embed_text(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|t| self.embed_text(t)).collect())
        }
    }

    /// Embedder that always fails.
    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        fn dimension(&self) -> usize {
            3
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::ModelUnavailable("offline".to_string()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::ModelUnavailable("offline".to_string()))
        }
    }

    struct FixedGenerator;

    #[async_trait]
    impl Generator for FixedGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String, GenerationError> {
            Ok("  A generated answer.  ".to_string())
        }
    }

    struct BrokenGenerator;

    #[async_trait]
    impl Generator for BrokenGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String, GenerationError> {
            Err(GenerationError::GenerationFailed("backend down".to_string()))
        }
    }

    fn ml_text() -> String {
        "Machine learning and artificial intelligence techniques let machine systems improve \
         from data, and modern learning pipelines rely on artificial intelligence methods."
            .to_string()
    }

    fn cooking_text() -> String {
        "This cooking recipe lists fresh ingredients and walks through the recipe steps for \
         cooking a weeknight dinner with simple ingredients."
            .to_string()
    }

    fn finance_text() -> String {
        "The finance report covers market movements and investment strategy, with market \
         commentary on every investment class in the finance sector."
            .to_string()
    }

    async fn seeded_engine(generator: Arc<dyn Generator>) -> RetrievalEngine {
        let mut engine = RetrievalEngine::with_defaults(Arc::new(KeywordEmbedder::topical()), generator);
        engine
            .add_document("ml", vec![ChunkInput::with_page(ml_text(), 1)], BTreeMap::new())
            .await
            .unwrap();
        engine
            .add_document("cooking", vec![ChunkInput::with_page(cooking_text(), 1)], BTreeMap::new())
            .await
            .unwrap();
        engine
            .add_document("finance", vec![ChunkInput::with_page(finance_text(), 1)], BTreeMap::new())
            .await
            .unwrap();
        engine
    }

    #[tokio::test]
    async fn query_returns_best_matching_source() {
        let engine = seeded_engine(Arc::new(FixedGenerator)).await;
        let request = QueryRequest::new("artificial intelligence techniques").with_max_sources(1);

        let response = engine.query(&request).await.unwrap();
        assert_eq!(response.answer, "A generated answer.");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].document_id, "ml");
        assert!(response.confidence > 0.0);
        assert_eq!(response.context_chunks, 1);
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn empty_corpus_gives_insufficient_info() {
        let engine = RetrievalEngine::with_defaults(
            Arc::new(KeywordEmbedder::topical()),
            Arc::new(FixedGenerator),
        );
        let response = engine
            .query(&QueryRequest::new("machine learning"))
            .await
            .unwrap();
        assert_eq!(response.answer, INSUFFICIENT_INFO);
        assert_eq!(response.confidence, 0.0);
        assert!(response.sources.is_empty());
    }

    #[tokio::test]
    async fn generation_failure_degrades_with_sources() {
        let engine = seeded_engine(Arc::new(BrokenGenerator)).await;
        let response = engine
            .query(&QueryRequest::new("machine learning techniques"))
            .await
            .unwrap();

        assert!(!response.sources.is_empty());
        assert_eq!(response.confidence, 0.0);
        assert!(response.error.as_deref().unwrap().contains("backend down"));
        assert!(response.answer.contains("error"));
    }

    #[tokio::test]
    async fn embedding_failure_is_fatal() {
        let mut engine = RetrievalEngine::with_defaults(
            Arc::new(BrokenEmbedder),
            Arc::new(FixedGenerator),
        );
        let ingest = engine
            .add_document("doc", vec![ChunkInput::new("some text")], BTreeMap::new())
            .await;
        assert!(matches!(ingest, Err(RetrievalError::Embedding(_))));
        assert_eq!(engine.stats().total_documents, 0);

        let query = engine.query(&QueryRequest::new("anything")).await;
        assert!(matches!(query, Err(RetrievalError::Embedding(_))));
    }

    #[tokio::test]
    async fn document_filter_restricts_results() {
        let engine = seeded_engine(Arc::new(FixedGenerator)).await;
        let request = QueryRequest::new("machine learning and artificial intelligence")
            .with_documents(vec!["cooking".to_string()]);

        let response = engine.query(&request).await.unwrap();
        // The only ml-relevant chunk is outside the filter set.
        assert_eq!(response.answer, INSUFFICIENT_INFO);
    }

    #[tokio::test]
    async fn removal_excludes_document_until_rebuild_and_after() {
        let mut engine = seeded_engine(Arc::new(FixedGenerator)).await;
        assert!(engine.remove_document("ml"));
        assert!(!engine.remove_document("ml"));

        let response = engine
            .query(&QueryRequest::new("artificial intelligence techniques"))
            .await
            .unwrap();
        assert!(response.sources.iter().all(|s| s.document_id != "ml"));

        // Index keeps the tombstoned entry until an explicit rebuild.
        assert_eq!(engine.stats().index_size, 3);
        engine.rebuild_index();
        assert_eq!(engine.stats().index_size, 2);

        let response = engine
            .query(&QueryRequest::new("cooking recipe ingredients"))
            .await
            .unwrap();
        assert_eq!(response.sources[0].document_id, "cooking");
    }

    #[tokio::test]
    async fn reingestion_replaces_previous_content() {
        let mut engine = seeded_engine(Arc::new(FixedGenerator)).await;
        engine
            .add_document(
                "ml",
                vec![ChunkInput::with_page(
                    "Cooking ingredients and recipe notes fill this revision of the document, \
                     with extra recipe guidance for the same ingredients.",
                    2,
                )],
                BTreeMap::new(),
            )
            .await
            .unwrap();

        assert_eq!(engine.stats().total_documents, 3);
        assert_eq!(engine.stats().total_chunks, 3);

        let response = engine
            .query(&QueryRequest::new("artificial intelligence techniques"))
            .await
            .unwrap();
        // The replacement chunk no longer matches the AI query.
        assert!(response.sources.iter().all(|s| s.document_id != "ml"));
    }

    #[tokio::test]
    async fn comparison_requires_two_documents() {
        let engine = seeded_engine(Arc::new(FixedGenerator)).await;
        let response = engine
            .compare_documents("anything", &["ml".to_string()])
            .await
            .unwrap();
        assert_eq!(response.answer, COMPARISON_NEEDS_TWO);
        assert_eq!(response.confidence, 0.0);
        assert!(response.sources.is_empty());
        assert_eq!(response.mode, QueryMode::Comparison);
    }

    #[tokio::test]
    async fn comparison_with_no_candidates_reports_no_content() {
        let engine = seeded_engine(Arc::new(FixedGenerator)).await;
        let response = engine
            .compare_documents(
                "completely unrelated topic",
                &["cooking".to_string(), "finance".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(response.answer, COMPARISON_NO_CONTENT);
        assert_eq!(response.confidence, 0.0);
    }

    #[tokio::test]
    async fn comparison_groups_per_document() {
        let engine = seeded_engine(Arc::new(FixedGenerator)).await;
        let response = engine
            .compare_documents(
                "cooking recipe ingredients versus finance market investment",
                &["cooking".to_string(), "finance".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(response.documents_compared, Some(2));
        let documents: HashSet<&str> = response
            .sources
            .iter()
            .map(|s| s.document_id.as_str())
            .collect();
        assert!(documents.contains("cooking"));
        assert!(documents.contains("finance"));
    }

    #[tokio::test]
    async fn generation_capability_off_returns_sources_only() {
        let embedder = Arc::new(KeywordEmbedder::topical());
        let mut engine = RetrievalEngine::new(
            embedder,
            Arc::new(BrokenGenerator),
            EngineConfig::default(),
            Capabilities::retrieval_only(),
        );
        engine
            .add_document("ml", vec![ChunkInput::new(ml_text())], BTreeMap::new())
            .await
            .unwrap();

        let response = engine
            .query(&QueryRequest::new("machine learning"))
            .await
            .unwrap();
        // The broken generator is never called.
        assert_eq!(response.answer, GENERATION_DISABLED);
        assert!(!response.sources.is_empty());
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn empty_question_is_invalid() {
        let engine = seeded_engine(Arc::new(FixedGenerator)).await;
        assert!(matches!(
            engine.query(&QueryRequest::new("   ")).await,
            Err(RetrievalError::InvalidQuery(_))
        ));
        assert!(matches!(
            engine
                .compare_documents("", &["a".to_string(), "b".to_string()])
                .await,
            Err(RetrievalError::InvalidQuery(_))
        ));
    }

    #[test]
    fn confidence_is_zero_for_empty_and_bounded_otherwise() {
        let config = ConfidenceConfig::default();
        assert_eq!(confidence(&[], &config), 0.0);

        let candidate = ScoredCandidate {
            result: SearchResult {
                chunk_id: ChunkId::new("doc", 0),
                document_id: "doc".to_string(),
                text: "text".to_string(),
                score: 0.9,
                page: None,
            },
            quality_score: 0.8,
            combined_score: 0.85,
        };
        let one = confidence(&[candidate.clone()], &config);
        assert!((0.0..=1.0).contains(&one));

        let three = confidence(&vec![candidate; 3], &config);
        assert!((0.0..=1.0).contains(&three));
        // More sources saturate the count factor upward.
        assert!(three > one);
    }

    #[test]
    fn sources_truncate_long_snippets() {
        let long_text = "x".repeat(400);
        let candidate = ScoredCandidate {
            result: SearchResult {
                chunk_id: ChunkId::new("doc", 0),
                document_id: "doc".to_string(),
                text: long_text,
                score: 0.87654,
                page: Some(9),
            },
            quality_score: 0.5,
            combined_score: 0.7,
        };

        let sources = format_sources(&[candidate]);
        assert_eq!(sources[0].snippet.chars().count(), 203);
        assert!(sources[0].snippet.ends_with("..."));
        assert_eq!(sources[0].relevance, 0.877);
        assert_eq!(sources[0].page, Some(9));
    }
}
