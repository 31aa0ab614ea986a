//! Search pipeline orchestrator.
//!
//! One [`SearchEngine`] owns the loaded index, the embedding service, the
//! reranker, and the optional image capabilities. All per-request work is
//! synchronous; the HTTP layer offloads calls onto a blocking thread. The
//! engine is immutable after construction, so shared access needs no locks
//! beyond the ones inside the embedding cache and batch tuner.

use std::sync::{Arc, Mutex, OnceLock};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::capability::{Captioner, CrossEncoder, ImageEmbedder, TextEmbedder};
use crate::config::EngineConfig;
use crate::embedding::EmbeddingService;
use crate::error::SearchError;
use crate::filter::filter_by_gender;
use crate::index::VectorIndex;
use crate::intent::{analyze, Intent};
use crate::rerank::Reranker;
use crate::types::{QueryRequest, RetrievalResult, SearchHit, SearchResponse};

/// Queries used when an image cannot be captioned: retrieve against broad
/// fashion vocabulary instead of failing the request.
const GENERIC_IMAGE_QUERIES: &[&str] = &[
    "fashion clothing style",
    "apparel outfit trendy",
    "clothing wear fashion",
];

/// Stand-in query for reranking image requests, which have no text of
/// their own.
const IMAGE_RERANK_QUERY: &str = "fashion item";

const NO_RESULTS_MESSAGE: &str = "No products found matching your criteria";
const RERANK_FALLBACK_WARNING: &str = "Smart ranking unavailable, showing basic results";
const CAPTION_FALLBACK_WARNING: &str =
    "Image understanding unavailable, showing general fashion results";

pub struct SearchEngine {
    index: VectorIndex,
    embedding: EmbeddingService,
    reranker: Reranker,
    captioner: Option<Arc<dyn Captioner>>,
    image_embedder: Option<Arc<dyn ImageEmbedder>>,
    config: EngineConfig,
}

// The capability handles are trait objects, so summarize instead of
// deriving.
impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("dimension", &self.index.dimension())
            .field("products", &self.index.len())
            .field("captioner", &self.captioner.is_some())
            .field("image_embedder", &self.image_embedder.is_some())
            .finish_non_exhaustive()
    }
}

impl SearchEngine {
    /// Assemble an engine from a loaded index and its capabilities.
    ///
    /// Fails with [`SearchError::DimensionMismatch`] when an embedder's
    /// output dimension disagrees with the index. That is a deployment
    /// fault; catching it here keeps it out of the request path.
    pub fn new(
        index: VectorIndex,
        text_embedder: Arc<dyn TextEmbedder>,
        cross_encoder: Arc<dyn CrossEncoder>,
        captioner: Option<Arc<dyn Captioner>>,
        image_embedder: Option<Arc<dyn ImageEmbedder>>,
        config: EngineConfig,
    ) -> Result<Self, SearchError> {
        if text_embedder.dimension() != index.dimension() {
            return Err(SearchError::DimensionMismatch {
                expected: index.dimension(),
                actual: text_embedder.dimension(),
            });
        }
        if let Some(ie) = &image_embedder {
            if ie.dimension() != index.dimension() {
                return Err(SearchError::DimensionMismatch {
                    expected: index.dimension(),
                    actual: ie.dimension(),
                });
            }
        }

        let embedding = EmbeddingService::new(
            text_embedder,
            config.cache_capacity,
            config.cache_text_limit,
        );
        Ok(Self {
            index,
            embedding,
            reranker: Reranker::new(cross_encoder),
            captioner,
            image_embedder,
            config,
        })
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn embedding(&self) -> &EmbeddingService {
        &self.embedding
    }

    /// Run one search request end to end.
    pub fn search(&self, request: &QueryRequest) -> Result<SearchResponse, SearchError> {
        let top_k = if request.top_k == 0 {
            self.config.default_top_k
        } else {
            request.top_k
        };

        if let Some(image) = request.image_base64.as_deref().filter(|s| !s.trim().is_empty()) {
            return self.search_by_image(image, request, top_k);
        }

        let text = request
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SearchError::Input("request needs query text or an image payload".into())
            })?;

        self.search_by_text(text, request, top_k, None)
    }

    fn search_by_text(
        &self,
        query: &str,
        request: &QueryRequest,
        top_k: usize,
        mut warning: Option<String>,
    ) -> Result<SearchResponse, SearchError> {
        let intent = analyze(query);
        tracing::debug!(query, ?intent.gender, ?intent.complexity, "text search");

        let vector = self.embedding.embed_text(query)?;
        let candidates = self.retrieve(&vector, top_k * self.config.oversample)?;

        // Explicit filter beats auto-detection.
        let gender = request.gender_filter.or(intent.gender);
        let filtered = filter_by_gender(candidates, gender, top_k);

        let (results, reranked) = if request.rerank {
            match self.rerank_with_fallback(query, &intent, filtered, top_k) {
                Ok(hits) => (hits, true),
                Err(hits) => {
                    warning = Some(RERANK_FALLBACK_WARNING.to_string());
                    (hits, false)
                }
            }
        } else {
            (
                filtered
                    .into_iter()
                    .take(top_k)
                    .map(SearchHit::from)
                    .collect(),
                false,
            )
        };

        let message = results.is_empty().then(|| NO_RESULTS_MESSAGE.to_string());
        Ok(SearchResponse {
            query: Some(query.to_string()),
            results,
            reranked,
            message,
            warning,
        })
    }

    /// Rerank, degrading to unranked hits when the cross-encoder fails.
    /// `Err` carries the fallback hits, not an error. Candidates are only
    /// cloned on the failure branch.
    fn rerank_with_fallback(
        &self,
        query: &str,
        intent: &Intent,
        candidates: Vec<RetrievalResult>,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, Vec<SearchHit>> {
        match self.reranker.rerank(query, intent, &candidates, top_k) {
            Ok(ranked) => Ok(ranked.into_iter().map(SearchHit::from).collect()),
            Err(err) => {
                tracing::warn!(error = %err, "rerank failed; serving retrieval order");
                Err(candidates
                    .into_iter()
                    .take(top_k)
                    .map(SearchHit::from)
                    .collect())
            }
        }
    }

    /// Rank or truncate candidates on the image paths, which carry no query
    /// text; a fixed stand-in query drives the cross-encoder and intent.
    fn finish_image_results(
        &self,
        request: &QueryRequest,
        candidates: Vec<RetrievalResult>,
        top_k: usize,
    ) -> (Vec<SearchHit>, bool, Option<String>) {
        if request.rerank {
            let intent = analyze(IMAGE_RERANK_QUERY);
            match self.rerank_with_fallback(IMAGE_RERANK_QUERY, &intent, candidates, top_k) {
                Ok(hits) => (hits, true, None),
                Err(hits) => (hits, false, Some(RERANK_FALLBACK_WARNING.to_string())),
            }
        } else {
            (
                candidates
                    .into_iter()
                    .take(top_k)
                    .map(SearchHit::from)
                    .collect(),
                false,
                None,
            )
        }
    }

    fn search_by_image(
        &self,
        payload: &str,
        request: &QueryRequest,
        top_k: usize,
    ) -> Result<SearchResponse, SearchError> {
        let bytes = decode_image_payload(payload)?;

        // Direct visual retrieval when an image embedder is wired in. Same
        // sequencing as the text path: over-fetch, filter, optional rerank.
        if let Some(embedder) = &self.image_embedder {
            let mut vector = embedder
                .embed_image(&bytes)
                .map_err(SearchError::Capability)?;
            crate::normalize::l2_normalize_in_place(&mut vector);
            let candidates = self.retrieve(&vector, top_k * self.config.oversample)?;
            let filtered = filter_by_gender(candidates, request.gender_filter, top_k);
            let (results, reranked, warning) =
                self.finish_image_results(request, filtered, top_k);
            let message = results.is_empty().then(|| NO_RESULTS_MESSAGE.to_string());
            return Ok(SearchResponse {
                query: None,
                results,
                reranked,
                message,
                warning,
            });
        }

        // Otherwise caption the image and reuse the text pipeline. Caption
        // failure is recoverable: fall back to broad fashion queries.
        if let Some(captioner) = &self.captioner {
            match captioner.caption(&bytes) {
                Ok(caption) => {
                    tracing::debug!(caption, "image captioned");
                    return self.search_by_text(&caption, request, top_k, None);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "captioning failed; using generic queries");
                    return self.search_generic(request, top_k);
                }
            }
        }

        tracing::warn!("no image capability configured; using generic queries");
        self.search_generic(request, top_k)
    }

    /// Retrieval over the fixed generic queries, gender-filtered per query,
    /// merged and deduplicated by product id, best similarity first. The
    /// request's rerank flag still applies to the merged set.
    fn search_generic(
        &self,
        request: &QueryRequest,
        top_k: usize,
    ) -> Result<SearchResponse, SearchError> {
        let mut merged: Vec<RetrievalResult> = Vec::new();
        for query in GENERIC_IMAGE_QUERIES {
            let vector = self.embedding.embed_text(query)?;
            let candidates = self.retrieve(&vector, top_k * self.config.oversample)?;
            for hit in filter_by_gender(candidates, request.gender_filter, top_k) {
                match merged.iter_mut().find(|m| m.product.id == hit.product.id) {
                    Some(existing) => {
                        existing.similarity = existing.similarity.max(hit.similarity)
                    }
                    None => merged.push(hit),
                }
            }
        }
        merged.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        merged.truncate(top_k);

        let (results, reranked, rerank_warning) =
            self.finish_image_results(request, merged, top_k);
        let message = results.is_empty().then(|| NO_RESULTS_MESSAGE.to_string());
        let warning = match rerank_warning {
            Some(extra) => Some(format!("{CAPTION_FALLBACK_WARNING}; {extra}")),
            None => Some(CAPTION_FALLBACK_WARNING.to_string()),
        };
        Ok(SearchResponse {
            query: None,
            results,
            reranked,
            message,
            warning,
        })
    }

    fn retrieve(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievalResult>, SearchError> {
        let hits = self.index.search(vector, k)?;
        Ok(hits
            .into_iter()
            .filter_map(|(pos, similarity)| {
                self.index.product(pos).map(|product| RetrievalResult {
                    product: product.clone(),
                    similarity,
                })
            })
            .collect())
    }
}

/// Decode a base64 image payload, tolerating a `data:image/...;base64,`
/// prefix, and verify the bytes decode as an image.
fn decode_image_payload(payload: &str) -> Result<Vec<u8>, SearchError> {
    let trimmed = payload.trim();
    let encoded = if trimmed.starts_with("data:") {
        trimmed
            .split_once(',')
            .map(|(_, rest)| rest)
            .ok_or_else(|| SearchError::Decode("malformed data URL".into()))?
    } else {
        trimmed
    };

    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| SearchError::Decode(format!("invalid base64: {e}")))?;

    image::load_from_memory(&bytes)
        .map_err(|e| SearchError::Decode(format!("unreadable image: {e}")))?;
    Ok(bytes)
}

static ENGINE: OnceLock<Arc<SearchEngine>> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Process-wide engine accessor with explicit init-once semantics.
///
/// The first caller runs `build`; concurrent callers block on the init lock
/// and then observe the already-built engine. A failed build leaves the slot
/// empty so a later call can retry.
pub fn init_or_get<F>(build: F) -> Result<Arc<SearchEngine>, SearchError>
where
    F: FnOnce() -> Result<SearchEngine, SearchError>,
{
    if let Some(engine) = ENGINE.get() {
        return Ok(engine.clone());
    }

    let _guard = INIT_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    if let Some(engine) = ENGINE.get() {
        return Ok(engine.clone());
    }

    let engine = Arc::new(build()?);
    // Cannot race: we hold the init lock and the slot was empty.
    let _ = ENGINE.set(engine.clone());
    Ok(engine)
}
