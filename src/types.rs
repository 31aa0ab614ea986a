use serde::{Deserialize, Serialize};

/// Gender signal used by intent detection, filtering, and explicit request
/// overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Men,
    Women,
    Unisex,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Men => "men",
            Gender::Women => "women",
            Gender::Unisex => "unisex",
        }
    }

    /// The opposing gender for strict-exclusivity checks. Unisex has none.
    pub fn opposite(&self) -> Option<Gender> {
        match self {
            Gender::Men => Some(Gender::Women),
            Gender::Women => Some(Gender::Men),
            Gender::Unisex => None,
        }
    }
}

/// One catalog record, immutable once loaded. Position in the metadata
/// sidecar is the same as the position of its vector in the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Opaque source metadata, carried through unmodified.
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// Incoming search request. At least one of `text` / `image_base64` is
/// required; that is validated by the engine, not by deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    /// Free-text query.
    #[serde(default, alias = "q")]
    pub text: Option<String>,
    /// Base64-encoded image payload, with or without a `data:image/...`
    /// URL prefix.
    #[serde(default)]
    pub image_base64: Option<String>,
    /// Number of results to return.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Whether to run the cross-encoder reranking stage.
    #[serde(default)]
    pub rerank: bool,
    /// Explicit gender filter; overrides auto-detection from the query text.
    #[serde(default)]
    pub gender_filter: Option<Gender>,
}

impl QueryRequest {
    /// A plain text query with default knobs.
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            text: Some(query.into()),
            image_base64: None,
            top_k: default_top_k(),
            rerank: false,
            gender_filter: None,
        }
    }
}

pub(crate) fn default_top_k() -> usize {
    12
}

/// One raw vector-search hit: a catalog product plus its inner-product
/// similarity to the query. Similarity is in [-1, 1] because both sides are
/// unit vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub product: Product,
    pub similarity: f32,
}

/// One reranked result. `relevance` is the cross-encoder score after
/// business-rule boosts, capped at 1.0; `rank` is dense and 1-based.
#[derive(Debug, Clone)]
pub struct RankedResult {
    pub product: Product,
    pub relevance: f32,
    pub rank: usize,
    pub explanation: String,
    pub boost_note: Option<String>,
}

/// Wire-level result entry, shared by the ranked and unranked paths.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost_note: Option<String>,
    /// Opaque source metadata, passed through for display layers.
    pub raw: serde_json::Value,
}

impl From<RetrievalResult> for SearchHit {
    fn from(r: RetrievalResult) -> Self {
        let p = r.product;
        SearchHit {
            id: p.id,
            title: p.title,
            price: p.price,
            rating: p.rating,
            brand: p.brand,
            score: r.similarity,
            rank: None,
            explanation: None,
            boost_note: None,
            raw: p.raw,
        }
    }
}

impl From<RankedResult> for SearchHit {
    fn from(r: RankedResult) -> Self {
        let p = r.product;
        SearchHit {
            id: p.id,
            title: p.title,
            price: p.price,
            rating: p.rating,
            brand: p.brand,
            score: r.relevance,
            rank: Some(r.rank),
            explanation: Some(r.explanation),
            boost_note: r.boost_note,
            raw: p.raw,
        }
    }
}

/// Response envelope for one search request.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub results: Vec<SearchHit>,
    pub reranked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Set whenever the engine served degraded results (rerank fallback,
    /// caption fallback). Never silently absent in those cases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
