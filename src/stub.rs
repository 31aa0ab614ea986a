//! Deterministic offline capability implementations.
//!
//! These stand in for real embedding/captioning/scoring models when no model
//! assets are available: the index builder, the demo server, and the test
//! suites all run against them. Vectors are sinusoid values derived from a
//! hash of the input, so identical inputs always produce identical outputs
//! with minimal CPU cost.

use fxhash::hash64;

use crate::capability::{Captioner, CrossEncoder, ImageEmbedder, TextEmbedder};
use crate::error::CapabilityError;
use crate::normalize::l2_normalize_in_place;

/// Default output dimension for the stub embedders.
pub const STUB_DIMENSION: usize = 768;

fn hash_vector(seed: u64, dim: usize) -> Vec<f32> {
    let mut v = vec![0f32; dim];
    for (idx, value) in v.iter_mut().enumerate() {
        *value = (((seed >> (idx % 32)) as f32) * 0.0001 + idx as f32 * 0.37).sin();
    }
    l2_normalize_in_place(&mut v);
    v
}

/// Hash-derived text embedder.
#[derive(Debug, Clone)]
pub struct StubTextEmbedder {
    dimension: usize,
}

impl StubTextEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for StubTextEmbedder {
    fn default() -> Self {
        Self::new(STUB_DIMENSION)
    }
}

impl TextEmbedder for StubTextEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        Ok(texts
            .iter()
            .map(|t| hash_vector(hash64(t.as_bytes()), self.dimension))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Hash-derived image embedder over the raw payload bytes.
#[derive(Debug, Clone)]
pub struct StubImageEmbedder {
    dimension: usize,
}

impl StubImageEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for StubImageEmbedder {
    fn default() -> Self {
        Self::new(STUB_DIMENSION)
    }
}

impl ImageEmbedder for StubImageEmbedder {
    fn embed_image(&self, bytes: &[u8]) -> Result<Vec<f32>, CapabilityError> {
        Ok(hash_vector(hash64(bytes), self.dimension))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Captioner that picks a generic fashion description keyed off the payload
/// hash. Stable for a given image.
#[derive(Debug, Clone, Default)]
pub struct StubCaptioner;

const STUB_CAPTIONS: &[&str] = &[
    "fashion clothing style",
    "apparel outfit wear",
    "clothing fashion items",
];

impl Captioner for StubCaptioner {
    fn caption(&self, bytes: &[u8]) -> Result<String, CapabilityError> {
        let pick = (hash64(bytes) as usize) % STUB_CAPTIONS.len();
        Ok(STUB_CAPTIONS[pick].to_string())
    }
}

/// Cross-encoder that scores by word overlap between query and candidate.
///
/// Not a relevance model, but monotone in shared vocabulary, which is enough
/// for deterministic rerank ordering offline.
#[derive(Debug, Clone, Default)]
pub struct OverlapCrossEncoder;

impl CrossEncoder for OverlapCrossEncoder {
    fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>, CapabilityError> {
        let query_words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .collect();

        Ok(candidates
            .iter()
            .map(|candidate| {
                if query_words.is_empty() {
                    return 0.0;
                }
                let text = candidate.to_lowercase();
                let hits = query_words
                    .iter()
                    .filter(|w| text.split_whitespace().any(|t| {
                        t.trim_matches(|c: char| !c.is_alphanumeric()) == w.as_str()
                    }))
                    .count();
                hits as f32 / query_words.len() as f32
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_embedder_is_deterministic() {
        let embedder = StubTextEmbedder::default();
        let a = embedder.embed(&["red summer dress".into()]).unwrap();
        let b = embedder.embed(&["red summer dress".into()]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn text_embedder_differs_per_text() {
        let embedder = StubTextEmbedder::default();
        let out = embedder
            .embed(&["red dress".into(), "blue shoes".into()])
            .unwrap();
        assert_ne!(out[0], out[1]);
    }

    #[test]
    fn text_embedder_output_is_unit_length() {
        let embedder = StubTextEmbedder::new(128);
        let out = embedder.embed(&["hello".into()]).unwrap();
        let norm: f32 = out[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
        assert_eq!(out[0].len(), 128);
    }

    #[test]
    fn image_embedder_matches_configured_dimension() {
        let embedder = StubImageEmbedder::new(64);
        let v = embedder.embed_image(&[1, 2, 3]).unwrap();
        assert_eq!(v.len(), 64);
        assert_eq!(embedder.dimension(), 64);
    }

    #[test]
    fn captioner_is_stable_per_payload() {
        let captioner = StubCaptioner;
        let a = captioner.caption(&[9, 9, 9]).unwrap();
        let b = captioner.caption(&[9, 9, 9]).unwrap();
        assert_eq!(a, b);
        assert!(STUB_CAPTIONS.contains(&a.as_str()));
    }

    #[test]
    fn overlap_scores_favor_shared_words() {
        let encoder = OverlapCrossEncoder;
        let scores = encoder
            .score(
                "mens running shoes",
                &[
                    "mens running shoes lightweight".into(),
                    "womens formal dress".into(),
                ],
            )
            .unwrap();
        assert!(scores[0] > scores[1]);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn overlap_empty_query_scores_zero() {
        let encoder = OverlapCrossEncoder;
        let scores = encoder.score("", &["anything".into()]).unwrap();
        assert_eq!(scores, vec![0.0]);
    }
}
