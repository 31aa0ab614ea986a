//! Embedding cache/batcher.
//!
//! Wraps a [`TextEmbedder`] capability with query preprocessing, a bounded
//! LRU cache for short texts, and adaptive batch sizing. Output order and
//! count always match the input; every returned vector is unit length.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use lru::LruCache;

use crate::batch::BatchTuner;
use crate::capability::TextEmbedder;
use crate::error::CapabilityError;
use crate::normalize::l2_normalize_in_place;
use crate::preprocess::preprocess;

pub struct EmbeddingService {
    embedder: Arc<dyn TextEmbedder>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
    cache_text_limit: usize,
    tuner: BatchTuner,
}

impl EmbeddingService {
    /// `cache_capacity` bounds the LRU entry count; texts at or above
    /// `cache_text_limit` chars always bypass the cache.
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        cache_capacity: usize,
        cache_text_limit: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity.max(1)).expect("capacity is at least 1");
        Self {
            embedder,
            cache: Mutex::new(LruCache::new(capacity)),
            cache_text_limit,
            tuner: BatchTuner::new(),
        }
    }

    /// Output dimension of the wrapped capability.
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    pub fn tuner(&self) -> &BatchTuner {
        &self.tuner
    }

    /// Embed one text.
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        let mut out = self.embed_texts(std::slice::from_ref(&text.to_string()))?;
        Ok(out.pop().expect("one output per input"))
    }

    /// Embed a sequence of texts, preserving order and count.
    pub fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        self.embed_texts_with(texts, None)
    }

    /// Like [`embed_texts`](Self::embed_texts) with an explicit batch-size
    /// override; the tuner's computed size is advisory only.
    pub fn embed_texts_with(
        &self,
        texts: &[String],
        batch_override: Option<usize>,
    ) -> Result<Vec<Vec<f32>>, CapabilityError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batch_size = batch_override
            .unwrap_or_else(|| self.tuner.optimal_batch_size())
            .max(1);
        tracing::debug!(count = texts.len(), batch_size, "embedding texts");

        let processed: Vec<String> = texts.iter().map(|t| preprocess(t)).collect();
        let mut out: Vec<Option<Vec<f32>>> = vec![None; texts.len()];

        // Cache lookups are keyed by the original text, not the preprocessed
        // form: entries never expire, so a hit wins unconditionally.
        {
            let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
            for (i, original) in texts.iter().enumerate() {
                if original.len() < self.cache_text_limit {
                    if let Some(v) = cache.get(original) {
                        out[i] = Some(v.clone());
                    }
                }
            }
        }

        let mut start = 0;
        while start < texts.len() {
            let end = (start + batch_size).min(texts.len());
            let pending: Vec<usize> = (start..end).filter(|&i| out[i].is_none()).collect();
            if pending.is_empty() {
                start = end;
                continue;
            }

            let batch: Vec<String> = pending.iter().map(|&i| processed[i].clone()).collect();
            let call_start = Instant::now();
            let vectors = self.embedder.embed(&batch)?;
            let elapsed = call_start.elapsed();

            if vectors.len() != batch.len() {
                tracing::warn!(
                    expected = batch.len(),
                    actual = vectors.len(),
                    "embedding batch returned wrong count; retrying unbatched"
                );
                return self.embed_all_unbatched(&processed);
            }
            self.tuner.record(batch.len(), elapsed);

            let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
            for (&i, mut v) in pending.iter().zip(vectors) {
                l2_normalize_in_place(&mut v);
                if texts[i].len() < self.cache_text_limit {
                    cache.put(texts[i].clone(), v.clone());
                }
                out[i] = Some(v);
            }
            start = end;
        }

        Ok(out
            .into_iter()
            .map(|v| v.expect("every slot filled by cache or batch"))
            .collect())
    }

    /// Recovery path for a misbehaving capability: one call over all texts,
    /// no caching. A second count mismatch here is a hard error.
    fn embed_all_unbatched(&self, processed: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        let mut vectors = self.embedder.embed(processed)?;
        if vectors.len() != processed.len() {
            return Err(CapabilityError::CountMismatch {
                expected: processed.len(),
                actual: vectors.len(),
            });
        }
        for v in vectors.iter_mut() {
            l2_normalize_in_place(v);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubTextEmbedder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts texts actually sent to the underlying capability.
    struct CountingEmbedder {
        inner: StubTextEmbedder,
        calls: AtomicUsize,
        texts_seen: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new(dim: usize) -> Self {
            Self {
                inner: StubTextEmbedder::new(dim),
                calls: AtomicUsize::new(0),
                texts_seen: AtomicUsize::new(0),
            }
        }
    }

    impl TextEmbedder for CountingEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.texts_seen.fetch_add(texts.len(), Ordering::SeqCst);
            self.inner.embed(texts)
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
    }

    /// Returns a truncated batch the first `bad_calls` times.
    struct FlakyEmbedder {
        inner: StubTextEmbedder,
        bad_calls: AtomicUsize,
    }

    impl TextEmbedder for FlakyEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
            let mut out = self.inner.embed(texts)?;
            if self.bad_calls.load(Ordering::SeqCst) > 0 {
                self.bad_calls.fetch_sub(1, Ordering::SeqCst);
                out.pop();
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
    }

    #[test]
    fn preserves_order_and_count() {
        let service = EmbeddingService::new(Arc::new(StubTextEmbedder::new(32)), 10, 100);
        let texts: Vec<String> = (0..7).map(|i| format!("query number {i}")).collect();
        let out = service.embed_texts(&texts).unwrap();
        assert_eq!(out.len(), 7);
        let direct = service.embed_text("query number 3").unwrap();
        assert_eq!(out[3], direct);
    }

    #[test]
    fn short_text_embedded_once_then_cached() {
        let embedder = Arc::new(CountingEmbedder::new(32));
        let service = EmbeddingService::new(embedder.clone(), 10, 100);

        let first = service.embed_text("red dress").unwrap();
        let second = service.embed_text("red dress").unwrap();

        // Bit-identical both times, single underlying call.
        assert_eq!(first, second);
        assert_eq!(embedder.texts_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn long_text_bypasses_cache() {
        let embedder = Arc::new(CountingEmbedder::new(32));
        let service = EmbeddingService::new(embedder.clone(), 10, 100);
        let long = "lengthy ".repeat(20); // 160 chars, over the threshold

        service.embed_text(&long).unwrap();
        service.embed_text(&long).unwrap();

        assert_eq!(embedder.texts_seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cache_hits_skip_the_capability_entirely() {
        let embedder = Arc::new(CountingEmbedder::new(32));
        let service = EmbeddingService::new(embedder.clone(), 10, 100);

        service.embed_text("blue jeans").unwrap();
        let calls_after_first = embedder.calls.load(Ordering::SeqCst);
        let batch: Vec<String> = vec!["blue jeans".into(), "blue jeans".into()];
        service.embed_texts(&batch).unwrap();

        assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_after_first);
    }

    #[test]
    fn outputs_are_unit_length() {
        let service = EmbeddingService::new(Arc::new(StubTextEmbedder::new(64)), 10, 100);
        let out = service.embed_text("anything at all").unwrap();
        let norm: f32 = out.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn count_mismatch_recovers_via_unbatched_call() {
        let embedder = Arc::new(FlakyEmbedder {
            inner: StubTextEmbedder::new(32),
            bad_calls: AtomicUsize::new(1),
        });
        let service = EmbeddingService::new(embedder, 10, 100);
        let texts: Vec<String> = vec!["one".into(), "two".into(), "three".into()];

        let out = service.embed_texts(&texts).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn persistent_count_mismatch_is_an_error() {
        let embedder = Arc::new(FlakyEmbedder {
            inner: StubTextEmbedder::new(32),
            bad_calls: AtomicUsize::new(10),
        });
        let service = EmbeddingService::new(embedder, 10, 100);
        let texts: Vec<String> = vec!["one".into(), "two".into()];

        let err = service.embed_texts(&texts).unwrap_err();
        assert!(matches!(err, CapabilityError::CountMismatch { .. }));
    }

    #[test]
    fn empty_input_is_empty_output() {
        let service = EmbeddingService::new(Arc::new(StubTextEmbedder::new(32)), 10, 100);
        assert!(service.embed_texts(&[]).unwrap().is_empty());
    }

    #[test]
    fn explicit_batch_override_is_honored() {
        let embedder = Arc::new(CountingEmbedder::new(32));
        let service = EmbeddingService::new(embedder.clone(), 10, 1); // cache off
        let texts: Vec<String> = (0..6).map(|i| format!("text {i}")).collect();

        service.embed_texts_with(&texts, Some(2)).unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    }
}
