//! Adaptive batch sizing for embedding calls.

use std::sync::Mutex;
use std::time::Duration;

/// Starting batch size before enough history exists to adapt.
pub(crate) const CONSERVATIVE_BATCH: usize = 32;
/// Fallback when throughput is neither fast nor slow.
pub(crate) const STABLE_BATCH: usize = 64;
/// Floor when scaling down under slow batches.
pub(crate) const MIN_BATCH: usize = 16;
/// Cap when scaling up under fast batches.
pub(crate) const MAX_BATCH: usize = 128;

const WARMUP_BATCHES: u64 = 5;
const FAST_BATCH_SECS: f64 = 1.0;
const SLOW_BATCH_SECS: f64 = 5.0;
const GROWTH_FACTOR: f64 = 1.5;
const SHRINK_FACTOR: f64 = 0.7;

#[derive(Debug, Default)]
struct TunerState {
    batches: u64,
    total_texts: u64,
    total_secs: f64,
}

/// Moving-average snapshot, surfaced for logging and stats endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunerStats {
    pub batches: u64,
    pub avg_batch_size: f64,
    pub avg_secs_per_batch: f64,
}

/// Process-wide record of (batch size, wall-clock) observations.
///
/// The counter state is tiny, so a single mutex serializes updates; reads
/// take the same lock, which keeps the averages consistent with each other.
/// The computed size is advisory — callers may override it explicitly.
#[derive(Debug, Default)]
pub struct BatchTuner {
    state: Mutex<TunerState>,
}

impl BatchTuner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed embedding batch.
    pub fn record(&self, batch_size: usize, elapsed: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.batches += 1;
        state.total_texts += batch_size as u64;
        state.total_secs += elapsed.as_secs_f64();
        tracing::debug!(
            batch_size,
            elapsed_secs = elapsed.as_secs_f64(),
            batches = state.batches,
            "embedding batch recorded"
        );
    }

    /// The batch size to use for the next call, per observed throughput.
    pub fn optimal_batch_size(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if state.batches < WARMUP_BATCHES {
            return CONSERVATIVE_BATCH;
        }

        let avg_secs = state.total_secs / state.batches as f64;
        let avg_batch = state.total_texts as f64 / state.batches as f64;

        if avg_secs < FAST_BATCH_SECS && avg_batch < 100.0 {
            ((avg_batch * GROWTH_FACTOR) as usize).min(MAX_BATCH)
        } else if avg_secs > SLOW_BATCH_SECS {
            ((avg_batch * SHRINK_FACTOR) as usize).max(MIN_BATCH)
        } else {
            STABLE_BATCH
        }
    }

    pub fn stats(&self) -> TunerStats {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let batches = state.batches;
        if batches == 0 {
            return TunerStats {
                batches: 0,
                avg_batch_size: 0.0,
                avg_secs_per_batch: 0.0,
            };
        }
        TunerStats {
            batches,
            avg_batch_size: state.total_texts as f64 / batches as f64,
            avg_secs_per_batch: state.total_secs / batches as f64,
        }
    }
}
