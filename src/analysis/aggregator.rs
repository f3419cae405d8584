// BandAggregator - sliding-window band power and quality smoothing
//
// Keeps the most recent `window_size` samples in a FIFO. Every ingest
// recomputes, from scratch:
// - bands[k]: mean of |sample.bands[k]| over the whole window
// - quality:  mean quality of the last `quality_window` samples
//
// The quality window is shorter than the band window; a degrading electrode
// contact shows up in the quality score within a few ticks.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::AggregatorConfig;
use crate::error::SampleError;
use crate::signal::{BandPowers, Sample};

/// Windowed summary of recent samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    /// Mean absolute magnitude per band over the window (non-negative)
    pub bands: BandPowers,
    /// Smoothed quality in [0, 1]
    pub quality: f32,
    /// Timestamp of the newest sample in the window
    pub timestamp_ms: u64,
    /// Number of samples the band means were computed over
    pub window_len: usize,
}

impl AggregateRecord {
    /// Build a record directly from band means and quality (quality is clamped)
    pub fn new(bands: BandPowers, quality: f32) -> Self {
        Self {
            bands,
            quality: quality.clamp(0.0, 1.0),
            timestamp_ms: 0,
            window_len: 0,
        }
    }
}

/// Bounded FIFO of samples producing an `AggregateRecord` per ingest
///
/// Not thread-safe on its own; callers that ingest from several threads
/// wrap the owning pipeline in a mutex (see `EngineHandle`).
#[derive(Debug)]
pub struct BandAggregator {
    window: VecDeque<Sample>,
    window_size: usize,
    quality_window: usize,
}

impl BandAggregator {
    /// Create an aggregator with explicit window sizes
    ///
    /// Both sizes are raised to at least 1; the quality window is capped at
    /// the band window since it reads from the same buffer.
    pub fn new(window_size: usize, quality_window: usize) -> Self {
        let window_size = window_size.max(1);
        let quality_window = quality_window.clamp(1, window_size);
        Self {
            window: VecDeque::with_capacity(window_size + 1),
            window_size,
            quality_window,
        }
    }

    pub fn from_config(config: &AggregatorConfig) -> Self {
        Self::new(config.window_size, config.quality_window)
    }

    /// Validate, buffer and summarize one sample
    ///
    /// On error the window is left untouched.
    pub fn ingest(&mut self, sample: Sample) -> Result<AggregateRecord, SampleError> {
        if let Err(err) = sample.validate() {
            log::debug!(
                "[Aggregator] Rejected sample at {} ms: {}",
                sample.timestamp_ms,
                err
            );
            return Err(err);
        }

        self.window.push_back(sample);
        if self.window.len() > self.window_size {
            self.window.pop_front();
        }

        Ok(self.summarize(sample.timestamp_ms))
    }

    fn summarize(&self, timestamp_ms: u64) -> AggregateRecord {
        let len = self.window.len();
        // f64 accumulators so large finite magnitudes cannot overflow to inf
        let mut sums = [0.0f64; 5];
        for sample in &self.window {
            for (sum, (_, magnitude)) in sums.iter_mut().zip(sample.bands.abs().iter()) {
                *sum += f64::from(magnitude);
            }
        }

        let n = len as f64;
        let mean = |sum: f64| (sum / n) as f32;
        let bands = BandPowers::new(
            mean(sums[0]),
            mean(sums[1]),
            mean(sums[2]),
            mean(sums[3]),
            mean(sums[4]),
        );

        let recent = len.min(self.quality_window);
        let quality_sum: f32 = self
            .window
            .iter()
            .skip(len - recent)
            .map(|sample| sample.quality)
            .sum();
        let quality = (quality_sum / recent as f32).clamp(0.0, 1.0);

        AggregateRecord {
            bands,
            quality,
            timestamp_ms,
            window_len: len,
        }
    }

    /// Number of samples currently buffered
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn quality_window(&self) -> usize {
        self.quality_window
    }

    /// Drop all buffered samples (e.g. after a headband reconnect)
    pub fn clear(&mut self) {
        self.window.clear();
    }
}

impl Default for BandAggregator {
    fn default() -> Self {
        Self::from_config(&AggregatorConfig::default())
    }
}
