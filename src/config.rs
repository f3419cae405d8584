//! Configuration management for pipeline parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling threshold experiments without recompilation. Window sizes,
//! classifier thresholds, the safety quality threshold and the synthetic
//! source settings can all be adjusted via the config file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::safety::VerdictMode;
use crate::source::SourceProfile;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "NEUROVEX_CONFIG";

/// Config file used when `NEUROVEX_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/neurovex.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub aggregator: AggregatorConfig,
    pub classifier: ClassifierThresholds,
    pub safety: SafetyConfig,
    pub source: SourceConfig,
    pub engine: EngineConfig,
}

/// Band aggregator window parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Number of samples retained for band-power averaging
    pub window_size: usize,
    /// Number of most recent samples averaged for the quality score
    pub quality_window: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            window_size: 64,
            quality_window: 8,
        }
    }
}

/// Threshold rules used by the state classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierThresholds {
    /// Beta above this (with low alpha) reads as Focus; below it (with high alpha) as Relax
    pub beta_high: f32,
    /// Alpha above this (with low beta) reads as Relax; below it (with high beta) as Focus
    pub alpha_high: f32,
    /// Alpha and beta both below this read as Fatigue
    pub low_activity: f32,
    /// Results with confidence strictly above this are flagged safe
    pub min_safe_confidence: f32,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            beta_high: 0.18,
            alpha_high: 0.12,
            low_activity: 0.06,
            min_safe_confidence: 0.25,
        }
    }
}

/// Safety gate settings applied at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Aggregate quality below this forces a poor_signal verdict
    pub quality_threshold: f32,
    /// Initial headband-connected flag
    pub headband_connected: bool,
    /// Separate (reference) or merged unsafe verdicts
    pub verdict_mode: VerdictMode,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            quality_threshold: 0.45,
            headband_connected: true,
            verdict_mode: VerdictMode::Separate,
        }
    }
}

/// Synthetic sample source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Samples emitted per second
    pub rate_hz: u32,
    /// Signal time advanced per sample, as a rate (1/128 s by default)
    pub time_step_hz: u32,
    /// Amplitude envelope of the synthetic generator
    pub profile: SourceProfile,
    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            rate_hz: 32,
            time_step_hz: 128,
            profile: SourceProfile::Demo,
            seed: None,
        }
    }
}

/// Streaming engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of the source -> worker ring buffer
    pub queue_capacity: usize,
    /// Capacity of each broadcast channel
    pub channel_capacity: usize,
    /// Log pipeline statistics every N samples (0 disables)
    pub log_every_n_samples: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            channel_capacity: 128,
            log_every_n_samples: 256,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file doesn't exist or
    /// the JSON is invalid. Fields missing from the file take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config.validated()
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from `NEUROVEX_CONFIG` or the default path
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from_file(path)
    }

    /// Clamp out-of-range values into something the pipeline can run with
    pub fn validated(mut self) -> Self {
        if self.aggregator.window_size == 0 {
            log::warn!("[Config] aggregator.window_size must be >= 1, using 1");
            self.aggregator.window_size = 1;
        }
        self.aggregator.quality_window = self
            .aggregator
            .quality_window
            .clamp(1, self.aggregator.window_size);

        let defaults = ClassifierThresholds::default();
        let t = &mut self.classifier;
        t.beta_high = unit_threshold(t.beta_high, defaults.beta_high, "classifier.beta_high");
        t.alpha_high = unit_threshold(t.alpha_high, defaults.alpha_high, "classifier.alpha_high");
        t.low_activity =
            unit_threshold(t.low_activity, defaults.low_activity, "classifier.low_activity");
        t.min_safe_confidence = unit_threshold(
            t.min_safe_confidence,
            defaults.min_safe_confidence,
            "classifier.min_safe_confidence",
        );

        self.safety.quality_threshold = unit_threshold(
            self.safety.quality_threshold,
            SafetyConfig::default().quality_threshold,
            "safety.quality_threshold",
        );

        if self.source.rate_hz == 0 {
            self.source.rate_hz = SourceConfig::default().rate_hz;
        }
        if self.source.time_step_hz == 0 {
            self.source.time_step_hz = SourceConfig::default().time_step_hz;
        }
        self.engine.queue_capacity = self.engine.queue_capacity.max(1);
        self.engine.channel_capacity = self.engine.channel_capacity.max(1);
        self
    }
}

/// Clamp a threshold into [0, 1]; non-finite values fall back
pub(crate) fn unit_threshold(value: f32, fallback: f32, name: &str) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        log::warn!(
            "[Config] {} must be finite, got {}; keeping {}",
            name,
            value,
            fallback
        );
        fallback
    }
}
