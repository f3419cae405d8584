//! Shared sample types flowing from the signal source into the pipeline.
//!
//! `BandPowers` is a fixed five-field struct so every band mapping carries
//! exactly delta/theta/alpha/beta/gamma. Loosely-typed input (JSON maps from
//! recordings or a hardware bridge) arrives as `RawSample` and is converted
//! with `Sample::try_from`, which is where missing or unknown keys are caught.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SampleError;

/// EEG frequency band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    /// 0.5-4 Hz
    Delta,
    /// 4-8 Hz
    Theta,
    /// 8-13 Hz
    Alpha,
    /// 13-30 Hz
    Beta,
    /// 30-50 Hz
    Gamma,
}

impl Band {
    /// All bands in canonical order
    pub const ALL: [Band; 5] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Delta => "delta",
            Band::Theta => "theta",
            Band::Alpha => "alpha",
            Band::Beta => "beta",
            Band::Gamma => "gamma",
        }
    }

    pub fn from_name(name: &str) -> Option<Band> {
        Band::ALL.into_iter().find(|band| band.as_str() == name)
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Band-power magnitudes for the five fixed bands
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPowers {
    pub delta: f32,
    pub theta: f32,
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,
}

impl BandPowers {
    pub fn new(delta: f32, theta: f32, alpha: f32, beta: f32, gamma: f32) -> Self {
        Self {
            delta,
            theta,
            alpha,
            beta,
            gamma,
        }
    }

    pub fn get(&self, band: Band) -> f32 {
        match band {
            Band::Delta => self.delta,
            Band::Theta => self.theta,
            Band::Alpha => self.alpha,
            Band::Beta => self.beta,
            Band::Gamma => self.gamma,
        }
    }

    pub fn set(&mut self, band: Band, value: f32) {
        match band {
            Band::Delta => self.delta = value,
            Band::Theta => self.theta = value,
            Band::Alpha => self.alpha = value,
            Band::Beta => self.beta = value,
            Band::Gamma => self.gamma = value,
        }
    }

    /// Iterate `(band, value)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Band, f32)> + '_ {
        Band::ALL.into_iter().map(move |band| (band, self.get(band)))
    }

    /// Element-wise absolute value
    pub fn abs(&self) -> Self {
        Self::new(
            self.delta.abs(),
            self.theta.abs(),
            self.alpha.abs(),
            self.beta.abs(),
            self.gamma.abs(),
        )
    }

    /// First band holding a NaN or infinite value, if any
    pub fn first_non_finite(&self) -> Option<(Band, f32)> {
        self.iter().find(|(_, value)| !value.is_finite())
    }
}

/// One instant of raw signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Monotonic timestamp in milliseconds
    pub timestamp_ms: u64,
    /// Per-band magnitudes (may be signed; the aggregator uses absolute values)
    pub bands: BandPowers,
    /// Signal quality in [0, 1]
    pub quality: f32,
}

impl Sample {
    pub fn new(timestamp_ms: u64, bands: BandPowers, quality: f32) -> Self {
        Self {
            timestamp_ms,
            bands,
            quality,
        }
    }

    /// Check the invariants the aggregator relies on
    ///
    /// Out-of-range quality is rejected, not clamped.
    pub fn validate(&self) -> Result<(), SampleError> {
        if let Some((band, value)) = self.bands.first_non_finite() {
            return Err(SampleError::NonFiniteBand {
                band: band.to_string(),
                value,
            });
        }
        if !self.quality.is_finite() || !(0.0..=1.0).contains(&self.quality) {
            return Err(SampleError::QualityOutOfRange {
                quality: self.quality,
            });
        }
        Ok(())
    }
}

/// Loosely-typed sample as produced by recordings and external bridges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    #[serde(alias = "timestamp")]
    pub timestamp_ms: u64,
    pub bands: BTreeMap<String, f32>,
    pub quality: f32,
}

impl TryFrom<RawSample> for Sample {
    type Error = SampleError;

    fn try_from(raw: RawSample) -> Result<Self, Self::Error> {
        if let Some(unknown) = raw.bands.keys().find(|key| Band::from_name(key).is_none()) {
            return Err(SampleError::UnknownBand {
                band: unknown.clone(),
            });
        }

        let mut bands = BandPowers::default();
        for band in Band::ALL {
            let value = raw
                .bands
                .get(band.as_str())
                .copied()
                .ok_or_else(|| SampleError::MissingBand {
                    band: band.to_string(),
                })?;
            bands.set(band, value);
        }

        let sample = Sample::new(raw.timestamp_ms, bands, raw.quality);
        sample.validate()?;
        Ok(sample)
    }
}
