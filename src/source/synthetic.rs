// SyntheticSource - demo EEG generator
//
// Each band is a sinusoid at a fixed frequency whose amplitude is redrawn
// for every sample from the profile's envelope:
//
//   band(t) = sin(2*pi*f*t) * (rand * span + min)
//
// Signal time advances 1/time_step_hz per sample (1/128 s by default) while
// samples are stamped at the emission rate (32 Hz by default), matching the
// dashboard demo. Quality is drawn uniformly from the profile's range.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SourceConfig;
use crate::signal::{Band, BandPowers, Sample};
use crate::source::{SampleSource, SourceProfile};

/// Amplitude envelope: amplitude = min + rand * span
#[derive(Debug, Clone, Copy)]
struct Envelope {
    min: f32,
    span: f32,
}

const fn env(min: f32, span: f32) -> Envelope {
    Envelope { min, span }
}

fn band_frequency_hz(band: Band) -> f64 {
    match band {
        Band::Delta => 1.0,
        Band::Theta => 5.0,
        Band::Alpha => 10.0,
        Band::Beta => 20.0,
        Band::Gamma => 40.0,
    }
}

/// Per-band envelopes in canonical band order plus the quality envelope
fn profile_envelopes(profile: SourceProfile) -> ([Envelope; 5], Envelope) {
    const DEMO_BANDS: [Envelope; 5] = [
        env(0.2, 0.6),
        env(0.1, 0.4),
        env(0.1, 0.5),
        env(0.1, 0.7),
        env(0.05, 0.3),
    ];

    match profile {
        SourceProfile::Demo => (DEMO_BANDS, env(0.8, 0.2)),
        SourceProfile::Focus => (
            [
                env(0.1, 0.2),
                env(0.05, 0.1),
                env(0.02, 0.05),
                env(0.35, 0.2),
                env(0.05, 0.1),
            ],
            env(0.85, 0.15),
        ),
        SourceProfile::Relax => (
            [
                env(0.1, 0.2),
                env(0.05, 0.1),
                env(0.35, 0.2),
                env(0.03, 0.05),
                env(0.02, 0.05),
            ],
            env(0.85, 0.15),
        ),
        SourceProfile::Fatigue => (
            [
                env(0.3, 0.3),
                env(0.4, 0.3),
                env(0.01, 0.04),
                env(0.01, 0.04),
                env(0.01, 0.03),
            ],
            env(0.8, 0.2),
        ),
        SourceProfile::Degraded => (DEMO_BANDS, env(0.1, 0.3)),
    }
}

/// Infinite seeded generator of demo samples
pub struct SyntheticSource {
    rng: StdRng,
    profile: SourceProfile,
    bands: [Envelope; 5],
    quality: Envelope,
    rate_hz: u32,
    time_step_s: f64,
    t: f64,
    emitted: u64,
    start_ms: u64,
}

impl SyntheticSource {
    /// Create a source with an explicit seed (reproducible output)
    pub fn with_seed(profile: SourceProfile, seed: u64) -> Self {
        Self::build(profile, StdRng::seed_from_u64(seed))
    }

    /// Create a source seeded from OS entropy
    pub fn new(profile: SourceProfile) -> Self {
        Self::build(profile, StdRng::from_entropy())
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        let source = match config.seed {
            Some(seed) => Self::with_seed(config.profile, seed),
            None => Self::new(config.profile),
        };
        source
            .with_rate(config.rate_hz)
            .with_time_step_hz(config.time_step_hz)
    }

    fn build(profile: SourceProfile, rng: StdRng) -> Self {
        let (bands, quality) = profile_envelopes(profile);
        Self {
            rng,
            profile,
            bands,
            quality,
            rate_hz: 32,
            time_step_s: 1.0 / 128.0,
            t: 0.0,
            emitted: 0,
            start_ms: 0,
        }
    }

    /// Emission rate used for timestamps and real-time pacing
    pub fn with_rate(mut self, rate_hz: u32) -> Self {
        self.rate_hz = rate_hz.max(1);
        self
    }

    /// Signal-time resolution (samples per simulated second)
    pub fn with_time_step_hz(mut self, time_step_hz: u32) -> Self {
        self.time_step_s = 1.0 / time_step_hz.max(1) as f64;
        self
    }

    /// Offset applied to every timestamp
    pub fn with_start_ms(mut self, start_ms: u64) -> Self {
        self.start_ms = start_ms;
        self
    }

    pub fn profile(&self) -> SourceProfile {
        self.profile
    }

    /// Switch envelopes without resetting time or RNG state
    pub fn set_profile(&mut self, profile: SourceProfile) {
        let (bands, quality) = profile_envelopes(profile);
        self.profile = profile;
        self.bands = bands;
        self.quality = quality;
    }

    fn draw(&mut self, envelope: Envelope) -> f32 {
        envelope.min + self.rng.gen::<f32>() * envelope.span
    }

    fn generate(&mut self) -> Sample {
        self.t += self.time_step_s;

        let mut bands = BandPowers::default();
        for (idx, band) in Band::ALL.into_iter().enumerate() {
            let amplitude = self.draw(self.bands[idx]);
            let phase = (2.0 * PI * band_frequency_hz(band) * self.t).sin() as f32;
            bands.set(band, phase * amplitude);
        }

        let quality = self.draw(self.quality).clamp(0.0, 1.0);
        let timestamp_ms = self.start_ms + self.emitted * 1000 / self.rate_hz as u64;
        self.emitted += 1;

        Sample::new(timestamp_ms, bands, quality)
    }
}

impl Iterator for SyntheticSource {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        Some(self.generate())
    }
}

impl SampleSource for SyntheticSource {
    fn rate_hz(&self) -> u32 {
        self.rate_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{BandAggregator, BrainState, StateClassifier};

    fn classify_after(profile: SourceProfile, samples: usize) -> BrainState {
        let mut aggregator = BandAggregator::default();
        let classifier = StateClassifier::default();
        let mut last = None;
        for sample in SyntheticSource::with_seed(profile, 42).take(samples) {
            let agg = aggregator.ingest(sample).unwrap();
            last = Some(classifier.classify(&agg));
        }
        last.unwrap().state
    }

    #[test]
    fn test_seeded_sources_are_reproducible() {
        let a: Vec<Sample> = SyntheticSource::with_seed(SourceProfile::Demo, 7)
            .take(32)
            .collect();
        let b: Vec<Sample> = SyntheticSource::with_seed(SourceProfile::Demo, 7)
            .take(32)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_samples_are_valid() {
        for profile in SourceProfile::ALL {
            for sample in SyntheticSource::with_seed(profile, 1).take(256) {
                assert!(sample.validate().is_ok(), "{:?} produced {:?}", profile, sample);
            }
        }
    }

    #[test]
    fn test_timestamps_follow_emission_rate() {
        let samples: Vec<Sample> = SyntheticSource::with_seed(SourceProfile::Demo, 3)
            .with_rate(32)
            .with_start_ms(1_000)
            .take(3)
            .collect();
        assert_eq!(samples[0].timestamp_ms, 1_000);
        assert_eq!(samples[1].timestamp_ms, 1_031);
        assert_eq!(samples[2].timestamp_ms, 1_062);
    }

    #[test]
    fn test_demo_quality_range() {
        for sample in SyntheticSource::with_seed(SourceProfile::Demo, 9).take(500) {
            assert!((0.8..=1.0).contains(&sample.quality));
        }
    }

    #[test]
    fn test_degraded_quality_range() {
        for sample in SyntheticSource::with_seed(SourceProfile::Degraded, 9).take(500) {
            assert!(sample.quality <= 0.4 + f32::EPSILON);
        }
    }

    #[test]
    fn test_profiles_drive_expected_states() {
        assert_eq!(classify_after(SourceProfile::Focus, 128), BrainState::Focus);
        assert_eq!(classify_after(SourceProfile::Relax, 128), BrainState::Relax);
        assert_eq!(
            classify_after(SourceProfile::Fatigue, 128),
            BrainState::Fatigue
        );
    }

    #[test]
    fn test_set_profile_keeps_timeline() {
        let mut source = SyntheticSource::with_seed(SourceProfile::Demo, 5);
        let first = source.next().unwrap();
        source.set_profile(SourceProfile::Fatigue);
        let second = source.next().unwrap();
        assert_eq!(source.profile(), SourceProfile::Fatigue);
        assert!(second.timestamp_ms > first.timestamp_ms);
    }
}
