//! Sample sources feeding the pipeline.
//!
//! A source is any `Iterator<Item = Sample>` that knows its nominal rate.
//! `SyntheticSource` generates demo signal, `ReplaySource` plays back a
//! JSON-lines recording. `SampleQueue` and `SourceRunner` move samples from a
//! source thread to the classification worker.

use serde::{Deserialize, Serialize};

use crate::signal::Sample;

pub mod queue;
pub mod replay;
pub mod runner;
pub mod synthetic;

pub use queue::{SampleQueue, SampleQueueChannels, DEFAULT_QUEUE_CAPACITY};
pub use replay::{InvalidSamplePolicy, ReplaySource};
pub use runner::{Pacing, SourceRunner, SourceStats};
pub use synthetic::SyntheticSource;

/// Producer of timestamped samples at a fixed nominal rate
pub trait SampleSource: Iterator<Item = Sample> + Send {
    /// Nominal samples per second
    fn rate_hz(&self) -> u32;
}

/// Amplitude envelope used by the synthetic generator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceProfile {
    /// Mixed rhythms of the dashboard demo
    #[default]
    Demo,
    /// Strong beta, weak alpha
    Focus,
    /// Strong alpha, weak beta
    Relax,
    /// Strong delta/theta, weak alpha and beta
    Fatigue,
    /// Demo rhythms with poor electrode contact
    Degraded,
}

impl SourceProfile {
    pub const ALL: [SourceProfile; 5] = [
        SourceProfile::Demo,
        SourceProfile::Focus,
        SourceProfile::Relax,
        SourceProfile::Fatigue,
        SourceProfile::Degraded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceProfile::Demo => "demo",
            SourceProfile::Focus => "focus",
            SourceProfile::Relax => "relax",
            SourceProfile::Fatigue => "fatigue",
            SourceProfile::Degraded => "degraded",
        }
    }
}

impl std::str::FromStr for SourceProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceProfile::ALL
            .into_iter()
            .find(|profile| profile.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown profile '{}' (expected one of demo, focus, relax, fatigue, degraded)",
                    s
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_parsing() {
        assert_eq!("focus".parse::<SourceProfile>(), Ok(SourceProfile::Focus));
        assert_eq!("Relax".parse::<SourceProfile>(), Ok(SourceProfile::Relax));
        assert!("stress".parse::<SourceProfile>().is_err());
    }

    #[test]
    fn test_profile_serde_names() {
        let json = serde_json::to_string(&SourceProfile::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
    }
}
