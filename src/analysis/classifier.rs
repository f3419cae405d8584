// StateClassifier - threshold rules mapping band power to a brain state
//
// Rules are evaluated in order, first match wins:
// 1. beta > BETA_HIGH AND alpha < ALPHA_HIGH      -> Focus   (base 0.80)
// 2. alpha > ALPHA_HIGH AND beta < BETA_HIGH      -> Relax   (base 0.75)
// 3. beta < LOW_ACTIVITY AND alpha < LOW_ACTIVITY -> Fatigue (base 0.85)
// 4. otherwise                                    -> Relax   (base 0.50, empty reason)
//
// Confidence is the base confidence discounted by the aggregate quality and
// clamped to [0, 1]. A result is flagged safe when confidence exceeds
// MIN_SAFE_CONFIDENCE.
//
// Classification is a pure function of (thresholds, aggregate).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::aggregator::AggregateRecord;
use crate::config::ClassifierThresholds;

const FOCUS_BASE_CONFIDENCE: f32 = 0.8;
const RELAX_BASE_CONFIDENCE: f32 = 0.75;
const FATIGUE_BASE_CONFIDENCE: f32 = 0.85;
const DEFAULT_BASE_CONFIDENCE: f32 = 0.5;

pub const FOCUS_REASON: &str = "High beta + low alpha";
pub const RELAX_REASON: &str = "High alpha";
pub const FATIGUE_REASON: &str = "Low overall activity";

/// Cognitive state label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrainState {
    /// High beta, low alpha
    Focus,
    /// High alpha, low beta (also the fallback when no rule matches)
    #[default]
    Relax,
    /// Low overall activity
    Fatigue,
}

impl fmt::Display for BrainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BrainState::Focus => "Focus",
            BrainState::Relax => "Relax",
            BrainState::Fatigue => "Fatigue",
        };
        f.write_str(label)
    }
}

/// Output of one classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Detected state
    pub state: BrainState,
    /// Rule explanation; empty when the default rule applied
    pub reason: String,
    /// Quality-discounted confidence (0.0-1.0)
    pub confidence: f32,
    /// `confidence > min_safe_confidence`
    pub safe: bool,
    /// Timestamp of the aggregate this result was derived from
    pub timestamp_ms: u64,
}

/// Applies the threshold rules to aggregate records
#[derive(Debug, Clone, Default)]
pub struct StateClassifier {
    thresholds: ClassifierThresholds,
}

impl StateClassifier {
    pub fn new(thresholds: ClassifierThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ClassifierThresholds {
        &self.thresholds
    }

    /// Replace thresholds (used by runtime parameter patches)
    pub fn set_thresholds(&mut self, thresholds: ClassifierThresholds) {
        self.thresholds = thresholds;
    }

    /// Classify an aggregate record
    ///
    /// # Arguments
    /// * `agg` - Windowed band means and smoothed quality
    ///
    /// # Returns
    /// ClassificationResult with state, reason, confidence and safe flag
    pub fn classify(&self, agg: &AggregateRecord) -> ClassificationResult {
        let (state, reason, base_confidence) = self.apply_rules(agg);

        let confidence = (base_confidence * agg.quality).clamp(0.0, 1.0);

        ClassificationResult {
            state,
            reason: reason.to_string(),
            confidence,
            safe: confidence > self.thresholds.min_safe_confidence,
            timestamp_ms: agg.timestamp_ms,
        }
    }

    fn apply_rules(&self, agg: &AggregateRecord) -> (BrainState, &'static str, f32) {
        let t = &self.thresholds;
        let alpha = agg.bands.alpha;
        let beta = agg.bands.beta;

        if beta > t.beta_high && alpha < t.alpha_high {
            (BrainState::Focus, FOCUS_REASON, FOCUS_BASE_CONFIDENCE)
        } else if alpha > t.alpha_high && beta < t.beta_high {
            (BrainState::Relax, RELAX_REASON, RELAX_BASE_CONFIDENCE)
        } else if beta < t.low_activity && alpha < t.low_activity {
            (BrainState::Fatigue, FATIGUE_REASON, FATIGUE_BASE_CONFIDENCE)
        } else {
            (BrainState::default(), "", DEFAULT_BASE_CONFIDENCE)
        }
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
