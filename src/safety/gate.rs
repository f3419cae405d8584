// SafetyGate - fail-closed verdict over signal quality, fatigue and operator flags
//
// Persistent state: headband_connected (default true), emergency (default
// false), quality_threshold (default 0.45). Verdicts are produced by three
// triggers:
//
// - on_aggregate:      quality < threshold -> {false, poor_signal}; otherwise
//                      the base rule (connected AND NOT emergency -> ok,
//                      else disabled)
// - on_classification: Fatigue -> {false, fatigue_detected}; no verdict
//                      otherwise (separate mode)
// - set_emergency / set_headband_connected: update the flag, re-run the base rule
//
// Any single unsafe condition makes the verdict unsafe. In merged mode the
// gate remembers the latest quality and fatigue observations and every
// trigger emits one verdict listing all active reasons.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::{AggregateRecord, BrainState, ClassificationResult};
use crate::config::{unit_threshold, SafetyConfig};

/// Reason code attached to a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyReason {
    Ok,
    Disabled,
    PoorSignal,
    FatigueDetected,
}

impl SafetyReason {
    /// Higher value wins when several reasons are active
    pub fn priority(&self) -> u8 {
        match self {
            SafetyReason::PoorSignal => 3,
            SafetyReason::FatigueDetected => 2,
            SafetyReason::Disabled => 1,
            SafetyReason::Ok => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyReason::Ok => "ok",
            SafetyReason::Disabled => "disabled",
            SafetyReason::PoorSignal => "poor_signal",
            SafetyReason::FatigueDetected => "fatigue_detected",
        }
    }
}

impl fmt::Display for SafetyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How unsafe conditions detected by different triggers are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictMode {
    /// One verdict per trigger, each naming only its own condition
    #[default]
    Separate,
    /// Every trigger re-evaluates all remembered conditions into one verdict
    Merged,
}

/// Boolean gate value plus reason code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub safe: bool,
    /// Highest-priority active reason (`ok` when safe)
    pub reason: SafetyReason,
    /// All unsafe reasons behind this verdict, highest priority first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active: Vec<SafetyReason>,
}

impl SafetyVerdict {
    pub fn ok() -> Self {
        Self {
            safe: true,
            reason: SafetyReason::Ok,
            active: Vec::new(),
        }
    }

    pub fn unsafe_because(reason: SafetyReason) -> Self {
        Self::from_active(vec![reason])
    }

    /// Build a verdict from a set of unsafe reasons (empty means safe)
    pub fn from_active(mut active: Vec<SafetyReason>) -> Self {
        active.retain(|reason| *reason != SafetyReason::Ok);
        active.sort_by_key(|reason| std::cmp::Reverse(reason.priority()));
        active.dedup();

        match active.first().copied() {
            Some(reason) => Self {
                safe: false,
                reason,
                active,
            },
            None => Self::ok(),
        }
    }
}

/// Owned safety state; one instance per pipeline
#[derive(Debug, Clone)]
pub struct SafetyGate {
    headband_connected: bool,
    emergency: bool,
    quality_threshold: f32,
    mode: VerdictMode,
    poor_signal: bool,
    fatigue: bool,
}

impl SafetyGate {
    pub fn new(quality_threshold: f32, mode: VerdictMode) -> Self {
        Self {
            headband_connected: true,
            emergency: false,
            quality_threshold: unit_threshold(
                quality_threshold,
                SafetyConfig::default().quality_threshold,
                "quality_threshold",
            ),
            mode,
            poor_signal: false,
            fatigue: false,
        }
    }

    pub fn from_config(config: &SafetyConfig) -> Self {
        let mut gate = Self::new(config.quality_threshold, config.verdict_mode);
        gate.headband_connected = config.headband_connected;
        gate
    }

    /// Verdict for a new aggregate record
    pub fn on_aggregate(&mut self, agg: &AggregateRecord) -> SafetyVerdict {
        // NaN on either side counts as poor signal
        self.poor_signal = !(agg.quality >= self.quality_threshold);

        match self.mode {
            VerdictMode::Separate => {
                if self.poor_signal {
                    SafetyVerdict::unsafe_because(SafetyReason::PoorSignal)
                } else {
                    self.evaluate_base()
                }
            }
            VerdictMode::Merged => self.merged_verdict(),
        }
    }

    /// Verdict for a new classification, if one is due
    ///
    /// Separate mode only speaks up on Fatigue; merged mode always emits.
    pub fn on_classification(&mut self, result: &ClassificationResult) -> Option<SafetyVerdict> {
        self.fatigue = result.state == BrainState::Fatigue;

        match self.mode {
            VerdictMode::Separate => self
                .fatigue
                .then(|| SafetyVerdict::unsafe_because(SafetyReason::FatigueDetected)),
            VerdictMode::Merged => Some(self.merged_verdict()),
        }
    }

    /// Engage or release the emergency stop
    pub fn set_emergency(&mut self, engaged: bool) -> SafetyVerdict {
        if engaged != self.emergency {
            if engaged {
                log::warn!("[SafetyGate] Emergency stop engaged");
            } else {
                log::info!("[SafetyGate] Emergency stop released");
            }
        }
        self.emergency = engaged;
        self.flag_verdict()
    }

    /// Release the emergency stop
    pub fn reset_emergency(&mut self) -> SafetyVerdict {
        self.set_emergency(false)
    }

    /// Record headband connect/disconnect
    pub fn set_headband_connected(&mut self, connected: bool) -> SafetyVerdict {
        if connected != self.headband_connected {
            log::info!(
                "[SafetyGate] Headband {}",
                if connected { "connected" } else { "disconnected" }
            );
        }
        self.headband_connected = connected;
        self.flag_verdict()
    }

    /// Non-finite thresholds are ignored and the current one is kept
    pub fn set_quality_threshold(&mut self, threshold: f32) {
        self.quality_threshold =
            unit_threshold(threshold, self.quality_threshold, "quality_threshold");
    }

    /// Forget the remembered poor-signal and fatigue observations
    pub fn clear_observations(&mut self) {
        self.poor_signal = false;
        self.fatigue = false;
    }

    pub fn set_mode(&mut self, mode: VerdictMode) {
        self.mode = mode;
    }

    /// Base rule: connected AND NOT emergency
    pub fn evaluate_base(&self) -> SafetyVerdict {
        if self.headband_connected && !self.emergency {
            SafetyVerdict::ok()
        } else {
            SafetyVerdict::unsafe_because(SafetyReason::Disabled)
        }
    }

    fn flag_verdict(&self) -> SafetyVerdict {
        match self.mode {
            VerdictMode::Separate => self.evaluate_base(),
            VerdictMode::Merged => self.merged_verdict(),
        }
    }

    fn merged_verdict(&self) -> SafetyVerdict {
        let mut active = Vec::with_capacity(3);
        if self.poor_signal {
            active.push(SafetyReason::PoorSignal);
        }
        if self.fatigue {
            active.push(SafetyReason::FatigueDetected);
        }
        if !self.evaluate_base().safe {
            active.push(SafetyReason::Disabled);
        }
        SafetyVerdict::from_active(active)
    }

    pub fn headband_connected(&self) -> bool {
        self.headband_connected
    }

    pub fn emergency(&self) -> bool {
        self.emergency
    }

    pub fn quality_threshold(&self) -> f32 {
        self.quality_threshold
    }

    pub fn mode(&self) -> VerdictMode {
        self.mode
    }
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self::from_config(&SafetyConfig::default())
    }
}
