//! Core telemetry event types describing pipeline diagnostics exposed to the
//! CLI and to broadcast subscribers.

use serde::{Deserialize, Serialize};

use crate::analysis::BrainState;
use crate::safety::SafetyReason;

/// Streaming lifecycle stages reported by the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    StreamStarted,
    StreamStopped,
    SourceExhausted,
}

/// Diagnostic error codes surfaced via telemetry metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticError {
    InvalidSample,
    QueueOverflow,
    LockPoisoned,
}

/// Metric events covering signal quality, decisions and stream lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    SignalQuality {
        quality: f32,
        window_len: usize,
    },
    Classification {
        state: BrainState,
        confidence: f32,
        safe: bool,
    },
    Verdict {
        safe: bool,
        reason: SafetyReason,
    },
    QueueOccupancy {
        percent: f32,
    },
    StreamLifecycle {
        phase: LifecyclePhase,
        timestamp_ms: u64,
    },
    Error {
        code: DiagnosticError,
        context: String,
    },
}
