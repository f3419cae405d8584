//! Diagnostics telemetry collector and helpers.
//!
//! The collector multiplexes signal quality, classification, verdict, queue
//! occupancy and stream lifecycle events into a bounded history plus an async
//! broadcast stream. The hub also keeps per-reason counts of unsafe verdicts.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use tokio::sync::{broadcast, mpsc};

use crate::analysis::{AggregateRecord, ClassificationResult};
use crate::engine::pipeline::PipelineObserver;
use crate::error::{ErrorCode, SampleError};
use crate::safety::{SafetyReason, SafetyVerdict};

pub mod events;

pub use events::{DiagnosticError, LifecyclePhase, MetricEvent};

/// Global telemetry hub shared across the crate.
static HUB: Lazy<Arc<TelemetryHub>> = Lazy::new(|| Arc::new(TelemetryHub::default()));

/// Shared handle to the global hub, for owners that need `Arc`.
pub fn shared_hub() -> Arc<TelemetryHub> {
    Arc::clone(&HUB)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
    /// Unsafe verdict counts keyed by reason code
    pub unsafe_verdicts: BTreeMap<String, u64>,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        let history_capacity = history_capacity.max(1);
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = lock(&self.history);
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    /// Forward events into an unbounded channel. Must be called from within
    /// a tokio runtime.
    pub fn subscribe_unbounded(&self) -> mpsc::UnboundedReceiver<MetricEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut broadcast_rx = self.tx.subscribe();

        tokio::spawn(async move {
            while let Ok(event) = broadcast_rx.recv().await {
                if tx.send(event).is_err() {
                    break;
                }
            }
        });

        rx
    }

    fn history(&self) -> Vec<MetricEvent> {
        lock(&self.history).iter().cloned().collect()
    }

    fn totals(&self) -> (u64, u64) {
        (
            self.total_events.load(Ordering::Relaxed),
            self.dropped_history.load(Ordering::Relaxed),
        )
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Top-level hub wrapping collector state plus derived gauges.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    quality_gauge: Mutex<Option<f32>>,
    queue_gauge: Mutex<Option<f32>>,
    unsafe_counts: Mutex<HashMap<SafetyReason, u64>>,
}

impl TelemetryHub {
    /// Minimum quality change that produces a new SignalQuality event
    const QUALITY_STEP: f32 = 0.05;
    /// Minimum occupancy change (percent) that produces a new QueueOccupancy event
    const OCCUPANCY_STEP: f32 = 2.5;

    pub fn new(channel_capacity: usize, history_capacity: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            quality_gauge: Mutex::new(None),
            queue_gauge: Mutex::new(None),
            unsafe_counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let (total_events, dropped_events) = self.collector.totals();
        let unsafe_verdicts = lock(&self.unsafe_counts)
            .iter()
            .map(|(reason, count)| (reason.as_str().to_string(), *count))
            .collect();
        TelemetrySnapshot {
            recent: self.collector.history(),
            total_events,
            dropped_events,
            unsafe_verdicts,
        }
    }

    /// Debounced: only emits when quality moved by at least `QUALITY_STEP`
    pub fn record_aggregate(&self, agg: &AggregateRecord) {
        let mut gauge = lock(&self.quality_gauge);
        let should_emit = gauge
            .map(|last| (last - agg.quality).abs() >= Self::QUALITY_STEP)
            .unwrap_or(true);

        if should_emit {
            *gauge = Some(agg.quality);
            self.collector.publish(MetricEvent::SignalQuality {
                quality: agg.quality,
                window_len: agg.window_len,
            });
        }
    }

    pub fn record_classification(&self, result: &ClassificationResult) {
        self.collector.publish(MetricEvent::Classification {
            state: result.state,
            confidence: result.confidence,
            safe: result.safe,
        });
    }

    pub fn record_verdict(&self, verdict: &SafetyVerdict) {
        if !verdict.safe {
            let mut counts = lock(&self.unsafe_counts);
            *counts.entry(verdict.reason).or_insert(0) += 1;
        }
        self.collector.publish(MetricEvent::Verdict {
            safe: verdict.safe,
            reason: verdict.reason,
        });
    }

    pub fn record_queue_occupancy(&self, percent: f32) {
        let normalized = percent.clamp(0.0, 100.0);
        let mut gauge = lock(&self.queue_gauge);
        let should_emit = gauge
            .map(|last| (last - normalized).abs() >= Self::OCCUPANCY_STEP)
            .unwrap_or(true);

        if should_emit {
            *gauge = Some(normalized);
            self.collector
                .publish(MetricEvent::QueueOccupancy { percent: normalized });
        }
    }

    pub fn record_lifecycle(&self, phase: LifecyclePhase) {
        self.collector.publish(MetricEvent::StreamLifecycle {
            phase,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_error(&self, code: DiagnosticError, context: impl Into<String>) {
        self.collector.publish(MetricEvent::Error {
            code,
            context: context.into(),
        });
    }

    pub fn unsafe_count(&self, reason: SafetyReason) -> u64 {
        lock(&self.unsafe_counts)
            .get(&reason)
            .copied()
            .unwrap_or(0)
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Pipeline observer recording every event into a hub
pub struct TelemetryObserver {
    hub: Arc<TelemetryHub>,
}

impl TelemetryObserver {
    pub fn new(hub: Arc<TelemetryHub>) -> Self {
        Self { hub }
    }
}

impl PipelineObserver for TelemetryObserver {
    fn on_aggregate(&mut self, agg: &AggregateRecord) {
        self.hub.record_aggregate(agg);
    }

    fn on_classification(&mut self, result: &ClassificationResult) {
        self.hub.record_classification(result);
    }

    fn on_safety_verdict(&mut self, verdict: &SafetyVerdict) {
        self.hub.record_verdict(verdict);
    }

    fn on_rejected(&mut self, err: &SampleError) {
        self.hub.record_error(
            DiagnosticError::InvalidSample,
            format!("code {}: {}", err.code(), err.message()),
        );
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
