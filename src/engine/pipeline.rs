//! SignalPipeline: synchronous aggregator -> classifier -> gate chain.
//!
//! Every sample runs to completion before the next one is accepted. Events
//! are delivered to registered observers in a fixed order:
//!
//! 1. aggregate
//! 2. gate verdict for the aggregate (quality / base rule)
//! 3. classification
//! 4. gate verdict for the classification (fatigue, or the merged verdict)
//!
//! The verdict derived from the classification is always emitted last, so a
//! fatigue verdict is never overtaken by an "ok" from the same sample.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::analysis::{AggregateRecord, BandAggregator, ClassificationResult, StateClassifier};
use crate::config::{AppConfig, ClassifierThresholds};
use crate::error::{log_sample_error, SampleError};
use crate::safety::{SafetyGate, SafetyVerdict, VerdictLatch, VerdictMode};
use crate::signal::Sample;

/// Typed replacement for the string-keyed event bus.
///
/// All methods default to no-ops so observers implement only what they need.
pub trait PipelineObserver: Send {
    fn on_aggregate(&mut self, _agg: &AggregateRecord) {}
    fn on_classification(&mut self, _result: &ClassificationResult) {}
    fn on_safety_verdict(&mut self, _verdict: &SafetyVerdict) {}
    fn on_rejected(&mut self, _err: &SampleError) {}
}

/// One emitted event, serialized with an `event` tag for JSON-lines output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Aggregate(AggregateRecord),
    Classification(ClassificationResult),
    SafetyVerdict(SafetyVerdict),
}

/// Everything produced by a single `on_sample` call
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub aggregate: AggregateRecord,
    pub classification: ClassificationResult,
    /// Verdicts in emission order (one or two)
    pub verdicts: Vec<SafetyVerdict>,
}

impl PipelineOutput {
    /// The verdict a latch would hold after this sample
    pub fn final_verdict(&self) -> Option<&SafetyVerdict> {
        self.verdicts.last()
    }

    /// Events in the order observers received them
    pub fn events(&self) -> Vec<PipelineEvent> {
        let mut events = Vec::with_capacity(2 + self.verdicts.len());
        events.push(PipelineEvent::Aggregate(self.aggregate));
        let mut verdicts = self.verdicts.iter().cloned();
        if let Some(first) = verdicts.next() {
            events.push(PipelineEvent::SafetyVerdict(first));
        }
        events.push(PipelineEvent::Classification(self.classification.clone()));
        events.extend(verdicts.map(PipelineEvent::SafetyVerdict));
        events
    }
}

pub struct SignalPipeline {
    aggregator: BandAggregator,
    classifier: StateClassifier,
    gate: SafetyGate,
    latch: VerdictLatch,
    observers: Vec<Box<dyn PipelineObserver>>,
    processed: u64,
    rejected: u64,
    log_every_n_samples: u64,
}

impl SignalPipeline {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            aggregator: BandAggregator::from_config(&config.aggregator),
            classifier: StateClassifier::new(config.classifier),
            gate: SafetyGate::from_config(&config.safety),
            latch: VerdictLatch::new(),
            observers: Vec::new(),
            processed: 0,
            rejected: 0,
            log_every_n_samples: config.engine.log_every_n_samples,
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn PipelineObserver>) {
        self.observers.push(observer);
    }

    pub fn with_observer(mut self, observer: Box<dyn PipelineObserver>) -> Self {
        self.add_observer(observer);
        self
    }

    /// Push one sample through the chain.
    ///
    /// A rejected sample leaves every component untouched and emits nothing
    /// except `on_rejected`.
    pub fn on_sample(&mut self, sample: Sample) -> Result<PipelineOutput, SampleError> {
        let aggregate = match self.aggregator.ingest(sample) {
            Ok(aggregate) => aggregate,
            Err(err) => {
                self.rejected += 1;
                log_sample_error(&err, "SignalPipeline::on_sample");
                for observer in self.observers.iter_mut() {
                    observer.on_rejected(&err);
                }
                return Err(err);
            }
        };

        for observer in self.observers.iter_mut() {
            observer.on_aggregate(&aggregate);
        }

        let mut verdicts = Vec::with_capacity(2);
        let verdict = self.gate.on_aggregate(&aggregate);
        self.emit_verdict(&verdict);
        verdicts.push(verdict);

        let classification = self.classifier.classify(&aggregate);
        for observer in self.observers.iter_mut() {
            observer.on_classification(&classification);
        }

        if let Some(verdict) = self.gate.on_classification(&classification) {
            self.emit_verdict(&verdict);
            verdicts.push(verdict);
        }

        self.processed += 1;
        if self.log_every_n_samples > 0 && self.processed % self.log_every_n_samples == 0 {
            debug!(
                "[SignalPipeline] {} samples processed, state={}, confidence={:.3}, quality={:.3}",
                self.processed, classification.state, classification.confidence, aggregate.quality
            );
        }

        Ok(PipelineOutput {
            aggregate,
            classification,
            verdicts,
        })
    }

    pub fn set_emergency(&mut self, engaged: bool) -> SafetyVerdict {
        let verdict = self.gate.set_emergency(engaged);
        self.emit_verdict(&verdict);
        verdict
    }

    pub fn reset_emergency(&mut self) -> SafetyVerdict {
        let verdict = self.gate.reset_emergency();
        self.emit_verdict(&verdict);
        verdict
    }

    pub fn set_headband_connected(&mut self, connected: bool) -> SafetyVerdict {
        let verdict = self.gate.set_headband_connected(connected);
        self.emit_verdict(&verdict);
        verdict
    }

    pub fn set_thresholds(&mut self, thresholds: ClassifierThresholds) {
        info!("[SignalPipeline] Classifier thresholds updated: {:?}", thresholds);
        self.classifier.set_thresholds(thresholds);
    }

    pub fn set_quality_threshold(&mut self, threshold: f32) {
        self.gate.set_quality_threshold(threshold);
    }

    pub fn set_verdict_mode(&mut self, mode: VerdictMode) {
        self.gate.set_mode(mode);
    }

    /// Latched view: false before the first verdict and while unsafe
    pub fn actuation_permitted(&self) -> bool {
        self.latch.permits_actuation()
    }

    pub fn latch(&self) -> &VerdictLatch {
        &self.latch
    }

    pub fn gate(&self) -> &SafetyGate {
        &self.gate
    }

    pub fn classifier(&self) -> &StateClassifier {
        &self.classifier
    }

    pub fn aggregator(&self) -> &BandAggregator {
        &self.aggregator
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Drop buffered samples, the latched verdict and the gate's remembered
    /// quality/fatigue observations. Operator flags (emergency, headband) are kept.
    pub fn reset_window(&mut self) {
        self.aggregator.clear();
        self.gate.clear_observations();
        self.latch.reset();
    }

    fn emit_verdict(&mut self, verdict: &SafetyVerdict) {
        self.latch.observe(verdict);
        for observer in self.observers.iter_mut() {
            observer.on_safety_verdict(verdict);
        }
    }
}

impl Default for SignalPipeline {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

/// Observer that records every event; handy for tests and batch runs
#[derive(Debug, Default, Clone)]
pub struct EventRecorder {
    events: std::sync::Arc<std::sync::Mutex<Vec<PipelineEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    fn push(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl PipelineObserver for EventRecorder {
    fn on_aggregate(&mut self, agg: &AggregateRecord) {
        self.push(PipelineEvent::Aggregate(*agg));
    }

    fn on_classification(&mut self, result: &ClassificationResult) {
        self.push(PipelineEvent::Classification(result.clone()));
    }

    fn on_safety_verdict(&mut self, verdict: &SafetyVerdict) {
        self.push(PipelineEvent::SafetyVerdict(verdict.clone()));
    }
}
