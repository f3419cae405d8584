// BroadcastChannelManager: Centralized tokio broadcast channel management
// Single Responsibility: Broadcast channel lifecycle and subscription

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::analysis::{AggregateRecord, ClassificationResult};
use crate::engine::pipeline::PipelineObserver;
use crate::safety::SafetyVerdict;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

type Slot<T> = Arc<Mutex<Option<broadcast::Sender<T>>>>;

fn lock_slot<T>(slot: &Slot<T>) -> MutexGuard<'_, Option<broadcast::Sender<T>>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn get_or_init<T: Clone>(slot: &Slot<T>, capacity: usize) -> broadcast::Sender<T> {
    let mut guard = lock_slot(slot);
    guard
        .get_or_insert_with(|| broadcast::channel(capacity).0)
        .clone()
}

fn subscribe<T: Clone>(slot: &Slot<T>) -> Option<broadcast::Receiver<T>> {
    lock_slot(slot).as_ref().map(|tx| tx.subscribe())
}

/// Manages the pipeline's tokio broadcast channels
///
/// # Channel Types
/// - Aggregates: smoothed band power and quality, one per accepted sample
/// - Classifications: state label, reason and confidence, one per accepted sample
/// - Verdicts: every safety verdict, including those from operator commands
///
/// Slow subscribers lag and lose the oldest messages; the pipeline never
/// blocks on a broadcast send.
pub struct BroadcastChannelManager {
    capacity: usize,
    aggregates: Slot<AggregateRecord>,
    classifications: Slot<ClassificationResult>,
    verdicts: Slot<SafetyVerdict>,
}

impl BroadcastChannelManager {
    /// Create a manager with all channels uninitialized
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            aggregates: Arc::new(Mutex::new(None)),
            classifications: Arc::new(Mutex::new(None)),
            verdicts: Arc::new(Mutex::new(None)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // ========================================================================
    // AGGREGATE CHANNEL
    // ========================================================================

    /// Initialize (or fetch) the aggregate sender
    pub fn init_aggregates(&self) -> broadcast::Sender<AggregateRecord> {
        get_or_init(&self.aggregates, self.capacity)
    }

    /// Subscribe to aggregates; `None` until `init_aggregates` has run
    pub fn subscribe_aggregates(&self) -> Option<broadcast::Receiver<AggregateRecord>> {
        subscribe(&self.aggregates)
    }

    // ========================================================================
    // CLASSIFICATION CHANNEL
    // ========================================================================

    pub fn init_classifications(&self) -> broadcast::Sender<ClassificationResult> {
        get_or_init(&self.classifications, self.capacity)
    }

    pub fn subscribe_classifications(
        &self,
    ) -> Option<broadcast::Receiver<ClassificationResult>> {
        subscribe(&self.classifications)
    }

    // ========================================================================
    // VERDICT CHANNEL
    // ========================================================================

    pub fn init_verdicts(&self) -> broadcast::Sender<SafetyVerdict> {
        get_or_init(&self.verdicts, self.capacity)
    }

    pub fn subscribe_verdicts(&self) -> Option<broadcast::Receiver<SafetyVerdict>> {
        subscribe(&self.verdicts)
    }

    /// Initialize every channel and return an observer publishing into them
    pub fn observer(&self) -> ChannelObserver {
        ChannelObserver {
            aggregates: self.init_aggregates(),
            classifications: self.init_classifications(),
            verdicts: self.init_verdicts(),
        }
    }

    /// Drop all senders; existing receivers see the channel close
    pub fn close_all(&self) {
        lock_slot(&self.aggregates).take();
        lock_slot(&self.classifications).take();
        lock_slot(&self.verdicts).take();
    }
}

impl Default for BroadcastChannelManager {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Pipeline observer fanning events out to broadcast subscribers
pub struct ChannelObserver {
    aggregates: broadcast::Sender<AggregateRecord>,
    classifications: broadcast::Sender<ClassificationResult>,
    verdicts: broadcast::Sender<SafetyVerdict>,
}

impl PipelineObserver for ChannelObserver {
    fn on_aggregate(&mut self, agg: &AggregateRecord) {
        // Err only means no receivers are subscribed right now
        let _ = self.aggregates.send(*agg);
    }

    fn on_classification(&mut self, result: &ClassificationResult) {
        let _ = self.classifications.send(result.clone());
    }

    fn on_safety_verdict(&mut self, verdict: &SafetyVerdict) {
        let _ = self.verdicts.send(verdict.clone());
    }
}
