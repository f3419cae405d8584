// Analysis module - band aggregation and brain-state classification
//
// Pipeline stages owned here:
// - BandAggregator: sliding window -> AggregateRecord
// - StateClassifier: AggregateRecord -> ClassificationResult
//
// The safety gate lives in `crate::safety`; composition of all three stages
// is in `crate::engine::pipeline`.

pub mod aggregator;
pub mod classifier;

pub use aggregator::{AggregateRecord, BandAggregator};
pub use classifier::{BrainState, ClassificationResult, StateClassifier};
