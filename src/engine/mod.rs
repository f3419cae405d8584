//! Engine module housing the signal pipeline and its threaded runtime.
//!
//! `pipeline` holds the synchronous aggregator -> classifier -> gate chain
//! and the observer trait, `worker` the queue-draining thread, and `core` the
//! `EngineHandle` orchestration layer shared by the CLI and embedders.

pub mod core;
pub mod pipeline;
pub mod worker;

pub use core::{EngineHandle, ParamPatch, StreamSummary};
pub use pipeline::{EventRecorder, PipelineEvent, PipelineObserver, PipelineOutput, SignalPipeline};
pub use worker::{PipelineWorker, WorkerStats};
