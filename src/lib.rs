// Neurovex Core - EEG brain-state pipeline
// Band aggregation, threshold classification and fail-closed safety gating

// Module declarations
pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod managers;
pub mod safety;
pub mod signal;
pub mod source;
pub mod telemetry;

// Re-exports for convenience
pub use analysis::{AggregateRecord, BandAggregator, BrainState, ClassificationResult, StateClassifier};
pub use config::AppConfig;
pub use engine::{EngineHandle, ParamPatch, PipelineEvent, PipelineObserver, SignalPipeline};
pub use error::{ErrorCode, PipelineError, SampleError};
pub use safety::{SafetyGate, SafetyReason, SafetyVerdict, VerdictLatch, VerdictMode};
pub use signal::{Band, BandPowers, RawSample, Sample};

/// Install the fmt subscriber on stderr (also captures `log` records).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(false);
        init_logging(true);
        log::info!("[Test] logging initialized");
    }
}
