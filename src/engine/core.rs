//! EngineHandle: thread-safe owner of the signal pipeline.
//!
//! The handle guards one `SignalPipeline` with a mutex so samples and
//! operator commands from any thread are serialized. It also runs the
//! threaded stream (source thread -> rtrb queue -> pipeline worker), owns the
//! broadcast channels, and applies `ParamPatch` updates shared by the CLI and
//! any embedding application.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::engine::pipeline::{PipelineOutput, SignalPipeline};
use crate::engine::worker::PipelineWorker;
use crate::error::{log_pipeline_error, PipelineError};
use crate::managers::BroadcastChannelManager;
use crate::safety::{SafetyVerdict, VerdictMode};
use crate::signal::Sample;
use crate::source::{Pacing, SampleQueue, SampleSource, SourceRunner};
use crate::telemetry::{self, LifecyclePhase, TelemetryHub, TelemetryObserver};

#[path = "core_subscriptions.rs"]
mod core_subscriptions;

/// Patch describing parameter updates to apply to the running engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamPatch {
    #[serde(default)]
    pub beta_high: Option<f32>,
    #[serde(default)]
    pub alpha_high: Option<f32>,
    #[serde(default)]
    pub low_activity: Option<f32>,
    #[serde(default)]
    pub min_safe_confidence: Option<f32>,
    #[serde(default)]
    pub quality_threshold: Option<f32>,
    #[serde(default)]
    pub verdict_mode: Option<VerdictMode>,
}

impl ParamPatch {
    pub fn is_empty(&self) -> bool {
        *self == ParamPatch::default()
    }

    /// Write the patched fields into `config` and re-validate it
    ///
    /// Non-finite values are skipped so the current setting stays in force.
    pub fn apply_to(&self, config: &mut AppConfig) {
        let thresholds = &mut config.classifier;
        patch_finite(&mut thresholds.beta_high, self.beta_high, "beta_high");
        patch_finite(&mut thresholds.alpha_high, self.alpha_high, "alpha_high");
        patch_finite(&mut thresholds.low_activity, self.low_activity, "low_activity");
        patch_finite(
            &mut thresholds.min_safe_confidence,
            self.min_safe_confidence,
            "min_safe_confidence",
        );
        patch_finite(
            &mut config.safety.quality_threshold,
            self.quality_threshold,
            "quality_threshold",
        );
        if let Some(mode) = self.verdict_mode {
            config.safety.verdict_mode = mode;
        }
        *config = std::mem::take(config).validated();
    }
}

fn patch_finite(target: &mut f32, value: Option<f32>, name: &str) {
    match value {
        Some(value) if value.is_finite() => *target = value,
        Some(value) => log::warn!(
            "[EngineHandle] Ignoring non-finite {} = {}, keeping {}",
            name,
            value,
            target
        ),
        None => {}
    }
}

/// Counters reported when a stream stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub pushed: u64,
    pub dropped: u64,
    pub processed: u64,
    pub rejected: u64,
    pub source_exhausted: bool,
    pub duration_ms: u64,
}

struct ActiveStream {
    running: Arc<AtomicBool>,
    source: SourceRunner,
    worker: PipelineWorker,
    started: Instant,
}

/// EngineHandle orchestrates the pipeline, stream threads and channels.
pub struct EngineHandle {
    config: Arc<RwLock<AppConfig>>,
    pipeline: Arc<Mutex<SignalPipeline>>,
    pub(crate) broadcasts: BroadcastChannelManager,
    telemetry: Arc<TelemetryHub>,
    stream: Mutex<Option<ActiveStream>>,
}

impl EngineHandle {
    /// Create a handle from `AppConfig::load()`, reporting to the global hub.
    pub fn new() -> Self {
        Self::from_config(AppConfig::load())
    }

    pub fn from_config(config: AppConfig) -> Self {
        Self::with_telemetry(config, telemetry::shared_hub())
    }

    /// Create a handle reporting to a private telemetry hub.
    pub fn with_telemetry(config: AppConfig, telemetry: Arc<TelemetryHub>) -> Self {
        let config = config.validated();
        let broadcasts = BroadcastChannelManager::new(config.engine.channel_capacity);
        let pipeline = SignalPipeline::new(&config)
            .with_observer(Box::new(broadcasts.observer()))
            .with_observer(Box::new(TelemetryObserver::new(Arc::clone(&telemetry))));

        Self {
            config: Arc::new(RwLock::new(config)),
            pipeline: Arc::new(Mutex::new(pipeline)),
            broadcasts,
            telemetry,
            stream: Mutex::new(None),
        }
    }

    fn lock_pipeline(&self) -> Result<MutexGuard<'_, SignalPipeline>, PipelineError> {
        self.pipeline
            .lock()
            .map_err(|_| PipelineError::LockPoisoned {
                component: "pipeline".into(),
            })
    }

    fn lock_stream(&self) -> Result<MutexGuard<'_, Option<ActiveStream>>, PipelineError> {
        self.stream.lock().map_err(|_| PipelineError::LockPoisoned {
            component: "stream".into(),
        })
    }

    // ========================================================================
    // PIPELINE METHODS
    // ========================================================================

    /// Feed one sample synchronously.
    pub fn ingest(&self, sample: Sample) -> Result<PipelineOutput, PipelineError> {
        let mut pipeline = self.lock_pipeline()?;
        Ok(pipeline.on_sample(sample)?)
    }

    pub fn set_emergency(&self, engaged: bool) -> Result<SafetyVerdict, PipelineError> {
        Ok(self.lock_pipeline()?.set_emergency(engaged))
    }

    pub fn reset_emergency(&self) -> Result<SafetyVerdict, PipelineError> {
        Ok(self.lock_pipeline()?.reset_emergency())
    }

    pub fn set_headband_connected(&self, connected: bool) -> Result<SafetyVerdict, PipelineError> {
        Ok(self.lock_pipeline()?.set_headband_connected(connected))
    }

    /// Latched actuation permission (false until the first safe verdict).
    pub fn actuation_permitted(&self) -> Result<bool, PipelineError> {
        Ok(self.lock_pipeline()?.actuation_permitted())
    }

    /// Last verdict seen by the latch, if any.
    pub fn last_verdict(&self) -> Result<Option<SafetyVerdict>, PipelineError> {
        Ok(self.lock_pipeline()?.latch().last().cloned())
    }

    pub fn apply_patch(&self, patch: ParamPatch) -> Result<(), PipelineError> {
        if patch.is_empty() {
            return Ok(());
        }

        let updated = {
            let mut config = self
                .config
                .write()
                .map_err(|_| PipelineError::LockPoisoned {
                    component: "config".into(),
                })?;
            patch.apply_to(&mut config);
            config.clone()
        };

        let mut pipeline = self.lock_pipeline()?;
        pipeline.set_thresholds(updated.classifier);
        pipeline.set_quality_threshold(updated.safety.quality_threshold);
        pipeline.set_verdict_mode(updated.safety.verdict_mode);
        log::info!("[EngineHandle] Applied parameter patch: {:?}", patch);
        Ok(())
    }

    pub fn config_snapshot(&self) -> AppConfig {
        self.config
            .read()
            .map(|config| config.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn telemetry(&self) -> &TelemetryHub {
        &self.telemetry
    }

    pub fn broadcasts(&self) -> &BroadcastChannelManager {
        &self.broadcasts
    }

    // ========================================================================
    // STREAMING METHODS
    // ========================================================================

    /// Start the source thread and pipeline worker.
    pub fn start_stream(
        &self,
        source: Box<dyn SampleSource>,
        pacing: Pacing,
    ) -> Result<(), PipelineError> {
        let mut stream = self.lock_stream()?;
        if stream.is_some() {
            return Err(PipelineError::AlreadyRunning);
        }

        let engine = self.config_snapshot().engine;
        let channels = SampleQueue::new(engine.queue_capacity);
        let running = Arc::new(AtomicBool::new(true));

        let worker = PipelineWorker::spawn(
            channels.consumer,
            Arc::clone(&self.pipeline),
            Arc::clone(&running),
            Arc::clone(&self.telemetry),
            engine.log_every_n_samples,
        )
        .map_err(|err| {
            log_pipeline_error(&err, "start_stream");
            err
        })?;

        let rate_hz = source.rate_hz();
        let source = match SourceRunner::spawn(
            source,
            channels.producer,
            pacing,
            Arc::clone(&running),
            Arc::clone(&self.telemetry),
        ) {
            Ok(runner) => runner,
            Err(err) => {
                log_pipeline_error(&err, "start_stream");
                running.store(false, Ordering::SeqCst);
                let _ = worker.join();
                return Err(err);
            }
        };

        *stream = Some(ActiveStream {
            running,
            source,
            worker,
            started: Instant::now(),
        });
        self.telemetry.record_lifecycle(LifecyclePhase::StreamStarted);
        log::info!("[EngineHandle] Stream started at {} Hz ({:?})", rate_hz, pacing);
        Ok(())
    }

    /// Stop the source, let the worker drain the queue, and report counters.
    pub fn stop_stream(&self) -> Result<StreamSummary, PipelineError> {
        let active = self
            .lock_stream()?
            .take()
            .ok_or(PipelineError::NotRunning)?;

        let source_stats = active.source.stop();
        active.running.store(false, Ordering::SeqCst);
        let worker_stats = active.worker.join();

        if source_stats.exhausted {
            self.telemetry.record_lifecycle(LifecyclePhase::SourceExhausted);
        }
        self.telemetry.record_lifecycle(LifecyclePhase::StreamStopped);

        let summary = StreamSummary {
            pushed: source_stats.pushed,
            dropped: source_stats.dropped,
            processed: worker_stats.processed,
            rejected: worker_stats.rejected,
            source_exhausted: source_stats.exhausted,
            duration_ms: active.started.elapsed().as_millis() as u64,
        };
        log::info!("[EngineHandle] Stream stopped: {:?}", summary);
        Ok(summary)
    }

    pub fn is_streaming(&self) -> bool {
        self.stream
            .lock()
            .map(|stream| stream.is_some())
            .unwrap_or(false)
    }

    /// True once a finite source has delivered its last sample
    pub fn source_finished(&self) -> bool {
        self.stream
            .lock()
            .map(|stream| {
                stream
                    .as_ref()
                    .map(|active| active.source.is_finished())
                    .unwrap_or(true)
            })
            .unwrap_or(true)
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if self.is_streaming() {
            let _ = self.stop_stream();
        }
    }
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
