// PipelineWorker - single consumer thread draining the sample queue
//
// Loop: pop a sample, lock the shared pipeline, run it to completion. When
// the queue is empty the worker checks the running flag and exits only once
// the flag is cleared, so everything queued before shutdown is processed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::{Consumer, PopError};

use crate::engine::pipeline::SignalPipeline;
use crate::error::PipelineError;
use crate::signal::Sample;
use crate::telemetry::{DiagnosticError, TelemetryHub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub processed: u64,
    pub rejected: u64,
}

pub struct PipelineWorker {
    handle: Option<JoinHandle<WorkerStats>>,
}

impl PipelineWorker {
    pub fn spawn(
        consumer: Consumer<Sample>,
        pipeline: Arc<Mutex<SignalPipeline>>,
        running: Arc<AtomicBool>,
        telemetry: Arc<TelemetryHub>,
        log_every_n_samples: u64,
    ) -> Result<Self, PipelineError> {
        let handle = thread::Builder::new()
            .name("neurovex-pipeline".into())
            .spawn(move || {
                WorkerLoop {
                    consumer,
                    pipeline,
                    running,
                    telemetry,
                    log_every_n_samples,
                    stats: WorkerStats::default(),
                }
                .run()
            })?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the worker to drain and exit. The running flag must already
    /// be cleared or this blocks until it is.
    pub fn join(mut self) -> WorkerStats {
        self.join_inner()
    }

    fn join_inner(&mut self) -> WorkerStats {
        match self.handle.take().map(|handle| handle.join()) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                log::error!("[PipelineWorker] Worker thread panicked");
                WorkerStats::default()
            }
            None => WorkerStats::default(),
        }
    }
}

struct WorkerLoop {
    consumer: Consumer<Sample>,
    pipeline: Arc<Mutex<SignalPipeline>>,
    running: Arc<AtomicBool>,
    telemetry: Arc<TelemetryHub>,
    log_every_n_samples: u64,
    stats: WorkerStats,
}

impl WorkerLoop {
    fn run(mut self) -> WorkerStats {
        tracing::info!("[PipelineWorker] Starting pipeline loop");
        let capacity = self.consumer.buffer().capacity().max(1);

        loop {
            let sample = match self.consumer.pop() {
                Ok(sample) => sample,
                Err(PopError::Empty) => {
                    // Check shutdown flag only when queue is empty
                    if !self.running.load(Ordering::SeqCst) {
                        tracing::info!(
                            "[PipelineWorker] Shutdown flag set and queue empty, exiting"
                        );
                        break;
                    }
                    thread::sleep(Duration::from_millis(1));
                    continue;
                }
            };

            let occupancy = (self.consumer.slots() + 1) as f32 / capacity as f32 * 100.0;
            self.telemetry.record_queue_occupancy(occupancy);

            let result = match self.pipeline.lock() {
                Ok(mut pipeline) => pipeline.on_sample(sample),
                Err(_) => {
                    tracing::error!("[PipelineWorker] Pipeline lock poisoned, exiting");
                    self.telemetry
                        .record_error(DiagnosticError::LockPoisoned, "pipeline worker");
                    break;
                }
            };

            match result {
                Ok(_) => self.stats.processed += 1,
                Err(_) => self.stats.rejected += 1,
            }

            let seen = self.stats.processed + self.stats.rejected;
            if self.log_every_n_samples > 0 && seen % self.log_every_n_samples == 0 {
                tracing::debug!(
                    "[PipelineWorker] processed={}, rejected={}, queue={:.0}%",
                    self.stats.processed,
                    self.stats.rejected,
                    occupancy
                );
            }
        }

        tracing::info!(
            "[PipelineWorker] Stopped: processed={}, rejected={}",
            self.stats.processed,
            self.stats.rejected
        );
        self.stats
    }
}

impl Drop for PipelineWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.join_inner();
        }
    }
}
