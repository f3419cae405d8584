// SourceRunner - drives a SampleSource on its own thread
//
// Real-time pacing sleeps one sample period between pushes and drops samples
// when the queue is full (a live headband cannot be paused). Unpaced runs
// push as fast as the consumer allows, waiting for free slots instead of
// dropping, which is what replay and tests want. Dropped samples are
// reported to the telemetry hub as queue overflows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::Producer;

use crate::error::PipelineError;
use crate::signal::Sample;
use crate::source::SampleSource;
use crate::telemetry::{DiagnosticError, TelemetryHub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Pacing {
    /// One sample per `1 / rate_hz` seconds
    #[default]
    RealTime,
    /// No sleeping; back-pressure from the queue
    Unpaced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub pushed: u64,
    pub dropped: u64,
    /// True when the source ran out of samples before shutdown
    pub exhausted: bool,
}

pub struct SourceRunner {
    handle: Option<JoinHandle<SourceStats>>,
    running: Arc<AtomicBool>,
}

impl SourceRunner {
    /// Spawn the feeder thread. It stops when `running` is cleared or the
    /// source is exhausted.
    pub fn spawn(
        source: Box<dyn SampleSource>,
        producer: Producer<Sample>,
        pacing: Pacing,
        running: Arc<AtomicBool>,
        telemetry: Arc<TelemetryHub>,
    ) -> Result<Self, PipelineError> {
        let thread_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("neurovex-source".into())
            .spawn(move || feed(source, producer, pacing, thread_running, telemetry))?;

        Ok(Self {
            handle: Some(handle),
            running,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
    }

    /// Signal shutdown and wait for the thread
    pub fn stop(mut self) -> SourceStats {
        self.running.store(false, Ordering::SeqCst);
        self.join_inner()
    }

    /// Wait for the thread without signalling shutdown
    pub fn join(mut self) -> SourceStats {
        self.join_inner()
    }

    fn join_inner(&mut self) -> SourceStats {
        match self.handle.take().map(|handle| handle.join()) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                log::error!("[SourceRunner] Source thread panicked");
                SourceStats::default()
            }
            None => SourceStats::default(),
        }
    }
}

impl Drop for SourceRunner {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.running.store(false, Ordering::SeqCst);
            let _ = self.join_inner();
        }
    }
}

fn feed(
    mut source: Box<dyn SampleSource>,
    mut producer: Producer<Sample>,
    pacing: Pacing,
    running: Arc<AtomicBool>,
    telemetry: Arc<TelemetryHub>,
) -> SourceStats {
    let period = Duration::from_secs_f64(1.0 / source.rate_hz().max(1) as f64);
    let mut stats = SourceStats::default();

    tracing::info!(
        "[SourceRunner] Starting at {} Hz ({:?})",
        source.rate_hz(),
        pacing
    );

    while running.load(Ordering::SeqCst) {
        let Some(sample) = source.next() else {
            stats.exhausted = true;
            break;
        };

        match pacing {
            Pacing::RealTime => {
                if producer.push(sample).is_ok() {
                    stats.pushed += 1;
                } else {
                    stats.dropped += 1;
                    if stats.dropped == 1 || stats.dropped % 100 == 0 {
                        tracing::warn!(
                            "[SourceRunner] Queue full, {} samples dropped",
                            stats.dropped
                        );
                        report_overflow(&telemetry, stats.dropped);
                    }
                }
                thread::sleep(period);
            }
            Pacing::Unpaced => {
                let mut pending = sample;
                loop {
                    match producer.push(pending) {
                        Ok(()) => {
                            stats.pushed += 1;
                            break;
                        }
                        Err(rtrb::PushError::Full(returned)) => {
                            if !running.load(Ordering::SeqCst) {
                                stats.dropped += 1;
                                report_overflow(&telemetry, stats.dropped);
                                break;
                            }
                            pending = returned;
                            thread::sleep(Duration::from_micros(200));
                        }
                    }
                }
            }
        }
    }

    tracing::info!(
        "[SourceRunner] Stopped: pushed={}, dropped={}, exhausted={}",
        stats.pushed,
        stats.dropped,
        stats.exhausted
    );
    stats
}

fn report_overflow(telemetry: &TelemetryHub, dropped: u64) {
    telemetry.record_error(
        DiagnosticError::QueueOverflow,
        format!("source queue full, {} samples dropped", dropped),
    );
}
