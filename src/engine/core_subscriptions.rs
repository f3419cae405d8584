use tokio::runtime::Builder;
use tokio::sync::{broadcast, mpsc};

use crate::analysis::{AggregateRecord, ClassificationResult};
use crate::safety::SafetyVerdict;

use super::EngineHandle;

/// Bridge a broadcast receiver into an unbounded mpsc receiver on a helper
/// thread with its own current-thread runtime. Lagged messages are skipped.
fn forward<T>(mut broadcast_rx: broadcast::Receiver<T>) -> mpsc::UnboundedReceiver<T>
where
    T: Clone + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let rt = match Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(err) => {
                log::error!("[EngineHandle] Failed to create subscription runtime: {}", err);
                return;
            }
        };
        rt.block_on(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(item) => {
                        if tx.send(item).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("[EngineHandle] Subscriber lagged, {} messages skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    });

    rx
}

impl EngineHandle {
    // ========================================================================
    // STREAM SUBSCRIPTIONS
    // ========================================================================

    pub fn subscribe_aggregates(&self) -> broadcast::Receiver<AggregateRecord> {
        self.broadcasts.init_aggregates().subscribe()
    }

    pub fn subscribe_classifications(&self) -> broadcast::Receiver<ClassificationResult> {
        self.broadcasts.init_classifications().subscribe()
    }

    pub fn subscribe_verdicts(&self) -> broadcast::Receiver<SafetyVerdict> {
        self.broadcasts.init_verdicts().subscribe()
    }

    /// Classification stream for consumers without a tokio runtime
    pub fn classification_stream(&self) -> mpsc::UnboundedReceiver<ClassificationResult> {
        forward(self.subscribe_classifications())
    }

    /// Verdict stream for consumers without a tokio runtime
    pub fn verdict_stream(&self) -> mpsc::UnboundedReceiver<SafetyVerdict> {
        forward(self.subscribe_verdicts())
    }
}
