// SampleQueue - lock-free SPSC hand-off between source and pipeline threads
//
// The source thread owns the producer, the pipeline worker owns the consumer.
// Samples are small Copy values so no buffer recycling is needed.

use rtrb::{Consumer, Producer};

use crate::signal::Sample;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Split queue endpoints, one per thread
pub struct SampleQueueChannels {
    /// Pushed by the source runner
    pub producer: Producer<Sample>,
    /// Popped by the pipeline worker
    pub consumer: Consumer<Sample>,
}

/// Lock-free sample queue backed by an `rtrb` ring buffer
///
/// # Example
/// ```ignore
/// let mut channels = SampleQueue::new(256);
/// channels.producer.push(sample).ok();
/// if let Ok(sample) = channels.consumer.pop() {
///     // classify
/// }
/// ```
pub struct SampleQueue;

impl SampleQueue {
    /// Create queue endpoints; a zero capacity is raised to one slot
    #[allow(clippy::new_ret_no_self)]
    pub fn new(capacity: usize) -> SampleQueueChannels {
        let (producer, consumer) = rtrb::RingBuffer::new(capacity.max(1));
        SampleQueueChannels { producer, consumer }
    }
}
