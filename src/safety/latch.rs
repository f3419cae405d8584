// VerdictLatch - presentation-side view of the verdict stream
//
// Actuators consult the latch, never an individual verdict. The latch is
// unsafe until the first verdict arrives, and any unsafe verdict stays in
// effect until a later verdict reports safe.

use crate::safety::gate::SafetyVerdict;

#[derive(Debug, Clone, Default)]
pub struct VerdictLatch {
    last: Option<SafetyVerdict>,
    unsafe_transitions: u64,
    observed: u64,
}

impl VerdictLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a verdict; returns whether actuation is now permitted
    pub fn observe(&mut self, verdict: &SafetyVerdict) -> bool {
        let was_blocking = self.last.as_ref().is_some_and(|last| !last.safe);
        if !verdict.safe && !was_blocking {
            self.unsafe_transitions += 1;
        }
        self.observed += 1;
        self.last = Some(verdict.clone());
        self.permits_actuation()
    }

    pub fn permits_actuation(&self) -> bool {
        self.last.as_ref().map(|verdict| verdict.safe).unwrap_or(false)
    }

    pub fn last(&self) -> Option<&SafetyVerdict> {
        self.last.as_ref()
    }

    /// Number of times the latch went from permitted (or fresh) to blocked
    pub fn unsafe_transitions(&self) -> u64 {
        self.unsafe_transitions
    }

    pub fn observed(&self) -> u64 {
        self.observed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
