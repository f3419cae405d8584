// Safety module - verdicts gating all actuation
//
// 1. SafetyGate: owned safety state producing verdicts from aggregates,
//    classifications and operator commands
// 2. VerdictLatch: tracks the most recent verdict for actuator consumers

pub mod gate;
pub mod latch;

pub use gate::{SafetyGate, SafetyReason, SafetyVerdict, VerdictMode};
pub use latch::VerdictLatch;
