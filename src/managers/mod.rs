// Managers module - focused owners of shared engine resources
//
// 1. BroadcastChannelManager: tokio broadcast channel lifecycle and
//    subscription for aggregates, classifications and verdicts

pub mod broadcast_manager;

pub use broadcast_manager::{BroadcastChannelManager, ChannelObserver, DEFAULT_CHANNEL_CAPACITY};
