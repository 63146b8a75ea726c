// Hand tracker integration
// Provides the tracker bridge and the recorded-detection replay source

pub mod tracker_bridge;

pub use tracker_bridge::{parse_frame, HandTracker, ReplayClock, ReplayTracker};
