// Request throttling for classifier dispatch
//
// Frames that arrive inside the interval are dropped, not queued.

use std::time::Instant;

/// Default minimum gap between two classifier requests
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 500;

/// Whether a request may be dispatched at `now_ms`.
///
/// True when nothing was sent yet, or strictly more than `min_interval_ms`
/// has passed since the last dispatch. Exactly `min_interval_ms` is too soon.
/// A clock reading earlier than `last_sent_ms` counts as no time elapsed.
pub fn should_send(now_ms: u64, last_sent_ms: Option<u64>, min_interval_ms: u64) -> bool {
    match last_sent_ms {
        None => true,
        Some(last) => now_ms.saturating_sub(last) > min_interval_ms,
    }
}

/// Time of the last dispatched request, owned by the frame pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThrottleState {
    last_sent_ms: Option<u64>,
}

impl ThrottleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_sent(&self) -> Option<u64> {
        self.last_sent_ms
    }

    /// Record a dispatch attempt. Called before the request resolves.
    pub fn record_dispatch(&mut self, now_ms: u64) {
        self.last_sent_ms = Some(now_ms);
    }
}

/// Milliseconds since construction on the process monotonic clock
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
