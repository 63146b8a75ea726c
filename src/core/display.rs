// Display sink - the single place display state is written
//
// Frame handling writes status updates; classify tasks write predictions as
// they resolve. Readers subscribe through a watch channel and always see the
// latest state.

use crate::models::prediction::{DisplayState, DisplayStatus, PredictionResult};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::debug;

pub struct DisplaySink {
    tx: watch::Sender<DisplayState>,
    newest_applied: AtomicU64,
    discard_stale: bool,
}

impl DisplaySink {
    /// With `discard_stale` off, whichever prediction resolves last is shown,
    /// regardless of dispatch order.
    pub fn new(discard_stale: bool) -> Self {
        let (tx, _rx) = watch::channel(DisplayState::default());
        Self {
            tx,
            newest_applied: AtomicU64::new(0),
            discard_stale,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> DisplayState {
        self.tx.borrow().clone()
    }

    pub fn show_status(&self, status: DisplayStatus) {
        self.publish(DisplayState::status(status));
    }

    /// Apply the result of the request dispatched with sequence number `seq`
    /// (starting at 1). Returns false if the result was dropped as stale.
    pub fn apply_prediction(&self, seq: u64, result: &PredictionResult) -> bool {
        let state = DisplayState::from_result(result);
        let mut applied = true;

        // The closure runs under the channel's write lock, so the sequence
        // check and the write cannot interleave with another apply.
        self.tx.send_if_modified(|current| {
            let newest = self.newest_applied.fetch_max(seq, Ordering::Relaxed);
            if self.discard_stale && newest > seq {
                debug!(seq, newest, "Dropping stale prediction");
                applied = false;
                return false;
            }
            replace_if_changed(current, state)
        });

        applied
    }

    fn publish(&self, state: DisplayState) {
        self.tx.send_if_modified(|current| replace_if_changed(current, state));
    }
}

fn replace_if_changed(current: &mut DisplayState, state: DisplayState) -> bool {
    if *current == state {
        false
    } else {
        *current = state;
        true
    }
}
