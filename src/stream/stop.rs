use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Cooperative, set-once shutdown flag.
///
/// Besides the flag it carries a channel that never delivers a message; its
/// sender is dropped on request so that anything selecting on
/// [`StopSignal::cancelled`] wakes up immediately.
pub struct StopSignal {
    set: AtomicBool,
    trip: Mutex<Option<Sender<()>>>,
    cancelled: Receiver<()>,
}

impl StopSignal {
    pub fn new() -> StopSignal {
        let (trip, cancelled) = bounded(0);
        StopSignal {
            set: AtomicBool::new(false),
            trip: Mutex::new(Some(trip)),
            cancelled,
        }
    }

    /// Requests shutdown. Returns `true` only for the call that set the flag.
    pub fn request(&self) -> bool {
        if self.set.swap(true, Ordering::SeqCst) {
            return false;
        }
        let mut trip = self.trip.lock().unwrap_or_else(|e| e.into_inner());
        trip.take();
        debug!("stop requested");
        true
    }

    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::SeqCst)
    }

    /// Becomes ready (disconnected) once stop has been requested.
    pub fn cancelled(&self) -> &Receiver<()> {
        &self.cancelled
    }

    /// Sleeps for `interval` unless stop is requested first.
    /// Returns `true` if the sleep was cut short by a stop request.
    pub fn wait_timeout(&self, interval: Duration) -> bool {
        if self.is_set() {
            return true;
        }
        match self.cancelled.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => false,
            _ => true,
        }
    }
}

impl Default for StopSignal {
    fn default() -> StopSignal {
        StopSignal::new()
    }
}
