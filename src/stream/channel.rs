use crossbeam_channel::{after, never, select, Receiver, Sender, TryRecvError};
use std::time::Duration;

use super::stop::StopSignal;
use crate::error::{Error, Result};

/// Fixed-capacity FIFO with blocking backpressure, split into its two halves.
///
/// Plain `put`/`get` block without limit. They only return early if the
/// other half is dropped. The `*_until` variants additionally give up on a
/// stop request or after an optional timeout.
pub struct Channel<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Channel<T> {
    pub fn new(capacity: usize) -> Result<Channel<T>> {
        if capacity == 0 {
            return Err(Error::Config("channel capacity must be at least 1".into()));
        }
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Ok(Channel { tx, rx })
    }

    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        (Producer { tx: self.tx }, Consumer { rx: self.rx })
    }
}

fn deadline(timeout: Option<Duration>) -> Receiver<std::time::Instant> {
    match timeout {
        Some(t) => after(t),
        None => never(),
    }
}

pub struct Producer<T> {
    tx: Sender<T>,
}

impl<T> Producer<T> {
    /// Blocks until a slot is free, then enqueues `value`.
    pub fn put(&self, value: T) -> Result<()> {
        self.tx.send(value).map_err(|_| Error::Disconnected)
    }

    pub fn put_until(&self, value: T, stop: &StopSignal, timeout: Option<Duration>) -> Result<()> {
        if stop.is_set() {
            return Err(Error::Stopped);
        }
        let timer = deadline(timeout);
        select! {
            send(self.tx, value) -> res => res.map_err(|_| Error::Disconnected),
            recv(stop.cancelled()) -> _ => Err(Error::Stopped),
            recv(timer) -> _ => Err(Error::TimedOut),
        }
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_full(&self) -> bool {
        self.tx.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(0)
    }
}

pub struct Consumer<T> {
    rx: Receiver<T>,
}

impl<T> Consumer<T> {
    /// Blocks until an item is available and returns the oldest one.
    pub fn get(&self) -> Result<T> {
        self.rx.recv().map_err(|_| Error::Disconnected)
    }

    /// Returns `Ok(None)` when nothing is pending.
    pub fn try_get(&self) -> Result<Option<T>> {
        match self.rx.try_recv() {
            Ok(v) => Ok(Some(v)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::Disconnected),
        }
    }

    pub fn get_until(&self, stop: &StopSignal, timeout: Option<Duration>) -> Result<T> {
        if stop.is_set() {
            return Err(Error::Stopped);
        }
        let timer = deadline(timeout);
        select! {
            recv(self.rx) -> res => res.map_err(|_| Error::Disconnected),
            recv(stop.cancelled()) -> _ => Err(Error::Stopped),
            recv(timer) -> _ => Err(Error::TimedOut),
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.rx.capacity().unwrap_or(0)
    }
}
