use ringbuf::{Consumer, Producer, RingBuffer};
use std::fmt;

use crate::error::{Error, Result};

/// Fixed-capacity buffer keeping the `maxlen` most recent values.
///
/// Both halves of the ring are owned together: pushing onto a full ring pops
/// the oldest entry from the consumer side first.
pub struct SlidingWindow<T> {
    producer: Producer<T>,
    consumer: Consumer<T>,
    newest: Option<T>,
    appends: u64,
}

impl<T: Copy> SlidingWindow<T> {
    pub fn new(maxlen: usize) -> Result<SlidingWindow<T>> {
        if maxlen == 0 {
            return Err(Error::Config("window length must be at least 1".into()));
        }
        let (producer, consumer) = RingBuffer::<T>::new(maxlen).split();
        Ok(SlidingWindow {
            producer,
            consumer,
            newest: None,
            appends: 0,
        })
    }

    /// A window holding `first` so the next value has a predecessor.
    /// The seed is not counted as an append.
    pub fn seeded(maxlen: usize, first: T) -> Result<SlidingWindow<T>> {
        let mut window = SlidingWindow::new(maxlen)?;
        window.push(first);
        window.appends = 0;
        Ok(window)
    }

    /// Appends `value`, returning the evicted entry if the window was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.producer.is_full() {
            self.consumer.pop()
        } else {
            None
        };
        let pushed = self.producer.push(value);
        debug_assert!(pushed.is_ok());
        self.newest = Some(value);
        self.appends += 1;
        evicted
    }

    pub fn last(&self) -> Option<T> {
        self.newest
    }

    pub fn len(&self) -> usize {
        self.consumer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }

    pub fn maxlen(&self) -> usize {
        self.consumer.capacity()
    }

    pub fn appends(&self) -> u64 {
        self.appends
    }

    pub fn snapshot(&self) -> WindowSnapshot<T> {
        WindowSnapshot {
            values: self.consumer.iter().copied().collect(),
            appends: self.appends,
        }
    }
}

/// Immutable copy of a window, oldest value first.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowSnapshot<T = f64> {
    pub values: Vec<T>,
    /// Appends performed on the window when the copy was taken.
    pub appends: u64,
}

impl<T: Copy> WindowSnapshot<T> {
    pub fn last(&self) -> Option<T> {
        self.values.last().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl WindowSnapshot<f64> {
    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().fold(None, |acc, v| match acc {
            Some(m) if m <= v => Some(m),
            _ => Some(v),
        })
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().fold(None, |acc, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        })
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }
}

impl fmt::Display for WindowSnapshot<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.3}", v)?;
        }
        write!(f, "] (appends: {})", self.appends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_is_rejected() {
        assert!(matches!(
            SlidingWindow::<f64>::new(0),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn seeded_window_evicts_oldest_when_full() {
        let mut w = SlidingWindow::seeded(3, 0.0).unwrap();
        assert_eq!(w.snapshot().values, vec![0.0]);

        assert_eq!(w.push(1.0), None);
        assert_eq!(w.push(2.0), None);
        assert_eq!(w.snapshot().values, vec![0.0, 1.0, 2.0]);

        assert_eq!(w.push(3.0), Some(0.0));
        assert_eq!(w.push(4.0), Some(1.0));
        assert_eq!(w.snapshot().values, vec![2.0, 3.0, 4.0]);
        assert_eq!(w.appends(), 4);
        assert_eq!(w.last(), Some(4.0));
    }

    #[test]
    fn length_is_min_of_appends_plus_seed_and_maxlen() {
        let maxlen = 5;
        let mut w = SlidingWindow::seeded(maxlen, 0.0).unwrap();
        assert_eq!(w.last(), Some(0.0));
        for n in 1..20u64 {
            w.push(n as f64);
            assert_eq!(w.last(), Some(n as f64));
            assert_eq!(w.last(), w.snapshot().last());
            assert_eq!(w.len(), std::cmp::min(n as usize + 1, maxlen));
            assert!(w.len() <= w.maxlen());
        }
    }

    #[test]
    fn maxlen_one_keeps_only_latest() {
        let mut w = SlidingWindow::seeded(1, 0.0).unwrap();
        assert_eq!(w.push(7.0), Some(0.0));
        assert_eq!(w.snapshot().values, vec![7.0]);
    }

    #[test]
    fn snapshot_summary() {
        let snap = WindowSnapshot {
            values: vec![1.0, -1.0, -0.5],
            appends: 3,
        };
        assert_eq!(snap.min(), Some(-1.0));
        assert_eq!(snap.max(), Some(1.0));
        assert_eq!(snap.mean(), Some(-0.5 / 3.0));
        assert_eq!(
            snap.to_string(),
            "[1.000, -1.000, -0.500] (appends: 3)"
        );

        let empty: WindowSnapshot = WindowSnapshot {
            values: vec![],
            appends: 0,
        };
        assert_eq!(empty.mean(), None);
        assert_eq!(empty.min(), None);
    }
}
