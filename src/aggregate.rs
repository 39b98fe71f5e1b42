use log::*;

use crate::error::Result;
use crate::params::Parameters;
use crate::window::{SlidingWindow, WindowSnapshot};

pub const SEED_VALUE: f64 = 0.0;

/// Folds samples into a random walk: `next = last + sample * sqrt(variance) + shift`.
pub struct Aggregator {
    window: SlidingWindow<f64>,
}

impl Aggregator {
    pub fn new(maxlen: usize) -> Result<Aggregator> {
        Ok(Aggregator {
            window: SlidingWindow::seeded(maxlen, SEED_VALUE)?,
        })
    }

    /// Applies one sample under `params`, returning the appended value.
    pub fn step(&mut self, sample: f64, params: Parameters) -> f64 {
        let prev = self.window.last().unwrap_or(SEED_VALUE);
        let next = prev + params.innovation(sample);
        self.window.push(next);
        trace!(
            "aggregated {} (shift {}, variance {}): {} -> {}",
            sample,
            params.shift,
            params.variance,
            prev,
            next
        );
        next
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        self.window.snapshot()
    }
}
