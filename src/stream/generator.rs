use log::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::channel::Producer;
use super::stop::StopSignal;
use crate::error::{Error, Result};
use crate::SampleSource;

/// Standard-normal draws, reproducible when seeded.
pub struct GaussianSource {
    rng: StdRng,
}

impl GaussianSource {
    pub fn new(seed: Option<u64>) -> GaussianSource {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        GaussianSource { rng }
    }
}

impl SampleSource for GaussianSource {
    fn next_sample(&mut self) -> Option<f64> {
        Some(self.rng.sample(StandardNormal))
    }
}

/// Background producer: draw, put, sleep, until stopped or the source runs dry.
pub struct Generator {
    source: Box<dyn SampleSource>,
    producer: Producer<f64>,
    stop: Arc<StopSignal>,
    tick: Duration,
    produced: Arc<AtomicU64>,
}

impl Generator {
    pub fn new(
        source: Box<dyn SampleSource>,
        producer: Producer<f64>,
        stop: Arc<StopSignal>,
        tick: Duration,
        produced: Arc<AtomicU64>,
    ) -> Generator {
        Generator {
            source,
            producer,
            stop,
            tick,
            produced,
        }
    }

    pub fn spawn(self) -> Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("streamwalk-generator".into())
            .spawn(move || self.run())
            .map_err(Error::Spawn)
    }

    pub fn run(mut self) {
        debug!("generator started, tick {:?}", self.tick);

        while !self.stop.is_set() {
            let sample = match self.source.next_sample() {
                Some(s) => s,
                None => {
                    debug!("sample source exhausted");
                    break;
                }
            };

            match self.producer.put_until(sample, &self.stop, None) {
                Ok(()) => {
                    let n = self.produced.fetch_add(1, Ordering::SeqCst) + 1;
                    trace!("produced sample #{}: {}", n, sample);
                }
                Err(Error::Stopped) => break,
                Err(e) => {
                    debug!("generator giving up: {}", e);
                    break;
                }
            }

            if self.stop.wait_timeout(self.tick) {
                break;
            }
        }

        debug!(
            "generator finished after {} samples",
            self.produced.load(Ordering::SeqCst)
        );
    }
}
