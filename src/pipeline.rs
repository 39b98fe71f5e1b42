use crossbeam_utils::Backoff;
use log::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime};

use crate::aggregate::Aggregator;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::memory::{until_next_boundary, MemorySampler, SysinfoProbe};
use crate::params::{ParameterName, ParameterStore, Parameters};
use crate::stream::channel::{Channel, Consumer};
use crate::stream::generator::{GaussianSource, Generator};
use crate::stream::stop::StopSignal;
use crate::window::WindowSnapshot;
use crate::{MemoryProbe, SampleSource, Trigger};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineStats {
    /// Samples the generator managed to enqueue.
    pub produced: u64,
    /// Samples folded into the data window.
    pub consumed: u64,
    /// Produced but not yet folded in.
    pub pending: u64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Generator thread, bounded channel and the two windows it feeds.
///
/// The pipeline never re-invokes itself: an external driver calls the
/// `step_*` methods (or the [`Trigger`] callbacks) when data is available or
/// a timer fires.
pub struct Pipeline {
    config: PipelineConfig,
    params: ParameterStore,
    stop: Arc<StopSignal>,
    consumer: Mutex<Consumer<f64>>,
    aggregator: Mutex<Aggregator>,
    memory: Mutex<MemorySampler>,
    produced: Arc<AtomicU64>,
    consumed: AtomicU64,
    generator: Mutex<Option<JoinHandle<()>>>,
}

impl Pipeline {
    /// Starts a pipeline fed by standard-normal draws and measuring this
    /// process's resident memory.
    pub fn start(config: PipelineConfig) -> Result<Pipeline> {
        let source = GaussianSource::new(config.seed);
        let probe = SysinfoProbe::new()?;
        Pipeline::with_parts(config, Box::new(source), Box::new(probe))
    }

    pub fn with_parts(
        config: PipelineConfig,
        source: Box<dyn SampleSource>,
        probe: Box<dyn MemoryProbe>,
    ) -> Result<Pipeline> {
        config.validate()?;

        let (producer, consumer) = Channel::new(config.channel_capacity)?.split();
        let params = ParameterStore::new(config.initial)?;
        let aggregator = Aggregator::new(config.window_len)?;
        let memory = MemorySampler::new(probe, config.memory_window_len)?;
        let stop = Arc::new(StopSignal::new());
        let produced = Arc::new(AtomicU64::new(0));

        let generator = Generator::new(
            source,
            producer,
            stop.clone(),
            config.tick_interval,
            produced.clone(),
        )
        .spawn()?;

        info!(
            "pipeline started: capacity {}, window {}, memory window {}, tick {:?}",
            config.channel_capacity, config.window_len, config.memory_window_len, config.tick_interval
        );

        Ok(Pipeline {
            config,
            params,
            stop,
            consumer: Mutex::new(consumer),
            aggregator: Mutex::new(aggregator),
            memory: Mutex::new(memory),
            produced,
            consumed: AtomicU64::new(0),
            generator: Mutex::new(Some(generator)),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn set_parameter(&self, name: ParameterName, value: f64) -> Result<()> {
        self.params.set(name, value)
    }

    pub fn parameters(&self) -> Parameters {
        self.params.snapshot()
    }

    /// Signals the generator. Safe to call any number of times.
    pub fn request_stop(&self) {
        if self.stop.request() {
            info!("pipeline stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_set()
    }

    /// Waits for the next sample and folds it into the data window.
    ///
    /// Blocks for as long as the channel stays empty, unless stop is requested
    /// or the generator has finished. In those cases the window is returned
    /// unchanged.
    pub fn step_aggregate(&self) -> WindowSnapshot {
        if self.stop.is_set() {
            return self.window();
        }
        let consumer = lock(&self.consumer);
        self.aggregate_with(consumer, |rx, stop| rx.get_until(stop, None).map(Some))
    }

    /// Folds a sample only if one is already pending. Never waits, not even
    /// behind another caller parked in [`Pipeline::step_aggregate`].
    pub fn try_step_aggregate(&self) -> WindowSnapshot {
        if self.stop.is_set() {
            return self.window();
        }
        match self.lock_consumer_until(None) {
            Some(consumer) => self.aggregate_with(consumer, |rx, _| rx.try_get()),
            None => self.window(),
        }
    }

    /// Waits at most `timeout` in total, lock acquisition included.
    pub fn step_aggregate_timeout(&self, timeout: Duration) -> WindowSnapshot {
        if self.stop.is_set() {
            return self.window();
        }
        let deadline = Instant::now() + timeout;
        let consumer = match self.lock_consumer_until(Some(deadline)) {
            Some(consumer) => consumer,
            None => return self.window(),
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.aggregate_with(consumer, |rx, stop| match rx.get_until(stop, Some(remaining)) {
            Ok(v) => Ok(Some(v)),
            Err(Error::TimedOut) => Ok(None),
            Err(e) => Err(e),
        })
    }

    // `None` tries once; otherwise spins with backoff until `deadline`.
    fn lock_consumer_until(&self, deadline: Option<Instant>) -> Option<MutexGuard<'_, Consumer<f64>>> {
        let backoff = Backoff::new();
        loop {
            match self.consumer.try_lock() {
                Ok(guard) => return Some(guard),
                Err(TryLockError::Poisoned(e)) => return Some(e.into_inner()),
                Err(TryLockError::WouldBlock) => {}
            }
            match deadline {
                Some(d) if Instant::now() < d => backoff.snooze(),
                _ => {
                    trace!("consumer busy, returning current window");
                    return None;
                }
            }
        }
    }

    // the consumer guard is held across take + fold so window order matches channel order
    fn aggregate_with<F>(&self, consumer: MutexGuard<'_, Consumer<f64>>, take: F) -> WindowSnapshot
    where
        F: FnOnce(&Consumer<f64>, &StopSignal) -> Result<Option<f64>>,
    {
        let sample = match take(&*consumer, &self.stop) {
            Ok(Some(sample)) => sample,
            Ok(None) => return self.window(),
            Err(e) => {
                debug!("no sample aggregated: {}", e);
                return self.window();
            }
        };

        let params = self.params.snapshot();
        let mut aggregator = lock(&self.aggregator);
        aggregator.step(sample, params);
        self.consumed.fetch_add(1, Ordering::SeqCst);
        aggregator.snapshot()
    }

    /// Takes one memory measurement into the memory window.
    pub fn step_memory_sample(&self) -> WindowSnapshot {
        let mut memory = lock(&self.memory);
        if self.stop.is_set() {
            return memory.snapshot();
        }
        memory.sample()
    }

    pub fn pause_memory_sampling(&self) {
        lock(&self.memory).pause();
    }

    pub fn resume_memory_sampling(&self) {
        lock(&self.memory).resume();
    }

    /// Delay until the next memory-sampling grid point.
    pub fn next_memory_tick(&self) -> Duration {
        until_next_boundary(SystemTime::now(), self.config.memory_sample_interval)
    }

    pub fn window(&self) -> WindowSnapshot {
        lock(&self.aggregator).snapshot()
    }

    pub fn memory_window(&self) -> WindowSnapshot {
        lock(&self.memory).snapshot()
    }

    pub fn stats(&self) -> PipelineStats {
        let produced = self.produced.load(Ordering::SeqCst);
        let consumed = self.consumed.load(Ordering::SeqCst);
        PipelineStats {
            produced,
            consumed,
            pending: produced.saturating_sub(consumed),
        }
    }

    /// Requests stop and waits for the generator thread to exit.
    pub fn shutdown(&self) {
        self.request_stop();
        if let Some(handle) = lock(&self.generator).take() {
            if handle.join().is_err() {
                error!("generator thread panicked");
            }
            debug!("generator joined");
        }
    }
}

impl Trigger for Pipeline {
    fn on_sample_available(&self) -> WindowSnapshot {
        self.step_aggregate()
    }

    fn on_timer_tick(&self) -> WindowSnapshot {
        self.step_memory_sample()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
        trace!("pipeline dropped");
    }
}
