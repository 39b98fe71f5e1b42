pub mod aggregate;
pub mod config;
pub mod error;
pub mod memory;
pub mod params;
pub mod pipeline;
pub mod stream;
pub mod window;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use params::{ParameterName, Parameters};
pub use pipeline::{Pipeline, PipelineStats};
pub use window::WindowSnapshot;

/// Where the generator draws its samples from. `None` ends the stream.
pub trait SampleSource: Send {
    fn next_sample(&mut self) -> Option<f64>;
}

impl<I> SampleSource for I
where
    I: Iterator<Item = f64> + Send,
{
    fn next_sample(&mut self) -> Option<f64> {
        self.next()
    }
}

pub trait MemoryProbe: Send {
    /// Reclaim what can be reclaimed before measuring. Nothing by default.
    fn collect(&mut self) {}

    fn live_bytes(&mut self) -> Result<u64>;
}

/// Callbacks an external scheduler invokes; the pipeline never schedules itself.
pub trait Trigger {
    /// New data may be waiting in the channel.
    fn on_sample_available(&self) -> WindowSnapshot;

    /// The memory-sampling timer fired.
    fn on_timer_tick(&self) -> WindowSnapshot;
}
