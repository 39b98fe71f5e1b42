use std::time::Duration;

use crate::error::{Error, Result};
use crate::params::Parameters;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 2;
pub const DEFAULT_WINDOW_LEN: usize = 20;
pub const DEFAULT_MEMORY_WINDOW_LEN: usize = 400;
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub channel_capacity: usize,
    pub window_len: usize,
    pub memory_window_len: usize,
    /// Pause between generated samples.
    pub tick_interval: Duration,
    /// Grid on which memory samples are taken.
    pub memory_sample_interval: Duration,
    /// Fixes the random sequence when set.
    pub seed: Option<u64>,
    pub initial: Parameters,
}

impl Default for PipelineConfig {
    fn default() -> PipelineConfig {
        PipelineConfig {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            window_len: DEFAULT_WINDOW_LEN,
            memory_window_len: DEFAULT_MEMORY_WINDOW_LEN,
            tick_interval: DEFAULT_TICK_INTERVAL,
            memory_sample_interval: DEFAULT_MEMORY_SAMPLE_INTERVAL,
            seed: None,
            initial: Parameters::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(Error::Config("channel capacity must be at least 1".into()));
        }
        if self.window_len == 0 || self.memory_window_len == 0 {
            return Err(Error::Config("window length must be at least 1".into()));
        }
        if self.tick_interval == Duration::from_secs(0)
            || self.memory_sample_interval == Duration::from_secs(0)
        {
            return Err(Error::Config("intervals must be non-zero".into()));
        }
        self.initial
            .validate()
            .map_err(|e| Error::Config(format!("initial parameters: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = PipelineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.channel_capacity, 2);
        assert_eq!(cfg.window_len, 20);
        assert_eq!(cfg.memory_window_len, 400);
    }

    #[test]
    fn rejects_degenerate_values() {
        let bad = vec![
            PipelineConfig {
                channel_capacity: 0,
                ..Default::default()
            },
            PipelineConfig {
                window_len: 0,
                ..Default::default()
            },
            PipelineConfig {
                memory_window_len: 0,
                ..Default::default()
            },
            PipelineConfig {
                tick_interval: Duration::from_secs(0),
                ..Default::default()
            },
            PipelineConfig {
                initial: Parameters {
                    shift: 0.0,
                    variance: -1.0,
                },
                ..Default::default()
            },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(Error::Config(_))), "{:?}", cfg);
        }
    }
}
