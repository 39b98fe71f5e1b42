use log::*;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use sysinfo::{Pid, System};

use crate::error::{Error, Result};
use crate::window::{SlidingWindow, WindowSnapshot};
use crate::MemoryProbe;

pub const BYTES_PER_MB: f64 = (1u64 << 20) as f64;

/// Resident set size of the current process, as reported by the OS.
///
/// This is not a live-heap count: the allocator rarely hands freed pages back,
/// so the value tracks the high-water mark more than current usage. A steady
/// climb still points at a leak; a drop after freeing should not be expected.
pub struct SysinfoProbe {
    system: System,
    pid: Pid,
}

impl SysinfoProbe {
    pub fn new() -> Result<SysinfoProbe> {
        let pid = sysinfo::get_current_pid().map_err(|e| Error::Probe(e.to_string()))?;
        Ok(SysinfoProbe {
            system: System::new(),
            pid,
        })
    }
}

impl MemoryProbe for SysinfoProbe {
    fn live_bytes(&mut self) -> Result<u64> {
        if !self.system.refresh_process(self.pid) {
            return Err(Error::Probe(format!("process {} not found", self.pid)));
        }
        self.system
            .process(self.pid)
            .map(|p| p.memory())
            .ok_or_else(|| Error::Probe(format!("process {} not found", self.pid)))
    }
}

/// Delay from `now` until the next wall-clock multiple of `interval`.
/// Zero when `now` already sits on a boundary.
pub fn until_next_boundary(now: SystemTime, interval: Duration) -> Duration {
    let step = interval.as_nanos();
    if step == 0 {
        return Duration::from_secs(0);
    }
    let since = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    match since % step {
        0 => Duration::from_secs(0),
        rem => Duration::from_nanos((step - rem) as u64),
    }
}

/// Collects, measures and records memory usage in megabytes.
pub struct MemorySampler {
    probe: Box<dyn MemoryProbe>,
    window: SlidingWindow<f64>,
    paused: bool,
}

impl MemorySampler {
    pub fn new(probe: Box<dyn MemoryProbe>, maxlen: usize) -> Result<MemorySampler> {
        Ok(MemorySampler {
            probe,
            window: SlidingWindow::new(maxlen)?,
            paused: false,
        })
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Takes one measurement. Probe failures are logged and leave the
    /// window untouched.
    pub fn sample(&mut self) -> WindowSnapshot {
        if self.paused {
            trace!("memory sampling paused");
            return self.window.snapshot();
        }

        self.probe.collect();
        match self.probe.live_bytes() {
            Ok(bytes) => {
                let mb = bytes as f64 / BYTES_PER_MB;
                self.window.push(mb);
                debug!("memory sample: {:.2} MB", mb);
            }
            Err(e) => warn!("memory sample skipped: {}", e),
        }
        self.window.snapshot()
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        self.window.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe {
        bytes: u64,
    }

    impl MemoryProbe for FixedProbe {
        fn live_bytes(&mut self) -> Result<u64> {
            self.bytes += 1 << 20;
            Ok(self.bytes)
        }
    }

    struct BrokenProbe;

    impl MemoryProbe for BrokenProbe {
        fn live_bytes(&mut self) -> Result<u64> {
            Err(Error::Probe("unavailable".into()))
        }
    }

    #[test]
    fn window_never_exceeds_maxlen() {
        let probe = FixedProbe { bytes: 0 };
        let mut sampler = MemorySampler::new(Box::new(probe), 4).unwrap();
        for _ in 0..50 {
            assert!(sampler.sample().len() <= 4);
        }
        let snap = sampler.snapshot();
        assert_eq!(snap.values, vec![47.0, 48.0, 49.0, 50.0]);
        assert_eq!(snap.appends, 50);
    }

    #[test]
    fn paused_sampler_does_not_measure() {
        let mut sampler =
            MemorySampler::new(Box::new(FixedProbe { bytes: 0 }), 10).unwrap();
        sampler.sample();
        sampler.pause();
        assert_eq!(sampler.sample().values, vec![1.0]);
        sampler.resume();
        assert_eq!(sampler.sample().values, vec![1.0, 2.0]);
    }

    #[test]
    fn probe_failure_keeps_window() {
        let mut sampler = MemorySampler::new(Box::new(BrokenProbe), 10).unwrap();
        let snap = sampler.sample();
        assert!(snap.is_empty());
        assert_eq!(snap.appends, 0);
    }

    #[test]
    fn sysinfo_reports_nonzero_memory() {
        let mut probe = SysinfoProbe::new().unwrap();
        assert!(probe.live_bytes().unwrap() > 0);
    }

    #[test]
    fn boundaries_round_up_to_the_grid() {
        let ten = Duration::from_secs(10);
        let at = |secs: u64, millis: u64| {
            UNIX_EPOCH + Duration::from_secs(secs) + Duration::from_millis(millis)
        };
        assert_eq!(until_next_boundary(at(100, 0), ten), Duration::from_secs(0));
        assert_eq!(until_next_boundary(at(101, 0), ten), Duration::from_secs(9));
        assert_eq!(
            until_next_boundary(at(109, 500), ten),
            Duration::from_millis(500)
        );
        assert_eq!(
            until_next_boundary(at(5, 0), Duration::from_secs(0)),
            Duration::from_secs(0)
        );
    }
}
