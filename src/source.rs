//! Counter-reading capabilities consumed by the sampling engine.
//!
//! The engine never touches the operating system directly. It reads raw
//! cumulative counters through [`SystemSource`] and timestamps through
//! [`Clock`]. [`crate::procfs::ProcFsSource`] reads a Linux `/proc` tree,
//! [`crate::fixture::FixtureSource`] replays recorded frames and
//! [`MemorySource`] holds plain values set by the caller.

use ahash::AHashMap as HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ProcessError, Result, SampleError};
use crate::sample::{AggregateCpuSample, NetworkIoSample, ProcessSample, UsageSnapshot};

/// Lazy process enumeration. Individual entries may fail; the sequence as a
/// whole keeps going.
pub type ProcessIter<'a> =
    Box<dyn Iterator<Item = std::result::Result<ProcessSample, ProcessError>> + 'a>;

/// Source of raw cumulative OS counters.
pub trait SystemSource {
    /// Current machine-wide CPU time-in-state counters.
    fn read_aggregate_cpu_times(&self) -> Result<AggregateCpuSample>;

    /// Current memory usage.
    fn read_memory_snapshot(&self) -> Result<UsageSnapshot>;

    /// Current usage of the filesystem containing `path`.
    ///
    /// Fails with [`SampleError::InvalidPath`] when `path` does not exist or
    /// is not accessible.
    fn read_disk_snapshot(&self, path: &Path) -> Result<UsageSnapshot>;

    /// Current machine-wide network byte counters.
    fn read_network_counters(&self) -> Result<NetworkIoSample>;

    /// Boot time in seconds since the Unix epoch.
    fn read_boot_time(&self) -> Result<f64>;

    /// Walks the live process table.
    fn enumerate_processes(&self) -> Result<ProcessIter<'_>>;
}

impl<S: SystemSource + ?Sized> SystemSource for Box<S> {
    fn read_aggregate_cpu_times(&self) -> Result<AggregateCpuSample> {
        (**self).read_aggregate_cpu_times()
    }

    fn read_memory_snapshot(&self) -> Result<UsageSnapshot> {
        (**self).read_memory_snapshot()
    }

    fn read_disk_snapshot(&self, path: &Path) -> Result<UsageSnapshot> {
        (**self).read_disk_snapshot(path)
    }

    fn read_network_counters(&self) -> Result<NetworkIoSample> {
        (**self).read_network_counters()
    }

    fn read_boot_time(&self) -> Result<f64> {
        (**self).read_boot_time()
    }

    fn enumerate_processes(&self) -> Result<ProcessIter<'_>> {
        (**self).enumerate_processes()
    }
}

/// Wall-clock time source, seconds since the Unix epoch.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            bits: AtomicU64::new(start.to_bits()),
        }
    }

    pub fn set(&self, now: f64) {
        self.bits.store(now.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// In-memory source whose counters are plain fields.
///
/// Disk paths not present in `disks` behave like missing paths.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub cpu: AggregateCpuSample,
    pub memory: UsageSnapshot,
    pub disks: HashMap<PathBuf, UsageSnapshot>,
    pub network: NetworkIoSample,
    pub boot_time: f64,
    pub processes: Vec<std::result::Result<ProcessSample, ProcessError>>,
}

impl SystemSource for MemorySource {
    fn read_aggregate_cpu_times(&self) -> Result<AggregateCpuSample> {
        Ok(self.cpu)
    }

    fn read_memory_snapshot(&self) -> Result<UsageSnapshot> {
        Ok(self.memory)
    }

    fn read_disk_snapshot(&self, path: &Path) -> Result<UsageSnapshot> {
        self.disks
            .get(path)
            .copied()
            .ok_or_else(|| SampleError::InvalidPath {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            })
    }

    fn read_network_counters(&self) -> Result<NetworkIoSample> {
        Ok(self.network)
    }

    fn read_boot_time(&self) -> Result<f64> {
        Ok(self.boot_time)
    }

    fn enumerate_processes(&self) -> Result<ProcessIter<'_>> {
        Ok(Box::new(self.processes.iter().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(10.0);
        assert_eq!(clock.now(), 10.0);
        clock.advance(2.5);
        assert_eq!(clock.now(), 12.5);
        clock.set(1.0);
        assert_eq!(clock.now(), 1.0);
    }

    #[test]
    fn test_memory_source_unknown_disk_is_invalid_path() {
        let source = MemorySource::default();
        match source.read_disk_snapshot(Path::new("/nope")) {
            Err(SampleError::InvalidPath { path, .. }) => assert_eq!(path, PathBuf::from("/nope")),
            other => panic!("expected InvalidPath, got {:?}", other),
        }
    }

    #[test]
    fn test_boxed_source_delegates() {
        let mut inner = MemorySource::default();
        inner.boot_time = 42.0;
        let boxed: Box<dyn SystemSource> = Box::new(inner);
        assert_eq!(boxed.read_boot_time().unwrap(), 42.0);
    }
}
