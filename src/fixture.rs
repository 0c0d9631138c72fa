//! Replayable counter data for running without a live /proc.
//!
//! A test data file holds a list of frames, each a complete set of
//! cumulative counters. [`FixtureSource`] serves frame `i` once
//! `i * interval_secs` seconds have passed since it was created and stays on
//! the last frame afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{ProcessError, Result, SampleError};
use crate::sample::{AggregateCpuSample, NetworkIoSample, ProcessSample, UsageSnapshot};
use crate::source::{ProcessIter, SystemSource};

/// One complete set of counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestFrame {
    pub cpu: AggregateCpuSample,
    pub memory: UsageSnapshot,
    /// Filesystem usage keyed by mount path.
    #[serde(default)]
    pub disks: BTreeMap<String, UsageSnapshot>,
    pub network: NetworkIoSample,
    pub boot_time: f64,
    #[serde(default)]
    pub processes: Vec<ProcessSample>,
    /// PIDs that show up in the process table but cannot be read.
    #[serde(default)]
    pub denied_pids: Vec<u32>,
}

/// Root structure for test data JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestData {
    pub version: String,
    pub generated_at: String,
    pub interval_secs: f64,
    pub frames: Vec<TestFrame>,
}

impl TestData {
    fn validate(&self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(SampleError::Source("Test data contains no frames".to_string()));
        }
        if !(self.interval_secs > 0.0) {
            return Err(SampleError::Source(format!(
                "Test data interval_secs must be positive, got {}",
                self.interval_secs
            )));
        }
        Ok(())
    }
}

/// Load test data from JSON file.
pub fn load_test_data_from_file(path: &Path) -> Result<TestData> {
    debug!("Loading test data from: {}", path.display());

    let content = fs::read_to_string(path).map_err(|source| SampleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let test_data: TestData = serde_json::from_str(&content)
        .map_err(|e| SampleError::Source(format!("Failed to parse test data JSON: {}", e)))?;
    test_data.validate()?;

    info!(
        "Loaded test data version {} from {} ({} frames)",
        test_data.version,
        test_data.generated_at,
        test_data.frames.len()
    );

    Ok(test_data)
}

/// Counter source replaying [`TestData`] frames over time.
pub struct FixtureSource {
    data: TestData,
    started: Instant,
    pinned: Option<usize>,
}

impl FixtureSource {
    pub fn new(data: TestData) -> Result<Self> {
        data.validate()?;
        Ok(Self {
            data,
            started: Instant::now(),
            pinned: None,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::new(load_test_data_from_file(path)?)
    }

    /// Serve a fixed frame instead of following elapsed time. `None` resumes
    /// time-based selection.
    pub fn pin_frame(&mut self, index: Option<usize>) {
        self.pinned = index;
    }

    pub fn frame_count(&self) -> usize {
        self.data.frames.len()
    }

    /// Index of the frame currently served.
    pub fn current_index(&self) -> usize {
        let last = self.data.frames.len() - 1;
        let index = match self.pinned {
            Some(i) => i,
            None => (self.started.elapsed().as_secs_f64() / self.data.interval_secs) as usize,
        };
        index.min(last)
    }

    fn frame(&self) -> &TestFrame {
        &self.data.frames[self.current_index()]
    }
}

impl SystemSource for FixtureSource {
    fn read_aggregate_cpu_times(&self) -> Result<AggregateCpuSample> {
        Ok(self.frame().cpu)
    }

    fn read_memory_snapshot(&self) -> Result<UsageSnapshot> {
        Ok(self.frame().memory)
    }

    fn read_disk_snapshot(&self, path: &Path) -> Result<UsageSnapshot> {
        let key = path.to_string_lossy();
        self.frame()
            .disks
            .get(key.as_ref())
            .copied()
            .ok_or_else(|| SampleError::InvalidPath {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            })
    }

    fn read_network_counters(&self) -> Result<NetworkIoSample> {
        Ok(self.frame().network)
    }

    fn read_boot_time(&self) -> Result<f64> {
        Ok(self.frame().boot_time)
    }

    fn enumerate_processes(&self) -> Result<ProcessIter<'_>> {
        let frame = self.frame();
        let readable = frame.processes.iter().cloned().map(Ok);
        let denied = frame
            .denied_pids
            .iter()
            .map(|&pid| Err(ProcessError::AccessDenied(pid)));
        Ok(Box::new(readable.chain(denied)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SamplingEngine;
    use crate::source::ManualClock;

    fn frame(user: f64, idle: f64, sent: u64, proc_cpu: f64) -> TestFrame {
        let mut disks = BTreeMap::new();
        disks.insert(
            "/".to_string(),
            UsageSnapshot {
                used_bytes: 10,
                total_bytes: 40,
                percent: None,
            },
        );
        TestFrame {
            cpu: AggregateCpuSample {
                user,
                idle,
                ..Default::default()
            },
            memory: UsageSnapshot {
                used_bytes: 1 << 30,
                total_bytes: 2 << 30,
                percent: Some(50.0),
            },
            disks,
            network: NetworkIoSample {
                bytes_sent: sent,
                bytes_recv: 0,
            },
            boot_time: 100.0,
            processes: vec![ProcessSample {
                pid: 10,
                name: "worker".to_string(),
                user: "svc".to_string(),
                cpu_time_user: proc_cpu,
                cpu_time_system: 0.0,
                memory_percent: 2.0,
                thread_count: 2,
                start_time: Some(1),
            }],
            denied_pids: vec![1],
        }
    }

    fn data() -> TestData {
        TestData {
            version: "1.0".to_string(),
            generated_at: "2024-01-01T00:00:00Z".to_string(),
            interval_secs: 3.0,
            frames: vec![frame(0.0, 0.0, 0, 0.0), frame(1.0, 3.0, 3072, 1.5)],
        }
    }

    #[test]
    fn test_rejects_empty_and_bad_interval() {
        let mut d = data();
        d.frames.clear();
        assert!(FixtureSource::new(d).is_err());

        let mut d = data();
        d.interval_secs = 0.0;
        assert!(FixtureSource::new(d).is_err());
    }

    #[test]
    fn test_starts_on_first_frame_and_clamps() {
        let mut src = FixtureSource::new(data()).unwrap();
        assert_eq!(src.current_index(), 0);
        src.pin_frame(Some(7));
        assert_eq!(src.current_index(), 1);
    }

    #[test]
    fn test_denied_pids_surface_as_errors() {
        let src = FixtureSource::new(data()).unwrap();
        let entries: Vec<_> = src.enumerate_processes().unwrap().collect();
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[1], Err(ProcessError::AccessDenied(1))));
    }

    #[test]
    fn test_engine_over_fixture_frames() {
        let clock = ManualClock::new(1000.0);
        let mut engine = SamplingEngine::with_clock(FixtureSource::new(data()).unwrap(), clock);
        engine.source_mut().pin_frame(Some(0));
        assert_eq!(engine.cpu_utilization().unwrap(), 0.0);
        assert_eq!(engine.network_io_rates().unwrap().sent_kbps, 0.0);
        assert!(engine.top_processes_by_cpu(5).unwrap().is_empty());

        engine.source_mut().pin_frame(Some(1));
        engine.clock().advance(3.0);
        assert_eq!(engine.cpu_utilization().unwrap(), 25.0);
        assert!((engine.network_io_rates().unwrap().sent_kbps - 1.0).abs() < 1e-9);
        let rows = engine.top_processes_by_cpu(5).unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].cpu_percent - 50.0).abs() < 1e-9);

        assert_eq!(engine.disk_usage("/").unwrap().percentage, 25.0);
        assert!(engine.disk_usage("/srv").is_err());
        assert_eq!(engine.system_uptime().unwrap().to_string(), "00:15:03");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("testdata.json");
        fs::write(&path, serde_json::to_string_pretty(&data()).unwrap()).unwrap();
        let src = FixtureSource::from_file(&path).unwrap();
        assert_eq!(src.frame_count(), 2);

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_test_data_from_file(&path), Err(SampleError::Source(_))));
        assert!(matches!(
            load_test_data_from_file(&dir.path().join("missing.json")),
            Err(SampleError::Io { .. })
        ));
    }
}
