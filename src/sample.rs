//! Raw counter snapshots and the derived records built from them.
//!
//! Raw samples are what a [`crate::source::SystemSource`] hands to the
//! engine. Derived records are what the engine returns; each carries its
//! unit in the field name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytes per gibibyte.
pub const BYTES_PER_GIB: f64 = (1u64 << 30) as f64;

/// Bytes per kilobyte as used for network rates.
pub const BYTES_PER_KB: f64 = 1024.0;

/// Cumulative machine-wide CPU time-in-state counters, in seconds.
///
/// Fields a platform does not report are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateCpuSample {
    #[serde(default)]
    pub user: f64,
    #[serde(default)]
    pub nice: f64,
    #[serde(default)]
    pub system: f64,
    #[serde(default)]
    pub idle: f64,
    #[serde(default)]
    pub iowait: f64,
    #[serde(default)]
    pub irq: f64,
    #[serde(default)]
    pub softirq: f64,
    #[serde(default)]
    pub steal: f64,
}

impl AggregateCpuSample {
    /// Sum of all eight fields.
    pub fn total(&self) -> f64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Non-active time (idle + iowait).
    pub fn idle_total(&self) -> f64 {
        self.idle + self.iowait
    }

    /// Fieldwise `self - previous`. Fields may come out negative when a
    /// counter regressed.
    pub fn delta_since(&self, previous: &AggregateCpuSample) -> AggregateCpuSample {
        AggregateCpuSample {
            user: self.user - previous.user,
            nice: self.nice - previous.nice,
            system: self.system - previous.system,
            idle: self.idle - previous.idle,
            iowait: self.iowait - previous.iowait,
            irq: self.irq - previous.irq,
            softirq: self.softirq - previous.softirq,
            steal: self.steal - previous.steal,
        }
    }
}

/// Cumulative machine-wide network byte counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIoSample {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// Instantaneous used/total figures for memory or a filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub used_bytes: u64,
    pub total_bytes: u64,
    /// Used percentage as computed by the source, if it provides one.
    #[serde(default)]
    pub percent: Option<f64>,
}

/// One live process as reported by the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub user: String,
    /// Cumulative user-mode CPU time in seconds.
    pub cpu_time_user: f64,
    /// Cumulative kernel-mode CPU time in seconds.
    pub cpu_time_system: f64,
    pub memory_percent: f64,
    pub thread_count: u32,
    /// Process start time in clock ticks after boot, when known.
    #[serde(default)]
    pub start_time: Option<u64>,
}

impl ProcessSample {
    /// Total CPU time (user + system) in seconds.
    pub fn cpu_time(&self) -> f64 {
        self.cpu_time_user + self.cpu_time_system
    }
}

/// Memory or disk usage derived from a [`UsageSnapshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageInfo {
    /// Used percentage in `[0, 100]`.
    pub percentage: f64,
    pub used_gb: f64,
    pub total_gb: f64,
}

impl UsageInfo {
    /// Converts a raw snapshot, preferring the source-provided percentage.
    pub fn from_snapshot(snapshot: &UsageSnapshot) -> Self {
        let percentage = match snapshot.percent {
            Some(p) if p.is_finite() => p,
            _ if snapshot.total_bytes == 0 => 0.0,
            _ => snapshot.used_bytes as f64 / snapshot.total_bytes as f64 * 100.0,
        };

        UsageInfo {
            percentage: percentage.clamp(0.0, 100.0),
            used_gb: snapshot.used_bytes as f64 / BYTES_PER_GIB,
            total_gb: snapshot.total_bytes as f64 / BYTES_PER_GIB,
        }
    }
}

/// Network throughput in KB/s since the previous sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NetworkRates {
    pub sent_kbps: f64,
    pub recv_kbps: f64,
}

/// Whole seconds since boot. Displays as `HH:MM:SS`, hours unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Uptime {
    pub seconds: u64,
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.seconds / 3600;
        let minutes = (self.seconds % 3600) / 60;
        let secs = self.seconds % 60;
        write!(f, "{:02}:{:02}:{:02}", hours, minutes, secs)
    }
}

/// One row of the per-process CPU ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessCpuRow {
    pub pid: u32,
    pub name: String,
    /// CPU percent over the last interval; may exceed 100 on multi-core hosts.
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub thread_count: u32,
    pub user: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_formats_total_hours() {
        assert_eq!(Uptime { seconds: 3661 }.to_string(), "01:01:01");
        assert_eq!(Uptime { seconds: 0 }.to_string(), "00:00:00");
        assert_eq!(Uptime { seconds: 100 * 3600 + 59 }.to_string(), "100:00:59");
    }

    #[test]
    fn test_usage_info_prefers_source_percent() {
        let snap = UsageSnapshot {
            used_bytes: 1 << 30,
            total_bytes: 4 << 30,
            percent: Some(40.0),
        };
        let info = UsageInfo::from_snapshot(&snap);
        assert!((info.percentage - 40.0).abs() < f64::EPSILON);
        assert!((info.used_gb - 1.0).abs() < f64::EPSILON);
        assert!((info.total_gb - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_usage_info_computes_and_clamps() {
        let snap = UsageSnapshot {
            used_bytes: 512,
            total_bytes: 1024,
            percent: None,
        };
        assert!((UsageInfo::from_snapshot(&snap).percentage - 50.0).abs() < 1e-9);

        let over = UsageSnapshot {
            used_bytes: 4096,
            total_bytes: 1024,
            percent: None,
        };
        assert_eq!(UsageInfo::from_snapshot(&over).percentage, 100.0);

        let empty = UsageSnapshot::default();
        assert_eq!(UsageInfo::from_snapshot(&empty).percentage, 0.0);

        let bogus = UsageSnapshot {
            used_bytes: 1,
            total_bytes: 2,
            percent: Some(-3.0),
        };
        assert_eq!(UsageInfo::from_snapshot(&bogus).percentage, 0.0);
    }

    #[test]
    fn test_cpu_sample_totals() {
        let s = AggregateCpuSample {
            user: 1.0,
            nice: 2.0,
            system: 3.0,
            idle: 4.0,
            iowait: 5.0,
            irq: 6.0,
            softirq: 7.0,
            steal: 8.0,
        };
        assert_eq!(s.total(), 36.0);
        assert_eq!(s.idle_total(), 9.0);
        assert_eq!(s.delta_since(&s).total(), 0.0);
    }
}
