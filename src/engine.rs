//! Stateful derivation of rates and percentages from cumulative counters.
//!
//! [`SamplingEngine`] keeps one baseline per metric family (aggregate CPU,
//! network, per-process CPU). Each derivation call reads fresh counters,
//! computes the delta against that family's baseline and replaces it. The
//! families never share state, so they can be called in any order and at
//! different cadences.
//!
//! The engine does no locking of its own. Callers that share one engine
//! between threads must serialize access to it.

use ahash::AHashMap as HashMap;
use std::path::Path;
use tracing::{debug, instrument, trace};

use crate::error::Result;
use crate::sample::{
    AggregateCpuSample, NetworkIoSample, NetworkRates, ProcessCpuRow, ProcessSample, UsageInfo,
    Uptime, BYTES_PER_KB,
};
use crate::source::{Clock, SystemClock, SystemSource};

/// Default number of rows returned by the process ranking.
pub const DEFAULT_TOP_N: usize = 10;

/// Default mount point for disk usage.
pub const DEFAULT_DISK_PATH: &str = "/";

/// Elapsed time substituted when the process family sees a non-positive interval.
const DEGENERATE_INTERVAL_SECONDS: f64 = 1.0;

#[derive(Debug, Clone, Copy)]
struct CpuBaseline {
    sample: AggregateCpuSample,
    taken_at: f64,
}

#[derive(Debug, Clone, Copy)]
struct NetworkBaseline {
    sample: NetworkIoSample,
    taken_at: f64,
}

#[derive(Debug, Clone, Copy)]
struct ProcessBaseline {
    cpu_time: f64,
    start_time: Option<u64>,
}

impl ProcessBaseline {
    /// CPU time to subtract for `current`, or 0 when this baseline belonged
    /// to an earlier holder of the same PID.
    fn prior_cpu_for(&self, current: &ProcessSample) -> f64 {
        match (self.start_time, current.start_time) {
            (Some(before), Some(now)) if before != now => 0.0,
            _ => self.cpu_time,
        }
    }
}

#[derive(Debug, Default)]
struct ProcessFamily {
    taken_at: Option<f64>,
    by_pid: HashMap<u32, ProcessBaseline>,
}

/// Busy percentage between two aggregate CPU samples, clamped to `[0, 100]`.
///
/// Returns 0.0 when no time elapsed (or the counters went backwards as a
/// whole).
pub fn cpu_percent_between(previous: &AggregateCpuSample, current: &AggregateCpuSample) -> f64 {
    let delta = current.delta_since(previous);
    let total = delta.total();
    if total <= 0.0 {
        return 0.0;
    }
    let busy = total - delta.idle_total();
    (busy / total * 100.0).clamp(0.0, 100.0)
}

/// KB/s rates between two network samples taken `elapsed` seconds apart.
///
/// Regressed counters and non-positive intervals yield 0.
pub fn network_rates_between(
    previous: &NetworkIoSample,
    current: &NetworkIoSample,
    elapsed: f64,
) -> NetworkRates {
    if elapsed <= 0.0 {
        return NetworkRates::default();
    }
    let sent = current.bytes_sent.saturating_sub(previous.bytes_sent) as f64;
    let recv = current.bytes_recv.saturating_sub(previous.bytes_recv) as f64;
    NetworkRates {
        sent_kbps: sent / BYTES_PER_KB / elapsed,
        recv_kbps: recv / BYTES_PER_KB / elapsed,
    }
}

/// CPU percent of one process over `elapsed` seconds. Never negative, not
/// capped at 100.
pub fn process_cpu_percent(current_cpu: f64, prior_cpu: f64, elapsed: f64) -> f64 {
    let elapsed = if elapsed > 0.0 {
        elapsed
    } else {
        DEGENERATE_INTERVAL_SECONDS
    };
    ((current_cpu - prior_cpu) / elapsed * 100.0).max(0.0)
}

/// Converts cumulative OS counters into point-in-time metrics.
pub struct SamplingEngine<S, C = SystemClock> {
    source: S,
    clock: C,
    cpu: Option<CpuBaseline>,
    network: Option<NetworkBaseline>,
    processes: ProcessFamily,
}

impl<S: SystemSource> SamplingEngine<S, SystemClock> {
    /// Engine over `source` using the system wall clock.
    pub fn new(source: S) -> Self {
        Self::with_clock(source, SystemClock)
    }
}

impl<S: SystemSource, C: Clock> SamplingEngine<S, C> {
    /// Engine over `source` with an explicit clock.
    pub fn with_clock(source: S, clock: C) -> Self {
        Self {
            source,
            clock,
            cpu: None,
            network: None,
            processes: ProcessFamily::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Number of PIDs currently holding a CPU baseline.
    pub fn tracked_processes(&self) -> usize {
        self.processes.by_pid.len()
    }

    /// Machine-wide CPU utilization in percent since the previous call.
    ///
    /// The first call records a baseline and returns 0.0.
    pub fn cpu_utilization(&mut self) -> Result<f64> {
        let current = self.source.read_aggregate_cpu_times()?;
        let now = self.clock.now();

        let percent = match &self.cpu {
            None => {
                debug!("CPU baseline recorded");
                0.0
            }
            Some(baseline) => {
                trace!("CPU interval: {:.3}s", now - baseline.taken_at);
                cpu_percent_between(&baseline.sample, &current)
            }
        };

        self.cpu = Some(CpuBaseline {
            sample: current,
            taken_at: now,
        });

        trace!("CPU utilization: {:.2}%", percent);
        Ok(percent)
    }

    /// Current memory usage. Stateless.
    pub fn memory_info(&self) -> Result<UsageInfo> {
        let snapshot = self.source.read_memory_snapshot()?;
        Ok(UsageInfo::from_snapshot(&snapshot))
    }

    /// Current usage of the filesystem holding `path`. Stateless.
    pub fn disk_usage(&self, path: impl AsRef<Path>) -> Result<UsageInfo> {
        let snapshot = self.source.read_disk_snapshot(path.as_ref())?;
        Ok(UsageInfo::from_snapshot(&snapshot))
    }

    /// Network throughput in KB/s since the previous call.
    ///
    /// The first call records a baseline and returns zero rates. A
    /// non-positive interval also returns zero rates and moves the baseline
    /// forward.
    pub fn network_io_rates(&mut self) -> Result<NetworkRates> {
        let current = self.source.read_network_counters()?;
        let now = self.clock.now();

        let rates = match &self.network {
            None => {
                debug!("Network baseline recorded");
                NetworkRates::default()
            }
            Some(baseline) => {
                let elapsed = now - baseline.taken_at;
                if elapsed <= 0.0 {
                    debug!("Non-positive network interval ({:.6}s), reporting zero", elapsed);
                }
                if current.bytes_sent < baseline.sample.bytes_sent
                    || current.bytes_recv < baseline.sample.bytes_recv
                {
                    debug!("Network counters regressed, clamping delta to zero");
                }
                network_rates_between(&baseline.sample, &current, elapsed)
            }
        };

        self.network = Some(NetworkBaseline {
            sample: current,
            taken_at: now,
        });

        Ok(rates)
    }

    /// Time since boot. Stateless.
    pub fn system_uptime(&self) -> Result<Uptime> {
        let boot_time = self.source.read_boot_time()?;
        let elapsed = (self.clock.now() - boot_time).max(0.0);
        Ok(Uptime {
            seconds: elapsed as u64,
        })
    }

    /// Top `limit` processes by CPU percent since the previous call.
    ///
    /// The first call records a baseline for every process and returns an
    /// empty list. Rows are sorted by CPU percent descending, ties by PID
    /// ascending. Baselines of processes no longer present are dropped.
    #[instrument(skip(self), level = "debug")]
    pub fn top_processes_by_cpu(&mut self, limit: usize) -> Result<Vec<ProcessCpuRow>> {
        let processes = self.source.enumerate_processes()?;
        let now = self.clock.now();

        let mut seen: HashMap<u32, ProcessBaseline> =
            HashMap::with_capacity(self.processes.by_pid.len());
        let mut rows = Vec::new();
        let mut skipped = 0usize;

        let elapsed = self.processes.taken_at.map(|then| now - then);

        for entry in processes {
            let process = match entry {
                Ok(p) => p,
                Err(e) => {
                    debug!("Skipping process {}: {}", e.pid(), e);
                    skipped += 1;
                    continue;
                }
            };

            let cpu_time = process.cpu_time();

            if let Some(elapsed) = elapsed {
                let prior = self
                    .processes
                    .by_pid
                    .get(&process.pid)
                    .map_or(0.0, |b| b.prior_cpu_for(&process));

                rows.push(ProcessCpuRow {
                    pid: process.pid,
                    cpu_percent: process_cpu_percent(cpu_time, prior, elapsed),
                    memory_percent: process.memory_percent,
                    thread_count: process.thread_count,
                    name: process.name,
                    user: process.user,
                });
            }

            seen.insert(
                process.pid,
                ProcessBaseline {
                    cpu_time,
                    start_time: process.start_time,
                },
            );
        }

        let pruned = self
            .processes
            .by_pid
            .keys()
            .filter(|pid| !seen.contains_key(*pid))
            .count();
        debug!(
            "Process scan: {} tracked, {} skipped, {} baselines pruned",
            seen.len(),
            skipped,
            pruned
        );

        self.processes.by_pid = seen;
        self.processes.taken_at = Some(now);

        if elapsed.is_none() {
            debug!("Process CPU baseline recorded");
            return Ok(Vec::new());
        }

        rows.sort_by(|a, b| {
            b.cpu_percent
                .total_cmp(&a.cpu_percent)
                .then_with(|| a.pid.cmp(&b.pid))
        });
        rows.truncate(limit);
        Ok(rows)
    }
}
