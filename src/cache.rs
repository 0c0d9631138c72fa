//! Cache of the most recent sample, shared between the sampler task and the
//! HTTP handlers.

use herakles_sysperf_exporter::{NetworkRates, ProcessCpuRow, UsageInfo, Uptime};
use serde::Serialize;
use std::time::Instant;

/// Everything derived in one sampling pass. A field is `None` when its read
/// failed; the failure is listed in `errors`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SampleReport {
    pub sampled_at: String,
    pub cpu_percent: Option<f64>,
    pub memory: Option<UsageInfo>,
    pub disk_path: String,
    pub disk: Option<UsageInfo>,
    pub network: Option<NetworkRates>,
    pub uptime: Option<Uptime>,
    /// `HH:MM:SS` rendering of `uptime`.
    pub uptime_display: Option<String>,
    pub top_processes: Vec<ProcessCpuRow>,
    pub tracked_processes: usize,
    pub errors: Vec<String>,
}

impl SampleReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Cache state for the latest report with update timing information.
#[derive(Clone, Default)]
pub struct MetricsCache {
    pub report: Option<SampleReport>,
    pub last_updated: Option<Instant>,
    pub update_duration_seconds: f64,
    pub update_success: bool,
    pub is_updating: bool,
}
