//! One sampling pass over every engine operation, and the background cache
//! refresh built on it.

use anyhow::anyhow;
use chrono::Utc;
use herakles_sysperf_exporter::{
    Clock, FixtureSource, ProcFsSource, SamplingEngine, SystemSource,
};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::cache::SampleReport;
use crate::config::Config;
use crate::state::SharedState;

/// Engine used by the binary: a boxed source read on a blocking thread.
pub type Engine = SamplingEngine<Box<dyn SystemSource + Send>>;

/// What a sampling pass reads.
#[derive(Debug, Clone)]
pub struct SamplePlan {
    pub disk_path: PathBuf,
    pub top_n: usize,
    pub include_processes: bool,
}

impl SamplePlan {
    pub fn from_config(config: &Config) -> Self {
        Self {
            disk_path: config.disk_path(),
            top_n: config.top_n_processes(),
            include_processes: config.process_metrics_enabled(),
        }
    }
}

/// Builds the counter source: recorded frames when a test data file is
/// given, the live proc filesystem otherwise.
pub fn build_source(
    config: &Config,
    test_data_file: Option<&Path>,
) -> anyhow::Result<Box<dyn SystemSource + Send>> {
    if let Some(path) = test_data_file {
        info!("Using test data from {}", path.display());
        return Ok(Box::new(FixtureSource::from_file(path)?));
    }

    let root = config
        .proc_root
        .clone()
        .unwrap_or_else(|| PathBuf::from(herakles_sysperf_exporter::procfs::DEFAULT_PROC_ROOT));
    let mut source = ProcFsSource::new(root).with_max_processes(config.max_processes);
    if let Some(passwd) = &config.passwd_path {
        source = source.with_passwd_path(passwd);
    }
    debug!("Reading counters from {}", source.root().display());
    Ok(Box::new(source))
}

fn record_error(report: &mut SampleReport, what: &str, err: impl Display) {
    warn!("Failed to sample {}: {}", what, err);
    report.errors.push(format!("{}: {}", what, err));
}

/// Runs every operation once. Failures are collected, never fatal.
pub fn collect_report<S: SystemSource, C: Clock>(
    engine: &mut SamplingEngine<S, C>,
    plan: &SamplePlan,
) -> SampleReport {
    let mut report = SampleReport {
        sampled_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        disk_path: plan.disk_path.display().to_string(),
        ..Default::default()
    };

    match engine.cpu_utilization() {
        Ok(v) => report.cpu_percent = Some(v),
        Err(e) => record_error(&mut report, "cpu", e),
    }
    match engine.memory_info() {
        Ok(v) => report.memory = Some(v),
        Err(e) => record_error(&mut report, "memory", e),
    }
    match engine.disk_usage(&plan.disk_path) {
        Ok(v) => report.disk = Some(v),
        Err(e) => record_error(&mut report, "disk", e),
    }
    match engine.network_io_rates() {
        Ok(v) => report.network = Some(v),
        Err(e) => record_error(&mut report, "network", e),
    }
    match engine.system_uptime() {
        Ok(v) => {
            report.uptime_display = Some(v.to_string());
            report.uptime = Some(v);
        }
        Err(e) => record_error(&mut report, "uptime", e),
    }
    if plan.include_processes {
        match engine.top_processes_by_cpu(plan.top_n) {
            Ok(rows) => report.top_processes = rows,
            Err(e) => record_error(&mut report, "processes", e),
        }
    }
    report.tracked_processes = engine.tracked_processes();

    report
}

/// Takes a fresh sample and swaps it into the shared cache.
#[instrument(skip(state))]
pub async fn update_cache(state: &SharedState) -> anyhow::Result<()> {
    let start = Instant::now();
    debug!("Starting cache update");

    {
        let mut cache = state.cache.write().await;
        cache.is_updating = true;
        state.sample_updating.set(1.0);
    }

    let engine = state.engine.clone();
    let plan = state.plan.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut engine = engine
            .lock()
            .map_err(|_| anyhow!("sampling engine lock poisoned"))?;
        Ok::<_, anyhow::Error>(collect_report(&mut *engine, &plan))
    })
    .await;

    let duration = start.elapsed().as_secs_f64();
    let mut cache = state.cache.write().await;
    cache.is_updating = false;
    cache.update_duration_seconds = duration;
    state.sample_updating.set(0.0);
    state.sample_duration.set(duration);

    let report = match result {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            cache.update_success = false;
            state.sample_success.set(0.0);
            state.health_stats.record_sample(0, duration, false);
            return Err(e);
        }
        Err(join_err) => {
            cache.update_success = false;
            state.sample_success.set(0.0);
            state.health_stats.record_sample(0, duration, false);
            return Err(anyhow!("sampling task failed: {}", join_err));
        }
    };

    let success = report.is_complete();
    state
        .health_stats
        .record_sample(report.tracked_processes as u64, duration, success);
    state.sample_success.set(if success { 1.0 } else { 0.0 });

    debug!(
        "Cache update finished in {:.3}s ({} processes tracked, {} errors)",
        duration,
        report.tracked_processes,
        report.errors.len()
    );

    cache.update_success = success;
    cache.last_updated = Some(Instant::now());
    cache.report = Some(report);
    Ok(())
}
