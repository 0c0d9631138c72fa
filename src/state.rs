//! Application state shared by the HTTP handlers and the sampler task.

use prometheus::{Gauge, Registry};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::cache::MetricsCache;
use crate::config::Config;
use crate::health_stats::HealthStats;
use crate::metrics::SysperfMetrics;
use crate::sampler::{Engine, SamplePlan};

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub registry: Registry,
    pub metrics: SysperfMetrics,
    pub scrape_duration: Gauge,
    pub sample_duration: Gauge,
    pub sample_success: Gauge,
    pub sample_updating: Gauge,
    pub cache: Arc<RwLock<MetricsCache>>,
    /// Owns every baseline; one sampling pass holds the lock at a time.
    pub engine: Arc<Mutex<Engine>>,
    pub plan: SamplePlan,
    pub config: Arc<Config>,
    pub health_stats: Arc<HealthStats>,
}

impl AppState {
    /// Registers all metrics and wraps `engine` for the sampler task.
    pub fn new(config: Config, engine: Engine) -> anyhow::Result<Self> {
        let registry = Registry::new();
        let metrics = SysperfMetrics::new(&registry)?;

        let scrape_duration = Gauge::new(
            "herakles_sysperf_scrape_duration_seconds",
            "Time spent serving /metrics request (reading from cache)",
        )?;
        let sample_duration = Gauge::new(
            "herakles_sysperf_sample_duration_seconds",
            "Time spent taking the last sample in background",
        )?;
        let sample_success = Gauge::new(
            "herakles_sysperf_sample_success",
            "Whether every read of the last sample succeeded (1) or not (0)",
        )?;
        let sample_updating = Gauge::new(
            "herakles_sysperf_sample_updating",
            "Whether a sample is currently in progress (1) or idle (0)",
        )?;

        if config.enable_telemetry.unwrap_or(true) {
            registry.register(Box::new(scrape_duration.clone()))?;
            registry.register(Box::new(sample_duration.clone()))?;
            registry.register(Box::new(sample_success.clone()))?;
            registry.register(Box::new(sample_updating.clone()))?;
        }

        Ok(Self {
            registry,
            metrics,
            scrape_duration,
            sample_duration,
            sample_success,
            sample_updating,
            cache: Arc::new(RwLock::new(MetricsCache::default())),
            engine: Arc::new(Mutex::new(engine)),
            plan: SamplePlan::from_config(&config),
            config: Arc::new(config),
            health_stats: Arc::new(HealthStats::new()),
        })
    }
}
