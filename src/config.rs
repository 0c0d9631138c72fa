//! Configuration loading, merging and validation.
//!
//! Precedence is CLI flag > config file > built-in default. Files may be
//! YAML, JSON or TOML, chosen by extension (YAML when unknown).

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::{Args, ConfigFormat};

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9216;
pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_TOP_N: usize = herakles_sysperf_exporter::DEFAULT_TOP_N;

/// Config file locations tried when no explicit path is given.
const DEFAULT_CONFIG_PATHS: [&str; 6] = [
    "/etc/herakles/sysperf-exporter.yaml",
    "/etc/herakles/sysperf-exporter.yml",
    "/etc/herakles/sysperf-exporter.json",
    "./herakles-sysperf-exporter.yaml",
    "./herakles-sysperf-exporter.yml",
    "./herakles-sysperf-exporter.json",
];

/// Effective exporter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Sampling
    #[serde(alias = "sample-interval-secs")]
    pub sample_interval_secs: Option<u64>,
    #[serde(alias = "top-n-processes")]
    pub top_n_processes: Option<usize>,
    #[serde(alias = "disk-path")]
    pub disk_path: Option<PathBuf>,
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,
    #[serde(alias = "passwd-path")]
    pub passwd_path: Option<PathBuf>,
    pub max_processes: Option<usize>,

    // Feature flags
    pub enable_health: Option<bool>,
    pub enable_telemetry: Option<bool>,
    #[serde(alias = "enable-process-metrics")]
    pub enable_process_metrics: Option<bool>,

    // Logging
    pub log_level: Option<String>,

    // TLS
    pub enable_tls: Option<bool>,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            sample_interval_secs: Some(DEFAULT_SAMPLE_INTERVAL_SECS),
            top_n_processes: Some(DEFAULT_TOP_N),
            disk_path: Some(PathBuf::from(herakles_sysperf_exporter::DEFAULT_DISK_PATH)),
            proc_root: Some(PathBuf::from(herakles_sysperf_exporter::procfs::DEFAULT_PROC_ROOT)),
            passwd_path: Some(PathBuf::from(
                herakles_sysperf_exporter::procfs::DEFAULT_PASSWD_PATH,
            )),
            max_processes: None,
            enable_health: Some(true),
            enable_telemetry: Some(true),
            enable_process_metrics: Some(true),
            log_level: Some("info".into()),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    pub fn sample_interval_secs(&self) -> u64 {
        self.sample_interval_secs
            .unwrap_or(DEFAULT_SAMPLE_INTERVAL_SECS)
    }

    pub fn top_n_processes(&self) -> usize {
        self.top_n_processes.unwrap_or(DEFAULT_TOP_N)
    }

    pub fn disk_path(&self) -> PathBuf {
        self.disk_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(herakles_sysperf_exporter::DEFAULT_DISK_PATH))
    }

    pub fn process_metrics_enabled(&self) -> bool {
        self.enable_process_metrics.unwrap_or(true)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.sample_interval_secs == Some(0) {
        bail!("sample_interval_secs must be at least 1");
    }

    if cfg.top_n_processes == Some(0) && cfg.process_metrics_enabled() {
        bail!("top_n_processes must be at least 1 when process metrics are enabled");
    }

    for (name, path) in [
        ("disk_path", &cfg.disk_path),
        ("proc_root", &cfg.proc_root),
        ("passwd_path", &cfg.passwd_path),
    ] {
        if path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            bail!("{} must not be empty", name);
        }
    }

    if let Some(bind) = cfg.bind.as_deref() {
        bind.parse::<std::net::IpAddr>()
            .with_context(|| format!("Invalid bind address '{}'", bind))?;
    }

    if cfg.enable_tls.unwrap_or(false) && (cfg.tls_cert_path.is_none() || cfg.tls_key_path.is_none())
    {
        bail!("enable_tls is set, but tls_cert_path and tls_key_path are not both defined");
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults
pub fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(port) = args.port {
        config.port = Some(port);
    }
    if let Some(interval) = args.sample_interval {
        config.sample_interval_secs = Some(interval);
    }
    if let Some(n) = args.top_n {
        config.top_n_processes = Some(n);
    }
    if let Some(path) = &args.disk_path {
        config.disk_path = Some(path.clone());
    }
    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if args.max_processes.is_some() {
        config.max_processes = args.max_processes;
    }

    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert) = &args.tls_cert {
        config.tls_cert_path = Some(cert.clone());
    }
    if let Some(key) = &args.tls_key {
        config.tls_key_path = Some(key.clone());
    }

    // Feature flags
    if args.disable_health {
        config.enable_health = Some(false);
    }
    if args.disable_telemetry {
        config.enable_telemetry = Some(false);
    }
    if args.disable_process_metrics {
        config.enable_process_metrics = Some(false);
    }

    Ok(config)
}

/// Loads a config file, or the defaults when none is found.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        },
    };

    if !path.exists() {
        bail!("Config file not found: {}", path.display());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = parse_config(&content, path.extension().and_then(|s| s.to_str()))
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

fn parse_config(content: &str, extension: Option<&str>) -> anyhow::Result<Config> {
    let config = match extension {
        Some("json") => serde_json::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        _ => serde_yaml::from_str(content)?,
    };
    Ok(config)
}

/// Serializes a config in the requested format.
pub fn render_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<String> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
