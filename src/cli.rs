//! CLI arguments and subcommands for herakles-sysperf-exporter.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Output format for the `test` subcommand
#[derive(Debug, Clone, ValueEnum)]
pub enum ReportFormat {
    Table,
    Yaml,
    Json,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-sysperf-exporter",
    about = "Prometheus exporter for derived system rates and per-process CPU usage",
    long_about = "Prometheus exporter for derived system rates and per-process CPU usage.\n\n\
                  Samples kernel counters on a fixed interval and exports CPU utilization, \
                  memory and disk usage, network throughput, uptime and the top processes \
                  by CPU, each derived from the change between consecutive snapshots.",
    author = "Michael Moll <proc-mem@herakles.io> - Herakles IO",
    version,
    propagate_version = true,
    after_help = "Project: https://github.com/herakles-io/herakles-sysperf-exporter | More info: https://www.herakles.io | Support: proc-mem@herakles.io"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level (overrides log_level from the config file)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Seconds between samples
    #[arg(long)]
    pub sample_interval: Option<u64>,

    /// Number of processes to export by CPU usage
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Filesystem path whose usage is exported
    #[arg(long)]
    pub disk_path: Option<PathBuf>,

    /// Root of the proc filesystem
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Maximum number of processes to scan
    #[arg(long)]
    pub max_processes: Option<usize>,

    /// Disable the /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Disable internal exporter_* metrics
    #[arg(long)]
    pub disable_telemetry: bool,

    /// Skip the per-process scan
    #[arg(long)]
    pub disable_process_metrics: bool,

    /// Serve HTTPS instead of HTTP
    #[arg(long)]
    pub enable_tls: bool,

    /// TLS certificate (PEM)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// TLS private key (PEM)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,

    /// Path to JSON test data file (replays recorded counters instead of /proc)
    #[arg(short = 't', long)]
    pub test_data_file: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and system requirements
    Check {
        /// Check /proc counter files
        #[arg(long)]
        proc: bool,

        /// Check the configured disk path
        #[arg(long)]
        disk: bool,

        /// Check all system requirements
        #[arg(long)]
        all: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Take a few samples and print the derived values
    Test {
        /// Number of samples after the bootstrap sample
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Seconds to wait between samples
        #[arg(long, default_value_t = 1.0)]
        interval: f64,

        /// Show the process table
        #[arg(long)]
        verbose: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: ReportFormat,
    },

    /// Generate synthetic test data JSON file
    GenerateTestdata {
        /// Output file path
        #[arg(short = 'o', long, default_value = "testdata.json")]
        output: PathBuf,

        /// Number of frames to generate
        #[arg(long, default_value_t = 5)]
        frames: usize,

        /// Number of processes per frame
        #[arg(long, default_value_t = 12)]
        processes: usize,

        /// Seconds between frames
        #[arg(long, default_value_t = 3.0)]
        interval: f64,
    },
}
