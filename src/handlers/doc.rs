//! Documentation endpoint handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::build_info::{BUILD_TIMESTAMP, GIT_SHA, VERSION};
use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the /doc endpoint.
#[instrument(skip(state))]
pub async fn doc_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /doc request");
    state.health_stats.record_http_request();

    let port = state.config.port.unwrap_or(crate::config::DEFAULT_PORT);
    let interval = state.config.sample_interval_secs();
    let doc = format!(
        r#"HERAKLES SYSPERF EXPORTER - DOCUMENTATION
=========================================

VERSION: {VERSION} (git {GIT_SHA}, built {BUILD_TIMESTAMP})
DESCRIPTION: Prometheus exporter for derived system rates and per-process CPU usage

HTTP ENDPOINTS
--------------
GET /metrics     - Prometheus metrics endpoint
GET /health      - Health check with internal statistics (plain text)
GET /report      - Latest sample as JSON
GET /doc         - This documentation (plain text)

HOW VALUES ARE DERIVED
----------------------
A background task samples every {interval}s. CPU utilization, network
throughput and per-process CPU are computed from the change between two
consecutive samples, so the first sample after startup reports 0 for them.
Memory, disk and uptime are read directly on every sample.

Per-process CPU percent is relative to one core and can exceed 100 on
multi-core hosts. Processes are ranked by CPU descending, ties by PID.

AVAILABLE METRICS
-----------------
herakles_sysperf_cpu_usage_percent          - Machine-wide CPU utilization
herakles_sysperf_memory_usage_percent       - Used memory in percent
herakles_sysperf_memory_used_bytes          - Used memory
herakles_sysperf_memory_total_bytes         - Total memory
herakles_sysperf_disk_usage_percent{{path}}   - Used space of a filesystem
herakles_sysperf_disk_used_bytes{{path}}      - Used bytes of a filesystem
herakles_sysperf_disk_total_bytes{{path}}     - Size of a filesystem
herakles_sysperf_network_sent_kbps          - Send rate, all interfaces
herakles_sysperf_network_recv_kbps          - Receive rate, all interfaces
herakles_sysperf_uptime_seconds             - Seconds since boot
herakles_sysperf_top_cpu_percent            - Top-N processes by CPU
herakles_sysperf_top_memory_percent         - Memory percent of the Top-N
herakles_sysperf_top_threads                - Thread count of the Top-N

herakles_sysperf_scrape_duration_seconds    - Time spent serving /metrics
herakles_sysperf_sample_duration_seconds    - Time spent on the last sample
herakles_sysperf_sample_success             - 1 when every read succeeded

CONFIGURATION
-------------
Config file locations (in order):
1. CLI specified: -c /path/to/config.yaml
2. System config: /etc/herakles/sysperf-exporter.yaml
3. Current directory: ./herakles-sysperf-exporter.yaml

Key configuration options:
- port: HTTP listen port (default: {default_port})
- bind: Bind address (default: 0.0.0.0)
- sample_interval_secs: Seconds between samples (default: 3)
- top_n_processes: Processes exported by CPU (default: 10)
- disk_path: Filesystem path whose usage is exported (default: /)
- proc_root: Root of the proc filesystem (default: /proc)

TLS/SSL Configuration:
- enable_tls: Enable HTTPS (default: false)
- tls_cert_path: Path to TLS certificate (PEM format)
- tls_key_path: Path to TLS private key (PEM format)

CLI COMMANDS
------------
herakles-sysperf-exporter                       - Start the exporter
herakles-sysperf-exporter check --all           - Validate system requirements
herakles-sysperf-exporter config -o config.yaml - Generate config file
herakles-sysperf-exporter test -n 3             - Print a few samples
herakles-sysperf-exporter generate-testdata     - Write synthetic counter frames
herakles-sysperf-exporter --help                - Show all CLI options

EXAMPLE PROMQL QUERIES
----------------------
# Busiest process right now
topk(1, herakles_sysperf_top_cpu_percent)

# Hosts with less than 10% free disk
herakles_sysperf_disk_usage_percent > 90

PROMETHEUS SCRAPE CONFIG
------------------------
scrape_configs:
  - job_name: 'herakles-sysperf'
    static_configs:
      - targets: ['localhost:{port}']
    scrape_interval: 15s

{FOOTER_TEXT}
"#,
        default_port = crate::config::DEFAULT_PORT,
    );

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        doc,
    )
}
