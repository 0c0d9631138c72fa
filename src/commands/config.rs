//! `config` subcommand: writes a default configuration file.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("herakles-sysperf-exporter.yaml"));

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Herakles Sysperf Exporter Configuration
# =======================================
#
# Server Configuration
# --------------------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 9216                   # HTTP port
#
# Sampling
# --------
# sample_interval_secs: 3      # Seconds between samples
# top_n_processes: 10          # Processes exported by CPU usage
# disk_path: "/"               # Filesystem whose usage is exported
# proc_root: "/proc"           # Root of the proc filesystem
# passwd_path: "/etc/passwd"   # UID to user name lookup
# max_processes: null          # Maximum processes to scan (null = all)
#
# Feature Flags
# -------------
# enable_health: true          # Enable /health endpoint
# enable_telemetry: true       # Enable internal metrics
# enable_process_metrics: true # Scan processes for the Top-N
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
#
# TLS
# ---
# enable_tls: false
# tls_cert_path: null          # PEM certificate
# tls_key_path: null           # PEM private key
"#;

    format!("{comments}\n{yaml}")
}
