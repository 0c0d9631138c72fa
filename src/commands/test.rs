//! `test` subcommand: samples a few times and prints the derived values.

use anyhow::Context;
use herakles_sysperf_exporter::{SamplingEngine, UsageInfo};
use std::fmt::Write as FmtWrite;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::cache::SampleReport;
use crate::cli::ReportFormat;
use crate::config::Config;
use crate::sampler::{build_source, collect_report, SamplePlan};

/// Takes a bootstrap sample, then `iterations` samples `interval` seconds apart.
pub fn command_test(
    iterations: usize,
    interval: f64,
    verbose: bool,
    format: ReportFormat,
    config: &Config,
    test_data_file: Option<&Path>,
) -> anyhow::Result<()> {
    let table = matches!(format, ReportFormat::Table);
    if table {
        println!("🧪 Herakles Sysperf Exporter - Test Mode");
        println!("========================================");
    }

    let pause = pause_between(interval)?;
    let mut engine = SamplingEngine::new(build_source(config, test_data_file)?);
    let plan = SamplePlan::from_config(config);

    // Rates need a previous sample.
    collect_report(&mut engine, &plan);

    for iteration in 1..=iterations {
        std::thread::sleep(pause);
        let start = Instant::now();
        let report = collect_report(&mut engine, &plan);
        let duration = start.elapsed();

        match format {
            ReportFormat::Table => {
                println!("\n🔄 Iteration {}/{}:", iteration, iterations);
                print!("{}", render_report(&report, verbose));
                println!(
                    "   ⏱️  Sample duration: {:.2}ms",
                    duration.as_secs_f64() * 1000.0
                );
            }
            ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            ReportFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        }
    }

    if table {
        println!("\n✅ Test completed successfully");
    }
    Ok(())
}

/// Sleep between samples; rejects negative, NaN and out-of-range intervals.
fn pause_between(interval: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(interval)
        .with_context(|| format!("Invalid --interval {}", interval))
}

fn usage_line(info: &Option<UsageInfo>) -> String {
    match info {
        Some(u) => format!(
            "{:.1}% ({:.2} / {:.2} GB)",
            u.percentage, u.used_gb, u.total_gb
        ),
        None => "unavailable".to_string(),
    }
}

/// Renders a report as the plain-text system information table.
pub fn render_report(report: &SampleReport, verbose: bool) -> String {
    let mut out = String::new();

    let cpu = report
        .cpu_percent
        .map_or("unavailable".to_string(), |c| format!("{:.1}%", c));
    writeln!(out, "   CPU Usage:       {}", cpu).ok();
    writeln!(out, "   Memory Usage:    {}", usage_line(&report.memory)).ok();
    writeln!(
        out,
        "   Disk Usage ({}): {}",
        report.disk_path,
        usage_line(&report.disk)
    )
    .ok();
    let network = match &report.network {
        Some(n) => format!("↑ {:.2} KB/s  ↓ {:.2} KB/s", n.sent_kbps, n.recv_kbps),
        None => "unavailable".to_string(),
    };
    writeln!(out, "   Network:         {}", network).ok();
    writeln!(
        out,
        "   System Uptime:   {}",
        report.uptime_display.as_deref().unwrap_or("unavailable")
    )
    .ok();

    let rows = if verbose {
        &report.top_processes[..]
    } else {
        &report.top_processes[..report.top_processes.len().min(5)]
    };
    if !rows.is_empty() {
        writeln!(out).ok();
        writeln!(
            out,
            "   {:>7}  {:<20} {:>7} {:>7} {:>7}  {}",
            "PID", "Name", "CPU %", "Mem %", "Threads", "User"
        )
        .ok();
        for row in rows {
            writeln!(
                out,
                "   {:>7}  {:<20} {:>7.1} {:>7.1} {:>7}  {}",
                row.pid, row.name, row.cpu_percent, row.memory_percent, row.thread_count, row.user
            )
            .ok();
        }
    }

    for err in &report.errors {
        writeln!(out, "   ❌ {}", err).ok();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use herakles_sysperf_exporter::{NetworkRates, ProcessCpuRow};

    #[test]
    fn test_pause_between_rejects_unrepresentable_intervals() {
        assert_eq!(pause_between(0.5).unwrap(), Duration::from_millis(500));
        assert_eq!(pause_between(0.0).unwrap(), Duration::ZERO);
        assert!(pause_between(f64::INFINITY).is_err());
        assert!(pause_between(f64::NAN).is_err());
        assert!(pause_between(-1.0).is_err());
    }

    #[test]
    fn test_render_report() {
        let report = SampleReport {
            cpu_percent: Some(71.43),
            memory: Some(UsageInfo {
                percentage: 50.0,
                used_gb: 8.0,
                total_gb: 16.0,
            }),
            disk_path: "/".into(),
            network: Some(NetworkRates {
                sent_kbps: 1.0,
                recv_kbps: 2.5,
            }),
            uptime_display: Some("01:01:01".into()),
            top_processes: vec![ProcessCpuRow {
                pid: 300,
                name: "db".into(),
                cpu_percent: 50.0,
                memory_percent: 4.0,
                thread_count: 12,
                user: "postgres".into(),
            }],
            errors: vec!["disk: missing".into()],
            ..Default::default()
        };

        let text = render_report(&report, false);
        assert!(text.contains("CPU Usage:       71.4%"));
        assert!(text.contains("50.0% (8.00 / 16.00 GB)"));
        assert!(text.contains("Disk Usage (/): unavailable"));
        assert!(text.contains("↓ 2.50 KB/s"));
        assert!(text.contains("01:01:01"));
        assert!(text.contains("postgres"));
        assert!(text.contains("❌ disk: missing"));
    }
}
