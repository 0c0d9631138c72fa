//! Prometheus metrics definitions for herakles-sysperf-exporter.

use herakles_sysperf_exporter::sample::BYTES_PER_GIB;
use herakles_sysperf_exporter::UsageInfo;
use prometheus::{Gauge, GaugeVec, Opts, Registry};

use crate::cache::SampleReport;

/// Gauges fed from the latest [`SampleReport`].
#[derive(Clone)]
pub struct SysperfMetrics {
    pub cpu_usage: Gauge,

    pub memory_percent: Gauge,
    pub memory_used: Gauge,
    pub memory_total: Gauge,

    pub disk_percent: GaugeVec,
    pub disk_used: GaugeVec,
    pub disk_total: GaugeVec,

    pub network_sent: Gauge,
    pub network_recv: Gauge,

    pub uptime: Gauge,

    // Top-N by CPU
    pub top_cpu_percent: GaugeVec,
    pub top_memory_percent: GaugeVec,
    pub top_threads: GaugeVec,
}

impl SysperfMetrics {
    /// Creates and registers all Prometheus metrics with the registry.
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let top_labels = &["rank", "pid", "name", "user"];

        let cpu_usage = Gauge::new(
            "herakles_sysperf_cpu_usage_percent",
            "Machine-wide CPU utilization in percent since the previous sample",
        )?;

        let memory_percent = Gauge::new(
            "herakles_sysperf_memory_usage_percent",
            "Used memory in percent",
        )?;
        let memory_used = Gauge::new(
            "herakles_sysperf_memory_used_bytes",
            "Used memory in bytes",
        )?;
        let memory_total = Gauge::new(
            "herakles_sysperf_memory_total_bytes",
            "Total memory in bytes",
        )?;

        let disk_percent = GaugeVec::new(
            Opts::new(
                "herakles_sysperf_disk_usage_percent",
                "Used space of the filesystem holding path, in percent",
            ),
            &["path"],
        )?;
        let disk_used = GaugeVec::new(
            Opts::new(
                "herakles_sysperf_disk_used_bytes",
                "Used space of the filesystem holding path, in bytes",
            ),
            &["path"],
        )?;
        let disk_total = GaugeVec::new(
            Opts::new(
                "herakles_sysperf_disk_total_bytes",
                "Size of the filesystem holding path, in bytes",
            ),
            &["path"],
        )?;

        let network_sent = Gauge::new(
            "herakles_sysperf_network_sent_kbps",
            "Bytes sent on all interfaces in KB/s since the previous sample",
        )?;
        let network_recv = Gauge::new(
            "herakles_sysperf_network_recv_kbps",
            "Bytes received on all interfaces in KB/s since the previous sample",
        )?;

        let uptime = Gauge::new(
            "herakles_sysperf_uptime_seconds",
            "Seconds since system boot",
        )?;

        let top_cpu_percent = GaugeVec::new(
            Opts::new(
                "herakles_sysperf_top_cpu_percent",
                "Top-N processes by CPU percent since the previous sample",
            ),
            top_labels,
        )?;
        let top_memory_percent = GaugeVec::new(
            Opts::new(
                "herakles_sysperf_top_memory_percent",
                "Resident memory percent of the Top-N CPU processes",
            ),
            top_labels,
        )?;
        let top_threads = GaugeVec::new(
            Opts::new(
                "herakles_sysperf_top_threads",
                "Thread count of the Top-N CPU processes",
            ),
            top_labels,
        )?;

        registry.register(Box::new(cpu_usage.clone()))?;
        registry.register(Box::new(memory_percent.clone()))?;
        registry.register(Box::new(memory_used.clone()))?;
        registry.register(Box::new(memory_total.clone()))?;
        registry.register(Box::new(disk_percent.clone()))?;
        registry.register(Box::new(disk_used.clone()))?;
        registry.register(Box::new(disk_total.clone()))?;
        registry.register(Box::new(network_sent.clone()))?;
        registry.register(Box::new(network_recv.clone()))?;
        registry.register(Box::new(uptime.clone()))?;
        registry.register(Box::new(top_cpu_percent.clone()))?;
        registry.register(Box::new(top_memory_percent.clone()))?;
        registry.register(Box::new(top_threads.clone()))?;

        Ok(Self {
            cpu_usage,
            memory_percent,
            memory_used,
            memory_total,
            disk_percent,
            disk_used,
            disk_total,
            network_sent,
            network_recv,
            uptime,
            top_cpu_percent,
            top_memory_percent,
            top_threads,
        })
    }

    /// Clears labelled series so vanished processes drop out.
    pub fn reset(&self) {
        self.disk_percent.reset();
        self.disk_used.reset();
        self.disk_total.reset();
        self.top_cpu_percent.reset();
        self.top_memory_percent.reset();
        self.top_threads.reset();
    }

    /// Publishes a report. Values whose read failed keep their last value.
    pub fn set_from_report(&self, report: &SampleReport) {
        self.reset();

        if let Some(cpu) = report.cpu_percent {
            self.cpu_usage.set(cpu);
        }
        if let Some(mem) = &report.memory {
            self.memory_percent.set(mem.percentage);
            self.memory_used.set(gib_to_bytes(mem.used_gb));
            self.memory_total.set(gib_to_bytes(mem.total_gb));
        }
        if let Some(disk) = &report.disk {
            self.set_disk(&report.disk_path, disk);
        }
        if let Some(net) = &report.network {
            self.network_sent.set(net.sent_kbps);
            self.network_recv.set(net.recv_kbps);
        }
        if let Some(uptime) = report.uptime {
            self.uptime.set(uptime.seconds as f64);
        }

        for (rank, row) in report.top_processes.iter().enumerate() {
            let rank = (rank + 1).to_string();
            let pid = row.pid.to_string();
            let labels = &[rank.as_str(), pid.as_str(), row.name.as_str(), row.user.as_str()];
            self.top_cpu_percent
                .with_label_values(labels)
                .set(row.cpu_percent);
            self.top_memory_percent
                .with_label_values(labels)
                .set(row.memory_percent);
            self.top_threads
                .with_label_values(labels)
                .set(row.thread_count as f64);
        }
    }

    fn set_disk(&self, path: &str, disk: &UsageInfo) {
        let labels = &[path];
        self.disk_percent.with_label_values(labels).set(disk.percentage);
        self.disk_used
            .with_label_values(labels)
            .set(gib_to_bytes(disk.used_gb));
        self.disk_total
            .with_label_values(labels)
            .set(gib_to_bytes(disk.total_gb));
    }
}

fn gib_to_bytes(gib: f64) -> f64 {
    (gib * BYTES_PER_GIB).round()
}
