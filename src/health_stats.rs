//! Running statistics about the exporter itself, rendered on `/health`.

use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

#[derive(Clone, Copy, Default)]
struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    fn add(&mut self, value: f64) {
        if self.count == 0 {
            *self = RunningStat {
                count: 1,
                sum: value,
                min: value,
                max: value,
                last: value,
            };
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe [`RunningStat`].
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns (current, average, max, min, count).
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        match self.inner.lock() {
            Ok(s) => (s.last, s.avg(), s.max, s.min, s.count),
            Err(_) => (0.0, 0.0, 0.0, 0.0, 0),
        }
    }
}

pub struct HealthStats {
    started: Instant,
    scanned_processes: Stat,
    sample_duration_seconds: Stat,
    scrape_duration_seconds: Stat,
    total_samples: AtomicU64,
    failed_samples: AtomicU64,
    http_requests: AtomicU64,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            scanned_processes: Stat::default(),
            sample_duration_seconds: Stat::default(),
            scrape_duration_seconds: Stat::default(),
            total_samples: AtomicU64::new(0),
            failed_samples: AtomicU64::new(0),
            http_requests: AtomicU64::new(0),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_sample(&self, tracked_processes: u64, duration_seconds: f64, success: bool) {
        self.scanned_processes.add_sample(tracked_processes as f64);
        self.sample_duration_seconds.add_sample(duration_seconds);
        self.total_samples.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed_samples.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_scrape(&self, duration_seconds: f64) {
        self.scrape_duration_seconds.add_sample(duration_seconds);
    }

    pub fn record_http_request(&self) {
        self.http_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples.load(Ordering::Relaxed)
    }

    pub fn render_table(&self) -> String {
        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "metric",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();
        writeln!(out, "{}", "-".repeat(left_col + 3 + (col_w + 3) * 4)).ok();

        let rows = [
            ("tracked processes", &self.scanned_processes, 0usize),
            ("sample duration (s)", &self.sample_duration_seconds, 3),
            ("scrape duration (s)", &self.scrape_duration_seconds, 3),
        ];
        for (label, stat, precision) in rows {
            let (cur, avg, max, min, _count) = stat.snapshot();
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                label,
                format!("{:.*}", precision, cur),
                format!("{:.*}", precision.max(1), avg),
                format!("{:.*}", precision, max),
                format!("{:.*}", precision, min),
                left = left_col,
                col = col_w
            )
            .ok();
        }

        writeln!(out).ok();
        writeln!(out, "number of samples: {}", self.total_samples()).ok();
        writeln!(
            out,
            "failed samples: {}",
            self.failed_samples.load(Ordering::Relaxed)
        )
        .ok();
        writeln!(
            out,
            "http requests: {}",
            self.http_requests.load(Ordering::Relaxed)
        )
        .ok();
        writeln!(
            out,
            "exporter uptime (s): {}",
            self.started.elapsed().as_secs()
        )
        .ok();

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stat() {
        let stat = Stat::default();
        assert_eq!(stat.snapshot(), (0.0, 0.0, 0.0, 0.0, 0));
        stat.add_sample(2.0);
        stat.add_sample(6.0);
        stat.add_sample(4.0);
        assert_eq!(stat.snapshot(), (4.0, 4.0, 6.0, 2.0, 3));
    }

    #[test]
    fn test_render_table_counts() {
        let stats = HealthStats::new();
        stats.record_sample(120, 0.02, true);
        stats.record_sample(118, 0.03, false);
        stats.record_http_request();
        let table = stats.render_table();
        assert!(table.contains("tracked processes"));
        assert!(table.contains("number of samples: 2"));
        assert!(table.contains("failed samples: 1"));
        assert!(table.contains("http requests: 1"));
    }
}
