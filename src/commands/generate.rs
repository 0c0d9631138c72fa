//! Generate testdata command implementation.
//!
//! Produces a replayable counter file for `--test-data-file`: every counter
//! grows monotonically between frames and a few processes exit or start
//! along the way.

use anyhow::bail;
use chrono::Utc;
use herakles_sysperf_exporter::{
    AggregateCpuSample, NetworkIoSample, ProcessSample, TestData, TestFrame, UsageSnapshot,
};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const GIB: u64 = 1 << 30;

/// One day between frames keeps every counter increment well inside u64.
const MAX_INTERVAL_SECS: f64 = 86_400.0;

const PROCESS_NAMES: [(&str, &str); 14] = [
    ("nginx", "www-data"),
    ("postgres", "postgres"),
    ("redis-server", "redis"),
    ("java", "app"),
    ("python3", "app"),
    ("node", "app"),
    ("sshd", "root"),
    ("systemd-journald", "root"),
    ("dockerd", "root"),
    ("containerd", "root"),
    ("chronyd", "chrony"),
    ("rsyslogd", "syslog"),
    ("prometheus", "prometheus"),
    ("haproxy", "haproxy"),
];

/// Generates synthetic test data JSON file for testing purposes.
pub fn command_generate_testdata(
    output: PathBuf,
    frames: usize,
    processes: usize,
    interval: f64,
) -> anyhow::Result<()> {
    debug!(
        "Generating test data: frames={}, processes={}, interval={}s, output={}",
        frames,
        processes,
        interval,
        output.display()
    );

    let test_data = generate_test_data(&mut rand::thread_rng(), frames, processes, interval)?;

    let json_content = serde_json::to_string_pretty(&test_data)?;
    fs::write(&output, &json_content)?;

    println!(
        "✅ Generated test data: {} frames, {} processes in {}",
        test_data.frames.len(),
        processes,
        output.display()
    );

    Ok(())
}

fn spawn_process(rng: &mut impl Rng, pid: u32, start_time: u64) -> ProcessSample {
    let (name, user) = PROCESS_NAMES
        .choose(rng)
        .copied()
        .unwrap_or(("worker", "root"));
    ProcessSample {
        pid,
        name: name.to_string(),
        user: user.to_string(),
        cpu_time_user: rng.gen_range(0.0..500.0),
        cpu_time_system: rng.gen_range(0.0..100.0),
        memory_percent: rng.gen_range(0.1..8.0),
        thread_count: rng.gen_range(1..64),
        start_time: Some(start_time),
    }
}

/// Builds `frames` frames `interval` seconds apart.
pub fn generate_test_data(
    rng: &mut impl Rng,
    frames: usize,
    processes: usize,
    interval: f64,
) -> anyhow::Result<TestData> {
    if frames == 0 {
        bail!("at least one frame is required");
    }
    if !(interval > 0.0 && interval <= MAX_INTERVAL_SECS) {
        bail!(
            "interval must be in (0, {}] seconds, got {}",
            MAX_INTERVAL_SECS,
            interval
        );
    }

    let cores = rng.gen_range(2u32..=16) as f64;
    let uptime = rng.gen_range(3_600.0..30.0 * 86_400.0);
    let boot_time = (Utc::now().timestamp() as f64 - uptime).floor();
    let mem_total = 16 * GIB;
    let disk_total = 500 * GIB;
    let mut disk_used = rng.gen_range(50 * GIB..400 * GIB);

    let mut cpu = AggregateCpuSample {
        user: uptime * cores * 0.2,
        system: uptime * cores * 0.05,
        idle: uptime * cores * 0.75,
        ..Default::default()
    };
    let mut network = NetworkIoSample {
        bytes_sent: rng.gen_range(0..GIB),
        bytes_recv: rng.gen_range(0..GIB),
    };

    // Kernel threads and init sit below 1000.
    let mut next_pid: u32 = 1000;
    let mut ticks: u64 = 100;
    let mut live: Vec<ProcessSample> = (0..processes)
        .map(|_| {
            next_pid += 1;
            spawn_process(rng, next_pid, ticks)
        })
        .collect();

    let mut out = Vec::with_capacity(frames);
    for index in 0..frames {
        if index > 0 {
            let capacity = cores * interval;
            let busy: f64 = rng.gen_range(0.05..0.9);
            cpu.user += capacity * busy * 0.7;
            cpu.system += capacity * busy * 0.25;
            cpu.softirq += capacity * busy * 0.05;
            cpu.idle += capacity * (1.0 - busy);

            network.bytes_sent += rng.gen_range(0..=(5_000_000.0 * interval) as u64);
            network.bytes_recv += rng.gen_range(0..=(5_000_000.0 * interval) as u64);
            disk_used = (disk_used + rng.gen_range(0..GIB / 10)).min(disk_total);
            ticks += (interval * 100.0) as u64;

            for p in &mut live {
                p.cpu_time_user += rng.gen_range(0.0..interval);
                p.cpu_time_system += rng.gen_range(0.0..interval * 0.3);
            }

            // Occasionally one process exits and another starts.
            if !live.is_empty() && rng.gen_bool(0.3) {
                let gone = rng.gen_range(0..live.len());
                live.swap_remove(gone);
                next_pid += 1;
                live.push(spawn_process(rng, next_pid, ticks));
            }
        }

        let mut disks = BTreeMap::new();
        disks.insert(
            "/".to_string(),
            UsageSnapshot {
                used_bytes: disk_used,
                total_bytes: disk_total,
                percent: None,
            },
        );

        out.push(TestFrame {
            cpu,
            memory: UsageSnapshot {
                used_bytes: (mem_total as f64 * rng.gen_range(0.3..0.8)) as u64,
                total_bytes: mem_total,
                percent: None,
            },
            disks,
            network,
            boot_time,
            processes: live.clone(),
            denied_pids: vec![1],
        });
    }

    Ok(TestData {
        version: "1.0".to_string(),
        generated_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        interval_secs: interval,
        frames: out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use herakles_sysperf_exporter::FixtureSource;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_counters_are_monotone() {
        let mut rng = StdRng::seed_from_u64(7);
        let data = generate_test_data(&mut rng, 6, 8, 3.0).unwrap();
        assert_eq!(data.frames.len(), 6);

        for pair in data.frames.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(b.cpu.total() > a.cpu.total());
            assert!(b.network.bytes_sent >= a.network.bytes_sent);
            assert!(b.network.bytes_recv >= a.network.bytes_recv);
            assert_eq!(b.processes.len(), 8);
            for p in &b.processes {
                if let Some(prev) = a.processes.iter().find(|q| q.pid == p.pid) {
                    assert!(p.cpu_time() >= prev.cpu_time());
                }
            }
        }
        assert!(FixtureSource::new(data).is_ok());
    }

    #[test]
    fn test_rejects_empty_requests() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_test_data(&mut rng, 0, 4, 3.0).is_err());
        assert!(generate_test_data(&mut rng, 2, 4, 0.0).is_err());
        assert!(generate_test_data(&mut rng, 2, 4, f64::INFINITY).is_err());
        assert!(generate_test_data(&mut rng, 2, 4, f64::NAN).is_err());
        assert!(generate_test_data(&mut rng, 2, 4, 1e12).is_err());
    }

    #[test]
    fn test_writes_loadable_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("testdata.json");
        command_generate_testdata(path.clone(), 3, 4, 1.0).unwrap();
        assert!(FixtureSource::from_file(&path).is_ok());
    }
}
