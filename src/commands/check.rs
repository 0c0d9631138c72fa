//! `check` subcommand: verifies every counter source can be read.

use herakles_sysperf_exporter::{SystemSource, UsageInfo};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::config::{validate_effective_config, Config};
use crate::sampler::build_source;

fn report<T, E: Display>(label: &str, result: Result<T, E>, ok: impl FnOnce(T) -> String) -> bool {
    match result {
        Ok(v) => {
            println!("   ✅ {}: {}", label, ok(v));
            true
        }
        Err(e) => {
            println!("   ❌ {}: {}", label, e);
            false
        }
    }
}

/// Runs the requested checks. Returns whether all of them passed.
pub fn command_check(
    proc: bool,
    disk: bool,
    all: bool,
    config: &Config,
    test_data_file: Option<&Path>,
) -> anyhow::Result<bool> {
    println!("🔍 Herakles Sysperf Exporter - System Check");
    println!("===========================================");

    let mut all_ok = true;
    let source = build_source(config, test_data_file)?;

    if proc || all {
        println!("\n📁 Checking counter sources...");
        if test_data_file.is_none() {
            let root = config
                .proc_root
                .clone()
                .unwrap_or_else(|| PathBuf::from("/proc"));
            if root.join("stat").exists() {
                println!("   ✅ {} accessible", root.display());
            } else {
                println!("   ❌ {} has no stat file", root.display());
                all_ok = false;
            }
        }

        all_ok &= report("aggregate CPU times", source.read_aggregate_cpu_times(), |c| {
            format!("{:.0}s total", c.total())
        });
        all_ok &= report("memory", source.read_memory_snapshot(), |m| {
            let info = UsageInfo::from_snapshot(&m);
            format!("{:.1}% of {:.2} GB used", info.percentage, info.total_gb)
        });
        all_ok &= report("network counters", source.read_network_counters(), |n| {
            format!("{} bytes sent, {} bytes received", n.bytes_sent, n.bytes_recv)
        });
        all_ok &= report("boot time", source.read_boot_time(), |b| format!("{:.0}", b));
        all_ok &= report(
            "process table",
            source.enumerate_processes().map(|it| {
                let (mut readable, mut unreadable) = (0usize, 0usize);
                for entry in it {
                    match entry {
                        Ok(_) => readable += 1,
                        Err(_) => unreadable += 1,
                    }
                }
                (readable, unreadable)
            }),
            |(r, u)| format!("{} readable, {} not readable", r, u),
        );
    }

    if disk || all {
        let path = config.disk_path();
        println!("\n💾 Checking disk path {}...", path.display());
        all_ok &= report("filesystem usage", source.read_disk_snapshot(&path), |d| {
            let info = UsageInfo::from_snapshot(&d);
            format!("{:.1}% of {:.2} GB used", info.percentage, info.total_gb)
        });
    }

    println!("\n⚙️  Checking configuration...");
    all_ok &= report("configuration", validate_effective_config(config), |_| {
        "valid".to_string()
    });

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
    } else {
        println!("   ❌ Some checks failed - please review warnings");
    }
    Ok(all_ok)
}
