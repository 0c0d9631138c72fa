//! Linux counter source backed by the /proc filesystem.
//!
//! Reads aggregate CPU times and boot time from `/proc/stat`, memory from
//! `/proc/meminfo`, network counters from `/proc/net/dev`, per-process data
//! from `/proc/<pid>/{stat,status,comm}` and filesystem usage via
//! `statvfs(3)`. The proc root and passwd file are configurable so the
//! parsers can run against a fixture tree.

use ahash::AHashMap as HashMap;
use once_cell::sync::{Lazy, OnceCell};
use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{ProcessError, Result, SampleError};
use crate::sample::{AggregateCpuSample, NetworkIoSample, ProcessSample, UsageSnapshot};
use crate::source::{ProcessIter, SystemSource};

/// Default location of the proc filesystem.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Default user database for UID lookups.
pub const DEFAULT_PASSWD_PATH: &str = "/etc/passwd";

/// Clock ticks per second as reported by the kernel, 100 if unavailable.
static CLOCK_TICKS: Lazy<f64> = Lazy::new(|| {
    // SAFETY: sysconf has no preconditions.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as f64
    } else {
        100.0
    }
});

/// Counter source reading a Linux /proc tree.
pub struct ProcFsSource {
    root: PathBuf,
    passwd_path: PathBuf,
    max_processes: Option<usize>,
    clock_ticks: f64,
    users: OnceCell<HashMap<u32, String>>,
}

impl Default for ProcFsSource {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcFsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            passwd_path: PathBuf::from(DEFAULT_PASSWD_PATH),
            max_processes: None,
            clock_ticks: *CLOCK_TICKS,
            users: OnceCell::new(),
        }
    }

    pub fn with_passwd_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.passwd_path = path.into();
        self
    }

    /// Stop enumerating after `max` processes.
    pub fn with_max_processes(mut self, max: Option<usize>) -> Self {
        self.max_processes = max;
        self
    }

    pub fn with_clock_ticks(mut self, ticks: f64) -> Self {
        if ticks > 0.0 {
            self.clock_ticks = ticks;
        }
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, relative: &str) -> Result<String> {
        let path = self.root.join(relative);
        fs::read_to_string(&path).map_err(|source| SampleError::Io { path, source })
    }

    fn user_name(&self, uid: u32) -> String {
        let users = self.users.get_or_init(|| match fs::read_to_string(&self.passwd_path) {
            Ok(content) => parse_passwd(&content),
            Err(e) => {
                warn!(
                    "Failed to read {}: {}, falling back to numeric UIDs",
                    self.passwd_path.display(),
                    e
                );
                HashMap::new()
            }
        });
        users
            .get(&uid)
            .cloned()
            .unwrap_or_else(|| uid.to_string())
    }

    fn read_process(
        &self,
        pid: u32,
        proc_path: &Path,
        mem_total_kb: u64,
    ) -> std::result::Result<ProcessSample, ProcessError> {
        let stat = fs::read_to_string(proc_path.join("stat"))
            .map_err(|e| ProcessError::from_io(pid, &e))?;
        let fields = parse_pid_stat(&stat).ok_or_else(|| ProcessError::Unreadable {
            pid,
            reason: "invalid stat format".to_string(),
        })?;

        let status = fs::read_to_string(proc_path.join("status"))
            .map_err(|e| ProcessError::from_io(pid, &e))?;
        let status = parse_pid_status(&status);

        let name = read_process_name(proc_path).unwrap_or(fields.comm);
        let user = status
            .uid
            .map(|uid| self.user_name(uid))
            .unwrap_or_default();

        let memory_percent = if mem_total_kb > 0 {
            status.vm_rss_kb as f64 / mem_total_kb as f64 * 100.0
        } else {
            0.0
        };

        Ok(ProcessSample {
            pid,
            name,
            user,
            cpu_time_user: fields.utime as f64 / self.clock_ticks,
            cpu_time_system: fields.stime as f64 / self.clock_ticks,
            memory_percent,
            thread_count: status.threads.unwrap_or(fields.num_threads),
            start_time: Some(fields.start_time),
        })
    }
}

impl SystemSource for ProcFsSource {
    fn read_aggregate_cpu_times(&self) -> Result<AggregateCpuSample> {
        let content = self.read("stat")?;
        parse_aggregate_cpu(&content, self.clock_ticks)
    }

    fn read_memory_snapshot(&self) -> Result<UsageSnapshot> {
        let content = self.read("meminfo")?;
        parse_meminfo(&content)
    }

    fn read_disk_snapshot(&self, path: &Path) -> Result<UsageSnapshot> {
        statvfs_usage(path)
    }

    fn read_network_counters(&self) -> Result<NetworkIoSample> {
        let content = self.read("net/dev")?;
        Ok(parse_net_dev(&content))
    }

    fn read_boot_time(&self) -> Result<f64> {
        let content = self.read("stat")?;
        parse_boot_time(&content)
    }

    fn enumerate_processes(&self) -> Result<ProcessIter<'_>> {
        // Memory percent needs the machine total; a missing meminfo only
        // degrades that column.
        let mem_total_kb = match self.read("meminfo").and_then(|c| parse_meminfo(&c)) {
            Ok(snapshot) => snapshot.total_bytes / 1024,
            Err(e) => {
                debug!("Memory total unavailable for process scan: {}", e);
                0
            }
        };

        let entries = fs::read_dir(&self.root).map_err(|source| SampleError::Io {
            path: self.root.clone(),
            source,
        })?;

        let pids = entries.flatten().filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            if !name.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let pid: u32 = name.parse().ok()?;
            Some((pid, entry.path()))
        });

        let limit = self.max_processes.unwrap_or(usize::MAX);
        Ok(Box::new(pids.take(limit).map(move |(pid, path)| {
            self.read_process(pid, &path, mem_total_kb)
        })))
    }
}

/// Parses the aggregate `cpu` line of /proc/stat into seconds.
///
/// Trailing fields missing on older kernels (steal, irq, ...) count as zero.
pub fn parse_aggregate_cpu(content: &str, clock_ticks: f64) -> Result<AggregateCpuSample> {
    let line = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| SampleError::Source("No aggregate cpu line in /proc/stat".to_string()))?;

    let values = line
        .split_whitespace()
        .skip(1)
        .map(str::parse::<u64>)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| SampleError::Source(format!("Invalid cpu line in /proc/stat: {}", e)))?;
    if values.len() < 4 {
        return Err(SampleError::Source(format!(
            "Invalid cpu line in /proc/stat: expected at least 4 fields, got {}",
            values.len()
        )));
    }

    let field = |i: usize| values.get(i).copied().unwrap_or(0) as f64 / clock_ticks;
    Ok(AggregateCpuSample {
        user: field(0),
        nice: field(1),
        system: field(2),
        idle: field(3),
        iowait: field(4),
        irq: field(5),
        softirq: field(6),
        steal: field(7),
    })
}

/// Reads the `btime` line of /proc/stat.
pub fn parse_boot_time(content: &str) -> Result<f64> {
    content
        .lines()
        .find_map(|l| l.strip_prefix("btime"))
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs as f64)
        .ok_or_else(|| SampleError::Source("No btime line in /proc/stat".to_string()))
}

/// Parses /proc/meminfo.
///
/// used = total - free - buffers - cached - sreclaimable, falling back to
/// total - free when that underflows; percent = (total - available) / total.
pub fn parse_meminfo(content: &str) -> Result<UsageSnapshot> {
    let mut values: HashMap<&str, u64> = HashMap::new();
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            if let Ok(kb) = value.parse::<u64>() {
                values.insert(key.trim_end_matches(':'), kb * 1024);
            }
        }
    }

    let total = *values
        .get("MemTotal")
        .ok_or_else(|| SampleError::Source("Failed to parse MemTotal from /proc/meminfo".to_string()))?;
    let free = values.get("MemFree").copied().unwrap_or(0);
    let buffers = values.get("Buffers").copied().unwrap_or(0);
    let cached = values.get("Cached").copied().unwrap_or(0)
        + values.get("SReclaimable").copied().unwrap_or(0);
    let available = values
        .get("MemAvailable")
        .copied()
        .unwrap_or(free + buffers + cached);

    let used = total
        .checked_sub(free + buffers + cached)
        .unwrap_or_else(|| total.saturating_sub(free));

    let percent = if total > 0 {
        Some(total.saturating_sub(available) as f64 / total as f64 * 100.0)
    } else {
        None
    };

    Ok(UsageSnapshot {
        used_bytes: used,
        total_bytes: total,
        percent,
    })
}

/// Sums receive and transmit byte counters of every interface in /proc/net/dev.
pub fn parse_net_dev(content: &str) -> NetworkIoSample {
    let mut sample = NetworkIoSample::default();
    for line in content.lines().skip(2) {
        let Some((_iface, stats)) = line.split_once(':') else {
            continue;
        };
        // Columns 0..=8 run from rx bytes to tx bytes; a bad token drops the line.
        let fields = stats
            .split_whitespace()
            .take(9)
            .map(str::parse::<u64>)
            .collect::<std::result::Result<Vec<_>, _>>();
        let Ok(fields) = fields else {
            continue;
        };
        if fields.len() < 9 {
            continue;
        }
        sample.bytes_recv = sample.bytes_recv.wrapping_add(fields[0]);
        sample.bytes_sent = sample.bytes_sent.wrapping_add(fields[8]);
    }
    sample
}

/// Fields of interest from /proc/<pid>/stat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidStat {
    pub comm: String,
    pub utime: u64,
    pub stime: u64,
    pub num_threads: u32,
    pub start_time: u64,
}

/// Parses /proc/<pid>/stat. The command name may contain spaces and
/// parentheses, so fields are counted from the last `)`.
pub fn parse_pid_stat(content: &str) -> Option<PidStat> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    if close < open {
        return None;
    }
    let comm = content[open + 1..close].to_string();
    // rest starts at field 3 (state)
    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
    if rest.len() < 20 {
        return None;
    }
    Some(PidStat {
        comm,
        utime: rest[11].parse().ok()?,
        stime: rest[12].parse().ok()?,
        num_threads: rest[17].parse().unwrap_or(0),
        start_time: rest[19].parse().unwrap_or(0),
    })
}

/// Fields of interest from /proc/<pid>/status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PidStatus {
    pub uid: Option<u32>,
    pub threads: Option<u32>,
    pub vm_rss_kb: u64,
}

pub fn parse_pid_status(content: &str) -> PidStatus {
    let mut status = PidStatus::default();
    for line in content.lines() {
        if let Some(v) = line.strip_prefix("Uid:") {
            // real, effective, saved, filesystem
            status.uid = v.split_whitespace().next().and_then(|s| s.parse().ok());
        } else if let Some(v) = line.strip_prefix("Threads:") {
            status.threads = v.trim().parse().ok();
        } else if let Some(v) = line.strip_prefix("VmRSS:") {
            status.vm_rss_kb = v
                .split_whitespace()
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
        }
    }
    status
}

/// Builds a UID to user name map from passwd(5) content.
pub fn parse_passwd(content: &str) -> HashMap<u32, String> {
    content
        .lines()
        .filter(|l| !l.starts_with('#'))
        .filter_map(|line| {
            let mut parts = line.split(':');
            let name = parts.next()?;
            let _password = parts.next()?;
            let uid = parts.next()?.parse::<u32>().ok()?;
            Some((uid, name.to_string()))
        })
        .collect()
}

/// Reads process name from comm file or extracts from cmdline
fn read_process_name(proc_path: &Path) -> Option<String> {
    let comm = proc_path.join("comm");
    if let Ok(s) = fs::read_to_string(&comm) {
        let t = s.trim();
        if !t.is_empty() {
            return Some(t.into());
        }
    }

    let cmd = proc_path.join("cmdline");
    if let Ok(content) = fs::read(&cmd) {
        let first = content.split(|&b| b == 0u8).next()?;
        let first = std::str::from_utf8(first).ok()?;
        if let Some(name) = Path::new(first).file_name() {
            return name.to_str().map(|s| s.to_string());
        }
    }
    None
}

/// Filesystem usage for the mount containing `path`.
///
/// Every failure is reported as [`SampleError::InvalidPath`]: statvfs only
/// fails for paths that are missing, unreachable or not permitted.
fn statvfs_usage(path: &Path) -> Result<UsageSnapshot> {
    let invalid = |source: io::Error| SampleError::InvalidPath {
        path: path.to_path_buf(),
        source,
    };

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| invalid(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

    // SAFETY: c_path is a valid NUL-terminated string and stat is a plain
    // C struct fully written by statvfs on success.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if ret != 0 {
        return Err(invalid(io::Error::last_os_error()));
    }

    let block_size = stat.f_frsize as u64;
    let total = stat.f_blocks as u64 * block_size;
    let free = stat.f_bfree as u64 * block_size;
    let avail = stat.f_bavail as u64 * block_size;
    Ok(disk_usage_from_blocks(total, free, avail))
}

/// used = total - free; percent is relative to the space unprivileged users
/// can reach (used + avail).
pub fn disk_usage_from_blocks(total: u64, free: u64, avail: u64) -> UsageSnapshot {
    let used = total.saturating_sub(free);
    let user_total = used + avail;
    let percent = if user_total > 0 {
        Some(used as f64 / user_total as f64 * 100.0)
    } else {
        None
    };
    UsageSnapshot {
        used_bytes: used,
        total_bytes: total,
        percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STAT: &str = "cpu  1000 20 300 8000 50 5 5 10 0 0\n\
cpu0 500 10 150 4000 25 2 3 5 0 0\n\
intr 12345\n\
ctxt 67890\n\
btime 1700000000\n\
processes 4242\n";

    const MEMINFO: &str = "MemTotal:       16000000 kB\n\
MemFree:         4000000 kB\n\
MemAvailable:    8000000 kB\n\
Buffers:         1000000 kB\n\
Cached:          2000000 kB\n\
SReclaimable:    1000000 kB\n\
SwapTotal:       4096000 kB\n";

    const NET_DEV: &str = "Inter-|   Receive                                                |  Transmit\n \
face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n    \
lo:  1000      10    0    0    0     0          0         0     1000      10    0    0    0     0       0          0\n  \
eth0: 50000     100    0    0    0     0          0         0    20000     80    0    0    0     0       0          0\n";

    fn pid_stat(pid: u32, comm: &str, utime: u64, stime: u64, start: u64) -> String {
        format!(
            "{pid} ({comm}) S 1 {pid} {pid} 0 -1 4194560 100 0 0 0 {utime} {stime} 0 0 20 0 3 0 {start} 1000000 200 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0\n"
        )
    }

    fn status(uid: u32, threads: u32, rss_kb: u64) -> String {
        format!(
            "Name:\tdummy\nUid:\t{uid}\t{uid}\t{uid}\t{uid}\nVmRSS:\t  {rss_kb} kB\nThreads:\t{threads}\n"
        )
    }

    fn fixture_root() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("stat"), STAT).unwrap();
        fs::write(root.join("meminfo"), MEMINFO).unwrap();
        fs::create_dir_all(root.join("net")).unwrap();
        fs::write(root.join("net/dev"), NET_DEV).unwrap();
        fs::write(root.join("passwd"), "root:x:0:0:root:/root:/bin/bash\n# comment\nwww:x:33:33::/var/www:/usr/sbin/nologin\n").unwrap();

        for (pid, comm, utime, stime, uid) in [(1u32, "init", 200u64, 100u64, 0u32), (77, "web server", 50, 50, 33)] {
            let p = root.join(pid.to_string());
            fs::create_dir_all(&p).unwrap();
            fs::write(p.join("stat"), pid_stat(pid, comm, utime, stime, 5000)).unwrap();
            fs::write(p.join("status"), status(uid, 3, 160000)).unwrap();
            fs::write(p.join("comm"), format!("{}\n", comm)).unwrap();
        }

        // a directory that vanished halfway: no stat file
        fs::create_dir_all(root.join("999")).unwrap();
        // non-PID entry
        fs::create_dir_all(root.join("sys")).unwrap();
        dir
    }

    fn source(dir: &TempDir) -> ProcFsSource {
        ProcFsSource::new(dir.path())
            .with_passwd_path(dir.path().join("passwd"))
            .with_clock_ticks(100.0)
    }

    #[test]
    fn test_parse_aggregate_cpu() {
        let cpu = parse_aggregate_cpu(STAT, 100.0).unwrap();
        assert_eq!(cpu.user, 10.0);
        assert_eq!(cpu.nice, 0.2);
        assert_eq!(cpu.system, 3.0);
        assert_eq!(cpu.idle, 80.0);
        assert_eq!(cpu.iowait, 0.5);
        assert_eq!(cpu.steal, 0.1);
    }

    #[test]
    fn test_parse_aggregate_cpu_short_line_defaults_missing_fields() {
        let cpu = parse_aggregate_cpu("cpu 100 0 50 850\n", 100.0).unwrap();
        assert_eq!(cpu.idle, 8.5);
        assert_eq!(cpu.iowait, 0.0);
        assert_eq!(cpu.steal, 0.0);

        assert!(parse_aggregate_cpu("cpu 1 2\n", 100.0).is_err());
        assert!(parse_aggregate_cpu("cpu0 1 2 3 4\n", 100.0).is_err());
    }

    #[test]
    fn test_parse_aggregate_cpu_rejects_malformed_fields() {
        assert!(matches!(
            parse_aggregate_cpu("cpu a b c d\n", 100.0),
            Err(SampleError::Source(_))
        ));
        assert!(parse_aggregate_cpu("cpu 1000 x 300 8000 50\n", 100.0).is_err());
    }

    #[test]
    fn test_malformed_stat_leaves_cpu_baseline_untouched() {
        use crate::engine::SamplingEngine;
        use crate::source::ManualClock;

        let dir = fixture_root();
        let mut engine = SamplingEngine::with_clock(source(&dir), ManualClock::new(100.0));
        assert_eq!(engine.cpu_utilization().unwrap(), 0.0);

        fs::write(dir.path().join("stat"), "cpu  1050 oops 300 8050 50 5 5 10 0 0\n").unwrap();
        engine.clock().advance(1.0);
        assert!(matches!(engine.cpu_utilization(), Err(SampleError::Source(_))));

        // user +100 and idle +100 ticks against the first good sample.
        fs::write(dir.path().join("stat"), "cpu  1100 20 300 8100 50 5 5 10 0 0\n").unwrap();
        engine.clock().advance(1.0);
        let pct = engine.cpu_utilization().unwrap();
        assert!((pct - 50.0).abs() < 1e-9, "cpu {}", pct);
    }

    #[test]
    fn test_parse_boot_time() {
        assert_eq!(parse_boot_time(STAT).unwrap(), 1_700_000_000.0);
        assert!(parse_boot_time("cpu 1 2 3 4\n").is_err());
    }

    #[test]
    fn test_parse_meminfo() {
        let mem = parse_meminfo(MEMINFO).unwrap();
        assert_eq!(mem.total_bytes, 16_000_000 * 1024);
        // 16M - 4M - 1M - (2M + 1M)
        assert_eq!(mem.used_bytes, 8_000_000 * 1024);
        assert!((mem.percent.unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_meminfo_missing_total() {
        assert!(parse_meminfo("MemFree: 100 kB\n").is_err());
    }

    #[test]
    fn test_parse_net_dev_sums_interfaces() {
        let net = parse_net_dev(NET_DEV);
        assert_eq!(net.bytes_recv, 51_000);
        assert_eq!(net.bytes_sent, 21_000);
    }

    #[test]
    fn test_parse_net_dev_skips_line_with_bad_column() {
        let content = format!(
            "{}  wlan0: 7000 bad 0 0 0 0 0 0 3000 9 0 0 0 0 0 0\n",
            NET_DEV
        );
        let net = parse_net_dev(&content);
        assert_eq!(net.bytes_recv, 51_000);
        assert_eq!(net.bytes_sent, 21_000);
    }

    #[test]
    fn test_parse_pid_stat_with_odd_comm() {
        let content = pid_stat(12, "tricky ) name", 300, 200, 777);
        let stat = parse_pid_stat(&content).unwrap();
        assert_eq!(stat.comm, "tricky ) name");
        assert_eq!(stat.utime, 300);
        assert_eq!(stat.stime, 200);
        assert_eq!(stat.num_threads, 3);
        assert_eq!(stat.start_time, 777);

        assert!(parse_pid_stat("12 (short) S 1 2").is_none());
    }

    #[test]
    fn test_parse_pid_status() {
        let st = parse_pid_status(&status(1000, 8, 2048));
        assert_eq!(st.uid, Some(1000));
        assert_eq!(st.threads, Some(8));
        assert_eq!(st.vm_rss_kb, 2048);

        // kernel threads have no VmRSS
        let st = parse_pid_status("Uid:\t0\t0\t0\t0\nThreads:\t1\n");
        assert_eq!(st.vm_rss_kb, 0);
    }

    #[test]
    fn test_parse_passwd() {
        let users = parse_passwd("root:x:0:0::/root:/bin/sh\nbad line\n#x:x:5:5\nbob:x:1000:1000::/home/bob:/bin/sh\n");
        assert_eq!(users.get(&0).map(String::as_str), Some("root"));
        assert_eq!(users.get(&1000).map(String::as_str), Some("bob"));
        assert_eq!(users.len(), 2);
    }

    #[test]
    fn test_disk_usage_from_blocks() {
        let usage = disk_usage_from_blocks(1000, 400, 300);
        assert_eq!(usage.used_bytes, 600);
        assert!((usage.percent.unwrap() - 66.666_666).abs() < 1e-3);
        assert_eq!(disk_usage_from_blocks(0, 0, 0).percent, None);
    }

    #[test]
    fn test_source_reads_fixture_tree() {
        let dir = fixture_root();
        let src = source(&dir);

        assert_eq!(src.read_aggregate_cpu_times().unwrap().user, 10.0);
        assert_eq!(src.read_boot_time().unwrap(), 1_700_000_000.0);
        assert_eq!(src.read_network_counters().unwrap().bytes_sent, 21_000);
        assert_eq!(src.read_memory_snapshot().unwrap().total_bytes, 16_000_000 * 1024);
    }

    #[test]
    fn test_enumerate_processes_skips_and_reports_failures() {
        let dir = fixture_root();
        let src = source(&dir);

        let mut ok: Vec<ProcessSample> = Vec::new();
        let mut failed: Vec<ProcessError> = Vec::new();
        for entry in src.enumerate_processes().unwrap() {
            match entry {
                Ok(p) => ok.push(p),
                Err(e) => failed.push(e),
            }
        }
        ok.sort_by_key(|p| p.pid);

        assert_eq!(ok.len(), 2);
        assert_eq!(failed, vec![ProcessError::NoSuchProcess(999)]);

        let init = &ok[0];
        assert_eq!(init.name, "init");
        assert_eq!(init.user, "root");
        assert_eq!(init.cpu_time_user, 2.0);
        assert_eq!(init.cpu_time_system, 1.0);
        assert_eq!(init.cpu_time(), 3.0);
        assert_eq!(init.thread_count, 3);
        assert_eq!(init.start_time, Some(5000));
        assert!((init.memory_percent - 1.0).abs() < 1e-9);

        let web = &ok[1];
        assert_eq!(web.pid, 77);
        assert_eq!(web.name, "web server");
        assert_eq!(web.user, "www");
    }

    #[test]
    fn test_enumerate_processes_respects_max() {
        let dir = fixture_root();
        let src = source(&dir).with_max_processes(Some(1));
        assert_eq!(src.enumerate_processes().unwrap().count(), 1);
    }

    #[test]
    fn test_unknown_uid_falls_back_to_number() {
        let dir = fixture_root();
        let src = source(&dir).with_passwd_path(dir.path().join("missing-passwd"));
        let users: Vec<String> = src
            .enumerate_processes()
            .unwrap()
            .flatten()
            .map(|p| p.user)
            .collect();
        assert!(users.contains(&"0".to_string()));
        assert!(users.contains(&"33".to_string()));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let src = ProcFsSource::new("/definitely/not/a/proc/root");
        assert!(matches!(src.read_aggregate_cpu_times(), Err(SampleError::Io { .. })));
        assert!(src.enumerate_processes().is_err());
    }

    #[test]
    fn test_statvfs_invalid_path() {
        let src = ProcFsSource::default();
        assert!(matches!(
            src.read_disk_snapshot(Path::new("/definitely/not/a/mount/point")),
            Err(SampleError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_statvfs_existing_path() {
        let dir = TempDir::new().unwrap();
        let usage = ProcFsSource::default().read_disk_snapshot(dir.path()).unwrap();
        assert!(usage.total_bytes > 0);
        let pct = usage.percent.unwrap_or(0.0);
        assert!((0.0..=100.0).contains(&pct));
    }
}
