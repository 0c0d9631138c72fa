//! herakles-sysperf-exporter library.
//!
//! The [`engine::SamplingEngine`] turns cumulative OS counters into rates and
//! percentages: CPU utilization, network throughput and per-process CPU
//! usage, plus stateless memory, disk and uptime readings. Counters come
//! from a [`source::SystemSource`]; [`procfs::ProcFsSource`] reads a Linux
//! /proc tree and [`fixture::FixtureSource`] replays recorded frames.

pub mod engine;
pub mod error;
pub mod fixture;
pub mod procfs;
pub mod sample;
pub mod source;

pub use engine::{SamplingEngine, DEFAULT_DISK_PATH, DEFAULT_TOP_N};
pub use error::{ProcessError, Result, SampleError};
pub use fixture::{FixtureSource, TestData, TestFrame};
pub use procfs::ProcFsSource;
pub use sample::{
    AggregateCpuSample, NetworkIoSample, NetworkRates, ProcessCpuRow, ProcessSample, UsageInfo,
    UsageSnapshot, Uptime,
};
pub use source::{Clock, ManualClock, MemorySource, SystemClock, SystemSource};
