//! CLI command implementations for herakles-sysperf-exporter.
//!
//! - `check`: System validation
//! - `config`: Configuration file generation
//! - `test`: Sample a few times and print the derived values
//! - `generate`: Test data generation

pub mod check;
pub mod config;
pub mod generate;
pub mod test;

pub use check::command_check;
pub use config::command_config;
pub use generate::command_generate_testdata;
pub use test::command_test;
