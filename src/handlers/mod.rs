//! HTTP endpoint handlers for the exporter.
//!
//! - `/metrics`: Prometheus metrics endpoint
//! - `/health`: Health check endpoint
//! - `/report`: Latest sample as JSON
//! - `/doc`: Documentation endpoint

pub mod doc;
pub mod health;
pub mod metrics;
pub mod report;

pub use doc::doc_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use report::report_handler;
