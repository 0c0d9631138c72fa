//! herakles-sysperf-exporter
//!
//! Prometheus exporter that samples kernel counters on a fixed interval and
//! derives CPU utilization, network throughput and per-process CPU usage
//! from consecutive snapshots, alongside memory, disk and uptime gauges.

use anyhow::{bail, Context};
use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use clap::{Parser, ValueEnum};
use herakles_sysperf_exporter::SamplingEngine;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, Level};

mod build_info;
mod cache;
mod cli;
mod commands;
mod config;
mod handlers;
mod health_stats;
mod metrics;
mod sampler;
mod state;

use build_info::{BUILD_TIMESTAMP, GIT_SHA, VERSION};
use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_config, command_generate_testdata, command_test};
use config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR,
    DEFAULT_PORT,
};
use handlers::{doc_handler, health_handler, metrics_handler, report_handler};
use sampler::{build_source, update_cache};
use state::{AppState, SharedState};

/// Grace period for open connections after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// CLI flag first, then the config file, then `info`.
fn resolve_log_level(args: &Args, config: &Config) -> LogLevel {
    if let Some(level) = &args.log_level {
        return level.clone();
    }
    config
        .log_level
        .as_deref()
        .and_then(|s| LogLevel::from_str(s, true).ok())
        .unwrap_or(LogLevel::Info)
}

/// Initializes tracing logging subsystem with configured log level
fn setup_logging(level: &LogLevel) {
    let max_level = match level {
        LogLevel::Off => Level::ERROR, // Off not fully supported, use ERROR as minimal
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    debug!("Logging initialized with level: {:?}", level);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {:#}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, &args.config_format);
    }

    let config = resolve_config(&args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {:#}", e);
        std::process::exit(1);
    }

    setup_logging(&resolve_log_level(&args, &config));

    let test_data_file = args.test_data_file.as_deref();

    if let Some(command) = &args.command {
        return match command {
            Commands::Check { proc, disk, all } => {
                if !command_check(*proc, *disk, *all, &config, test_data_file)? {
                    std::process::exit(1);
                }
                Ok(())
            }
            Commands::Config {
                output,
                format,
                commented,
            } => command_config(output.clone(), format.clone(), *commented),
            Commands::Test {
                iterations,
                interval,
                verbose,
                format,
            } => command_test(
                *iterations,
                *interval,
                *verbose,
                format.clone(),
                &config,
                test_data_file,
            ),
            Commands::GenerateTestdata {
                output,
                frames,
                processes,
                interval,
            } => command_generate_testdata(output.clone(), *frames, *processes, *interval),
        };
    }

    run_exporter(config, test_data_file).await
}

async fn run_exporter(config: Config, test_data_file: Option<&Path>) -> anyhow::Result<()> {
    info!(
        "Starting herakles-sysperf-exporter {} (git {}, built {})",
        VERSION, GIT_SHA, BUILD_TIMESTAMP
    );

    let bind_ip: IpAddr = config
        .bind
        .as_deref()
        .unwrap_or(DEFAULT_BIND_ADDR)
        .parse()
        .context("Invalid bind address")?;
    let addr = SocketAddr::new(bind_ip, config.port.unwrap_or(DEFAULT_PORT));
    let period = Duration::from_secs(config.sample_interval_secs());

    let engine = SamplingEngine::new(build_source(&config, test_data_file)?);
    let state: SharedState = Arc::new(AppState::new(config.clone(), engine)?);
    debug!("All metrics registered successfully");

    // The first pass records baselines; rates appear from the next one on.
    info!("Taking bootstrap sample");
    if let Err(e) = update_cache(&state).await {
        error!("Bootstrap sample failed: {:#}", e);
    }

    let bg_state = state.clone();
    let background_task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately and the bootstrap sample covered it.
        ticker.tick().await;
        debug!("Sampler started with {}s interval", period.as_secs());

        loop {
            ticker.tick().await;
            if let Err(e) = update_cache(&bg_state).await {
                error!("Scheduled sample failed: {:#}", e);
            }
        }
    });

    let mut app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/report", get(report_handler))
        .route("/doc", get(doc_handler));
    if config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    }
    let app = app.with_state(state);

    let served = if config.enable_tls.unwrap_or(false) {
        serve_tls(app, addr, &config).await
    } else {
        serve_plain(app, addr).await
    };

    background_task.abort();
    let _ = background_task.await;

    served?;
    info!("herakles-sysperf-exporter stopped gracefully");
    Ok(())
}

async fn serve_plain(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("herakles-sysperf-exporter listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn serve_tls(app: Router, addr: SocketAddr, config: &Config) -> anyhow::Result<()> {
    let (Some(cert), Some(key)) = (&config.tls_cert_path, &config.tls_key_path) else {
        bail!("enable_tls is set, but tls_cert_path and tls_key_path are not both defined");
    };
    let tls = RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| format!("Failed to load TLS files {} / {}", cert.display(), key.display()))?;

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    info!("herakles-sysperf-exporter listening on https://{}", addr);
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}
