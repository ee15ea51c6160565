//! # planning-poker
//!
//! Planning poker server binary. Wires the in-memory store, the planning
//! service and the realtime hub together and serves them over HTTP.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use poker_server::ServerConfig;
use poker_service::PlanningService;
use poker_store::InMemoryPlanningRepository;
use poker_telemetry::{LogFormat, TelemetryConfig};
use tracing::{Level, info, warn};

/// Planning poker server.
#[derive(Parser, Debug)]
#[command(name = "planning-poker", about = "Planning poker session server")]
struct Cli {
    /// Host to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Directory holding the client application.
    #[arg(long, env = "STATIC_DIR", default_value = "./frontend")]
    static_dir: PathBuf,

    /// Seconds between active-session reports.
    #[arg(long, env = "REPORT_INTERVAL_SECS", default_value = "10")]
    report_interval_secs: u64,

    /// Default log level (`RUST_LOG` takes precedence).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: Level,

    /// Log output format: `json` or `pretty`.
    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    log_format: LogFormat,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            static_dir: self.static_dir.clone(),
            report_interval_secs: self.report_interval_secs,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    poker_telemetry::init_telemetry(&TelemetryConfig {
        log_level: cli.log_level,
        format: cli.log_format,
        ..TelemetryConfig::default()
    })
    .context("Failed to initialize logging")?;

    let metrics = poker_server::metrics::install_recorder()
        .inspect_err(|e| warn!(error = %e, "metrics disabled"))
        .ok();

    let repository = Arc::new(InMemoryPlanningRepository::new());
    let service = Arc::new(PlanningService::new(repository));

    let config = cli.server_config();
    let handle = poker_server::start(config, service, metrics)
        .await
        .with_context(|| format!("Failed to bind {}:{}", cli.host, cli.port))?;
    info!(addr = %handle.addr(), static_dir = %cli.static_dir.display(), "planning poker ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl+c")?;
    handle.shutdown().await;
    Ok(())
}
