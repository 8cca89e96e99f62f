//! # Run Monitor Binary
//!
//! Usage: `run-monitor <engine args...>`, e.g. `run-monitor run --models tag:daily`.
//! Exits 0 only when the engine run succeeded.

use anyhow::{bail, Context, Result};
use std::process::ExitCode;
use tracing::{error, info};

use run_monitor::{
    build_alert_sink, build_metrics_sink, init_error_tracking, init_tracing, report_failure, run,
    set_run_tags, Dispatcher, GlobalTags, LogSink, MonitorConfig, TelemetryConfig,
};

async fn monitor(config: &MonitorConfig, command: Vec<String>) -> Result<bool> {
    let Some(subcommand) = command.first() else {
        bail!("usage: run-monitor <engine args...>");
    };

    info!(
        env = %config.env,
        engine = %config.engine_name,
        version = config.app_version.as_deref().unwrap_or("unknown"),
        "Starting {} run monitor",
        config.engine_name
    );

    let tags = GlobalTags::new(config, subcommand);
    set_run_tags(&tags);
    let log_sink = LogSink::new(tags.to_context());
    let alert_sink = build_alert_sink(config).context("Failed to create alert sink")?;
    let metrics_sink = build_metrics_sink(config, tags)
        .await
        .context("Failed to create metrics sink")?;

    let dispatcher = Dispatcher::new(alert_sink, metrics_sink, log_sink);
    let outcome = run(config, &command, &dispatcher).await?;

    Ok(outcome.success())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    if let Err(e) = init_tracing(&TelemetryConfig::from_env()) {
        eprintln!("Failed to initialize tracing: {:#}", e);
        return ExitCode::FAILURE;
    }

    let config = match MonitorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = ?e, "Failed to load monitor configuration");
            return ExitCode::FAILURE;
        }
    };

    let _error_tracking = match init_error_tracking(&config) {
        Ok(guard) => guard,
        Err(e) => {
            error!(error = ?e, "Failed to initialize error tracking");
            return ExitCode::FAILURE;
        }
    };

    let command: Vec<String> = std::env::args().skip(1).collect();
    match monitor(&config, command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            report_failure(&e);
            ExitCode::FAILURE
        }
    }
}
