//! Run orchestration: execute the engine, then format and dispatch every result.

use crate::config::MonitorConfig;
use crate::dispatcher::{DispatchStats, Dispatcher};
use crate::results::{join_result, load_manifest, load_results, written_since, ResultsError};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use run_result_common::format_result;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{info, warn};

/// Summary of one monitored run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub engine_success: bool,
    pub processed: usize,
    pub skipped: usize,
    pub elapsed: Duration,
    pub stats: DispatchStats,
}

impl RunOutcome {
    /// The run counts as successful only when the engine itself succeeded
    pub fn success(&self) -> bool {
        self.engine_success
    }
}

/// Format and dispatch every result in the results artifact at `results_path`.
///
/// Entries are joined to their node in the manifest at `manifest_path`;
/// entries that fail to join or format are logged and skipped. With
/// `not_before` set, an artifact written earlier is left alone. Returns
/// `(processed, skipped)`.
pub async fn report_results(
    results_path: &Path,
    manifest_path: &Path,
    not_before: Option<DateTime<Utc>>,
    dispatcher: &Dispatcher,
) -> Result<(usize, usize), ResultsError> {
    let artifact = load_results(results_path).await?;

    if let Some(since) = not_before {
        if !written_since(results_path, &artifact, since).await? {
            warn!(
                path = %results_path.display(),
                generated_at = artifact.metadata.generated_at.as_deref().unwrap_or("unknown"),
                run_started_at = %since.to_rfc3339(),
                "Results were not written by this run, not reporting them"
            );
            return Ok((0, 0));
        }
    }

    let manifest = load_manifest(manifest_path).await?;
    info!(
        path = %results_path.display(),
        count = artifact.results.len(),
        engine_version = artifact.metadata.dbt_version.as_deref().unwrap_or("unknown"),
        "Loaded run results"
    );

    let mut processed = 0;
    let mut skipped = 0;
    for (index, entry) in artifact.results.into_iter().enumerate() {
        let result = match join_result(entry, &manifest) {
            Ok(result) => result,
            Err(e) => {
                warn!(index, error = %e, "Skipping result without a usable node");
                skipped += 1;
                continue;
            }
        };

        match format_result(&result) {
            Ok(message) => {
                dispatcher.dispatch(&message).await;
                processed += 1;
            }
            Err(e) => {
                warn!(index, name = %result.node.name, error = %e, "Skipping result that could not be formatted");
                skipped += 1;
            }
        }
    }

    Ok((processed, skipped))
}

async fn execute(
    config: &MonitorConfig,
    command: &[String],
    dispatcher: &Dispatcher,
) -> Result<(bool, usize, usize)> {
    let started_at = Utc::now();
    info!(
        engine = %config.engine_name,
        args = ?command,
        started_at = %started_at.to_rfc3339(),
        "Starting {} run",
        config.engine_name
    );

    let status = Command::new(&config.engine_name)
        .args(command)
        .status()
        .await
        .with_context(|| format!("Failed to start {}", config.engine_name))?;

    let results_path = config.results_path(command);
    if !status.success() {
        warn!(code = ?status.code(), "{} exited with a failure", config.engine_name);

        // the engine can fail before it writes anything
        if !tokio::fs::try_exists(results_path).await.unwrap_or(false) {
            warn!(path = %results_path.display(), "No results to report");
            return Ok((false, 0, 0));
        }
    }

    let (processed, skipped) = report_results(
        results_path,
        &config.manifest_path,
        Some(started_at),
        dispatcher,
    )
    .await
    .context("Failed to report run results")?;

    Ok((status.success(), processed, skipped))
}

/// Run the engine with `command`, report its results and time the whole command
pub async fn run(
    config: &MonitorConfig,
    command: &[String],
    dispatcher: &Dispatcher,
) -> Result<RunOutcome> {
    let start = Instant::now();
    let result = execute(config, command, dispatcher).await;
    let elapsed = start.elapsed();

    // recorded whether or not the run itself failed
    dispatcher.command_time(elapsed).await;

    let (engine_success, processed, skipped) = result?;
    let outcome = RunOutcome {
        engine_success,
        processed,
        skipped,
        elapsed,
        stats: dispatcher.stats(),
    };

    info!(
        success = outcome.engine_success,
        processed = outcome.processed,
        skipped = outcome.skipped,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        alerts_delivered = outcome.stats.alerts_delivered,
        alert_failures = outcome.stats.alert_failures,
        metrics_failures = outcome.stats.metrics_failures,
        "Run finished"
    );

    Ok(outcome)
}
