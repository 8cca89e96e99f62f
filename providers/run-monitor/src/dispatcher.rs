//! Fan-out of each message to the alert, metrics and log sinks.
//!
//! Sinks are called independently: one failing never stops the others, and
//! no sink error leaves the dispatcher.

use crate::alerting::{AlertOutcome, AlertSink};
use crate::log_sink::LogSink;
use crate::monitoring::MetricsSink;
use parking_lot::Mutex;
use run_result_common::Message;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-run delivery counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub messages: u64,
    pub alerts_delivered: u64,
    pub alerts_suppressed: u64,
    pub alert_failures: u64,
    pub metrics_failures: u64,
}

pub struct Dispatcher {
    alert: Arc<dyn AlertSink>,
    metrics: Arc<dyn MetricsSink>,
    log: LogSink,
    stats: Mutex<DispatchStats>,
}

impl Dispatcher {
    pub fn new(alert: Arc<dyn AlertSink>, metrics: Arc<dyn MetricsSink>, log: LogSink) -> Self {
        Self {
            alert,
            metrics,
            log,
            stats: Mutex::new(DispatchStats::default()),
        }
    }

    /// Hand one message to every sink
    pub async fn dispatch(&self, message: &Message) {
        let (metrics, alert) = tokio::join!(self.metrics.report(message), self.alert.alert(message));

        let mut stats = self.stats.lock();
        stats.messages += 1;

        if let Err(e) = metrics {
            stats.metrics_failures += 1;
            warn!(error = %e, title = %message.title, "Failed to report metrics");
        }

        match alert {
            Ok(AlertOutcome::Delivered) => stats.alerts_delivered += 1,
            Ok(AlertOutcome::Suppressed) => stats.alerts_suppressed += 1,
            Ok(AlertOutcome::Disabled) => {}
            Err(e) => {
                stats.alert_failures += 1;
                warn!(error = %e, title = %message.title, "Failed to send alert");
            }
        }
        drop(stats);

        self.log.log_message(message);
    }

    /// Record the duration of the whole engine command
    pub async fn command_time(&self, elapsed: Duration) {
        match self.metrics.command_time(elapsed).await {
            Ok(()) => debug!(elapsed_ms = elapsed.as_millis() as u64, "Recorded command time"),
            Err(e) => {
                self.stats.lock().metrics_failures += 1;
                warn!(error = %e, "Failed to record command time");
            }
        }
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats.lock().clone()
    }
}
