//! Metrics sinks
//!
//! Both real backends record the same figures per message; [`Observations`]
//! pulls them out of a [`Message`] once so each backend only decides how to
//! ship them.

pub mod noop;
pub mod pushgateway;
pub mod statsd;

use crate::config::{MetricsBackend, MonitorConfig};
use crate::http::DeliveryError;
use async_trait::async_trait;
use run_result_common::{Context, Message};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub use noop::NoopMonitor;
pub use pushgateway::PushGatewayMonitor;
pub use statsd::StatsdMonitor;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Metrics socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metrics push failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Record the figures carried by one message
    async fn report(&self, message: &Message) -> Result<(), MetricsError>;

    /// Record the wall-clock time of the whole engine command
    async fn command_time(&self, elapsed: Duration) -> Result<(), MetricsError>;
}

/// Tags attached to every metric and log line of a run
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalTags {
    pub app: String,
    pub command: String,
    pub version: String,
    pub number_of_cores: usize,
    pub env: String,
    pub run_id: Uuid,
}

impl GlobalTags {
    pub fn new(config: &MonitorConfig, command: &str) -> Self {
        Self {
            app: config.engine_name.clone(),
            command: command.to_string(),
            version: config
                .engine_version
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            number_of_cores: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            env: config.env.clone(),
            run_id: Uuid::new_v4(),
        }
    }

    pub fn to_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("app", self.app.clone());
        context.insert("command", self.command.clone());
        context.insert("version", self.version.clone());
        context.insert("number_of_cores", self.number_of_cores);
        context.insert("env", self.env.clone());
        context.insert("run_id", self.run_id.to_string());
        context
    }
}

/// Figures recorded for one message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observations {
    /// `(phase name, seconds)` for every phase with both timestamps
    pub phases: Vec<(String, f64)>,
    pub execution_time: Option<f64>,
    pub freshness_age: Option<f64>,
    pub rows: Option<i64>,
}

impl Observations {
    /// Zero execution time and zero rows are treated as not reported
    pub fn from_message(message: &Message) -> Self {
        let Some(reporting) = message.reporting.as_ref() else {
            return Self::default();
        };

        Self {
            phases: reporting
                .timing
                .iter()
                .filter_map(|t| t.elapsed_seconds().map(|secs| (t.name.clone(), secs)))
                .collect(),
            execution_time: Some(reporting.execution_time).filter(|t| *t > 0.0),
            freshness_age: reporting.freshness.as_ref().map(|f| f.age),
            rows: reporting.rows.filter(|rows| *rows != 0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
            && self.execution_time.is_none()
            && self.freshness_age.is_none()
            && self.rows.is_none()
    }
}

/// Build the metrics sink selected by the config
pub async fn build_metrics_sink(
    config: &MonitorConfig,
    tags: GlobalTags,
) -> Result<Arc<dyn MetricsSink>, MetricsError> {
    match &config.metrics_backend {
        MetricsBackend::Statsd { host, port } => {
            info!(host = %host, port = port, "Using statsd monitor.");
            let monitor = StatsdMonitor::connect(host, *port, &config.metrics_prefix, &tags).await?;
            Ok(Arc::new(monitor))
        }
        MetricsBackend::PushGateway { host, port } => {
            info!(host = %host, port = port, "Using push gateway monitor.");
            let monitor = PushGatewayMonitor::new(host, *port, config, tags)?;
            Ok(Arc::new(monitor))
        }
        MetricsBackend::Disabled => {
            info!("Instrumentation is not enabled.");
            Ok(Arc::new(NoopMonitor))
        }
    }
}
