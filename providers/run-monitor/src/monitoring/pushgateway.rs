use super::{GlobalTags, MetricsError, MetricsSink, Observations};
use crate::config::MonitorConfig;
use crate::http::{build_client, send_text};
use async_trait::async_trait;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use reqwest::{Client, Method};
use run_result_common::{Context, Message};
use std::time::Duration;
use tracing::debug;

/// Label names shared by every metric
pub const LABELS: [&str; 7] = [
    "database",
    "schema",
    "name",
    "resource_type",
    "command",
    "version",
    "env",
];

/// Metrics sink pushing a prometheus registry to a push gateway after every report
pub struct PushGatewayMonitor {
    registry: Registry,
    rows_moved: IntCounterVec,
    execution_time: HistogramVec,
    freshness: HistogramVec,
    phase_time: HistogramVec,
    run_time: HistogramVec,
    http_client: Client,
    url: String,
    global_tags: Context,
    service_name: String,
}

fn histogram(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<HistogramVec, MetricsError> {
    let histogram = HistogramVec::new(HistogramOpts::new(name, help), labels)?;
    registry.register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

impl PushGatewayMonitor {
    pub fn new(
        host: &str,
        port: u16,
        config: &MonitorConfig,
        tags: GlobalTags,
    ) -> Result<Self, MetricsError> {
        let prefix = &config.metrics_prefix;
        let registry = Registry::new();

        let rows_moved = IntCounterVec::new(
            Opts::new(
                format!("{}_rows_moved", prefix),
                "Records the number of rows moved",
            ),
            &LABELS,
        )?;
        registry.register(Box::new(rows_moved.clone()))?;

        let execution_time = histogram(
            &registry,
            &format!("{}_execution_time_seconds", prefix),
            "Records the time it takes to execute a node",
            &LABELS,
        )?;
        let freshness = histogram(
            &registry,
            &format!("{}_freshness_seconds", prefix),
            "Records how fresh a source is, in the unit of its threshold",
            &LABELS,
        )?;
        let phase_labels: Vec<&str> = LABELS.iter().copied().chain(["phase"]).collect();
        let phase_time = histogram(
            &registry,
            &format!("{}_phase_time_seconds", prefix),
            "Records the time spent in each execution phase",
            &phase_labels,
        )?;
        let run_time = histogram(
            &registry,
            &format!("{}_run_time_seconds", prefix),
            "Records the time it takes to complete a full run",
            &LABELS,
        )?;

        Ok(Self {
            registry,
            rows_moved,
            execution_time,
            freshness,
            phase_time,
            run_time,
            http_client: build_client(config.alert_timeout)?,
            url: format!("http://{}:{}/metrics/job/{}", host, port, prefix),
            global_tags: tags.to_context(),
            service_name: format!("{} pushgateway", config.service_name),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Label values for a context; global tags win, missing labels are `unknown`
    pub fn label_values(&self, context: &Context) -> Vec<String> {
        LABELS
            .iter()
            .map(|label| {
                self.global_tags
                    .get(label)
                    .or_else(|| context.get(label))
                    .and_then(Context::scalar_text)
                    .unwrap_or_else(|| "unknown".to_string())
            })
            .collect()
    }

    /// Text exposition of everything recorded so far
    pub fn exposition(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn record(&self, message: &Message) -> Result<(), MetricsError> {
        let observations = Observations::from_message(message);
        let values = self.label_values(&message.context);
        let labels: Vec<&str> = values.iter().map(String::as_str).collect();

        for (phase, seconds) in &observations.phases {
            let mut phase_labels = labels.clone();
            phase_labels.push(phase.as_str());
            self.phase_time
                .get_metric_with_label_values(&phase_labels)?
                .observe(*seconds);
        }
        if let Some(execution_time) = observations.execution_time {
            self.execution_time
                .get_metric_with_label_values(&labels)?
                .observe(execution_time);
        }
        if let Some(age) = observations.freshness_age {
            self.freshness
                .get_metric_with_label_values(&labels)?
                .observe(age);
        }
        if let Some(rows) = observations.rows.filter(|rows| *rows > 0) {
            self.rows_moved
                .get_metric_with_label_values(&labels)?
                .inc_by(rows as u64);
        }
        Ok(())
    }

    async fn push(&self) -> Result<(), MetricsError> {
        let body = self.exposition()?;
        debug!(url = %self.url, bytes = body.len(), "Pushing metrics");
        send_text(
            &self.http_client,
            Method::PUT,
            &self.url,
            body,
            TextEncoder::new().format_type(),
            &self.service_name,
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MetricsSink for PushGatewayMonitor {
    async fn report(&self, message: &Message) -> Result<(), MetricsError> {
        self.record(message)?;
        self.push().await
    }

    async fn command_time(&self, elapsed: Duration) -> Result<(), MetricsError> {
        let values = self.label_values(&Context::new());
        let labels: Vec<&str> = values.iter().map(String::as_str).collect();
        self.run_time
            .get_metric_with_label_values(&labels)?
            .observe(elapsed.as_secs_f64());
        self.push().await
    }
}
