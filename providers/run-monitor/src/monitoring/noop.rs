use super::{MetricsError, MetricsSink};
use async_trait::async_trait;
use run_result_common::Message;
use std::time::Duration;

/// Metrics sink used when instrumentation is off
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

#[async_trait]
impl MetricsSink for NoopMonitor {
    async fn report(&self, _message: &Message) -> Result<(), MetricsError> {
        Ok(())
    }

    async fn command_time(&self, _elapsed: Duration) -> Result<(), MetricsError> {
        Ok(())
    }
}
