use super::{AlertError, AlertOutcome, AlertSink};
use async_trait::async_trait;
use run_result_common::Message;

/// Alert sink used when no backend is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAlert;

#[async_trait]
impl AlertSink for NoopAlert {
    async fn alert(&self, _message: &Message) -> Result<AlertOutcome, AlertError> {
        Ok(AlertOutcome::Disabled)
    }
}
