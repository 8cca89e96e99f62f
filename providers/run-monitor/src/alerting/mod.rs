//! Alert sinks
//!
//! The backend is picked once from [`AlertBackend`]; callers only see the
//! [`AlertSink`] trait.

pub mod noop;
pub mod slack;

use crate::config::{AlertBackend, MonitorConfig};
use crate::http::DeliveryError;
use async_trait::async_trait;
use run_result_common::Message;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub use noop::NoopAlert;
pub use slack::SlackAlert;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Alert delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

/// What happened to one alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    Delivered,
    /// Below the minimum level and success alerts are off
    Suppressed,
    /// No alert backend configured
    Disabled,
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one message, or decide not to
    async fn alert(&self, message: &Message) -> Result<AlertOutcome, AlertError>;
}

/// Build the alert sink selected by the config
pub fn build_alert_sink(config: &MonitorConfig) -> Result<Arc<dyn AlertSink>, AlertError> {
    match &config.alert_backend {
        AlertBackend::Slack { url } => {
            info!("Using slack alerting.");
            Ok(Arc::new(SlackAlert::new(url.clone(), config)?))
        }
        AlertBackend::Disabled => {
            info!("Alerting is not enabled.");
            Ok(Arc::new(NoopAlert))
        }
    }
}
