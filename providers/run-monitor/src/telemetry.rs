//! Tracing initialization for the monitor binary.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is not set
    pub log_level: String,
    pub log_format: LogFormat,
}

impl TelemetryConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "run-monitor".to_string()),
            log_level: std::env::var("LOG_LEVEL")
                .map(|level| level.to_lowercase())
                .unwrap_or_else(|_| "debug".to_string()),
            log_format: std::env::var("LOG_FORMAT")
                .map(|format| LogFormat::parse(&format))
                .unwrap_or_default(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "run-monitor".to_string(),
            log_level: "debug".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

/// Install the global subscriber: env filter plus a text or JSON fmt layer.
///
/// `RUST_LOG` wins over the configured level. Fails when a subscriber is
/// already installed or the level is not a valid filter directive.
pub fn init_tracing(config: &TelemetryConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("Invalid LOG_LEVEL {:?}", config.log_level))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
            .context("Failed to install tracing subscriber")?,
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true))
            .try_init()
            .context("Failed to install tracing subscriber")?,
    }

    info!(
        service = %config.service_name,
        format = ?config.log_format,
        "Tracing initialized"
    );
    Ok(())
}
