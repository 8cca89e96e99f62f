use anyhow::{Context, Result};
use run_result_common::LogLevel;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where alerts go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertBackend {
    Slack { url: String },
    Disabled,
}

/// Where metrics go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsBackend {
    Statsd { host: String, port: u16 },
    PushGateway { host: String, port: u16 },
    Disabled,
}

/// Monitor configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub env: String,
    pub service_name: String,
    pub app_version: Option<String>,
    pub engine_name: String,
    pub engine_version: Option<String>,
    pub alert_backend: AlertBackend,
    pub success_alerts: bool,
    pub alert_min_level: LogLevel,
    pub alert_timeout: Duration,
    pub metrics_backend: MetricsBackend,
    pub metrics_prefix: String,
    pub run_results_path: PathBuf,
    /// Results of `source freshness` commands
    pub sources_path: PathBuf,
    pub manifest_path: PathBuf,
    pub sentry_dsn: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            env: "dev".to_string(),
            service_name: "run-monitor".to_string(),
            app_version: None,
            engine_name: "dbt".to_string(),
            engine_version: None,
            alert_backend: AlertBackend::Disabled,
            success_alerts: false,
            alert_min_level: LogLevel::Notice,
            alert_timeout: Duration::from_secs(30),
            metrics_backend: MetricsBackend::Disabled,
            metrics_prefix: "dbt".to_string(),
            run_results_path: PathBuf::from("target/run_results.json"),
            sources_path: PathBuf::from("target/sources.json"),
            manifest_path: PathBuf::from("target/manifest.json"),
            sentry_dsn: None,
        }
    }
}

/// Look a key up by its variable name, then by its lower-cased name; blanks count as unset
fn lookup<'a>(props: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    props
        .get(key)
        .or_else(|| props.get(&key.to_lowercase()))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn parse_port(props: &HashMap<String, String>, key: &str) -> Result<Option<u16>> {
    lookup(props, key)
        .map(|value| {
            value
                .parse::<u16>()
                .with_context(|| format!("{} must be a port number, got {:?}", key, value))
        })
        .transpose()
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl MonitorConfig {
    /// Create config from a properties map
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();

        let alert_backend = match lookup(props, "SLACK_URL") {
            Some(url) => AlertBackend::Slack {
                url: url.to_string(),
            },
            None => AlertBackend::Disabled,
        };

        let dd_host = lookup(props, "DD_HOST");
        let dd_port = parse_port(props, "DD_STATSD_PORT")?;
        let pushgateway_host = lookup(props, "PUSHGATEWAY_HOST");
        let pushgateway_port = parse_port(props, "PUSHGATEWAY_PORT")?;

        // statsd wins when both backends are configured
        let metrics_backend = match (dd_host, dd_port, pushgateway_host, pushgateway_port) {
            (Some(host), Some(port), _, _) => MetricsBackend::Statsd {
                host: host.to_string(),
                port,
            },
            (_, _, Some(host), Some(port)) => MetricsBackend::PushGateway {
                host: host.to_string(),
                port,
            },
            _ => MetricsBackend::Disabled,
        };

        let alert_min_level = match lookup(props, "ALERT_MIN_LEVEL") {
            Some(level) => level
                .parse::<LogLevel>()
                .with_context(|| format!("ALERT_MIN_LEVEL is not a log level: {:?}", level))?,
            None => defaults.alert_min_level,
        };

        let alert_timeout = match lookup(props, "ALERT_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(
                secs.parse()
                    .with_context(|| format!("ALERT_TIMEOUT_SECS must be whole seconds, got {:?}", secs))?,
            ),
            None => defaults.alert_timeout,
        };

        Ok(Self {
            env: lookup(props, "ENV")
                .map(str::to_string)
                .unwrap_or(defaults.env),
            service_name: lookup(props, "SERVICE_NAME")
                .map(str::to_string)
                .unwrap_or(defaults.service_name),
            app_version: lookup(props, "IMAGE_VERSION").map(str::to_string),
            engine_name: lookup(props, "ENGINE_NAME")
                .map(str::to_string)
                .unwrap_or(defaults.engine_name),
            engine_version: lookup(props, "ENGINE_VERSION").map(str::to_string),
            alert_backend,
            success_alerts: lookup(props, "SUCCESS_ALERTS").map_or(false, parse_flag),
            alert_min_level,
            alert_timeout,
            metrics_backend,
            metrics_prefix: lookup(props, "METRICS_PREFIX")
                .map(str::to_string)
                .unwrap_or(defaults.metrics_prefix),
            run_results_path: lookup(props, "RUN_RESULTS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.run_results_path),
            sources_path: lookup(props, "SOURCES_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.sources_path),
            manifest_path: lookup(props, "MANIFEST_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.manifest_path),
            sentry_dsn: lookup(props, "SENTRY_DSN").map(str::to_string),
        })
    }

    /// Create config from environment variables, loading `.env` first when present
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_properties(&vars)
    }

    /// Results artifact the engine writes for `command`
    pub fn results_path(&self, command: &[String]) -> &Path {
        match command.first().map(String::as_str) {
            Some("source") => &self.sources_path,
            _ => &self.run_results_path,
        }
    }

    /// Release reported to error tracking: `{service}@{version}`
    pub fn release(&self) -> String {
        format!(
            "{}@{}",
            self.service_name,
            self.app_version.as_deref().unwrap_or("unknown")
        )
    }

    /// Alert footer text, only when the engine version is known
    pub fn engine_footer(&self) -> Option<String> {
        self.engine_version
            .as_ref()
            .map(|version| format!("{} {}", self.engine_name, version))
    }
}
