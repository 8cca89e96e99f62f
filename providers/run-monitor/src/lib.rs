//! Run monitor: executes a transformation engine run and reports every
//! result to the configured alert, metrics and log sinks.

pub mod alerting;
pub mod config;
pub mod dispatcher;
pub mod error_tracking;
pub mod http;
pub mod log_sink;
pub mod monitoring;
pub mod results;
pub mod runner;
pub mod telemetry;

pub use alerting::{build_alert_sink, AlertError, AlertOutcome, AlertSink};
pub use config::{AlertBackend, MetricsBackend, MonitorConfig};
pub use dispatcher::{DispatchStats, Dispatcher};
pub use error_tracking::{init_error_tracking, report_failure, set_run_tags};
pub use log_sink::LogSink;
pub use monitoring::{build_metrics_sink, GlobalTags, MetricsError, MetricsSink};
pub use runner::{run, RunOutcome};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
