//! Run result types
//!
//! These types mirror the per-node records a run engine writes once a run
//! completes. They are read-only inputs to the formatter: nothing in this
//! crate mutates a [`RawResult`] after it has been deserialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structural category of a run result
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    Source,
    Model,
    Test,
    Snapshot,
    Seed,
    /// Any resource type this crate has no dedicated handling for
    Other(String),
}

impl ResourceKind {
    /// Lowercase name as written by the engine
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Source => "source",
            ResourceKind::Model => "model",
            ResourceKind::Test => "test",
            ResourceKind::Snapshot => "snapshot",
            ResourceKind::Seed => "seed",
            ResourceKind::Other(kind) => kind.as_str(),
        }
    }
}

impl From<String> for ResourceKind {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "source" => ResourceKind::Source,
            "model" => ResourceKind::Model,
            "test" => ResourceKind::Test,
            "snapshot" => ResourceKind::Snapshot,
            "seed" => ResourceKind::Seed,
            _ => ResourceKind::Other(value),
        }
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain status reported by the engine for a single node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeStatus {
    Success,
    Error,
    Fail,
    Warn,
    Skipped,
    Pass,
    RuntimeError,
    /// Status string the engine introduced after this crate was written
    Unknown(String),
}

impl NodeStatus {
    /// Lowercase status as written by the engine
    pub fn as_str(&self) -> &str {
        match self {
            NodeStatus::Success => "success",
            NodeStatus::Error => "error",
            NodeStatus::Fail => "fail",
            NodeStatus::Warn => "warn",
            NodeStatus::Skipped => "skipped",
            NodeStatus::Pass => "pass",
            NodeStatus::RuntimeError => "runtime error",
            NodeStatus::Unknown(status) => status.as_str(),
        }
    }
}

impl From<String> for NodeStatus {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "success" => NodeStatus::Success,
            "error" => NodeStatus::Error,
            "fail" => NodeStatus::Fail,
            "warn" => NodeStatus::Warn,
            "skipped" => NodeStatus::Skipped,
            "pass" => NodeStatus::Pass,
            "runtime error" | "runtime_error" | "runtimeerr" => NodeStatus::RuntimeError,
            _ => NodeStatus::Unknown(value),
        }
    }
}

impl From<&str> for NodeStatus {
    fn from(value: &str) -> Self {
        NodeStatus::from(value.to_string())
    }
}

impl From<NodeStatus> for String {
    fn from(status: NodeStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time unit used by freshness thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    Second,
    Minute,
    Hour,
    Day,
}

impl TimePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::Second => "second",
            TimePeriod::Minute => "minute",
            TimePeriod::Hour => "hour",
            TimePeriod::Day => "day",
        }
    }
}

impl std::fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One freshness threshold (`warn_after` / `error_after`)
///
/// The engine writes `{"count": null, "period": null}` for thresholds that
/// were never configured, so both fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreshnessThreshold {
    #[serde(default)]
    pub count: Option<f64>,
    #[serde(default)]
    pub period: Option<TimePeriod>,
}

impl FreshnessThreshold {
    pub fn new(count: f64, period: TimePeriod) -> Self {
        Self {
            count: Some(count),
            period: Some(period),
        }
    }

    /// Count and period, when both are configured
    pub fn configured(&self) -> Option<(f64, TimePeriod)> {
        match (self.count, self.period) {
            (Some(count), Some(period)) => Some((count, period)),
            _ => None,
        }
    }
}

/// Freshness sub-config carried only by source definitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreshnessCriteria {
    #[serde(default)]
    pub warn_after: FreshnessThreshold,
    #[serde(default)]
    pub error_after: FreshnessThreshold,
}

/// Snapshot unique key, either a single column or a composite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UniqueKey {
    Single(String),
    Composite(Vec<String>),
}

impl UniqueKey {
    pub fn joined(&self) -> String {
        match self {
            UniqueKey::Single(key) => key.clone(),
            UniqueKey::Composite(keys) => keys.join(", "),
        }
    }
}

/// Node config; snapshot-only keys are absent for other resource kinds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub materialized: String,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub unique_key: Option<UniqueKey>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Upstream node identifiers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependsOn {
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// Node descriptor attached to every result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub database: String,
    pub schema: String,
    pub name: String,
    pub package_name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub root_path: String,
    /// Set for compiled nodes
    #[serde(default)]
    pub build_path: Option<String>,
    /// Set for source definitions
    #[serde(default)]
    pub original_file_path: Option<String>,
    #[serde(default)]
    pub depends_on: DependsOn,
    #[serde(default)]
    pub config: NodeConfig,
    #[serde(default)]
    pub loader: Option<String>,
    #[serde(default)]
    pub freshness: Option<FreshnessCriteria>,
}

impl Node {
    /// Source definitions are the only nodes carrying a freshness sub-config
    pub fn is_source_definition(&self) -> bool {
        self.freshness.is_some()
    }
}

/// Timing of one execution phase (typically `compile` and `execute`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingInfo {
    pub name: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TimingInfo {
    /// Phase duration in seconds, when both ends were recorded
    pub fn elapsed_seconds(&self) -> Option<f64> {
        let started = self.started_at?;
        let completed = self.completed_at?;
        let micros = (completed - started).num_microseconds()?;
        Some(micros as f64 / 1_000_000.0)
    }
}

/// One execution outcome produced by the run engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    #[serde(rename = "resource_type")]
    pub resource_kind: ResourceKind,
    pub status: NodeStatus,
    pub node: Node,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timing: Vec<TimingInfo>,
    #[serde(default)]
    pub execution_time: f64,
    #[serde(default)]
    pub adapter_response: Map<String, Value>,
    /// Raw freshness age in seconds
    #[serde(default, alias = "max_loaded_at_time_ago_in_s")]
    pub age: Option<f64>,
    /// Failing row count reported by tests
    #[serde(default)]
    pub failures: Option<i64>,
}

impl RawResult {
    /// Row count, only when the adapter explicitly reported one
    pub fn rows_affected(&self) -> Option<i64> {
        self.adapter_response
            .get("rows_affected")
            .and_then(Value::as_i64)
    }

    /// Engine message, ignoring empty strings
    pub fn engine_message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_kind_parsing() {
        assert_eq!(ResourceKind::from("Model".to_string()), ResourceKind::Model);
        assert_eq!(ResourceKind::from("seed".to_string()), ResourceKind::Seed);
        assert_eq!(
            ResourceKind::from("analysis".to_string()),
            ResourceKind::Other("analysis".to_string())
        );
        assert_eq!(ResourceKind::Other("analysis".to_string()).as_str(), "analysis");
    }

    #[test]
    fn test_node_status_parsing() {
        assert_eq!(NodeStatus::from("runtime error"), NodeStatus::RuntimeError);
        assert_eq!(NodeStatus::from("runtime_error"), NodeStatus::RuntimeError);
        assert_eq!(NodeStatus::from("PASS"), NodeStatus::Pass);
        assert_eq!(
            NodeStatus::from("partial success"),
            NodeStatus::Unknown("partial success".to_string())
        );
        assert_eq!(NodeStatus::RuntimeError.to_string(), "runtime error");
    }

    #[test]
    fn test_rows_affected_requires_explicit_key() {
        let mut result: RawResult = serde_json::from_value(json!({
            "resource_type": "model",
            "status": "success",
            "node": {
                "database": "db",
                "schema": "sch",
                "name": "tbl",
                "package_name": "pkg"
            }
        }))
        .unwrap();
        assert_eq!(result.rows_affected(), None);

        result
            .adapter_response
            .insert("rows_affected".to_string(), json!(0));
        assert_eq!(result.rows_affected(), Some(0));
    }

    #[test]
    fn test_unconfigured_threshold() {
        let threshold: FreshnessThreshold =
            serde_json::from_value(json!({"count": null, "period": null})).unwrap();
        assert_eq!(threshold.configured(), None);

        let threshold = FreshnessThreshold::new(4.0, TimePeriod::Hour);
        assert_eq!(threshold.configured(), Some((4.0, TimePeriod::Hour)));
    }

    #[test]
    fn test_timing_elapsed() {
        let timing: TimingInfo = serde_json::from_value(json!({
            "name": "execute",
            "started_at": "2021-04-07T18:18:49.077503Z",
            "completed_at": "2021-04-07T18:18:55.131509Z"
        }))
        .unwrap();
        let elapsed = timing.elapsed_seconds().unwrap();
        assert!((elapsed - 6.054006).abs() < 1e-9);

        let open = TimingInfo {
            name: "compile".to_string(),
            started_at: None,
            completed_at: None,
        };
        assert_eq!(open.elapsed_seconds(), None);
    }

    #[test]
    fn test_composite_unique_key() {
        let config: NodeConfig = serde_json::from_value(json!({
            "materialized": "snapshot",
            "unique_key": ["id", "valid_from"]
        }))
        .unwrap();
        assert_eq!(config.unique_key.unwrap().joined(), "id, valid_from");
    }
}
