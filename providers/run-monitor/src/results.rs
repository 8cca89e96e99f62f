//! Reading the engine's artifacts
//!
//! A run leaves per-node outcomes in a results artifact (`run_results.json`,
//! or `sources.json` for freshness checks) and node descriptors in
//! `manifest.json`. Each outcome is joined to its node on `unique_id` before
//! it reaches the formatter.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use run_result_common::RawResult;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResultsError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed artifact {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a single results entry could not become a [`RawResult`]
#[derive(Error, Debug)]
pub enum JoinError {
    #[error("Result entry has no unique_id")]
    MissingUniqueId,

    #[error("Node `{0}` is not in the manifest")]
    UnknownNode(String),

    #[error("Malformed result `{unique_id}`: {source}")]
    Decode {
        unique_id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Header every engine artifact carries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtifactMetadata {
    #[serde(default)]
    pub dbt_schema_version: Option<String>,
    #[serde(default)]
    pub dbt_version: Option<String>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

impl ArtifactMetadata {
    /// Generation time; older engines omit the UTC offset
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.generated_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|at| at.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|at| at.and_utc())
            })
            .ok()
    }
}

/// Results artifact; entries stay undecoded until joined
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsArtifact {
    #[serde(default)]
    pub metadata: ArtifactMetadata,
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub elapsed_time: Option<f64>,
}

/// Node descriptors keyed by unique id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub metadata: ArtifactMetadata,
    #[serde(default)]
    pub nodes: Map<String, Value>,
    #[serde(default)]
    pub sources: Map<String, Value>,
}

impl Manifest {
    pub fn node(&self, unique_id: &str) -> Option<&Value> {
        self.nodes
            .get(unique_id)
            .or_else(|| self.sources.get(unique_id))
    }
}

async fn read(path: &Path) -> Result<String, ResultsError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ResultsError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn parse<T: for<'de> Deserialize<'de>>(path: &Path, raw: &str) -> Result<T, ResultsError> {
    serde_json::from_str(raw).map_err(|source| ResultsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a results artifact written by the engine
pub async fn load_results(path: &Path) -> Result<ResultsArtifact, ResultsError> {
    let raw = read(path).await?;
    parse(path, &raw)
}

/// Read the manifest written by the engine
pub async fn load_manifest(path: &Path) -> Result<Manifest, ResultsError> {
    let raw = read(path).await?;
    parse(path, &raw)
}

/// Whether `artifact` was written at or after `since`.
///
/// `metadata.generated_at` is authoritative; the file's modification time is
/// used when the header has none. Both are compared at whole-second precision.
pub async fn written_since(
    path: &Path,
    artifact: &ResultsArtifact,
    since: DateTime<Utc>,
) -> Result<bool, ResultsError> {
    let written_at = match artifact.metadata.generated_at() {
        Some(generated_at) => generated_at,
        None => {
            let modified = tokio::fs::metadata(path)
                .await
                .and_then(|metadata| metadata.modified())
                .map_err(|source| ResultsError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            DateTime::<Utc>::from(modified)
        }
    };
    Ok(written_at.trunc_subsecs(0) >= since.trunc_subsecs(0))
}

/// Join one results entry to its manifest node
pub fn join_result(entry: Value, manifest: &Manifest) -> Result<RawResult, JoinError> {
    let Value::Object(mut fields) = entry else {
        return Err(JoinError::MissingUniqueId);
    };
    let unique_id = fields
        .get("unique_id")
        .and_then(Value::as_str)
        .ok_or(JoinError::MissingUniqueId)?
        .to_string();
    let mut node = manifest
        .node(&unique_id)
        .cloned()
        .ok_or_else(|| JoinError::UnknownNode(unique_id.clone()))?;

    if let Value::Object(node_fields) = &mut node {
        // newer manifests only record compiled_path
        if node_fields.get("build_path").map_or(true, Value::is_null) {
            if let Some(compiled_path) = node_fields.get("compiled_path").cloned() {
                node_fields.insert("build_path".to_string(), compiled_path);
            }
        }
        // freshness outcomes carry the criteria the check ran with
        if let Some(criteria) = fields.remove("criteria").filter(|c| !c.is_null()) {
            node_fields.insert("freshness".to_string(), criteria);
        }
        if let Some(kind) = node_fields.get("resource_type").cloned() {
            fields.insert("resource_type".to_string(), kind);
        }
    }

    // freshness runtime errors report their text under `error`
    if fields.get("message").map_or(true, Value::is_null) {
        if let Some(error) = fields.remove("error") {
            fields.insert("message".to_string(), error);
        }
    }
    fields.insert("node".to_string(), node);

    serde_json::from_value(Value::Object(fields)).map_err(|source| JoinError::Decode {
        unique_id,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use run_result_common::{NodeStatus, ResourceKind};
    use serde_json::json;

    fn manifest() -> Manifest {
        serde_json::from_value(json!({
            "nodes": {
                "model.analytics.orders": {
                    "resource_type": "model",
                    "database": "WH",
                    "schema": "CORE",
                    "name": "orders",
                    "package_name": "analytics",
                    "path": "orders.sql",
                    "compiled_path": "target/compiled/analytics/models/orders.sql",
                    "config": {"materialized": "table"}
                }
            },
            "sources": {
                "source.analytics.lake.events": {
                    "resource_type": "source",
                    "database": "LAKE",
                    "schema": "RAW",
                    "name": "events",
                    "package_name": "analytics",
                    "original_file_path": "models/sources.yml",
                    "loader": "fivetran",
                    "freshness": null
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_results_keeps_entries_raw() {
        let artifact: ResultsArtifact = parse(
            Path::new("run_results.json"),
            &json!({
                "metadata": {"generated_at": "2021-04-07T18:18:31.214871Z"},
                "elapsed_time": 12.5,
                "results": [{"status": "success"}, {"status": "error"}]
            })
            .to_string(),
        )
        .unwrap();
        assert_eq!(artifact.results.len(), 2);
        assert_eq!(
            artifact.metadata.generated_at(),
            Some(Utc.with_ymd_and_hms(2021, 4, 7, 18, 18, 31).unwrap() + Duration::microseconds(214871))
        );
    }

    #[test]
    fn test_generated_at_without_offset() {
        let metadata = ArtifactMetadata {
            generated_at: Some("2021-04-07T18:18:31.214871".to_string()),
            ..ArtifactMetadata::default()
        };
        assert_eq!(
            metadata.generated_at().map(|at| at.trunc_subsecs(0)),
            Some(Utc.with_ymd_and_hms(2021, 4, 7, 18, 18, 31).unwrap())
        );
    }

    #[test]
    fn test_parse_garbage() {
        let result: Result<ResultsArtifact, _> = parse(Path::new("run_results.json"), "not json");
        assert!(matches!(result, Err(ResultsError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = load_results(Path::new("/nonexistent/run_results.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResultsError::Io { .. }));
    }

    #[test]
    fn test_join_model_result() {
        let result = join_result(
            json!({
                "status": "success",
                "unique_id": "model.analytics.orders",
                "execution_time": 7.39,
                "adapter_response": {"rows_affected": 5},
                "message": "SUCCESS 5",
                "thread_id": "Thread-1",
                "timing": []
            }),
            &manifest(),
        )
        .unwrap();

        assert_eq!(result.resource_kind, ResourceKind::Model);
        assert_eq!(result.status, NodeStatus::Success);
        assert_eq!(result.node.name, "orders");
        assert_eq!(
            result.node.build_path.as_deref(),
            Some("target/compiled/analytics/models/orders.sql")
        );
        assert_eq!(result.rows_affected(), Some(5));
    }

    #[test]
    fn test_join_freshness_result_uses_criteria() {
        let result = join_result(
            json!({
                "unique_id": "source.analytics.lake.events",
                "status": "warn",
                "max_loaded_at_time_ago_in_s": 14400.0,
                "criteria": {
                    "warn_after": {"count": 4, "period": "hour"},
                    "error_after": {"count": null, "period": null},
                    "filter": null
                }
            }),
            &manifest(),
        )
        .unwrap();

        assert_eq!(result.resource_kind, ResourceKind::Source);
        assert_eq!(result.age, Some(14400.0));
        assert!(result.node.is_source_definition());
    }

    #[test]
    fn test_join_runtime_error_keeps_error_text() {
        let result = join_result(
            json!({
                "unique_id": "source.analytics.lake.events",
                "status": "runtime error",
                "error": "Database Error: relation does not exist"
            }),
            &manifest(),
        )
        .unwrap();
        assert_eq!(
            result.engine_message(),
            Some("Database Error: relation does not exist")
        );
    }

    #[test]
    fn test_join_rejects_unknown_and_anonymous_entries() {
        assert!(matches!(
            join_result(json!({"status": "success", "unique_id": "operation.analytics.hook-0"}), &manifest()),
            Err(JoinError::UnknownNode(id)) if id == "operation.analytics.hook-0"
        ));
        assert!(matches!(
            join_result(json!({"status": "success"}), &manifest()),
            Err(JoinError::MissingUniqueId)
        ));
    }

    #[tokio::test]
    async fn test_written_since_prefers_generated_at() {
        let artifact = ResultsArtifact {
            metadata: ArtifactMetadata {
                generated_at: Some("2021-04-07T18:18:31.214871Z".to_string()),
                ..ArtifactMetadata::default()
            },
            ..ResultsArtifact::default()
        };
        let path = Path::new("/nonexistent/run_results.json");

        let before = Utc.with_ymd_and_hms(2021, 4, 7, 18, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2021, 4, 7, 19, 0, 0).unwrap();
        assert!(written_since(path, &artifact, before).await.unwrap());
        assert!(!written_since(path, &artifact, after).await.unwrap());
    }

    #[tokio::test]
    async fn test_written_since_falls_back_to_mtime() {
        let path = std::env::temp_dir().join(format!("run-results-{}.json", uuid::Uuid::new_v4()));
        let since = Utc::now() - Duration::seconds(1);
        tokio::fs::write(&path, "{\"results\": []}").await.unwrap();

        let artifact = load_results(&path).await.unwrap();
        assert!(written_since(&path, &artifact, since).await.unwrap());
        assert!(!written_since(&path, &artifact, since + Duration::hours(1))
            .await
            .unwrap());

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
