//! Reporting extraction: timing, rows moved and freshness age

use crate::error::FormatError;
use crate::message::{Freshness, Reporting};
use crate::types::{NodeStatus, RawResult};
use crate::utils::freshness_age_to_unit;

/// Freshness of a source result, measured against the threshold its status tripped
///
/// A `warn` status reads `warn_after`, every other status reads
/// `error_after`. When the chosen threshold was never configured the other
/// one is used instead.
pub fn extract_freshness(result: &RawResult) -> Result<Freshness, FormatError> {
    let missing = |field| {
        FormatError::missing(field, result.resource_kind.as_str(), result.node.name.clone())
    };

    let criteria = result
        .node
        .freshness
        .as_ref()
        .ok_or_else(|| missing("node.freshness"))?;
    let age = result.age.ok_or_else(|| missing("age"))?;

    let (primary, fallback, field) = if result.status == NodeStatus::Warn {
        (&criteria.warn_after, &criteria.error_after, "node.freshness.warn_after")
    } else {
        (&criteria.error_after, &criteria.warn_after, "node.freshness.error_after")
    };
    let (threshold, unit) = primary
        .configured()
        .or_else(|| fallback.configured())
        .ok_or_else(|| missing(field))?;

    Ok(Freshness {
        unit,
        threshold,
        loader: result.node.loader.clone().unwrap_or_default(),
        age: freshness_age_to_unit(age, unit),
    })
}

/// Figures every metrics sink reads off a result
pub fn extract_reporting(result: &RawResult) -> Result<Reporting, FormatError> {
    let freshness = if result.node.is_source_definition() {
        Some(extract_freshness(result)?)
    } else {
        None
    };

    Ok(Reporting {
        rows: result.rows_affected(),
        execution_time: result.execution_time,
        timing: result.timing.clone(),
        freshness,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimePeriod;
    use serde_json::json;

    fn freshness_result(status: &str, age: f64) -> RawResult {
        serde_json::from_value(json!({
            "resource_type": "source",
            "status": status,
            "age": age,
            "execution_time": 2.5,
            "node": {
                "database": "lake",
                "schema": "core",
                "name": "events",
                "package_name": "analytics",
                "root_path": "/srv/project",
                "original_file_path": "models/sources.yml",
                "loader": "pipelinewise",
                "freshness": {
                    "warn_after": {"count": 4, "period": "hour"},
                    "error_after": {"count": 10, "period": "day"}
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_warn_uses_warn_after() {
        let freshness = extract_freshness(&freshness_result("warn", 14400.0)).unwrap();
        assert_eq!(freshness.unit, TimePeriod::Hour);
        assert_eq!(freshness.age, 4.0);
        assert_eq!(freshness.threshold, 4.0);
        assert_eq!(freshness.loader, "pipelinewise");
    }

    #[test]
    fn test_other_statuses_use_error_after() {
        for status in ["error", "pass", "runtime error"] {
            let freshness = extract_freshness(&freshness_result(status, 52531200.0)).unwrap();
            assert_eq!(freshness.unit, TimePeriod::Day);
            assert_eq!(freshness.age, 608.0);
            assert_eq!(freshness.threshold, 10.0);
        }
    }

    #[test]
    fn test_falls_back_when_branch_unconfigured() {
        let mut result = freshness_result("pass", 7200.0);
        if let Some(criteria) = result.node.freshness.as_mut() {
            criteria.error_after = Default::default();
        }
        let freshness = extract_freshness(&result).unwrap();
        assert_eq!(freshness.unit, TimePeriod::Hour);
        assert_eq!(freshness.age, 2.0);
    }

    #[test]
    fn test_unconfigured_thresholds_name_chosen_branch() {
        for (status, expected) in [
            ("warn", "node.freshness.warn_after"),
            ("error", "node.freshness.error_after"),
        ] {
            let mut result = freshness_result(status, 7200.0);
            result.node.freshness = Some(Default::default());
            match extract_freshness(&result) {
                Err(FormatError::MissingField { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected missing threshold, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_missing_age() {
        let mut result = freshness_result("pass", 0.0);
        result.age = None;
        assert!(matches!(
            extract_freshness(&result),
            Err(FormatError::MissingField { field: "age", .. })
        ));
    }

    #[test]
    fn test_reporting_for_source() {
        let reporting = extract_reporting(&freshness_result("pass", 0.0)).unwrap();
        assert_eq!(reporting.rows, None);
        assert_eq!(reporting.execution_time, 2.5);
        assert!(reporting.timing.is_empty());
        assert!(reporting.freshness.is_some());
    }

    #[test]
    fn test_reporting_rows_only_when_reported() {
        let mut result: RawResult = serde_json::from_value(json!({
            "resource_type": "model",
            "status": "success",
            "execution_time": 7.25,
            "adapter_response": {"code": "SUCCESS"},
            "node": {
                "database": "db",
                "schema": "sch",
                "name": "tbl",
                "package_name": "pkg",
                "build_path": "target/run/tbl.sql"
            }
        }))
        .unwrap();
        assert_eq!(extract_reporting(&result).unwrap().rows, None);

        result
            .adapter_response
            .insert("rows_affected".to_string(), json!(5));
        let reporting = extract_reporting(&result).unwrap();
        assert_eq!(reporting.rows, Some(5));
        assert_eq!(reporting.freshness, None);
    }
}
