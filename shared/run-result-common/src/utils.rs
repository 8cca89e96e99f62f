//! Small formatting helpers shared by the extractors and the sinks

use crate::types::{TimePeriod, TimingInfo};

/// `DB.SCHEMA.NAME` identifier, upper-cased unless `capitalize` is false
pub fn full_db_id(database: &str, schema: &str, name: &str, capitalize: bool) -> String {
    let id = format!("{}.{}.{}", database, schema, name);
    if capitalize {
        id.to_uppercase()
    } else {
        id
    }
}

/// Round half to even at `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Convert a raw age in seconds to the display unit of its threshold
///
/// Hours and days keep no decimals, minutes keep one and seconds keep two.
pub fn freshness_age_to_unit(age_seconds: f64, unit: TimePeriod) -> f64 {
    match unit {
        TimePeriod::Hour => round_to(age_seconds / 3600.0, 0),
        TimePeriod::Minute => round_to(age_seconds / 60.0, 1),
        TimePeriod::Day => round_to(age_seconds / 86400.0, 0),
        TimePeriod::Second => round_to(age_seconds, 2),
    }
}

/// Unix seconds at which the last `execute` phase completed
pub fn execution_timestamp(timing: &[TimingInfo]) -> Option<f64> {
    timing
        .iter()
        .filter(|t| t.name == "execute")
        .filter_map(|t| t.completed_at)
        .last()
        .map(|completed| completed.timestamp() as f64)
}

/// First character upper-cased, the rest lower-cased
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => {
            let rest = chars.as_str().to_lowercase();
            first.to_uppercase().chain(rest.chars()).collect()
        }
        None => String::new(),
    }
}

/// Remove duplicates while keeping the first occurrence of each item
pub fn dedup_preserving_order(items: &[String]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .map(String::as_str)
        .filter(|item| seen.insert(*item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    #[rstest]
    #[case(7200.0, TimePeriod::Hour, 2.0)]
    #[case(120.0, TimePeriod::Minute, 2.0)]
    #[case(120.0, TimePeriod::Second, 120.0)]
    #[case(14400.0, TimePeriod::Hour, 4.0)]
    #[case(52531200.0, TimePeriod::Day, 608.0)]
    #[case(90.0, TimePeriod::Minute, 1.5)]
    #[case(1.23456, TimePeriod::Second, 1.23)]
    #[case(5400.0, TimePeriod::Hour, 2.0)]
    fn test_freshness_age_to_unit(#[case] age: f64, #[case] unit: TimePeriod, #[case] expected: f64) {
        assert_eq!(freshness_age_to_unit(age, unit), expected);
    }

    #[test]
    fn test_full_db_id() {
        assert_eq!(full_db_id("db", "schema", "table", true), "DB.SCHEMA.TABLE");
        assert_eq!(full_db_id("db", "schema", "table", false), "db.schema.table");
        assert_eq!(full_db_id("db", "SCHEMA", "table", false), "db.SCHEMA.table");
    }

    #[test]
    fn test_execution_timestamp() {
        let timing = vec![
            TimingInfo {
                name: "compile".to_string(),
                started_at: Some(Utc.with_ymd_and_hms(2021, 4, 7, 17, 16, 32).unwrap()),
                completed_at: Some(Utc.with_ymd_and_hms(2021, 4, 7, 17, 16, 33).unwrap()),
            },
            TimingInfo {
                name: "execute".to_string(),
                started_at: Some(Utc.with_ymd_and_hms(2021, 4, 7, 17, 16, 33).unwrap()),
                completed_at: Some(Utc.with_ymd_and_hms(2021, 4, 7, 17, 16, 34).unwrap()),
            },
        ];
        assert_eq!(execution_timestamp(&timing), Some(1617815794.0));
        assert_eq!(execution_timestamp(&timing[..1]), None);
        assert_eq!(execution_timestamp(&[]), None);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("incremental"), "Incremental");
        assert_eq!(capitalize("TABLE"), "Table");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_dedup_preserving_order() {
        let items = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(dedup_preserving_order(&items), vec!["b", "a"]);
    }
}
