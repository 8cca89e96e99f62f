//! Severity vocabulary
//!
//! Two fixed lookup tables: engine status to a generic log level, and log
//! level to the color used by alert payloads.

use crate::types::NodeStatus;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Generic severity level, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Sentinel for statuses without a mapping
    NotSet,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Map an engine status to a log level; unmapped statuses become `NotSet`
    pub fn from_status(status: &NodeStatus) -> Self {
        match status {
            NodeStatus::Success | NodeStatus::Pass => LogLevel::Info,
            NodeStatus::Warn | NodeStatus::Skipped => LogLevel::Warning,
            NodeStatus::Error | NodeStatus::Fail => LogLevel::Error,
            NodeStatus::RuntimeError => LogLevel::Critical,
            NodeStatus::Unknown(_) => LogLevel::NotSet,
        }
    }

    /// Numeric value on the conventional 0-15 logging scale
    pub fn value(&self) -> u8 {
        match self {
            LogLevel::NotSet => 0,
            LogLevel::Debug => 10,
            LogLevel::Info => 11,
            LogLevel::Notice => 12,
            LogLevel::Warning => 13,
            LogLevel::Error => 14,
            LogLevel::Critical => 15,
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(LogLevel::NotSet),
            10 => Some(LogLevel::Debug),
            11 => Some(LogLevel::Info),
            12 => Some(LogLevel::Notice),
            13 => Some(LogLevel::Warning),
            14 => Some(LogLevel::Error),
            15 => Some(LogLevel::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::NotSet => "NOTSET",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Notice => "NOTICE",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CRITICAL" | "FATAL" => Ok(LogLevel::Critical),
            "ERROR" => Ok(LogLevel::Error),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "NOTICE" => Ok(LogLevel::Notice),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "NOTSET" => Ok(LogLevel::NotSet),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Presentation colors for alert payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusColor {
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
    Success,
}

impl StatusColor {
    pub const FATAL: StatusColor = StatusColor::Critical;
    pub const WARN: StatusColor = StatusColor::Warning;

    pub fn hex(&self) -> &'static str {
        match self {
            StatusColor::Critical => "#0F0F0F",
            StatusColor::Error => "#E01E5A",
            StatusColor::Warning => "#FF7900",
            StatusColor::Notice => "#FFCC00",
            StatusColor::Info => "#1890ff",
            StatusColor::Debug => "#888888",
            StatusColor::Success => "#2EB67D",
        }
    }

    /// Color for a log level; `Debug` and the `NotSet` sentinel share one
    pub fn for_level(level: LogLevel) -> Self {
        match level {
            LogLevel::Critical => StatusColor::Critical,
            LogLevel::Error => StatusColor::Error,
            LogLevel::Warning => StatusColor::Warning,
            LogLevel::Notice => StatusColor::Notice,
            LogLevel::Info => StatusColor::Info,
            LogLevel::Debug | LogLevel::NotSet => StatusColor::Debug,
        }
    }

    /// Color for a raw numeric level; values off the scale fall back to `Info`
    pub fn for_level_value(value: u8) -> Self {
        LogLevel::from_value(value)
            .map(Self::for_level)
            .unwrap_or(StatusColor::Info)
    }
}

impl std::fmt::Display for StatusColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(NodeStatus::Success, LogLevel::Info)]
    #[case(NodeStatus::Error, LogLevel::Error)]
    #[case(NodeStatus::Fail, LogLevel::Error)]
    #[case(NodeStatus::Warn, LogLevel::Warning)]
    #[case(NodeStatus::Skipped, LogLevel::Warning)]
    #[case(NodeStatus::Pass, LogLevel::Info)]
    #[case(NodeStatus::RuntimeError, LogLevel::Critical)]
    #[case(NodeStatus::from("unknown_status"), LogLevel::NotSet)]
    fn test_status_to_level(#[case] status: NodeStatus, #[case] expected: LogLevel) {
        assert_eq!(LogLevel::from_status(&status), expected);
    }

    #[rstest]
    #[case(LogLevel::Critical, StatusColor::Critical)]
    #[case(LogLevel::Error, StatusColor::Error)]
    #[case(LogLevel::Warning, StatusColor::Warning)]
    #[case(LogLevel::Notice, StatusColor::Notice)]
    #[case(LogLevel::Info, StatusColor::Info)]
    #[case(LogLevel::Debug, StatusColor::Debug)]
    #[case(LogLevel::NotSet, StatusColor::Debug)]
    fn test_level_to_color(#[case] level: LogLevel, #[case] expected: StatusColor) {
        assert_eq!(StatusColor::for_level(level), expected);
    }

    #[test]
    fn test_off_scale_value_is_info() {
        assert_eq!(StatusColor::for_level_value(200), StatusColor::Info);
        assert_eq!(StatusColor::for_level_value(14), StatusColor::Error);
    }

    #[test]
    fn test_notset_is_below_every_named_level() {
        assert!(LogLevel::NotSet < LogLevel::Debug);
        assert!(LogLevel::Info < LogLevel::Notice);
        assert!(LogLevel::Error < LogLevel::Critical);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("fatal".parse::<LogLevel>(), Ok(LogLevel::Critical));
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!(" notice ".parse::<LogLevel>(), Ok(LogLevel::Notice));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_color_aliases() {
        assert_eq!(StatusColor::FATAL.hex(), StatusColor::Critical.hex());
        assert_eq!(StatusColor::WARN.hex(), "#FF7900");
    }
}
