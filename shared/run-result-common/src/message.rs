//! Message value objects handed to every sink

use crate::severity::LogLevel;
use crate::types::{TimePeriod, TimingInfo};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat, insertion-ordered mapping of scalar context fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Map<String, Value>);

impl Context {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert a scalar, replacing any previous value for the key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Merge another context in; its values win on key collisions
    pub fn extend(&mut self, other: Context) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Scalar rendered as plain text; `None` for nulls and nested values
    pub fn scalar_text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// `key:value` pairs for metric tags, skipping nulls
    pub fn to_tags(&self) -> Vec<String> {
        self.0
            .iter()
            .filter_map(|(key, value)| Self::scalar_text(value).map(|v| format!("{}:{}", key, v)))
            .collect()
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Staleness of a source, expressed in the unit of the threshold it was checked against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Freshness {
    pub unit: TimePeriod,
    /// Rounded for display; no more precise than `unit` implies
    pub age: f64,
    pub loader: String,
    pub threshold: f64,
}

impl Freshness {
    /// Fields flattened for merging into a message context
    pub fn to_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("unit", self.unit.as_str());
        context.insert("age", self.age);
        context.insert("loader", self.loader.clone());
        context.insert("threshold", self.threshold);
        context
    }
}

/// Timing, row and freshness figures for one result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reporting {
    pub rows: Option<i64>,
    pub execution_time: f64,
    pub timing: Vec<TimingInfo>,
    pub freshness: Option<Freshness>,
}

impl Reporting {
    /// Completion time of the `execute` phase as unix seconds
    pub fn execution_timestamp(&self) -> Option<f64> {
        crate::utils::execution_timestamp(&self.timing)
    }
}

/// Uniform notification record produced once per result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub level: LogLevel,
    pub title: String,
    pub message: String,
    pub error: Option<String>,
    pub context: Context,
    pub reporting: Option<Reporting>,
}
