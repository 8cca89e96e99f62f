//! Result-to-message formatter
//!
//! Classifies a result by resource kind and builds the title, text, error
//! detail and level handed to every sink. Formatting is a pure function of
//! one result: the same input always yields an identical [`Message`].

use crate::error::FormatError;
use crate::message::Message;
use crate::node::extract_context;
use crate::reporting::extract_reporting;
use crate::severity::LogLevel;
use crate::types::{NodeStatus, RawResult, ResourceKind};
use crate::utils::{capitalize, dedup_preserving_order, full_db_id};

fn target_id(result: &RawResult) -> String {
    let node = &result.node;
    full_db_id(&node.database, &node.schema, &node.name, true)
}

fn source_message(result: &RawResult) -> Result<Message, FormatError> {
    let reporting = extract_reporting(result)?;
    let freshness = reporting.freshness.clone().ok_or_else(|| {
        FormatError::missing("node.freshness", result.resource_kind.as_str(), result.node.name.clone())
    })?;

    let is_error = matches!(result.status, NodeStatus::Error | NodeStatus::RuntimeError);
    let is_warning = result.status == NodeStatus::Warn;
    let db_id = target_id(result);

    let title_id = if is_error || is_warning {
        "out of date"
    } else {
        "up to date"
    };
    let title = format!("Source freshness {}.", title_id);

    let mut error = None;
    let mut message = format!("Source `{}` is up to date", db_id);
    if is_error || is_warning {
        let modifier = if is_error { "failure" } else { "warning" };
        message = format!(
            "Source `{}` is out of date, {} threshold exceeded",
            db_id, modifier
        );
        error = Some(format!(
            "Freshness of {:?} {}(s) exceeded the {} threshold of {} {}(s)",
            freshness.age, freshness.unit, modifier, freshness.threshold, freshness.unit
        ));
    }

    // engine detail wins over the synthesized text
    if let Some(engine_message) = result.engine_message() {
        error = Some(engine_message.to_string());
    }

    let mut context = extract_context(result)?;
    context.extend(freshness.to_context());

    Ok(Message {
        level: LogLevel::from_status(&result.status),
        title,
        message,
        error,
        context,
        reporting: Some(reporting),
    })
}

fn model_message(result: &RawResult) -> Result<Message, FormatError> {
    let reporting = extract_reporting(result)?;
    let node = &result.node;

    let depends_on = dedup_preserving_order(&node.depends_on.nodes)
        .join(", ")
        .to_uppercase();
    let title = format!(
        "{} model {}.",
        capitalize(&node.config.materialized),
        result.status
    );
    let message = format!(
        "*[{}]* model `{}` that depends on `{}`",
        result.status.as_str().to_uppercase(),
        target_id(result),
        depends_on
    );

    Ok(Message {
        level: LogLevel::from_status(&result.status),
        title,
        message,
        error: result.message.clone(),
        context: extract_context(result)?,
        reporting: Some(reporting),
    })
}

fn test_message(result: &RawResult) -> Result<Message, FormatError> {
    let reporting = extract_reporting(result)?;
    let node = &result.node;
    let status = result.status.as_str().to_uppercase();

    let title = format!("[{}] Test {}", status, node.name);
    let message = format!(
        "*[{}]* Test {} in `{}`",
        status,
        node.name,
        node.database.to_uppercase()
    );

    // older engines put the failing row count in the message, newer ones a sentence
    let error = match result.status {
        NodeStatus::Warn | NodeStatus::Fail | NodeStatus::Error | NodeStatus::RuntimeError => {
            let engine_message = result.engine_message();
            let count = engine_message
                .filter(|m| m.trim().parse::<i64>().is_ok())
                .map(str::to_string)
                .or_else(|| result.failures.map(|f| f.to_string()))
                .or_else(|| engine_message.map(str::to_string))
                .unwrap_or_else(|| "unknown".to_string());
            Some(format!("Got {} results, expected 0", count))
        }
        _ => None,
    };

    Ok(Message {
        level: LogLevel::from_status(&result.status),
        title,
        message,
        error,
        context: extract_context(result)?,
        reporting: Some(reporting),
    })
}

fn snapshot_message(result: &RawResult) -> Result<Message, FormatError> {
    let reporting = extract_reporting(result)?;
    let is_error = matches!(result.status, NodeStatus::Error | NodeStatus::Skipped);

    let title = format!("Snapshot {}", if is_error { "failed" } else { "completed" });
    let message = format!(
        "*[{}]* snapshot with target `{}`",
        result.status.as_str().to_uppercase(),
        target_id(result)
    );

    Ok(Message {
        level: LogLevel::from_status(&result.status),
        title,
        message,
        error: result.message.clone(),
        context: extract_context(result)?,
        reporting: Some(reporting),
    })
}

/// Format one result into the message every sink consumes
pub fn format_result(result: &RawResult) -> Result<Message, FormatError> {
    match &result.resource_kind {
        ResourceKind::Source => source_message(result),
        ResourceKind::Model => model_message(result),
        ResourceKind::Test => test_message(result),
        ResourceKind::Snapshot => snapshot_message(result),
        ResourceKind::Seed | ResourceKind::Other(_) => model_message(result),
    }
}
