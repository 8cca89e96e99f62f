//! Node descriptor extraction
//!
//! Flattens the node attached to a result into a [`Context`]. Source
//! definitions and compiled nodes locate their files differently; compiled
//! nodes additionally contribute a config extension picked by resource kind.

use crate::error::FormatError;
use crate::message::Context;
use crate::types::{Node, NodeConfig, RawResult, ResourceKind};
use serde_json::Value;
use tracing::debug;

/// Identity fields shared by every node kind, lower-cased
fn base_context(result: &RawResult) -> Context {
    let node = &result.node;
    let mut context = Context::new();
    context.insert("database", node.database.to_lowercase());
    context.insert("schema", node.schema.to_lowercase());
    context.insert("path", node.path.to_lowercase());
    context.insert("name", node.name.to_lowercase());
    context.insert("resource_type", result.resource_kind.as_str().to_lowercase());
    context.insert("package_name", node.package_name.to_lowercase());

    // only add tags when they exist
    if !node.tags.is_empty() {
        context.insert("tags", node.tags.join(", ").to_lowercase());
    }

    context
}

fn source_definition_context(result: &RawResult) -> Result<Context, FormatError> {
    let node = &result.node;
    let original_file_path = node
        .original_file_path
        .as_deref()
        .ok_or_else(|| missing(result, "node.original_file_path"))?;

    let mut context = base_context(result);
    context.insert("filename", original_file_path);
    context.insert("abs_path", format!("{}/{}", node.root_path, original_file_path));
    Ok(context)
}

fn compiled_node_context(result: &RawResult) -> Result<Context, FormatError> {
    let node = &result.node;
    let build_path = node
        .build_path
        .as_deref()
        .ok_or_else(|| missing(result, "node.build_path"))?;

    let mut context = base_context(result);
    context.insert("filename", node.root_path.clone());
    context.insert("abs_path", format!("{}/{}", node.root_path, build_path));
    Ok(context)
}

// TODO: seed configs carry column types and quoting; add them once a sink reads them
fn seed_config_context(_config: &NodeConfig) -> Context {
    Context::new()
}

fn test_config_context(config: &NodeConfig) -> Context {
    let mut context = Context::new();
    context.insert("materialized", config.materialized.to_lowercase());
    context
}

fn snapshot_config_context(config: &NodeConfig) -> Context {
    let mut context = default_config_context(config);
    context.insert(
        "strategy",
        config.strategy.as_deref().unwrap_or_default().to_lowercase(),
    );
    context.insert(
        "unique_key",
        config
            .unique_key
            .as_ref()
            .map(|key| key.joined().to_lowercase())
            .unwrap_or_default(),
    );
    context.insert(
        "updated_at",
        config
            .updated_at
            .as_deref()
            .map(|column| Value::from(column.to_lowercase()))
            .unwrap_or(Value::Null),
    );
    context
}

fn default_config_context(config: &NodeConfig) -> Context {
    let mut context = Context::new();
    context.insert("materialized", config.materialized.to_lowercase());
    context
}

fn config_context(kind: &ResourceKind, node: &Node) -> Context {
    match kind {
        ResourceKind::Seed => {
            debug!("parsing seed node config");
            seed_config_context(&node.config)
        }
        ResourceKind::Test => {
            debug!("parsing test node config");
            test_config_context(&node.config)
        }
        ResourceKind::Snapshot => {
            debug!("parsing snapshot node config");
            snapshot_config_context(&node.config)
        }
        _ => {
            debug!("parsing default node config");
            default_config_context(&node.config)
        }
    }
}

fn missing(result: &RawResult, field: &'static str) -> FormatError {
    FormatError::missing(field, result.resource_kind.as_str(), result.node.name.clone())
}

/// Extract the flat context for one result without touching the result itself
pub fn extract_context(result: &RawResult) -> Result<Context, FormatError> {
    if result.node.is_source_definition() {
        debug!(name = %result.node.name, "parsing source definition node");
        return source_definition_context(result);
    }

    let mut context = compiled_node_context(result)?;
    context.extend(config_context(&result.resource_kind, &result.node));
    Ok(context)
}
