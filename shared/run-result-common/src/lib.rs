//! Shared types and the result formatter for run monitors
//!
//! This library turns the per-node results written by a transformation run
//! engine into uniform [`Message`] values that alert, metrics and log sinks
//! consume. Everything here is pure: no I/O, no shared state.

pub mod error;
pub mod formatter;
pub mod message;
pub mod node;
pub mod reporting;
pub mod severity;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::FormatError;
pub use formatter::format_result;
pub use message::{Context, Freshness, Message, Reporting};
pub use node::extract_context;
pub use reporting::{extract_freshness, extract_reporting};
pub use severity::{LogLevel, StatusColor};
pub use types::*;
