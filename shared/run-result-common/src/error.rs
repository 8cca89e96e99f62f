//! Error types for result formatting

use thiserror::Error;

/// Raised when a result is missing a field its resource kind requires
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A required field is structurally absent
    #[error("Missing required field `{field}` on {resource_type} result `{name}`")]
    MissingField {
        field: &'static str,
        resource_type: String,
        name: String,
    },
}

impl FormatError {
    pub fn missing(field: &'static str, resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        FormatError::MissingField {
            field,
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}
