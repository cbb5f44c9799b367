use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned by the API (`{"detail": ...}`).
///
/// `detail` is usually a string but validation failures return a list of
/// objects, so it is kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable detail or structured validation errors
    pub detail: Value,
}

impl ErrorBody {
    /// Creates an error body with a plain message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            detail: Value::String(message.into()),
        }
    }

    /// Renders `detail` as a single line of text.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.detail {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ErrorBody {}
