//! Domain errors for the pagecap discovery engine.

use thiserror::Error;

/// Domain-level errors that can occur while discovering, caching, or
/// aggregating page capabilities.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Classifier '{classifier}' failed: {message}")]
    Classifier { classifier: String, message: String },

    #[error("Element handle does not belong to the active scan")]
    StaleElementHandle,

    #[error("Element not found: {0}")]
    ElementNotFound(usize),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Page context unavailable: {0}")]
    PageUnavailable(String),
}

impl DomainError {
    /// Build a classifier failure for the named classifier.
    pub fn classifier(classifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Classifier {
            classifier: classifier.into(),
            message: message.into(),
        }
    }
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
