//! Error types for the rapport core library.

use thiserror::Error;

/// Top-level error type for all rapport operations.
#[derive(Error, Debug)]
pub enum RapportError {
    /// A value was out of its valid range at construction time.
    ///
    /// Raised immediately by smart constructors and never clamped away.
    #[error("Validation failed for `{field}`: {reason}")]
    Validation {
        /// Which field or section failed.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The text-analysis collaborator failed to produce a response.
    #[error("Text analysis failed: {0}")]
    Analyzer(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RapportError {
    /// Shorthand for building a [`RapportError::Validation`].
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a construction-time validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl From<serde_json::Error> for RapportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, RapportError>;
