//! LLM error types.

use rapport_core::RapportError;
use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed before a response arrived.
    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    /// The provider answered with a non-success status.
    #[error("LLM provider returned HTTP {status}: {body}")]
    Http {
        /// Status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// LLM response was not valid JSON.
    #[error("Failed to parse LLM response as JSON: {0}")]
    ParseError(String),

    /// Request timed out.
    #[error("LLM request timed out after {0}ms")]
    Timeout(u64),

    /// LLM provider is unavailable.
    #[error("LLM provider unavailable: {0}")]
    Unavailable(String),

    /// All retry attempts exhausted.
    #[error("All LLM retry attempts exhausted after {attempts} tries: {last_error}")]
    RetriesExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Message of the final failure.
        last_error: String,
    },

    /// Configuration error.
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Whether another attempt could succeed.
    ///
    /// Transport failures, timeouts, rate limiting and server errors are
    /// transient; malformed output and configuration problems are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::Timeout(_) | Self::Unavailable(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::ParseError(_) | Self::RetriesExhausted { .. } | Self::ConfigError(_) => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(0)
        } else if err.is_connect() {
            LlmError::Unavailable(err.to_string())
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}

impl From<LlmError> for RapportError {
    fn from(err: LlmError) -> Self {
        RapportError::Analyzer(err.to_string())
    }
}
