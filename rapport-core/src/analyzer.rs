//! Text-analysis collaborator boundary.
//!
//! Fact extraction can delegate to an external language model. The core only
//! knows this trait: hand over the user message and a ready-made extraction
//! prompt, get back raw text that may contain JSON. Timeouts and retries are
//! the implementor's business.

use std::future::Future;

use crate::error::Result;

/// An external service that turns a message plus an extraction prompt into text.
pub trait TextAnalyzer: Send + Sync {
    /// Analyze `message` following `prompt`.
    ///
    /// # Errors
    /// Returns `RapportError::Analyzer` when the collaborator cannot answer.
    fn analyze(&self, message: &str, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Analyzer that always answers with a fixed response. Useful for tests and
/// offline replays of recorded model output.
#[derive(Debug, Clone)]
pub struct StaticAnalyzer {
    response: std::result::Result<String, String>,
}

impl StaticAnalyzer {
    /// Always return `response`.
    #[must_use]
    pub fn responding(response: impl Into<String>) -> Self {
        Self {
            response: Ok(response.into()),
        }
    }

    /// Always fail with `reason`.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            response: Err(reason.into()),
        }
    }
}

impl TextAnalyzer for StaticAnalyzer {
    async fn analyze(&self, _message: &str, _prompt: &str) -> Result<String> {
        self.response
            .clone()
            .map_err(crate::error::RapportError::Analyzer)
    }
}
