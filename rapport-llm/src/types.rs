//! Core types for LLM requests and responses.

use serde::{Deserialize, Serialize};

/// A request to the LLM.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    /// System prompt (analyst role, rules, constraints).
    pub system: String,
    /// User prompt (the message and the task).
    pub user: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Ask the provider for JSON-only output when it supports it.
    pub json_mode: bool,
    /// Optional GBNF grammar for structured output.
    pub grammar: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl LlmRequest {
    /// Low-temperature structured-analysis request.
    #[must_use]
    pub fn analysis(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 512,
            temperature: 0.2,
            json_mode: true,
            grammar: None,
            timeout_ms: 10_000,
        }
    }

    /// Set a GBNF grammar for structured output.
    #[must_use]
    pub fn with_grammar(mut self, grammar: impl Into<String>) -> Self {
        self.grammar = Some(grammar.into());
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set sampling limits.
    #[must_use]
    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

/// A response from the LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    /// The generated text.
    pub text: String,
    /// How many tokens were generated.
    pub tokens_generated: u32,
    /// Latency of the successful attempt in milliseconds.
    pub latency_ms: u64,
    /// Which model was used.
    pub model: String,
}

/// Structured sentiment judgement (matches [`crate::prompt::SENTIMENT_GRAMMAR`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentJudgement {
    /// One of `very_positive`, `positive`, `neutral`, `negative`, `very_negative`.
    pub interaction_type: String,
    /// Short justification.
    #[serde(default)]
    pub reason: String,
}
