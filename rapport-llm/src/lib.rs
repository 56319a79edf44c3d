//! # rapport-llm — Language-Model Analyst for Rapport
//!
//! Implements the core's [`rapport_core::TextAnalyzer`] boundary over:
//!   - **Ollama** (local, recommended default)
//!   - **OpenAI-compatible API** (any chat-completions endpoint)
//!
//! Every call goes through this crate, which provides:
//!   - Structured output (JSON mode and GBNF grammars)
//!   - Per-request timeouts
//!   - An explicit [`RetryPolicy`] with exponential backoff
//!   - Graceful degradation to the core's rule-based paths
//!
//! # Architecture
//!
//! ```text
//! FactExtractor::extract_with ──► TextAnalyzer ──► LlmAnalyzer ──► LlmClient ──► provider
//!        │                                                             │
//!        └──────── rules ◄──────────── RapportError::Analyzer ◄────────┘
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analyzer;
pub mod client;
pub mod error;
pub mod prompt;
pub mod retry;
pub mod types;

pub use analyzer::LlmAnalyzer;
pub use client::{LlmClient, LlmProvider};
pub use error::LlmError;
pub use retry::RetryPolicy;
pub use types::{LlmRequest, LlmResponse};
