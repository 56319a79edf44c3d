//! [`TextAnalyzer`] backed by a language model.
//!
//! Every LLM failure degrades to the rule-based path: extraction errors are
//! reported to the core extractor, which falls back to its rules, and
//! sentiment errors fall back to the keyword scorer here.

use rapport_core::affinity::InteractionType;
use rapport_core::affinity::scoring;
use rapport_core::{Result, TextAnalyzer};
use tracing::{debug, warn};

use crate::client::LlmClient;
use crate::error::LlmError;
use crate::prompt::{PromptEngine, PromptId};
use crate::types::{LlmRequest, SentimentJudgement};

/// An [`LlmClient`] paired with the templates it renders.
#[derive(Debug, Clone)]
pub struct LlmAnalyzer {
    client: LlmClient,
    prompts: PromptEngine,
}

impl LlmAnalyzer {
    /// Analyzer using `prompts` instead of the built-in templates.
    #[must_use]
    pub fn new(client: LlmClient, prompts: PromptEngine) -> Self {
        Self { client, prompts }
    }

    /// Underlying client.
    #[must_use]
    pub fn client(&self) -> &LlmClient {
        &self.client
    }

    /// Classify the tone of `message` towards `personality_name`.
    ///
    /// Falls back to the keyword scorer when the model is unavailable or
    /// answers with something other than a known label.
    pub async fn score_interaction(&self, personality_name: &str, message: &str) -> InteractionType {
        match self.judge(personality_name, message).await {
            Ok(kind) => kind,
            Err(e) => {
                debug!(error = %e, "Falling back to keyword sentiment");
                scoring::score_interaction(message)
            }
        }
    }

    async fn judge(&self, personality_name: &str, message: &str) -> std::result::Result<InteractionType, LlmError> {
        if !self.client.is_available() {
            return Err(LlmError::Unavailable("No LLM provider configured".into()));
        }
        let request = self.request(
            PromptId::InteractionSentiment,
            &[("personality_name", personality_name), ("message", message)],
        )?;
        let response = self.client.generate(&request).await?;
        let judgement: SentimentJudgement = self.client.parse_structured(&response)?;
        parse_interaction_type(&judgement.interaction_type)
    }

    async fn extract(&self, prompt: &str) -> std::result::Result<String, LlmError> {
        let request = self.request(PromptId::FactExtraction, &[("request", prompt)])?;
        let response = self.client.generate(&request).await?;
        debug!(
            model = %response.model,
            tokens = response.tokens_generated,
            latency_ms = response.latency_ms,
            "Fact extraction answered"
        );
        Ok(response.text)
    }

    fn request(&self, id: PromptId, vars: &[(&str, &str)]) -> std::result::Result<LlmRequest, LlmError> {
        let (system, user) = self.prompts.render(id, vars)?;
        let mut request = self.client.analysis_request(system, user);
        if let Some(tpl) = self.prompts.get(id) {
            let max_tokens = tpl.max_tokens.min(request.max_tokens);
            request = request.with_sampling(
                max_tokens,
                tpl.temperature,
            );
            if !tpl.grammar.is_empty() {
                request = request.with_grammar(tpl.grammar.clone());
            }
        }
        Ok(request)
    }
}

impl From<LlmClient> for LlmAnalyzer {
    fn from(client: LlmClient) -> Self {
        Self::new(client, PromptEngine::builtin())
    }
}

/// Map a model-produced label onto [`InteractionType`].
///
/// # Errors
/// Returns [`LlmError::ParseError`] for unknown labels.
pub fn parse_interaction_type(label: &str) -> std::result::Result<InteractionType, LlmError> {
    let normalized = label.trim().to_ascii_lowercase().replace([' ', '-'], "_");
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|_| LlmError::ParseError(format!("unknown interaction type '{label}'")))
}

impl TextAnalyzer for LlmAnalyzer {
    async fn analyze(&self, _message: &str, prompt: &str) -> Result<String> {
        self.extract(prompt).await.map_err(|e| {
            warn!(error = %e, "LLM fact extraction failed");
            e.into()
        })
    }
}

impl TextAnalyzer for LlmClient {
    async fn analyze(&self, message: &str, prompt: &str) -> Result<String> {
        LlmAnalyzer::from(self.clone()).analyze(message, prompt).await
    }
}
