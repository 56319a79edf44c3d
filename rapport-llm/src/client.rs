//! LLM Client — one interface over Ollama and OpenAI-compatible back-ends.

use std::time::{Duration, Instant};

use rapport_core::config::LlmConfig;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::retry::RetryPolicy;
use crate::types::{LlmRequest, LlmResponse};

/// Longest provider error body kept in an [`LlmError::Http`].
const MAX_ERROR_BODY: usize = 512;

/// Provider backend for LLM inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmProvider {
    /// Ollama running locally.
    Ollama {
        /// Server root, e.g. `http://localhost:11434`.
        base_url: String,
    },
    /// OpenAI-compatible chat-completions API.
    OpenAiCompatible {
        /// API root, without the `/v1` suffix.
        base_url: String,
        /// Bearer token.
        api_key: String,
    },
    /// No LLM available; every call fails and callers fall back to rules.
    None,
}

impl LlmProvider {
    /// Short provider name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ollama { .. } => "ollama",
            Self::OpenAiCompatible { .. } => "openai",
            Self::None => "none",
        }
    }
}

/// Routes requests to the configured backend, retrying transient failures.
#[derive(Debug, Clone)]
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
    retry: RetryPolicy,
    max_tokens: u32,
    temperature: f32,
    timeout_ms: u64,
}

impl LlmClient {
    /// Create a new LLM client with default sampling settings.
    #[must_use]
    pub fn new(provider: LlmProvider, model: impl Into<String>, retry: RetryPolicy) -> Self {
        let defaults = LlmConfig::default();
        Self {
            provider,
            http: Client::new(),
            model: model.into(),
            retry,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            timeout_ms: defaults.request_timeout_ms,
        }
    }

    /// Create a client with no LLM backend (all calls fail → rule-based fallback).
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new(), RetryPolicy::none())
    }

    /// Build a client from the `[llm]` configuration section.
    ///
    /// The OpenAI-compatible provider reads its key from the environment
    /// variable named by `api_key_env`.
    ///
    /// # Errors
    /// Returns [`LlmError::ConfigError`] for an unknown provider or a missing key.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let provider = match config.provider.trim().to_ascii_lowercase().as_str() {
            "none" | "" => LlmProvider::None,
            "ollama" => LlmProvider::Ollama { base_url },
            "openai" | "openai_compatible" => {
                let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                    LlmError::ConfigError(format!(
                        "environment variable {} is not set",
                        config.api_key_env
                    ))
                })?;
                LlmProvider::OpenAiCompatible { base_url, api_key }
            }
            other => {
                return Err(LlmError::ConfigError(format!("unknown provider '{other}'")));
            }
        };

        info!(
            provider = provider.name(),
            model = %config.model,
            max_retries = config.retry.max_retries,
            "LLM client configured"
        );

        Ok(Self {
            provider,
            http: Client::new(),
            model: config.model.clone(),
            retry: RetryPolicy::from_config(&config.retry),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout_ms: config.request_timeout_ms,
        })
    }

    /// Analysis request carrying this client's sampling settings.
    #[must_use]
    pub fn analysis_request(&self, system: impl Into<String>, user: impl Into<String>) -> LlmRequest {
        LlmRequest::analysis(system, user)
            .with_sampling(self.max_tokens, self.temperature)
            .with_timeout(self.timeout_ms)
    }

    /// Generate a response from the LLM.
    ///
    /// # Errors
    /// [`LlmError::Unavailable`] immediately when no provider is configured;
    /// otherwise the first permanent failure or [`LlmError::RetriesExhausted`].
    pub async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match &self.provider {
            LlmProvider::None => Err(LlmError::Unavailable("No LLM provider configured".into())),
            LlmProvider::Ollama { base_url } => {
                self.retry
                    .run("ollama", || self.generate_ollama(base_url, request))
                    .await
            }
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                self.retry
                    .run("openai", || self.generate_openai(base_url, api_key, request))
                    .await
            }
        }
    }

    /// One attempt against Ollama's `/api/generate`.
    async fn generate_ollama(&self, base_url: &str, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{base_url}/api/generate");
        let mut body = json!({
            "model": self.model,
            "system": request.system,
            "prompt": request.user,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            }
        });
        if request.json_mode {
            body["format"] = json!("json");
        }
        if let Some(grammar) = &request.grammar {
            body["options"]["grammar"] = json!(grammar);
        }

        let (json, latency_ms) = self.post(&url, None, &body, request.timeout_ms).await?;
        let text = json["response"].as_str().unwrap_or_default().to_string();
        Ok(LlmResponse {
            text,
            tokens_generated: token_count(&json["eval_count"]),
            latency_ms,
            model: self.model.clone(),
        })
    }

    /// One attempt against `/v1/chat/completions`.
    async fn generate_openai(
        &self,
        base_url: &str,
        api_key: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let url = format!("{base_url}/v1/chat/completions");
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });
        if request.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let (json, latency_ms) = self.post(&url, Some(api_key), &body, request.timeout_ms).await?;
        let text = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        Ok(LlmResponse {
            text,
            tokens_generated: token_count(&json["usage"]["completion_tokens"]),
            latency_ms,
            model: self.model.clone(),
        })
    }

    /// POST `body` and decode a JSON reply, mapping every failure into [`LlmError`].
    async fn post(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &Value,
        timeout_ms: u64,
    ) -> Result<(Value, u64), LlmError> {
        let timeout = Duration::from_millis(timeout_ms);
        let mut builder = self.http.post(url).json(body).timeout(timeout);
        if let Some(key) = bearer {
            builder = builder.bearer_auth(key);
        }

        let start = Instant::now();
        let send = async {
            let resp = builder.send().await?;
            let status = resp.status();
            if !status.is_success() {
                let mut text = resp.text().await.unwrap_or_default();
                if text.len() > MAX_ERROR_BODY {
                    let cut = (0..=MAX_ERROR_BODY)
                        .rev()
                        .find(|i| text.is_char_boundary(*i))
                        .unwrap_or(0);
                    text.truncate(cut);
                }
                return Err(LlmError::Http {
                    status: status.as_u16(),
                    body: text,
                });
            }
            resp.json::<Value>()
                .await
                .map_err(|e| LlmError::ParseError(e.to_string()))
        };

        let json = match tokio::time::timeout(timeout, send).await {
            Ok(Ok(json)) => json,
            Ok(Err(LlmError::Timeout(_))) | Err(_) => return Err(LlmError::Timeout(timeout_ms)),
            Ok(Err(e)) => return Err(e),
        };
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(url, latency_ms, "LLM call completed");
        Ok((json, latency_ms))
    }

    /// Parse a raw LLM response text as structured JSON.
    ///
    /// # Errors
    /// Returns [`LlmError::ParseError`] if the text is not valid JSON for `T`.
    pub fn parse_structured<T: serde::de::DeserializeOwned>(
        &self,
        response: &LlmResponse,
    ) -> Result<T, LlmError> {
        serde_json::from_str(response.text.trim()).map_err(|e| {
            warn!(model = %response.model, error = %e, "Structured LLM output rejected");
            LlmError::ParseError(format!("{e}: raw text '{}'", response.text))
        })
    }

    /// Check if the LLM client has a backend configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// Configured backend.
    #[must_use]
    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Model name sent to the backend.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Retry policy applied to every call.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

fn token_count(value: &Value) -> u32 {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn none_provider_fails_fast() {
        let client = LlmClient::none();
        assert!(!client.is_available());
        let err = client
            .generate(&LlmRequest::analysis("s", "u"))
            .await
            .expect_err("no backend");
        assert!(matches!(err, LlmError::Unavailable(_)));
    }

    #[test]
    fn from_config_picks_provider() {
        let mut config = LlmConfig {
            provider: "Ollama".into(),
            base_url: "http://localhost:11434/".into(),
            ..LlmConfig::default()
        };
        let client = LlmClient::from_config(&config).expect("ollama config");
        assert_eq!(
            client.provider(),
            &LlmProvider::Ollama {
                base_url: "http://localhost:11434".into()
            }
        );
        assert_eq!(client.retry_policy().max_retries, config.retry.max_retries);

        config.provider = "carrier-pigeon".into();
        assert!(matches!(
            LlmClient::from_config(&config),
            Err(LlmError::ConfigError(_))
        ));
    }

    #[test]
    fn openai_requires_key_variable() {
        let config = LlmConfig {
            provider: "openai".into(),
            api_key_env: "RAPPORT_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            LlmClient::from_config(&config),
            Err(LlmError::ConfigError(msg)) if msg.contains("RAPPORT_TEST_KEY_THAT_IS_NEVER_SET")
        ));
    }

    #[test]
    fn analysis_request_uses_client_settings() {
        let config = LlmConfig {
            provider: "ollama".into(),
            max_tokens: 64,
            request_timeout_ms: 1500,
            ..LlmConfig::default()
        };
        let client = LlmClient::from_config(&config).expect("valid");
        let req = client.analysis_request("sys", "user");
        assert_eq!(req.max_tokens, 64);
        assert_eq!(req.timeout_ms, 1500);
        assert!(req.json_mode);
    }

    #[test]
    fn structured_parse_reports_raw_text() {
        let client = LlmClient::none();
        let resp = LlmResponse {
            text: "not json".into(),
            tokens_generated: 2,
            latency_ms: 1,
            model: "m".into(),
        };
        let err = client
            .parse_structured::<Value>(&resp)
            .expect_err("invalid json");
        assert!(matches!(err, LlmError::ParseError(msg) if msg.contains("not json")));
    }
}
