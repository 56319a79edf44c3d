//! Prompt templates and structured-output grammars for the analyst model.
//!
//! The fact-extraction request body is built by `rapport-core`; this module
//! supplies the system role around it, plus the sentiment prompt used by
//! [`crate::analyzer::score_interaction`].

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::LlmError;

pub use rapport_core::facts::prompt::render_template;

/// System role for every analysis call.
pub const ANALYST_SYSTEM: &str = r"You are a careful conversation analyst for a companion chat application.
You read what a user wrote and report only what the text supports.
Never invent details. Never answer the user or continue the conversation.
Output JSON only, with no commentary before or after it.";

/// User prompt wrapping the extraction request built by the core.
pub const FACT_EXTRACTION_USER: &str = r"{request}";

/// System prompt for judging the tone of one message.
pub const INTERACTION_SENTIMENT_SYSTEM: &str = r"You are a careful conversation analyst for a companion chat application.
You judge how a user's message treats the companion named {personality_name}.
Output JSON only.";

/// User prompt for judging the tone of one message.
pub const INTERACTION_SENTIMENT_USER: &str = r#"Classify the tone of this message towards {personality_name}.

Message:
"""
{message}
"""

Respond with {"interaction_type": one of "very_positive", "positive", "neutral", "negative", "very_negative", "reason": a short phrase}."#;

/// GBNF grammar for a list of extracted facts.
pub const FACT_LIST_GRAMMAR: &str = r#"root   ::= "[" ws ( fact ( "," ws fact )* )? "]" ws
fact   ::= "{" ws "\"category\"" ws ":" ws string "," ws "\"key\"" ws ":" ws string "," ws "\"value\"" ws ":" ws string "," ws "\"confidence\"" ws ":" ws number "}" ws
string ::= "\"" [^"]* "\"" ws
number ::= "0" ( "." [0-9]+ )? | "1" ( ".0" )?
ws     ::= [ \t\n]*"#;

/// GBNF grammar for a sentiment judgement.
pub const SENTIMENT_GRAMMAR: &str = r#"root   ::= "{" ws "\"interaction_type\"" ws ":" ws label "," ws "\"reason\"" ws ":" ws string "}" ws
label  ::= "\"very_positive\"" | "\"positive\"" | "\"neutral\"" | "\"negative\"" | "\"very_negative\""
string ::= "\"" [^"]* "\"" ws
ws     ::= [ \t\n]*"#;

// ---------------------------------------------------------------------------
// Prompt Template Engine
// ---------------------------------------------------------------------------

/// Identifies a prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Durable-fact extraction from one message.
    FactExtraction,
    /// Tone of one message towards the companion.
    InteractionSentiment,
}

impl PromptId {
    /// TOML filename for this prompt.
    #[must_use]
    pub fn filename(self) -> &'static str {
        match self {
            Self::FactExtraction => "fact_extraction.toml",
            Self::InteractionSentiment => "interaction_sentiment.toml",
        }
    }

    /// Every known prompt.
    #[must_use]
    pub fn all() -> &'static [PromptId] {
        &[Self::FactExtraction, Self::InteractionSentiment]
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FactExtraction => "fact_extraction",
            Self::InteractionSentiment => "interaction_sentiment",
        })
    }
}

impl FromStr for PromptId {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fact_extraction" => Ok(Self::FactExtraction),
            "interaction_sentiment" => Ok(Self::InteractionSentiment),
            other => Err(LlmError::ConfigError(format!("unknown prompt id '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TomlPromptFile {
    prompt: PromptTemplate,
}

/// A loaded, ready-to-render prompt template.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PromptTemplate {
    /// Prompt version string (e.g., "1.0").
    pub version: String,
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Inline GBNF grammar; empty when the provider's JSON mode suffices.
    #[serde(default)]
    pub grammar: String,
    /// System prompt template (contains `{key}` placeholders).
    pub system: String,
    /// User prompt template (contains `{key}` placeholders).
    pub user: String,
}

/// Loads versioned prompt templates and renders them.
///
/// ```
/// use rapport_llm::prompt::{PromptEngine, PromptId};
///
/// let engine = PromptEngine::builtin();
/// let (system, user) = engine
///     .render(PromptId::InteractionSentiment, &[("personality_name", "Aria"), ("message", "thanks!")])
///     .expect("builtin template");
/// assert!(system.contains("Aria"));
/// assert!(user.contains("thanks!"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptEngine {
    templates: HashMap<PromptId, PromptTemplate>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptEngine {
    /// Engine holding the compiled-in templates.
    #[must_use]
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        templates.insert(
            PromptId::FactExtraction,
            PromptTemplate {
                version: "builtin".into(),
                max_tokens: 512,
                temperature: 0.2,
                grammar: FACT_LIST_GRAMMAR.into(),
                system: ANALYST_SYSTEM.into(),
                user: FACT_EXTRACTION_USER.into(),
            },
        );
        templates.insert(
            PromptId::InteractionSentiment,
            PromptTemplate {
                version: "builtin".into(),
                max_tokens: 64,
                temperature: 0.0,
                grammar: SENTIMENT_GRAMMAR.into(),
                system: INTERACTION_SENTIMENT_SYSTEM.into(),
                user: INTERACTION_SENTIMENT_USER.into(),
            },
        );
        Self { templates }
    }

    /// Load templates from a directory of TOML files, one per [`PromptId`].
    ///
    /// Missing files keep their built-in template; unknown files are ignored.
    ///
    /// # Errors
    /// Returns [`LlmError::ConfigError`] when the directory holds no prompt
    /// files, or a present file cannot be read or parsed.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self, LlmError> {
        let dir = dir.as_ref();
        let mut engine = Self::builtin();
        let mut loaded = 0usize;

        for id in PromptId::all() {
            let path = dir.join(id.filename());
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&path).map_err(|e| {
                LlmError::ConfigError(format!("failed to read {}: {e}", path.display()))
            })?;
            let parsed: TomlPromptFile = toml::from_str(&content).map_err(|e| {
                LlmError::ConfigError(format!("failed to parse {}: {e}", path.display()))
            })?;
            engine.templates.insert(*id, parsed.prompt);
            loaded += 1;
        }

        if loaded == 0 {
            return Err(LlmError::ConfigError(format!(
                "no prompt templates found in directory: {}",
                dir.display()
            )));
        }
        Ok(engine)
    }

    /// Get a loaded prompt template by ID.
    #[must_use]
    pub fn get(&self, id: PromptId) -> Option<&PromptTemplate> {
        self.templates.get(&id)
    }

    /// Render `(system, user)` for `id` with `{key}` placeholders replaced.
    ///
    /// # Errors
    /// Returns [`LlmError::ConfigError`] if the prompt is not loaded.
    pub fn render(&self, id: PromptId, vars: &[(&str, &str)]) -> Result<(String, String), LlmError> {
        let tpl = self
            .get(id)
            .ok_or_else(|| LlmError::ConfigError(format!("prompt template '{id}' not loaded")))?;
        Ok((render_template(&tpl.system, vars), render_template(&tpl.user, vars)))
    }

    /// Number of loaded templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no templates are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
