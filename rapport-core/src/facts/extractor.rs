//! Fact extraction: deterministic rules offline, or delegation to a
//! [`TextAnalyzer`] with rule-based fallback.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::rules::{self, RuleMatch};
use super::{Fact, FactCategory, prompt};
use crate::analyzer::TextAnalyzer;
use crate::config::{FactConfig, FeatureFlags};
use crate::error::{RapportError, Result};

/// Confidence assumed when a collaborator omits it.
const DEFAULT_CANDIDATE_CONFIDENCE: f64 = 0.5;

fn default_candidate_confidence() -> f64 {
    DEFAULT_CANDIDATE_CONFIDENCE
}

/// A fact proposed by a rule or a collaborator, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCandidate {
    /// Category name; unknown names become `other`.
    pub category: String,
    /// Fact key.
    pub key: String,
    /// Fact value; non-string JSON is rendered as text.
    pub value: Value,
    /// Proposed confidence.
    #[serde(default = "default_candidate_confidence")]
    pub confidence: f64,
    /// Free-form labels.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FactCandidate {
    fn value_text(&self) -> Option<String> {
        match &self.value {
            Value::Null => None,
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            other => Some(other.to_string()),
        }
    }
}

impl From<RuleMatch> for FactCandidate {
    fn from(m: RuleMatch) -> Self {
        Self {
            category: m.category.as_str().to_string(),
            key: m.key,
            value: Value::String(m.value),
            confidence: m.confidence,
            tags: vec!["rule".to_string()],
        }
    }
}

/// Keep candidates whose confidence is at least `threshold`.
#[must_use]
pub fn filter_by_confidence(candidates: Vec<FactCandidate>, threshold: f64) -> Vec<FactCandidate> {
    candidates
        .into_iter()
        .filter(|c| c.confidence >= threshold)
        .collect()
}

/// Turns user messages into [`Fact`] records.
#[derive(Debug, Clone)]
pub struct FactExtractor {
    confidence_threshold: f64,
}

impl Default for FactExtractor {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
        }
    }
}

impl FactExtractor {
    /// Extractor dropping candidates below `confidence_threshold`.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` if the threshold is outside `[0, 1]`.
    pub fn new(confidence_threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(RapportError::validation(
                "confidence_threshold",
                format!("{confidence_threshold} is outside [0, 1]"),
            ));
        }
        Ok(Self {
            confidence_threshold,
        })
    }

    /// Extractor configured from the `[facts]` section.
    ///
    /// # Errors
    /// Same as [`FactExtractor::new`].
    pub fn from_config(config: &FactConfig) -> Result<Self> {
        Self::new(config.confidence_threshold)
    }

    /// The configured confidence threshold.
    #[must_use]
    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    /// Offline extraction with the deterministic rules.
    ///
    /// Returns nothing when rule-based extraction is disabled.
    #[must_use]
    pub fn extract(
        &self,
        user_id: &str,
        message: &str,
        message_id: Option<&str>,
        features: &FeatureFlags,
    ) -> Vec<Fact> {
        if !features.rule_based_fact_extraction {
            return Vec::new();
        }
        let candidates: Vec<FactCandidate> = rules::apply_rules(message)
            .into_iter()
            .map(FactCandidate::from)
            .collect();
        let kept = filter_by_confidence(candidates, self.confidence_threshold);
        self.create_fact_objects(user_id, kept, message_id)
    }

    /// Delegated extraction through `analyzer`.
    ///
    /// Falls back to [`FactExtractor::extract`] when delegation is disabled or
    /// the analyzer fails. An unparseable response yields no facts.
    pub async fn extract_with<A: TextAnalyzer>(
        &self,
        analyzer: &A,
        user_id: &str,
        message: &str,
        message_id: Option<&str>,
        features: &FeatureFlags,
    ) -> Vec<Fact> {
        if !features.llm_fact_extraction {
            return self.extract(user_id, message, message_id, features);
        }

        let request = self.build_extraction_prompt(message);
        match analyzer.analyze(message, &request).await {
            Ok(response) => {
                let candidates = self.parse_response(&response);
                debug!(user_id, found = candidates.len(), "Analyzer proposed fact candidates");
                let kept = filter_by_confidence(candidates, self.confidence_threshold);
                self.create_fact_objects(user_id, kept, message_id)
            }
            Err(e) => {
                warn!(user_id, error = %e, "Fact analyzer failed; falling back to rules");
                self.extract(user_id, message, message_id, features)
            }
        }
    }

    /// Render the structured extraction request for `message`.
    #[must_use]
    pub fn build_extraction_prompt(&self, message: &str) -> String {
        prompt::build_extraction_prompt(message)
    }

    /// Parse a collaborator response into candidates.
    #[must_use]
    pub fn parse_response(&self, response: &str) -> Vec<FactCandidate> {
        prompt::parse_candidates(response)
    }

    /// Convert candidates into validated facts stamped with `message_id`.
    ///
    /// Invalid candidates are dropped. When two candidates share a category
    /// and key, the later one wins.
    #[must_use]
    pub fn create_fact_objects(
        &self,
        user_id: &str,
        candidates: Vec<FactCandidate>,
        message_id: Option<&str>,
    ) -> Vec<Fact> {
        let mut order: Vec<(FactCategory, String)> = Vec::new();
        let mut facts: HashMap<(FactCategory, String), Fact> = HashMap::new();

        for candidate in candidates {
            let category = FactCategory::from_name(&candidate.category);
            let key = rules::slugify(&candidate.key);
            let Some(value) = candidate.value_text() else {
                debug!(key = %candidate.key, "Skipping fact candidate without a value");
                continue;
            };
            match Fact::new(user_id, category, key.clone(), value, candidate.confidence) {
                Ok(fact) => {
                    let fact = fact
                        .with_tags(candidate.tags)
                        .with_source(message_id);
                    let identity = (category, key);
                    if facts.insert(identity.clone(), fact).is_none() {
                        order.push(identity);
                    }
                }
                Err(e) => {
                    warn!(user_id, key = %candidate.key, error = %e, "Dropping invalid fact candidate");
                }
            }
        }

        order
            .into_iter()
            .filter_map(|identity| facts.remove(&identity))
            .collect()
    }
}
